//! The main entrypoint for secvarctl, which just calls into the library.

use anyhow::Result;
use secvarctl_lib::cli::Invocation;
use secvarctl_lib::outcome::FATAL;

fn run() -> Result<i32> {
    let invocation = Invocation::from_args(std::env::args_os());
    secvarctl_utils::initialize_tracing(invocation.log_level());
    tracing::trace!("starting");
    let outcome = invocation.run_on_host()?;
    tracing::debug!("finished: {outcome:?}");
    Ok(outcome.exit_code())
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            FATAL
        }
    };
    std::process::exit(code);
}
