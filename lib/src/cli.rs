//! # Secure boot variable CLI
//!
//! Command line tool to read and update platform secure boot variables.
//! The leading flags pick a mode and verbosity; the first non-flag token
//! names a subcommand which, together with everything after it, is handed
//! to the backend the platform is running.

use std::ffi::OsString;
use std::io::Write;

use anyhow::{Context as _, Result};
use cap_std_ext::cap_std;
use cap_std_ext::cap_std::fs::Dir;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::backend::{Backend, Registry};
use crate::config::{verbosity_from_count, Context, Mode, ProcessConfig};
use crate::dispatch::{dispatch, Dispatch};
use crate::outcome::{Failure, Outcome, Skip};
use crate::probe::probe;
use crate::usage::{write_help, write_usage};

/// Manage secure boot variables for host firmware or guest hypervisors.
#[derive(Debug, Parser)]
#[clap(name = "secvarctl")]
#[clap(disable_help_flag = true, disable_version_flag = true)]
#[clap(args_override_self = true)]
pub(crate) struct Opt {
    /// Print usage and exit
    #[clap(long)]
    usage: bool,

    /// Print help and usage and exit
    #[clap(long, short = 'h')]
    help: bool,

    /// Which secure boot variables to manage
    #[clap(long, short = 'm', value_enum)]
    mode: Option<Mode>,

    /// Increase logging verbosity
    #[clap(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// The subcommand and its own arguments, passed through untouched
    #[clap(trailing_var_arg = true)]
    command: Vec<OsString>,
}

impl Opt {
    /// The subcommand and its arguments.  Anything that is not UTF-8 is
    /// converted lossily, so it can never name a command.
    fn command(&self) -> Vec<String> {
        self.command
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Debug)]
enum Parsed {
    NoArguments,
    /// Parsing stopped at a leading flag, before clap saw the command line.
    Stopped(Skip),
    Opts(Opt),
    Rejected(clap::Error),
}

/// Walk the leading flags in order.  `--help`, `-h` and `--usage` end
/// parsing where they stand, as do mode errors; a bare `-` or `--` is an
/// unrecognized flag here, not a value or separator.  Returns `None` at
/// the first token this does not handle, and clap then parses (or
/// rejects) the command line as a whole.
fn scan_leading_flags(args: &[OsString]) -> Option<Skip> {
    let mut args = args.iter().skip(1).map(|a| a.to_string_lossy());
    while let Some(arg) = args.next() {
        match arg.as_ref() {
            "--usage" => return Some(Skip::Usage),
            "--help" | "-h" => return Some(Skip::Help),
            "-" | "--" => return Some(Skip::UnrecognizedFlag(arg.to_string())),
            "-v" | "--verbose" => {}
            // The next token is the value, even if it looks like a flag
            "-m" | "--mode" => match args.next() {
                Some(v) if <Mode as ValueEnum>::from_str(&v, false).is_ok() => {}
                Some(v) => return Some(Skip::InvalidMode(v.into_owned())),
                None => return Some(Skip::MissingModeValue),
            },
            _ => return None,
        }
    }
    None
}

/// Classify a command line clap refused.  Unknown flags and bad modes
/// end the run without dispatching, but are not failures.
fn rejected(e: &clap::Error) -> Outcome {
    let string_context = |kind| match e.get(kind) {
        Some(ContextValue::String(s)) => Some(s.clone()),
        _ => None,
    };
    let skip = match e.kind() {
        ErrorKind::UnknownArgument => {
            Skip::UnrecognizedFlag(string_context(ContextKind::InvalidArg).unwrap_or_default())
        }
        // --mode is the only option taking a value
        ErrorKind::InvalidValue => match string_context(ContextKind::InvalidValue) {
            Some(v) if !v.is_empty() => Skip::InvalidMode(v),
            _ => Skip::MissingModeValue,
        },
        kind => {
            tracing::error!("{kind}");
            return Failure::InvalidArguments(kind.to_string()).into();
        }
    };
    tracing::warn!("{skip}");
    skip.into()
}

/// Find the backend to dispatch to: whatever the platform reports, or
/// failing that, the backend implied by the requested mode.
pub fn resolve_backend<'r>(ctx: &Context<'_>, registry: &'r Registry) -> Option<&'r dyn Backend> {
    let requested = ctx.config.mode.backend_name();
    if let Some(backend) = probe(ctx.root, registry).backend() {
        if backend.name() != requested {
            tracing::debug!(
                "platform runs {}, not {requested}; ignoring requested mode",
                backend.name()
            );
        }
        return Some(backend);
    }
    let backend = registry.find_by_name_prefix(requested)?;
    tracing::warn!(
        "unsupported backend detected, assuming {}; read/write may not work as expected",
        backend.name()
    );
    Some(backend)
}

/// A parsed command line, ready to run.
#[derive(Debug)]
pub struct Invocation {
    parsed: Parsed,
}

impl Invocation {
    /// Parse the full argument vector, including the program name.
    /// This never fails; a rejected command line is reported by [`Self::run`].
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let parsed = if args.len() < 2 {
            Parsed::NoArguments
        } else if let Some(skip) = scan_leading_flags(&args) {
            Parsed::Stopped(skip)
        } else {
            match Opt::try_parse_from(args) {
                Ok(opt) => Parsed::Opts(opt),
                Err(e) => Parsed::Rejected(e),
            }
        };
        Self { parsed }
    }

    /// Return the log level set via command-line flags.
    pub fn log_level(&self) -> LevelFilter {
        match &self.parsed {
            Parsed::Opts(opt) => verbosity_from_count(opt.verbose),
            _ => verbosity_from_count(0),
        }
    }

    /// Run against the real platform root with the compiled-in backends,
    /// writing usage text to stdout.
    pub fn run_on_host(&self) -> Result<Outcome> {
        let root = Dir::open_ambient_dir("/", cap_std::ambient_authority()).context("Opening /")?;
        self.run(&Registry::builtin(), &root, &mut std::io::stdout())
    }

    /// Resolve the mode and backend, and dispatch the subcommand.
    /// Usage and help text are written to `out`.
    pub fn run(&self, registry: &Registry, root: &Dir, out: &mut impl Write) -> Result<Outcome> {
        let opt = match &self.parsed {
            Parsed::NoArguments => {
                write_usage(out)?;
                return Ok(Failure::NoArguments.into());
            }
            Parsed::Stopped(skip) => {
                match skip {
                    Skip::Help => write_help(out)?,
                    Skip::Usage => write_usage(out)?,
                    _ => {
                        tracing::warn!("{skip}");
                        write_usage(out)?
                    }
                }
                return Ok(skip.clone().into());
            }
            Parsed::Rejected(e) => {
                let outcome = rejected(e);
                write_usage(out)?;
                return Ok(outcome);
            }
            Parsed::Opts(opt) => opt,
        };
        tracing::debug!("parsed: {opt:?}");

        if opt.help {
            write_help(out)?;
            return Ok(Skip::Help.into());
        }
        if opt.usage {
            write_usage(out)?;
            return Ok(Skip::Usage.into());
        }
        let command = opt.command();
        let Some(subcommand) = command.first() else {
            tracing::error!("commands not found");
            write_usage(out)?;
            return Ok(Failure::MissingCommand.into());
        };
        let Some(mode) = opt.mode else {
            write_usage(out)?;
            return Ok(Skip::ModeUnset.into());
        };

        let config = ProcessConfig {
            verbosity: verbosity_from_count(opt.verbose),
            mode,
        };
        let ctx = Context::new(config, root);
        let Some(backend) = resolve_backend(&ctx, registry) else {
            let skip = Skip::ModeNotEnabled(mode);
            tracing::warn!("{skip}");
            return Ok(skip.into());
        };

        match dispatch(&ctx, backend, &command) {
            Dispatch::Ran(status) => Ok(Outcome::Dispatched { status }),
            Dispatch::UnknownCommand => {
                tracing::error!("unknown command {subcommand}");
                write_usage(out)?;
                Ok(Failure::UnknownCommand(subcommand.clone()).into())
            }
        }
    }
}
