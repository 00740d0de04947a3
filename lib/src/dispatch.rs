//! Route a subcommand to the selected backend's handler.

use crate::backend::Backend;
use crate::config::Context;

/// Only this many leading bytes of a subcommand name are compared.
pub const MAX_COMMAND_NAME_LEN: usize = 32;

/// Result of looking up and running a subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran and returned this status.
    Ran(i32),
    /// Nothing in the command table matched.
    UnknownCommand,
}

fn command_name_matches(candidate: &str, name: &str) -> bool {
    let truncate = |s: &str| s.bytes().take(MAX_COMMAND_NAME_LEN).collect::<Vec<u8>>();
    truncate(candidate) == truncate(name)
}

/// Invoke the first command in `backend` whose name matches `argv[0]`,
/// passing it the whole of `argv`.  At most one handler runs.
pub fn dispatch(ctx: &Context<'_>, backend: &dyn Backend, argv: &[String]) -> Dispatch {
    let Some(subcommand) = argv.first() else {
        return Dispatch::UnknownCommand;
    };
    let Some(cmd) = backend
        .commands()
        .iter()
        .find(|c| command_name_matches(subcommand, c.name))
    else {
        return Dispatch::UnknownCommand;
    };
    tracing::debug!("dispatching {} to {}", cmd.name, backend.name());
    Dispatch::Ran((cmd.handler)(ctx, argv))
}
