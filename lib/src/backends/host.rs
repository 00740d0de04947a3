//! Host firmware secure variables, as exposed by skiboot's edk2-compatible
//! secvar backend.

use crate::backend::{Backend, Command, HOST_BACKEND_NAME};
use crate::config::Context;

use super::commands;

/// Variables the firmware backend manages.
const VARIABLES: &[&str] = &["PK", "KEK", "db", "dbx", "TS"];

fn read(ctx: &Context<'_>, args: &[String]) -> i32 {
    commands::read(ctx, args, VARIABLES)
}

fn write(ctx: &Context<'_>, args: &[String]) -> i32 {
    commands::write(ctx, args, VARIABLES)
}

static COMMANDS: &[Command] = &[
    Command {
        name: "read",
        handler: read,
    },
    Command {
        name: "write",
        handler: write,
    },
    Command {
        name: "validate",
        handler: commands::unsupported,
    },
    Command {
        name: "verify",
        handler: commands::unsupported,
    },
    #[cfg(feature = "crypto-write")]
    Command {
        name: "generate",
        handler: commands::unsupported,
    },
];

#[derive(Debug)]
pub(crate) struct Edk2Compat;

impl Backend for Edk2Compat {
    fn name(&self) -> &'static str {
        HOST_BACKEND_NAME
    }

    fn commands(&self) -> &[Command] {
        COMMANDS
    }
}
