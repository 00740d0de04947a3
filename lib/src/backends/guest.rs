//! Guest secure variables, stored in the hypervisor's Platform KeyStore.

use crate::backend::{Backend, Command, GUEST_BACKEND_NAME};
use crate::config::Context;

use super::commands;

/// Variables the keystore manages; the grub and module databases are
/// specific to guest secure boot.
const VARIABLES: &[&str] = &[
    "PK",
    "KEK",
    "db",
    "dbx",
    "grubdb",
    "grubdbx",
    "sbat",
    "moduledb",
    "trustedcadb",
];

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
pub(crate) struct Plpks;

impl Backend for Plpks {
    fn name(&self) -> &'static str {
        GUEST_BACKEND_NAME
    }

    fn commands(&self) -> &[Command] {
        COMMANDS
    }
}
