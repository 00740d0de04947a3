//! How an invocation ended, and the exit status each ending maps to.
//!
//! The numeric values are a compatibility contract with scripts written
//! against earlier releases; several "error" paths deliberately exit
//! with [`SUCCESS`].

use crate::config::Mode;

/// The invocation completed.
pub const SUCCESS: i32 = 0;
/// An internal error, e.g. the root filesystem could not be opened.
pub const FATAL: i32 = 1;
/// No arguments, no subcommand, or an unparsable command line.
pub const ARG_PARSE_FAIL: i32 = 2;
/// The subcommand is not in the selected backend's command table.
pub const UNKNOWN_COMMAND: i32 = 3;
/// The subcommand needs support this build does not carry.
pub const UNSUPPORTED: i32 = 4;
/// A secure variable name the backend does not know.
pub const INVALID_VAR_NAME: i32 = 5;
/// A handler failed reading or writing a file.
pub const FILE_IO_FAIL: i32 = 6;

/// Why dispatch was intentionally not attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Skip {
    /// `--help` or `-h`.
    #[error("help requested")]
    Help,
    /// `--usage`.
    #[error("usage requested")]
    Usage,
    /// A leading flag that is not recognized.
    #[error("unrecognized option {0}")]
    UnrecognizedFlag(String),
    /// `--mode` with something other than `host` or `guest`.
    #[error("{0} is unknown mode")]
    InvalidMode(String),
    /// `--mode` without a value.
    #[error("mode name is needed")]
    MissingModeValue,
    /// No `--mode` was given.
    #[error("no mode given")]
    ModeUnset,
    /// Neither the probe nor the requested mode resolved to a compiled-in
    /// backend.
    #[error("{0} mode is not enabled")]
    ModeNotEnabled(Mode),
}

/// The command line could not be acted upon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// Nothing after the program name.
    #[error("no arguments given")]
    NoArguments,
    /// Flags were given but no subcommand followed them.
    #[error("commands not found")]
    MissingCommand,
    /// The subcommand is not in the backend's command table.
    #[error("unknown command {0}")]
    UnknownCommand(String),
    /// The command line was rejected for another reason.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// The result of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ran; its status is passed through unchanged.
    Dispatched {
        /// The handler's return value.
        status: i32,
    },
    /// The invocation ended without dispatching, on purpose.
    Skipped(Skip),
    /// The invocation failed before a handler could run.
    Failed(Failure),
}

impl Outcome {
    /// The process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Dispatched { status } => *status,
            Outcome::Skipped(_) => SUCCESS,
            Outcome::Failed(Failure::UnknownCommand(_)) => UNKNOWN_COMMAND,
            Outcome::Failed(
                Failure::NoArguments | Failure::MissingCommand | Failure::InvalidArguments(_),
            ) => ARG_PARSE_FAIL,
        }
    }
}

impl From<Skip> for Outcome {
    fn from(value: Skip) -> Self {
        Self::Skipped(value)
    }
}

impl From<Failure> for Outcome {
    fn from(value: Failure) -> Self {
        Self::Failed(value)
    }
}
