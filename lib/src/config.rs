//! Per-invocation configuration.
//!
//! Everything here is decided while parsing the command line and is
//! read-only afterwards; it is handed by reference to the prober, the
//! dispatcher and the backend command handlers.

use cap_std_ext::cap_std::fs::Dir;
use tracing::level_filters::LevelFilter;

use crate::backend::{GUEST_BACKEND_NAME, HOST_BACKEND_NAME};

/// Which backend family the user asked to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Host firmware secure variables.
    Host,
    /// Guest (hypervisor keystore) secure variables.
    Guest,
}

impl Mode {
    /// The registry name assumed for this mode when the platform probe
    /// is inconclusive.
    pub fn backend_name(self) -> &'static str {
        match self {
            Mode::Host => HOST_BACKEND_NAME,
            Mode::Guest => GUEST_BACKEND_NAME,
        }
    }

    /// The command line spelling of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Host => "host",
            Mode::Guest => "guest",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a `-v` repeat count to a log level.
pub fn verbosity_from_count(count: u8) -> LevelFilter {
    match count {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Configuration resolved from the leading flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessConfig {
    /// Log level requested on the command line.
    pub verbosity: LevelFilter,
    /// The requested backend family.
    pub mode: Mode,
}

impl ProcessConfig {
    /// Whether `-v` was given at least once.
    pub fn is_verbose(&self) -> bool {
        self.verbosity >= LevelFilter::DEBUG
    }
}

/// State shared with every component that runs after argument parsing.
#[derive(Debug)]
pub struct Context<'a> {
    /// The parsed configuration.
    pub config: ProcessConfig,
    /// The root of the platform filesystem; `/` outside of tests.
    pub root: &'a Dir,
}

impl<'a> Context<'a> {
    /// Bundle a configuration with the platform root.
    pub fn new(config: ProcessConfig, root: &'a Dir) -> Self {
        Self { config, root }
    }
}
