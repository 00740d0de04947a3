//! Backends and the registry of those compiled into this binary.

use crate::config::Context;

/// Name the host firmware reports for its secure variable format.
pub const HOST_BACKEND_NAME: &str = "ibm,edk2-compat-v1";
/// Name the hypervisor keystore reports for its secure variable format.
pub const GUEST_BACKEND_NAME: &str = "ibm,plpks-sb-v1";

/// A subcommand implementation.  It receives the argument vector starting
/// at its own subcommand token and returns the process exit status.
pub type Handler = fn(&Context<'_>, &[String]) -> i32;

/// A named entry in a backend's command table.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    /// The subcommand token that selects this entry.
    pub name: &'static str,
    /// The implementation.
    pub handler: Handler,
}

/// A platform-specific family of secure variable commands.
pub trait Backend: std::fmt::Debug {
    /// The format string the platform reports when this backend is active;
    /// this is also the registry key and must remain stable.
    fn name(&self) -> &'static str;

    /// The command table, in match order.
    fn commands(&self) -> &[Command];
}

/// The backends available to this invocation.
#[derive(Debug, Default)]
pub struct Registry {
    backends: Vec<Box<dyn Backend>>,
}

impl Registry {
    /// Create a registry from an ordered list of backends.
    pub fn new(backends: Vec<Box<dyn Backend>>) -> Self {
        Self { backends }
    }

    /// The backends enabled at build time.
    pub fn builtin() -> Self {
        crate::backends::builtin()
    }

    /// Iterate over the registered backends in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Backend> {
        self.backends.iter().map(|b| b.as_ref())
    }

    /// Length of the longest registered name; this is how much of the
    /// platform format file is worth reading.
    pub fn max_name_len(&self) -> usize {
        self.iter().map(|b| b.name().len()).max().unwrap_or_default()
    }

    /// Find the first backend whose name `candidate` begins with.
    ///
    /// This is a prefix match over the registered name, so trailing data
    /// (a newline, a version suffix) in the candidate is tolerated.
    pub fn find_by_name_prefix(&self, candidate: impl AsRef<[u8]>) -> Option<&dyn Backend> {
        let candidate = candidate.as_ref();
        let found = self
            .iter()
            .find(|b| candidate.starts_with(b.name().as_bytes()))?;
        tracing::info!("found backend {}", found.name());
        Some(found)
    }
}
