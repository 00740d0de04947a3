//! The backends compiled into this binary.

mod commands;
#[cfg(feature = "guest")]
mod guest;
#[cfg(feature = "host")]
mod host;

use crate::backend::{Backend, Registry};

/// Build the registry from whichever backends were enabled at build time,
/// host first.
pub(crate) fn builtin() -> Registry {
    let mut backends: Vec<Box<dyn Backend>> = Vec::new();
    #[cfg(feature = "host")]
    backends.push(Box::new(host::Edk2Compat));
    #[cfg(feature = "guest")]
    backends.push(Box::new(guest::Plpks));
    Registry::new(backends)
}
