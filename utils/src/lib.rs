//! Helpers shared by the `secvarctl` entrypoint and library which only
//! depend on the standard library and "core" crates.
//!
mod path;
pub use path::*;
mod tracing_util;
pub use tracing_util::*;
