//! Detect which secure variable backend the platform is running.
//!
//! The firmware (or hypervisor) exposes a short format string under
//! sysfs.  Nothing here is fatal: an absent or unrecognized format is
//! logged and left to the caller to recover from.

use std::io::Read;

use cap_std_ext::cap_std::fs::Dir;
use cap_std_ext::dirext::CapStdExtDirExt;

use crate::backend::{Backend, Registry};

/// The format file, relative to the platform root.
pub const SECVAR_FORMAT_PATH: &str = "sys/firmware/secvar/format";

/// What reading the platform format file found.
#[derive(Debug)]
pub enum Probe<'r> {
    /// The format names a registered backend.
    Found(&'r dyn Backend),
    /// The format file does not exist.
    Unsupported,
    /// The format file exists but could not be read, or was empty.
    Unreadable,
    /// The format file names something that is not registered.
    UnknownFormat(String),
}

impl<'r> Probe<'r> {
    /// The detected backend, if any.
    pub fn backend(&self) -> Option<&'r dyn Backend> {
        match self {
            Probe::Found(b) => Some(*b),
            _ => None,
        }
    }
}

/// Read at most `len` bytes of the format file; `Ok(None)` if it is absent.
fn read_format(root: &Dir, len: usize) -> std::io::Result<Option<Vec<u8>>> {
    let Some(f) = root.open_optional(SECVAR_FORMAT_PATH)? else {
        return Ok(None);
    };
    let mut buf = Vec::with_capacity(len);
    f.take(len as u64).read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// Determine the active backend by reading [`SECVAR_FORMAT_PATH`] under `root`.
pub fn probe<'r>(root: &Dir, registry: &'r Registry) -> Probe<'r> {
    let buf = match read_format(root, registry.max_name_len()) {
        Ok(Some(buf)) if !buf.is_empty() => buf,
        Ok(None) => {
            tracing::warn!("platform does not support secure variables");
            return Probe::Unsupported;
        }
        Ok(Some(_)) => {
            tracing::warn!(
                "could not extract data from /{SECVAR_FORMAT_PATH}, assuming platform does not support secure variables"
            );
            return Probe::Unreadable;
        }
        Err(e) => {
            tracing::warn!(
                "could not extract data from /{SECVAR_FORMAT_PATH}: {e}, assuming platform does not support secure variables"
            );
            return Probe::Unreadable;
        }
    };
    match registry.find_by_name_prefix(&buf) {
        Some(backend) => Probe::Found(backend),
        None => {
            let format = String::from_utf8_lossy(&buf).trim_end().to_string();
            tracing::warn!("/{SECVAR_FORMAT_PATH} does not contain known backend format: {format}");
            Probe::UnknownFormat(format)
        }
    }
}
