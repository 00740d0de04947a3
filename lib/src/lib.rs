//! # Secure boot variable tool
//!
//! This crate implements `secvarctl`: it works out which secure variable
//! backend the running platform exposes (host firmware or guest
//! hypervisor), and hands the requested subcommand to that backend's
//! command table.

// See https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![forbid(unused_must_use)]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]

#[cfg(not(any(feature = "host", feature = "guest")))]
compile_error!("at least one of the `host` or `guest` features must be enabled");

pub mod backend;
mod backends;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod outcome;
pub mod probe;
mod usage;
