//! Subcommands shared by the host and guest backends.
//!
//! Both backends expose their variables the same way under sysfs:
//! `<vars>/<NAME>/data` holds the current value, `size` its reported size,
//! and writing a signed update to `update` queues it for the next boot.

use std::io::{Read as _, Write};

use anyhow::{Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std_ext::cap_std;
use cap_std_ext::cap_std::fs::{Dir, OpenOptions};
use cap_std_ext::dirext::CapStdExtDirExt;
use clap::{CommandFactory, Parser};
use fn_error_context::context;
use secvarctl_utils::QuotedPath;

use crate::config::Context;
use crate::outcome::{ARG_PARSE_FAIL, FILE_IO_FAIL, INVALID_VAR_NAME, SUCCESS, UNSUPPORTED};

/// The variables directory, relative to the platform root.
pub(crate) const SECVAR_VARS_PATH: &str = "sys/firmware/secvar/vars";

/// Print name and size of secure variables
#[derive(Debug, Parser)]
struct ReadOpts {
    /// Print usage and exit
    #[clap(long)]
    usage: bool,

    /// Also print the variable data, hex encoded
    #[clap(long, short = 'r')]
    raw: bool,

    /// Read variables from this directory instead of sysfs
    #[clap(long, short = 'p')]
    path: Option<Utf8PathBuf>,

    /// Variables to print; defaults to all variables the backend knows
    variables: Vec<String>,
}

/// Queue a signed update for a secure variable, applied on reboot
#[derive(Debug, Parser)]
struct WriteOpts {
    /// Print usage and exit
    #[clap(long)]
    usage: bool,

    /// Write the update without validating it first
    #[clap(long, short = 'f')]
    force: bool,

    /// Write to variables in this directory instead of sysfs
    #[clap(long, short = 'p')]
    path: Option<Utf8PathBuf>,

    /// The variable to update
    #[clap(required_unless_present = "usage")]
    variable: Option<String>,

    /// The signed update
    #[clap(required_unless_present = "usage")]
    file: Option<Utf8PathBuf>,
}

/// Commands that need signature and certificate handling
#[derive(Debug, Parser)]
struct UnsupportedOpts {
    /// Print usage and exit
    #[clap(long)]
    usage: bool,

    /// Arguments for the command
    #[clap(trailing_var_arg = true)]
    args: Vec<String>,
}

fn command_for<T: CommandFactory>(args: &[String]) -> clap::Command {
    let name = args.first().map(String::as_str).unwrap_or_default();
    T::command().bin_name(format!("secvarctl {name}"))
}

/// Parse a handler's arguments; on failure (or `--help`) the message has
/// already been printed and the status to return is given instead.
fn parse_args<T: Parser>(args: &[String]) -> std::result::Result<T, i32> {
    let mut cmd = command_for::<T>(args);
    let r = cmd
        .try_get_matches_from_mut(args)
        .and_then(|m| T::from_arg_matches(&m));
    r.map_err(|e| {
        let e = e.format(&mut cmd);
        if let Err(err) = e.print() {
            tracing::warn!("printing usage: {err}");
        }
        if e.use_stderr() {
            ARG_PARSE_FAIL
        } else {
            SUCCESS
        }
    })
}

fn print_usage<T: CommandFactory>(args: &[String]) -> i32 {
    println!("{}", command_for::<T>(args).render_usage());
    SUCCESS
}

/// Reject names outside `known`, returning the first bad one.
fn check_names<'a>(names: &[&'a str], known: &[&str]) -> std::result::Result<(), &'a str> {
    match names.iter().copied().find(|n| !known.contains(n)) {
        Some(bad) => Err(bad),
        None => Ok(()),
    }
}

#[context("Opening secure variables")]
fn open_vars(root: &Dir, path: Option<&Utf8Path>) -> Result<Dir> {
    let vars = match path {
        Some(p) => Dir::open_ambient_dir(p, cap_std::ambient_authority())
            .with_context(|| format!("Opening {}", QuotedPath::new(p)))?,
        None => root
            .open_dir(SECVAR_VARS_PATH)
            .with_context(|| format!("Opening /{SECVAR_VARS_PATH}"))?,
    };
    Ok(vars)
}

fn print_variables(
    vars: &Dir,
    names: &[&str],
    raw: bool,
    verbose: bool,
    out: &mut impl Write,
) -> Result<()> {
    for &name in names {
        let Some(var) = vars.open_dir_optional(name)? else {
            tracing::warn!("could not find variable {name}");
            continue;
        };
        let data = var
            .read("data")
            .with_context(|| format!("Reading {name}/data"))?;
        writeln!(out, "{name}:")?;
        writeln!(out, "    Size: {} bytes", data.len())?;
        if verbose {
            if let Some(mut f) = var.open_optional("size")? {
                let mut size = String::new();
                f.read_to_string(&mut size)
                    .with_context(|| format!("Reading {name}/size"))?;
                writeln!(out, "    Reported size: {}", size.trim())?;
            }
        }
        if raw && !data.is_empty() {
            writeln!(out, "    Data: {}", hex::encode(&data))?;
        }
    }
    Ok(())
}

#[context("Updating {}", variable)]
fn write_update(vars: &Dir, variable: &str, update: &[u8]) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Update is empty");
    }
    let var = vars.open_dir(variable)?;
    // sysfs attributes must be opened in place, not replaced; truncation
    // only matters for a plain directory given with --path
    let mut f = var.open_with("update", OpenOptions::new().write(true).truncate(true))?;
    f.write_all(update)?;
    Ok(())
}

/// Implementation of `read`.
pub(crate) fn read(ctx: &Context<'_>, args: &[String], known: &[&str]) -> i32 {
    let opts = match parse_args::<ReadOpts>(args) {
        Ok(opts) => opts,
        Err(status) => return status,
    };
    if opts.usage {
        return print_usage::<ReadOpts>(args);
    }
    let names: Vec<&str> = if opts.variables.is_empty() {
        known.to_vec()
    } else {
        opts.variables.iter().map(String::as_str).collect()
    };
    if let Err(bad) = check_names(&names, known) {
        tracing::error!("invalid variable name {bad}; expected one of: {}", known.join(" "));
        return INVALID_VAR_NAME;
    }
    let r = open_vars(ctx.root, opts.path.as_deref()).and_then(|vars| {
        let stdout = &mut std::io::stdout().lock();
        print_variables(&vars, &names, opts.raw, ctx.config.is_verbose(), stdout)
    });
    match r {
        Ok(()) => SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            FILE_IO_FAIL
        }
    }
}

/// Implementation of `write`.
pub(crate) fn write(ctx: &Context<'_>, args: &[String], known: &[&str]) -> i32 {
    let opts = match parse_args::<WriteOpts>(args) {
        Ok(opts) => opts,
        Err(status) => return status,
    };
    if opts.usage {
        return print_usage::<WriteOpts>(args);
    }
    // Both are required unless --usage was given
    let (Some(variable), Some(file)) = (opts.variable.as_deref(), opts.file.as_deref()) else {
        return ARG_PARSE_FAIL;
    };
    if let Err(bad) = check_names(&[variable], known) {
        tracing::error!("invalid variable name {bad}; expected one of: {}", known.join(" "));
        return INVALID_VAR_NAME;
    }
    if !opts.force {
        tracing::error!(
            "validating {} requires signature verification, which this build does not include; use --force to write it anyway",
            QuotedPath::new(file)
        );
        return UNSUPPORTED;
    }
    let r = std::fs::read(file)
        .with_context(|| format!("Reading {}", QuotedPath::new(file)))
        .and_then(|update| {
            let vars = open_vars(ctx.root, opts.path.as_deref())?;
            write_update(&vars, variable, &update)?;
            Ok(update.len())
        });
    match r {
        Ok(len) => {
            tracing::info!("wrote {len} bytes to {variable}, committed upon reboot");
            SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            FILE_IO_FAIL
        }
    }
}

/// Implementation of `validate`, `verify` and `generate`, none of which
/// can run without the signature and certificate layer.
pub(crate) fn unsupported(_ctx: &Context<'_>, args: &[String]) -> i32 {
    let opts = match parse_args::<UnsupportedOpts>(args) {
        Ok(opts) => opts,
        Err(status) => return status,
    };
    if opts.usage {
        return print_usage::<UnsupportedOpts>(args);
    }
    let name = args.first().map(String::as_str).unwrap_or_default();
    tracing::error!(
        "{name} requires signature and certificate support, which this build does not include"
    );
    UNSUPPORTED
}
