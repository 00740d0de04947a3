//! End-to-end tests of backend resolution and dispatch.

use std::cell::RefCell;

use anyhow::Result;
use cap_std_ext::cap_std::fs::Dir;
use cap_std_ext::{cap_std, cap_tempfile};
use secvarctl_lib::backend::{
    Backend, Command, Registry, GUEST_BACKEND_NAME, HOST_BACKEND_NAME,
};
use secvarctl_lib::cli::Invocation;
use secvarctl_lib::config::{Context, Mode};
use secvarctl_lib::outcome::{
    Failure, Outcome, Skip, ARG_PARSE_FAIL, INVALID_VAR_NAME, SUCCESS, UNKNOWN_COMMAND,
    UNSUPPORTED,
};
use secvarctl_lib::probe::SECVAR_FORMAT_PATH;

thread_local! {
    static CALLS: RefCell<Vec<(&'static str, Vec<String>)>> = RefCell::new(Vec::new());
}

fn host_read(_: &Context<'_>, argv: &[String]) -> i32 {
    CALLS.with(|c| c.borrow_mut().push(("host-read", argv.to_vec())));
    0
}

fn guest_read(_: &Context<'_>, argv: &[String]) -> i32 {
    CALLS.with(|c| c.borrow_mut().push(("guest-read", argv.to_vec())));
    17
}

static HOST_COMMANDS: &[Command] = &[Command {
    name: "read",
    handler: host_read,
}];

static GUEST_COMMANDS: &[Command] = &[Command {
    name: "read",
    handler: guest_read,
}];

#[derive(Debug)]
struct FakeHost;

impl Backend for FakeHost {
    fn name(&self) -> &'static str {
        HOST_BACKEND_NAME
    }

    fn commands(&self) -> &[Command] {
        HOST_COMMANDS
    }
}

#[derive(Debug)]
struct FakeGuest;

impl Backend for FakeGuest {
    fn name(&self) -> &'static str {
        GUEST_BACKEND_NAME
    }

    fn commands(&self) -> &[Command] {
        GUEST_COMMANDS
    }
}

fn both() -> Registry {
    Registry::new(vec![Box::new(FakeHost), Box::new(FakeGuest)])
}

fn host_only() -> Registry {
    Registry::new(vec![Box::new(FakeHost)])
}

/// A platform root; `format` is written to the secvar format file if given.
fn platform(format: Option<&str>) -> Result<cap_tempfile::TempDir> {
    let td = cap_tempfile::tempdir(cap_std::ambient_authority())?;
    if let Some(format) = format {
        td.create_dir_all("sys/firmware/secvar")?;
        td.write(SECVAR_FORMAT_PATH, format)?;
    }
    Ok(td)
}

struct Run {
    outcome: Outcome,
    stdout: String,
    calls: Vec<(&'static str, Vec<String>)>,
}

fn run(registry: &Registry, root: &Dir, args: &[&str]) -> Result<Run> {
    CALLS.with(|c| c.borrow_mut().clear());
    let mut stdout = Vec::new();
    let outcome = Invocation::from_args(args).run(registry, root, &mut stdout)?;
    Ok(Run {
        outcome,
        stdout: String::from_utf8(stdout)?,
        calls: CALLS.with(|c| c.take()),
    })
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_no_arguments() -> Result<()> {
    let root = &platform(Some(HOST_BACKEND_NAME))?;
    let r = run(&both(), root, &["secvarctl"])?;
    assert_eq!(r.outcome, Outcome::Failed(Failure::NoArguments));
    assert_eq!(r.outcome.exit_code(), ARG_PARSE_FAIL);
    assert!(r.stdout.contains("USAGE:"));
    assert!(r.calls.is_empty());
    Ok(())
}

#[test]
fn test_help() -> Result<()> {
    let root = &platform(Some(HOST_BACKEND_NAME))?;
    // Flags after help are never parsed, even malformed ones
    let rests: [&[&str]; 3] = [&["-m", "host", "read"], &["--bogus"], &["-m", "firmware", "read"]];
    for flag in ["--help", "-h"] {
        for rest in rests {
            let args: Vec<&str> = ["secvarctl", flag].iter().chain(rest).copied().collect();
            let r = run(&both(), root, &args)?;
            assert_eq!(r.outcome, Outcome::Skipped(Skip::Help), "{args:?}");
            assert_eq!(r.outcome.exit_code(), SUCCESS);
            assert!(r.stdout.contains("HELP:"));
            assert!(r.stdout.contains("USAGE:"));
            assert!(r.calls.is_empty());
        }
    }
    let r = run(&both(), root, &["secvarctl", "--usage"])?;
    assert_eq!(r.outcome, Outcome::Skipped(Skip::Usage));
    assert!(!r.stdout.contains("HELP:"));
    assert!(r.stdout.contains("USAGE:"));
    Ok(())
}

#[test]
fn test_probe_selects_host() -> Result<()> {
    let root = &platform(Some("ibm,edk2-compat-v1\n"))?;
    let r = run(&both(), root, &["secvarctl", "-m", "host", "read", "-p", "PK"])?;
    assert_eq!(r.outcome, Outcome::Dispatched { status: 0 });
    assert_eq!(r.calls, vec![("host-read", argv(&["read", "-p", "PK"]))]);
    assert!(r.stdout.is_empty());
    Ok(())
}

#[test]
fn test_probe_overrides_mode() -> Result<()> {
    // The platform is authoritative over the requested mode.
    let root = &platform(Some(GUEST_BACKEND_NAME))?;
    let r = run(&both(), root, &["secvarctl", "-m", "guest", "read"])?;
    assert_eq!(r.outcome, Outcome::Dispatched { status: 17 });
    assert_eq!(r.outcome.exit_code(), 17);
    let r = run(&both(), root, &["secvarctl", "-m", "host", "read"])?;
    assert_eq!(r.calls[0].0, "guest-read");
    Ok(())
}

#[test]
fn test_unknown_command() -> Result<()> {
    let root = &platform(Some(GUEST_BACKEND_NAME))?;
    let r = run(&both(), root, &["secvarctl", "-m", "guest", "bogus-subcommand"])?;
    assert_eq!(
        r.outcome,
        Outcome::Failed(Failure::UnknownCommand("bogus-subcommand".into()))
    );
    assert_eq!(r.outcome.exit_code(), UNKNOWN_COMMAND);
    assert!(r.stdout.contains("USAGE:"));
    assert!(r.calls.is_empty());
    Ok(())
}

#[test]
fn test_fallback_to_mode() -> Result<()> {
    for format in [None, Some(""), Some("ibm,secvar-v2")] {
        let root = &platform(format)?;
        let r = run(&both(), root, &["secvarctl", "-m", "guest", "read", "db"])?;
        assert_eq!(r.outcome, Outcome::Dispatched { status: 17 }, "{format:?}");
        assert_eq!(r.calls, vec![("guest-read", argv(&["read", "db"]))]);
    }
    Ok(())
}

#[test]
fn test_mode_not_enabled() -> Result<()> {
    let root = &platform(None)?;
    let r = run(&host_only(), root, &["secvarctl", "-m", "guest", "read"])?;
    assert_eq!(r.outcome, Outcome::Skipped(Skip::ModeNotEnabled(Mode::Guest)));
    assert_eq!(r.outcome.exit_code(), SUCCESS);
    assert!(r.calls.is_empty());
    // But a platform that reports a compiled-in backend still dispatches.
    let root = &platform(Some(HOST_BACKEND_NAME))?;
    let r = run(&host_only(), root, &["secvarctl", "-m", "guest", "read"])?;
    assert_eq!(r.calls.len(), 1);
    Ok(())
}

#[test]
fn test_non_utf8_command() -> Result<()> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let root = &platform(Some(HOST_BACKEND_NAME))?;
    let args = [
        OsString::from("secvarctl"),
        OsString::from("-m"),
        OsString::from("host"),
        OsString::from_vec(b"read\xff".to_vec()),
    ];
    let mut stdout = Vec::new();
    let outcome = Invocation::from_args(args).run(&both(), root, &mut stdout)?;
    assert_eq!(
        outcome,
        Outcome::Failed(Failure::UnknownCommand("read\u{fffd}".into()))
    );
    assert_eq!(outcome.exit_code(), UNKNOWN_COMMAND);
    Ok(())
}

#[test]
fn test_missing_command() -> Result<()> {
    let root = &platform(Some(HOST_BACKEND_NAME))?;
    let r = run(&both(), root, &["secvarctl", "-m", "host", "-v"])?;
    assert_eq!(r.outcome, Outcome::Failed(Failure::MissingCommand));
    assert_eq!(r.outcome.exit_code(), ARG_PARSE_FAIL);
    assert!(r.stdout.contains("USAGE:"));
    Ok(())
}

#[test]
fn test_mode_errors_exit_successfully() -> Result<()> {
    let root = &platform(Some(HOST_BACKEND_NAME))?;
    let cases: [(&[&str], Skip); 6] = [
        (&["secvarctl", "read"], Skip::ModeUnset),
        (
            &["secvarctl", "-m", "firmware", "read"],
            Skip::InvalidMode("firmware".into()),
        ),
        (&["secvarctl", "-m"], Skip::MissingModeValue),
        (
            &["secvarctl", "-x", "read"],
            Skip::UnrecognizedFlag("-x".into()),
        ),
        // Dashes are flags here, not a value or a separator
        (
            &["secvarctl", "-m", "host", "-"],
            Skip::UnrecognizedFlag("-".into()),
        ),
        (
            &["secvarctl", "-m", "host", "--", "read"],
            Skip::UnrecognizedFlag("--".into()),
        ),
    ];
    for (args, skip) in cases {
        let r = run(&both(), root, args)?;
        assert_eq!(r.outcome, Outcome::Skipped(skip), "{args:?}");
        assert_eq!(r.outcome.exit_code(), SUCCESS);
        assert!(r.stdout.contains("USAGE:"));
        assert!(r.calls.is_empty());
    }
    Ok(())
}

/// Run the compiled-in backends against a platform tree on disk.
mod builtin {
    use super::*;
    use std::path::Path;

    fn sysfs(format: &str) -> Result<tempfile::TempDir> {
        let td = tempfile::tempdir()?;
        let vars = td.path().join("sys/firmware/secvar/vars");
        for var in ["PK", "KEK", "db"] {
            std::fs::create_dir_all(vars.join(var))?;
            std::fs::write(vars.join(var).join("data"), b"\x30\x82")?;
            std::fs::write(vars.join(var).join("update"), "")?;
        }
        std::fs::write(td.path().join(SECVAR_FORMAT_PATH), format)?;
        Ok(td)
    }

    fn open(path: &Path) -> Result<Dir> {
        Ok(Dir::open_ambient_dir(path, cap_std::ambient_authority())?)
    }

    #[test]
    #[cfg(feature = "host")]
    fn test_read() -> Result<()> {
        let td = sysfs(HOST_BACKEND_NAME)?;
        let root = &open(td.path())?;
        let registry = &Registry::builtin();
        let r = run(registry, root, &["secvarctl", "-m", "host", "read", "-r", "PK"])?;
        assert_eq!(r.outcome, Outcome::Dispatched { status: SUCCESS });
        // Only the guest keystore has grubdb
        let r = run(registry, root, &["secvarctl", "-m", "host", "read", "grubdb"])?;
        assert_eq!(
            r.outcome,
            Outcome::Dispatched {
                status: INVALID_VAR_NAME
            }
        );
        Ok(())
    }

    #[test]
    #[cfg(feature = "guest")]
    fn test_write() -> Result<()> {
        let td = sysfs(GUEST_BACKEND_NAME)?;
        let root = &open(td.path())?;
        let update = td.path().join("db.auth");
        std::fs::write(&update, "signed update")?;
        let update = update.to_str().unwrap();

        let registry = &Registry::builtin();
        let args = ["secvarctl", "-m", "guest", "write", "db", update];
        let r = run(registry, root, &args)?;
        assert_eq!(r.outcome, Outcome::Dispatched { status: UNSUPPORTED });
        let written = td.path().join("sys/firmware/secvar/vars/db/update");
        assert_eq!(std::fs::read_to_string(&written)?, "");

        let args = ["secvarctl", "-m", "guest", "write", "-f", "db", update];
        let r = run(registry, root, &args)?;
        assert_eq!(r.outcome, Outcome::Dispatched { status: SUCCESS });
        assert_eq!(std::fs::read_to_string(&written)?, "signed update");
        Ok(())
    }

    #[test]
    #[cfg(feature = "host")]
    fn test_unsupported() -> Result<()> {
        let td = sysfs(HOST_BACKEND_NAME)?;
        let root = &open(td.path())?;
        let registry = &Registry::builtin();
        for mode in ["host", "guest"] {
            for cmd in ["validate", "verify"] {
                let r = run(registry, root, &["secvarctl", "-m", mode, cmd, "x.auth"])?;
                assert_eq!(r.outcome, Outcome::Dispatched { status: UNSUPPORTED });
                let r = run(registry, root, &["secvarctl", "-m", mode, cmd, "--usage"])?;
                assert_eq!(r.outcome, Outcome::Dispatched { status: SUCCESS });
            }
        }
        Ok(())
    }
}
