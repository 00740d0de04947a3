//! Top-level usage and help text.

use std::io::Write;

use anyhow::Result;
use fn_error_context::context;
use indoc::indoc;

const USAGE: &str = indoc! {"

    USAGE:
        $ secvarctl [MODE] [COMMAND]
    MODEs:
    -m, --mode      supports both the Guest and Host secure boot variables in two different modes
                    and either -m host or -m guest are acceptable values.
    COMMANDs:
        --help/--usage
        read        prints info on secure variables,
                    use 'secvarctl [MODE] read --usage/help' for more information
        write       updates secure variable with new auth,
                    use 'secvarctl [MODE] write --usage/help' for more information
        validate    validates format of given esl/cert/auth,
                    use 'secvarctl [MODE] validate --usage/help' for more information
        verify      compares proposed variable to the current variables,
                    use 'secvarctl [MODE] verify --usage/help' for more information
"};

#[cfg(feature = "crypto-write")]
const USAGE_GENERATE: &str = concat!(
    "    generate    creates relevant files for secure variable management,\n",
    "                use 'secvarctl [MODE] generate --usage/help' for more information\n",
);

const HELP: &str = indoc! {"

    HELP:
        A command line tool for simplifying the reading and writing of secure boot variables.
        Commands are:
            read - print out information on their current secure variables
            write - update the given variable's key value, committed upon reboot
            validate - checks format requirements are met for the given file type
            verify - checks that the given files are correctly signed by the current variables
"};

#[cfg(feature = "crypto-write")]
const HELP_GENERATE: &str =
    "        generate - create files that are relevant to the secure variable management process\n";

/// Write the usage text.
#[context("Writing usage")]
pub(crate) fn write_usage(out: &mut impl Write) -> Result<()> {
    out.write_all(USAGE.as_bytes())?;
    #[cfg(feature = "crypto-write")]
    out.write_all(USAGE_GENERATE.as_bytes())?;
    Ok(())
}

/// Write the help text, followed by the usage text.
#[context("Writing help")]
pub(crate) fn write_help(out: &mut impl Write) -> Result<()> {
    out.write_all(HELP.as_bytes())?;
    #[cfg(feature = "crypto-write")]
    out.write_all(HELP_GENERATE.as_bytes())?;
    write_usage(out)
}
