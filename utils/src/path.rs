use std::fmt::Display;

use camino::Utf8Path;

/// Display a path quoted for a POSIX shell, so that diagnostics can be
/// pasted back into a command line.
#[derive(Debug)]
pub struct QuotedPath<'a> {
    path: &'a Utf8Path,
}

impl<'a> QuotedPath<'a> {
    /// Wrap `path`. Paths made only of alphanumerics, `/`, `.`, `-` and `_`
    /// are shown unchanged.
    pub fn new<P: AsRef<Utf8Path> + ?Sized>(path: &'a P) -> Self {
        Self {
            path: path.as_ref(),
        }
    }
}

impl Display for QuotedPath<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.path.as_str();
        if s.chars()
            .all(|c| matches!(c, '/' | '.' | '-' | '_') || c.is_alphanumeric())
        {
            return f.write_str(s);
        }
        // Only fails on NUL bytes, which a path cannot hold
        let quoted = shlex::try_quote(s).map_err(|_| std::fmt::Error)?;
        f.write_str(&quoted)
    }
}
