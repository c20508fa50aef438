use crate::error::{Error, ErrorKind};
use std::ffi::{OsStr, OsString};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

/// A single, fully-specified engine command line.
///
/// Built fresh for every job so that the command attached to a failure is
/// always the one that was actually attempted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// The dimension query: prints `<width> <height>` of the first frame.
    pub fn dimensions(program: impl Into<PathBuf>, source: impl AsRef<Path>) -> Self {
        let mut frame = source.as_ref().as_os_str().to_os_string();
        frame.push("[0]");
        Self::new(program).arg(frame).args(["-format", "%w %h", "info:"])
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub(crate) fn command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future (timeout, cancellation) must not leave an orphaned engine behind.
            .kill_on_drop(true);
        command
    }
}

/// Renders the invocation as a copy-pasteable POSIX shell command.
impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(self.program.as_os_str()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(arg: &OsStr) -> String {
    let arg = arg.to_string_lossy();
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        return arg.into_owned();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Captured output of a successful engine run.
#[derive(Clone, Debug, Default)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

/// Pixel dimensions as reported by the dimension query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = Error;

    /// Parses `"<width> <height>"`; anything else (including zero) is invalid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::from(ErrorKind::InvalidDimensions(s.trim().to_string()));
        let mut parts = s.split_whitespace();
        let (Some(width), Some(height), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        match (width.parse::<u32>(), height.parse::<u32>()) {
            (Ok(width), Ok(height)) if width > 0 && height > 0 => Ok(Self { width, height }),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn dimension_query_selects_first_frame() {
        let invocation = Invocation::dimensions("/usr/bin/magick", "/photos/cat.gif");
        assert_eq!(invocation.to_string(), "/usr/bin/magick '/photos/cat.gif[0]' -format '%w %h' info:");
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("-resize", "-resize")]
    #[case("250x250>", "'250x250>'")]
    #[case("with space", "'with space'")]
    #[case("it's", r"'it'\''s'")]
    #[case("", "''")]
    fn test_quote(#[case] arg: &str, #[case] expected: &str) {
        assert_eq!(quote(OsStr::new(arg)), expected);
    }

    #[rstest]
    #[case("3000 2000", 3000, 2000)]
    #[case("800 600\n", 800, 600)]
    #[case("  1 1  ", 1, 1)]
    fn test_parse_dimensions(#[case] input: &str, #[case] width: u32, #[case] height: u32) {
        let dimensions: Dimensions = input.parse().unwrap();
        assert_eq!(dimensions, Dimensions { width, height });
    }

    #[rstest]
    #[case("")]
    #[case("800")]
    #[case("800 600 1")]
    #[case("0 600")]
    #[case("800 0")]
    #[case("wide tall")]
    #[case("-800 600")]
    fn test_parse_dimensions_invalid(#[case] input: &str) {
        let err = input.parse::<Dimensions>().unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidDimensions(input.trim().to_string()));
    }

    #[test]
    fn longest_side() {
        assert_eq!(Dimensions { width: 3000, height: 2000 }.longest_side(), 3000);
        assert_eq!(Dimensions { width: 600, height: 800 }.longest_side(), 800);
    }
}
