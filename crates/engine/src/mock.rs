//! In-memory engine for testing.

use crate::error::{ErrorKind, Result};
use crate::{Engine, Invocation, Output};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;

/// How a scripted invocation should go wrong.
#[derive(Clone, Debug)]
pub enum MockFailure {
    /// Exit with the given code and stderr.
    Exit(i32, String),
    /// Exit successfully without writing the destination file.
    NoOutput,
    /// Fail to start, as if the executable vanished.
    Spawn,
    /// Never finish (well, not for an hour).
    Hang,
}

struct Rule {
    needle: String,
    failure: MockFailure,
    remaining: Option<usize>,
}

/// Engine that never spawns a process.
///
/// Dimension queries are answered from a table keyed by file name. Transforms
/// create the destination file (containing the command line) unless a
/// scripted failure matches. Every invocation is recorded for inspection.
///
/// # Examples
///
/// ```
/// use thumbs_engine::{Engine, Invocation, MockEngine};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let engine = MockEngine::new().with_image("cat.png", 3000, 2000);
/// let query = Invocation::dimensions(engine.program(), "/photos/cat.png");
/// let output = engine.run(&query, Duration::from_secs(1)).await.unwrap();
/// assert_eq!(output.stdout, "3000 2000");
/// # }
/// ```
pub struct MockEngine {
    program: PathBuf,
    dimensions: HashMap<String, String>,
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("/mock/bin/magick"),
            dimensions: HashMap::new(),
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Registers the dimensions reported for any file with this name.
    pub fn with_image(self, name: impl Into<String>, width: u32, height: u32) -> Self {
        self.with_identify_output(name, format!("{width} {height}"))
    }

    /// Registers raw dimension query output, for feeding garbage.
    pub fn with_identify_output(mut self, name: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), stdout.into());
        self
    }

    /// Every invocation whose command line contains `needle` fails.
    pub fn fail(self, needle: impl Into<String>, failure: MockFailure) -> Self {
        self.push_rule(needle, failure, None)
    }

    /// The first `times` invocations whose command line contains `needle` fail.
    pub fn fail_times(self, needle: impl Into<String>, failure: MockFailure, times: usize) -> Self {
        self.push_rule(needle, failure, Some(times))
    }

    fn push_rule(mut self, needle: impl Into<String>, failure: MockFailure, remaining: Option<usize>) -> Self {
        self.rules.get_mut().push(Rule { needle: needle.into(), failure, remaining });
        self
    }

    /// All invocations received so far, in order.
    pub async fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().await.clone()
    }

    async fn scripted_failure(&self, command: &str) -> Option<MockFailure> {
        let mut rules = self.rules.lock().await;
        let rule = rules.iter_mut().find(|r| command.contains(&r.needle) && r.remaining != Some(0))?;
        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(rule.failure.clone())
    }

    fn identify(&self, invocation: &Invocation) -> Result<Output> {
        let source = invocation.arguments().first().map(|a| a.to_string_lossy().into_owned()).unwrap_or_default();
        let source = source.strip_suffix("[0]").unwrap_or(&source);
        let name = Path::new(source).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match self.dimensions.get(&name) {
            Some(stdout) => Ok(Output { stdout: stdout.clone(), stderr: String::new() }),
            None => exn::bail!(ErrorKind::NonZeroExit {
                code: Some(1),
                stderr: format!("identify: unable to open image '{source}'"),
            }),
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn program(&self) -> &Path {
        &self.program
    }

    async fn execute(&self, invocation: &Invocation) -> Result<Output> {
        self.calls.lock().await.push(invocation.clone());
        let command = invocation.to_string();
        match self.scripted_failure(&command).await {
            Some(MockFailure::Exit(code, stderr)) => exn::bail!(ErrorKind::NonZeroExit { code: Some(code), stderr }),
            Some(MockFailure::Spawn) => exn::bail!(ErrorKind::Spawn("No such file or directory (os error 2)".into())),
            Some(MockFailure::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Ok(Output::default());
            },
            Some(MockFailure::NoOutput) => return Ok(Output::default()),
            None => {},
        }
        let last = invocation.arguments().last().map(|a| a.to_string_lossy().into_owned()).unwrap_or_default();
        if last == "info:" {
            return self.identify(invocation);
        }
        // Transforms end with `<format>:<destination>`.
        let destination = last.split_once(':').map_or(last.as_str(), |(_, path)| path);
        if let Err(e) = std::fs::write(destination, command.as_bytes()) {
            exn::bail!(ErrorKind::NonZeroExit { code: Some(1), stderr: e.to_string() });
        }
        Ok(Output::default())
    }
}
