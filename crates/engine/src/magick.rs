use crate::error::{ErrorKind, Result};
use crate::{Engine, Invocation, Output};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Executable names searched for on `PATH`, in order of preference.
// ImageMagick 7 ships `magick`; `convert` is the ImageMagick 6 name (and on
// Windows, an unrelated disk utility).
#[cfg(not(windows))]
const EXECUTABLES: [&str; 2] = ["magick", "convert"];
#[cfg(windows)]
const EXECUTABLES: [&str; 1] = ["magick"];

/// A located ImageMagick executable.
#[derive(Clone, Debug)]
pub struct ImageMagick {
    path: PathBuf,
}

impl ImageMagick {
    /// Resolves the engine, either from an explicit path or from `PATH`.
    ///
    /// An explicit path must exist and be executable, and is returned in
    /// absolute form. No fallback to `PATH` happens when an explicit path is
    /// given but unusable.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::explicit(path),
            None => Self::discover(),
        }
    }

    fn explicit(path: &Path) -> Result<Self> {
        if !path.is_file() || !is_executable(path) {
            exn::bail!(ErrorKind::EngineNotInvocable(path.to_path_buf()));
        }
        let path = std::fs::canonicalize(path).or_raise(|| ErrorKind::EngineNotInvocable(path.to_path_buf()))?;
        tracing::debug!(engine = %path.display(), "Using explicitly configured engine");
        Ok(Self { path })
    }

    fn discover() -> Result<Self> {
        for exe in EXECUTABLES {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(engine = %path.display(), "Discovered engine on PATH");
                return Ok(Self { path });
            }
        }
        tracing::info!("ImageMagick executable not found in PATH");
        exn::bail!(ErrorKind::EngineNotFound);
    }

    /// Asks the engine for its version banner. Only used for logging; a
    /// failing probe is not fatal because older builds disagree on flags.
    pub async fn probe(&self) -> Option<String> {
        let invocation = Invocation::new(&self.path).arg("-version");
        match self.execute(&invocation).await {
            Ok(output) => {
                let banner = output.stdout.lines().next().map(str::trim).map(str::to_string);
                tracing::debug!(version = banner.as_deref().unwrap_or("unknown"), "Engine responded to probe");
                banner
            },
            Err(e) => {
                let kind: &ErrorKind = &e;
                tracing::warn!(engine = %self.path.display(), error = %kind, "Engine did not respond to version probe");
                None
            },
        }
    }
}

#[async_trait]
impl Engine for ImageMagick {
    fn program(&self) -> &Path {
        &self.path
    }

    #[instrument(skip_all, fields(command = %invocation))]
    async fn execute(&self, invocation: &Invocation) -> Result<Output> {
        let output = match invocation.command().output().await {
            Ok(output) => output,
            Err(e) => exn::bail!(ErrorKind::Spawn(e.to_string())),
        };
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            exn::bail!(ErrorKind::NonZeroExit { code: output.status.code(), stderr });
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = stderr.trim(), "Engine succeeded with diagnostics");
        }
        Ok(Output { stdout, stderr })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_must_exist() {
        let missing = Path::new("/definitely/not/a/real/magick");
        let err = ImageMagick::locate(Some(missing)).unwrap_err();
        assert_eq!(*err, ErrorKind::EngineNotInvocable(missing.to_path_buf()));
    }

    #[test]
    fn explicit_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageMagick::locate(Some(dir.path())).unwrap_err();
        assert_eq!(*err, ErrorKind::EngineNotInvocable(dir.path().to_path_buf()));
    }

    #[cfg(unix)]
    #[test]
    fn explicit_path_must_be_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("magick");
        std::fs::write(&engine, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(ImageMagick::locate(Some(&engine)).is_err());

        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();
        let located = ImageMagick::locate(Some(&engine)).unwrap();
        assert!(located.program().is_absolute());
        assert_eq!(located.program(), std::fs::canonicalize(&engine).unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_captures_exit_status_and_stderr() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("magick");
        std::fs::write(&engine, "#!/bin/sh\necho \"$1 said no\" >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();
        let magick = ImageMagick::locate(Some(&engine)).unwrap();

        let err = magick.execute(&Invocation::new(magick.program()).arg("engine")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NonZeroExit { code: Some(3), stderr: "engine said no\n".to_string() });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_returns_stdout() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("magick");
        std::fs::write(&engine, "#!/bin/sh\necho '3000 2000'\n").unwrap();
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();
        let magick = ImageMagick::locate(Some(&engine)).unwrap();

        let output = magick.execute(&Invocation::dimensions(magick.program(), "a.png")).await.unwrap();
        assert_eq!(output.stdout.trim(), "3000 2000");
    }

    #[tokio::test]
    async fn spawn_failure_is_captured() {
        let magick = ImageMagick { path: PathBuf::from("/definitely/not/a/real/magick") };
        let err = magick.execute(&Invocation::new(magick.program())).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Spawn(_)));
    }
}
