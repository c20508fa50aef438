use crate::format::FormatProfile;
use crate::path::output_path;
use crate::plan::TargetSize;
use std::ffi::{OsStr, OsString};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use thumbs_engine::Invocation;
use thumbs_engine::error::ErrorKind as EngineErrorKind;

/// A discovered image to generate thumbnails from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceImage {
    path: PathBuf,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without its extension, byte-for-byte as on disk.
    pub fn base_name(&self) -> &OsStr {
        self.path.file_stem().unwrap_or_default()
    }

    /// Directory containing the image; thumbnails are written beneath it.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// One engine pass: one image, one size, one format.
#[derive(Clone, Debug)]
pub struct ConversionJob<'a> {
    pub image: &'a SourceImage,
    pub size: TargetSize,
    pub profile: FormatProfile,
    pub destination: PathBuf,
}

impl<'a> ConversionJob<'a> {
    pub fn new(image: &'a SourceImage, profile: FormatProfile, size: TargetSize) -> Self {
        let destination = output_path(image, profile, size);
        Self { image, size, profile, destination }
    }

    /// The exact command line for this job. Built from the job alone, so two
    /// jobs can never share (or inherit) a command.
    pub fn invocation(&self, program: &Path) -> Invocation {
        let mut output = OsString::from(format!("{}:", self.profile.engine_id()));
        output.push(self.destination.as_os_str());
        Invocation::new(program).arg(self.image.path()).args(self.profile.arguments(self.size)).arg(output)
    }
}

/// Outcome of a single engine invocation for a single thumbnail.
#[derive(Clone, Debug)]
pub enum ConversionResult {
    /// The engine succeeded and the thumbnail exists on disk.
    Created { output: PathBuf },
    Failed(Failure),
}

/// Everything needed to understand (and reproduce) a failed invocation.
#[derive(Clone, Debug)]
pub struct Failure {
    /// `None` when the dimension query itself failed.
    pub size: Option<TargetSize>,
    pub error: EngineErrorKind,
    /// The command that was attempted, ready to paste into a shell.
    pub command: String,
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(size) => writeln!(f, "    size:        {size}")?,
            None => writeln!(f, "    size:        (dimension query)")?,
        }
        writeln!(f, "    error:       {}", self.error)?;
        writeln!(f, "    command:     {}", self.command)?;
        if let Some(diagnostics) = self.error.diagnostics() {
            for (i, line) in diagnostics.lines().enumerate() {
                let label = if i == 0 { "diagnostics:" } else { "" };
                writeln!(f, "    {label:<12} {line}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_image_parts() {
        let image = SourceImage::new("/photos/trip/beach.day.png");
        assert_eq!(image.base_name(), "beach.day");
        assert_eq!(image.directory(), Path::new("/photos/trip"));
    }

    #[test]
    fn job_invocation() {
        let image = SourceImage::new("/photos/cat.png");
        let job = ConversionJob::new(&image, FormatProfile::Gif, TargetSize::new(1000));
        assert_eq!(job.destination, Path::new("/photos/GIF/1000px/cat-1000px.gif"));
        assert_eq!(
            job.invocation(Path::new("/usr/bin/magick")).to_string(),
            "/usr/bin/magick /photos/cat.png -strip -filter Lanczos -resize '1000x1000>' -colors 256 \
             gif:/photos/GIF/1000px/cat-1000px.gif"
        );
    }

    #[test]
    fn failure_block() {
        let failure = Failure {
            size: Some(TargetSize::new(500)),
            error: EngineErrorKind::NonZeroExit { code: Some(1), stderr: "bad\nworse\n".to_string() },
            command: "magick a.png png:b.png".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "    size:        500px\n    error:       engine exited with code 1\n    command:     magick a.png png:b.png\n    \
             diagnostics: bad\n                 worse\n"
        );
    }
}
