use crate::error::{Error, ErrorKind};
use crate::plan::TargetSize;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Parameters applied to every thumbnail, before the format-specific ones.
///
/// The trailing `>` on the resize geometry only ever shrinks, so the engine
/// leaves an image alone rather than upscaling it.
fn universal(size: TargetSize) -> [String; 5] {
    ["-strip".into(), "-filter".into(), "Lanczos".into(), "-resize".into(), format!("{0}x{0}>", size.pixels())]
}

/// An output format and everything the engine needs to know to produce it.
///
/// Both `jpg` and `jpeg` resolve to [`FormatProfile::Jpeg`], so they share
/// one extension, one engine identifier and one parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatProfile {
    Png,
    Jpeg,
    Webp,
    Bmp,
    Gif,
}

impl FromStr for FormatProfile {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "bmp" => Ok(Self::Bmp),
            "gif" => Ok(Self::Gif),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

impl FormatProfile {
    /// Canonical file extension of generated thumbnails.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }

    /// Format identifier given to the engine as the output prefix (`jpeg:out.jpg`).
    pub fn engine_id(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }

    /// Name of the per-format output directory, e.g. `JPG`.
    pub fn directory(&self) -> String {
        self.extension().to_uppercase()
    }

    /// Format-specific engine parameters, in order.
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Png => &["-define", "png:compression-level=9", "-density", "150"],
            Self::Jpeg => &[
                "-quality",
                "95",
                // Flatten onto white so transparent regions don't turn black.
                "-background",
                "white",
                "-flatten",
                "-define",
                "jpeg:optimize-coding=true",
                "-define",
                "jpeg:dct-method=float",
                "-sampling-factor",
                "4:4:4",
            ],
            Self::Webp => &["-quality", "95"],
            Self::Bmp => &[],
            Self::Gif => &["-colors", "256"],
        }
    }

    /// Universal parameters followed by [`parameters`](Self::parameters), for one target size.
    pub fn arguments(&self, size: TargetSize) -> Vec<String> {
        universal(size).into_iter().chain(self.parameters().iter().map(|p| p.to_string())).collect()
    }
}

impl Display for FormatProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
