use crate::format::FormatProfile;
use crate::job::SourceImage;
use crate::plan::TargetSize;
use std::path::{Path, PathBuf};

/// Destination of a thumbnail:
/// `<source dir>/<FORMAT>/<size>px/<base name>-<size>px.<ext>`.
///
/// The layout is load-bearing: discovery relies on the `-<size>px` suffix to
/// recognise thumbnails from earlier runs.
pub fn output_path(image: &SourceImage, profile: FormatProfile, size: TargetSize) -> PathBuf {
    let mut file_name = image.base_name().to_os_string();
    file_name.push(format!("-{}.{}", size.marker(), profile.extension()));
    image.directory().join(profile.directory()).join(size.marker()).join(file_name)
}

/// Creates the destination's parent directory if it isn't there yet.
///
/// Safe to race: `create_dir_all` treats a directory that appeared in the
/// meantime as success.
pub(crate) async fn ensure_parent(destination: &Path) -> std::io::Result<()> {
    match destination.parent() {
        Some(parent) => tokio::fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}
