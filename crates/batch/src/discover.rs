use crate::error::{ErrorKind, Result};
use crate::job::SourceImage;
use crate::plan::TARGET_SIZES;
use exn::ResultExt;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Extensions thumbnails are generated from.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["gif", "png", "jpg", "jpeg", "webp", "bmp"];
/// Extensions that are recognised as images but never processed (Windows metafiles).
pub const LEGACY_EXTENSIONS: [&str; 2] = ["wmf", "emf"];

/// Everything found beneath a source root.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Images to generate thumbnails from, sorted by path.
    pub images: Vec<SourceImage>,
    /// Legacy-format files that are reported but not processed, sorted by path.
    pub unsupported: Vec<PathBuf>,
}

impl Discovery {
    /// Pairs of images in the same directory that share a file stem, such as
    /// `cat.jpg` and `cat.png`. Both write the same thumbnail paths, so the
    /// later one overwrites the earlier one's output.
    pub fn collisions(&self) -> Vec<(&SourceImage, &SourceImage)> {
        let mut seen = HashMap::new();
        self.images
            .iter()
            .filter_map(|image| match seen.entry((image.directory(), image.base_name())) {
                Entry::Occupied(first) => Some((*first.get(), image)),
                Entry::Vacant(slot) => {
                    slot.insert(image);
                    None
                },
            })
            .collect()
    }
}

enum Candidate {
    Image,
    Unsupported,
    Ignored,
}

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// `true` when the file name carries the marker of any thumbnail size, i.e.
/// it was (most likely) written by a previous run.
pub fn is_derivative(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return false;
    };
    TARGET_SIZES.iter().any(|size| name.contains(&size.marker()))
}

fn classify(path: &Path) -> Candidate {
    let Some(extension) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
        return Candidate::Ignored;
    };
    if is_derivative(path) {
        return Candidate::Ignored;
    }
    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Candidate::Image
    } else if LEGACY_EXTENSIONS.contains(&extension.as_str()) {
        Candidate::Unsupported
    } else {
        Candidate::Ignored
    }
}

/// Recursively lists candidate images beneath `root`.
///
/// Failing to read the root itself is fatal; a subdirectory that can't be
/// read is logged and skipped. Symlinks are not followed.
pub async fn discover(root: &Path) -> Result<Discovery> {
    let invalid = || ErrorKind::SourcePathInvalid(root.to_path_buf());
    let root = fs::canonicalize(root).await.or_raise(invalid)?;
    let metadata = fs::metadata(&root).await.or_raise(invalid)?;
    if !metadata.is_dir() {
        exn::bail!(invalid());
    }

    let mut discovery = Discovery::default();
    let mut stack = vec![root.clone()];
    while let Some(current) = stack.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if current == root => return Err(e).or_raise(invalid),
            Err(e) => {
                tracing::warn!(path = %current.display(), error = %e, "Skipping unreadable directory");
                continue;
            },
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(path = %current.display(), error = %e, "Directory listing interrupted");
                    break;
                },
            };
            match process_entry(entry).await {
                WalkEntry::Descend(dir) => stack.push(dir),
                WalkEntry::File(path) => match classify(&path) {
                    Candidate::Image => discovery.images.push(SourceImage::new(path)),
                    Candidate::Unsupported => discovery.unsupported.push(path),
                    Candidate::Ignored => tracing::trace!(path = %path.display(), "Ignoring file"),
                },
                WalkEntry::Skip => {},
            }
        }
    }
    discovery.images.sort_by(|a, b| a.path().cmp(b.path()));
    discovery.unsupported.sort();
    for (first, second) in discovery.collisions() {
        tracing::warn!(
            first = %first.path().display(),
            second = %second.path().display(),
            "Images share a base name; their thumbnails will overwrite each other"
        );
    }
    tracing::debug!(
        root = %root.display(),
        images = discovery.images.len(),
        unsupported = discovery.unsupported.len(),
        "Discovery complete"
    );
    Ok(discovery)
}

async fn process_entry(entry: DirEntry) -> WalkEntry {
    let path = entry.path();
    match entry.file_type().await {
        Ok(kind) if kind.is_dir() => WalkEntry::Descend(path),
        Ok(kind) if kind.is_file() => WalkEntry::File(path),
        // Note: symlinks and special files are silently dropped.
        Ok(_) => WalkEntry::Skip,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not stat directory entry");
            WalkEntry::Skip
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    fn names(discovery: &Discovery, root: &Path) -> Vec<String> {
        discovery
            .images
            .iter()
            .map(|i| i.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[rstest]
    #[case("cat-1000px.png", true)]
    #[case("cat-2500px.jpg", true)]
    #[case("CAT-250PX.GIF", true)]
    #[case("banner_750px_wide.png", true)]
    #[case("cat.png", false)]
    #[case("cat-100px.png", false)]
    #[case("cat-2500.png", false)]
    fn test_is_derivative(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_derivative(Path::new(name)), expected);
    }

    #[tokio::test]
    async fn finds_supported_images_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        for file in ["a.png", "b.JPG", "c.jpeg", "nested/d.webp", "nested/deeper/e.bmp", "f.Gif"] {
            touch(&root, file);
        }
        for file in ["notes.txt", "README", "raw.cr2", "nested/thumbs.db"] {
            touch(&root, file);
        }
        let discovery = discover(&root).await.unwrap();
        assert_eq!(
            names(&discovery, &root),
            ["a.png", "b.JPG", "c.jpeg", "f.Gif", "nested/d.webp", "nested/deeper/e.bmp"]
        );
        assert!(discovery.unsupported.is_empty());
    }

    #[tokio::test]
    async fn excludes_thumbnails_from_previous_runs() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        touch(&root, "cat.png");
        touch(&root, "PNG/1000px/cat-1000px.png");
        touch(&root, "PNG/250px/cat-250px.png");
        touch(&root, "JPG/750px/cat-750px.jpg");
        let discovery = discover(&root).await.unwrap();
        assert_eq!(names(&discovery, &root), ["cat.png"]);
    }

    #[tokio::test]
    async fn legacy_formats_are_reported_separately() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        touch(&root, "logo.wmf");
        touch(&root, "art/diagram.EMF");
        touch(&root, "photo.png");
        let discovery = discover(&root).await.unwrap();
        assert_eq!(names(&discovery, &root), ["photo.png"]);
        assert_eq!(discovery.unsupported, [root.join("art/diagram.EMF"), root.join("logo.wmf")]);
    }

    #[tokio::test]
    async fn images_sharing_a_base_name_collide() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        for file in ["cat.png", "cat.jpg", "cat-a.png", "dog.png", "nested/cat.png"] {
            touch(&root, file);
        }
        let discovery = discover(&root).await.unwrap();
        let collisions: Vec<_> =
            discovery.collisions().into_iter().map(|(a, b)| (a.path().to_path_buf(), b.path().to_path_buf())).collect();
        assert_eq!(collisions, [(root.join("cat.jpg"), root.join("cat.png"))]);
    }

    #[tokio::test]
    async fn empty_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let discovery = discover(dir.path()).await.unwrap();
        assert!(discovery.images.is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = discover(&missing).await.unwrap_err();
        assert_eq!(*err, ErrorKind::SourcePathInvalid(missing));
    }

    #[tokio::test]
    async fn file_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.png");
        let file = dir.path().join("a.png");
        let err = discover(&file).await.unwrap_err();
        assert_eq!(*err, ErrorKind::SourcePathInvalid(file));
    }
}
