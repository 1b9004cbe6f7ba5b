//! Cover detection, listing and replacement.

pub(crate) mod candidates;
pub(crate) mod change;
pub(crate) mod imaging;
pub(crate) mod locate;
pub(crate) mod write;

pub use self::change::CoverTargets;
pub use self::imaging::convert_to_jpeg;
use crate::archive::path;
use crate::error::{self, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

const PREFERRED_NAMES: [&str; 3] = ["cover.jpg", "cover.jpeg", "cover.png"];
const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Whether the file name is exactly `cover.jpg`, `cover.jpeg` or `cover.png`,
/// ignoring case.
pub(crate) fn is_preferred_name(entry: &str) -> bool {
    let name = path::file_name(entry);
    PREFERRED_NAMES.iter().any(|preferred| name.eq_ignore_ascii_case(preferred))
}

pub(crate) fn has_image_extension(entry: &str) -> bool {
    let lower = entry.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Media type implied by an entry's extension.
pub(crate) fn media_type_for(entry: &str) -> &'static str {
    imaging::Encoding::for_path(entry).media_type()
}

/// Writes `bytes` to `target` through a temporary file in the same directory,
/// creating the directory if needed.
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| error::io(e, dir))?;
    let mut temp = tempfile::Builder::new().prefix(".bindery-").tempfile_in(dir).map_err(|e| error::io(e, dir))?;
    temp.write_all(bytes).map_err(|e| error::io(e, temp.path()))?;
    temp.persist(target).map_err(|e| error::io(e.error, target))?;
    Ok(())
}

/// Cover cache directory: one `<id>.jpg` per book, keyed by catalog id.
#[derive(Debug, Clone)]
pub struct CoverCache {
    dir: PathBuf,
}
impl CoverCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.jpg"))
    }

    /// Replaces the cached cover for `id`, returning where it was written.
    pub fn store(&self, id: u64, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(id);
        write_atomic(&path, bytes)?;
        tracing::debug!(id, path = %path.display(), bytes = bytes.len(), "Cached cover");
        Ok(path)
    }
}
