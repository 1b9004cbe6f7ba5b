//! Read access to the zip container.
//!
//! An [`Archive`] is opened fresh for every engine operation and dropped when
//! the operation finishes; nothing is held open across calls.

mod container;
pub mod path;
mod rewrite;

pub(crate) use self::rewrite::Rewrite;
use crate::error::{self, ErrorKind, Result};
use crate::opf::PackageDocument;
use exn::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;
use zip::ZipArchive;

pub(crate) type ZipReader = ZipArchive<BufReader<File>>;

/// Upper bound on the buffer reserved up front for one entry. Sizes come
/// from the entry header, which the archive is free to lie about.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Capacity to reserve before decompressing an entry of the `declared` size.
pub(crate) fn preallocation(declared: u64) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(MAX_PREALLOCATION)
}

pub(crate) struct Archive {
    path: PathBuf,
    zip: ZipReader,
}
impl Archive {
    /// Opens the file at `path` as a zip archive.
    ///
    /// A missing or unreadable file reports a filesystem error; a file that
    /// exists but is not a zip reports [`ErrorKind::InvalidArchive`].
    #[instrument(level = "trace", skip_all, fields(path = %path.as_ref().display()))]
    pub(crate) fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| error::io(e, path))?;
        let zip = ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::InvalidArchive)?;
        Ok(Self { path: path.to_path_buf(), zip })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Entry names in central-directory order, exactly as stored.
    pub(crate) fn names(&self) -> Vec<String> {
        (0..self.zip.len()).filter_map(|index| self.zip.name_for_index(index)).map(str::to_string).collect()
    }

    /// Finds the stored name of the entry whose normalized path equals the
    /// normalized `wanted` path.
    pub(crate) fn find(&self, wanted: &str) -> Option<String> {
        let wanted = path::normalize(wanted);
        if wanted.is_empty() {
            return None;
        }
        (0..self.zip.len())
            .filter_map(|index| self.zip.name_for_index(index))
            .find(|name| path::normalize(name) == wanted)
            .map(str::to_string)
    }

    /// Reads an entry's decompressed bytes, matching its name after
    /// normalization.
    pub(crate) fn read(&mut self, wanted: &str) -> Result<Vec<u8>> {
        let name = self.find(wanted).ok_or_raise(|| ErrorKind::NotFound(wanted.to_string()))?;
        let mut entry = self.zip.by_name(&name).or_raise(|| ErrorKind::NotFound(name.clone()))?;
        let mut content = Vec::with_capacity(preallocation(entry.size()));
        entry.read_to_end(&mut content).or_raise(|| ErrorKind::InvalidArchive)?;
        Ok(content)
    }

    /// Container Locator: the path of the package document inside the archive.
    pub(crate) fn package_path(&mut self) -> Result<String> {
        container::locate(self)
    }

    /// Loads the package document located by [`package_path`](Self::package_path).
    pub(crate) fn package(&mut self) -> Result<PackageDocument> {
        let path = self.package_path()?;
        let content = match self.read(&path) {
            Ok(content) => content,
            Err(e) if matches!(&*e, ErrorKind::NotFound(_)) => {
                return Err(e.raise(ErrorKind::PackageNotFound));
            },
            Err(e) => return Err(e),
        };
        Ok(PackageDocument::new(path, content))
    }

    /// Starts an atomic rewrite of this archive; the archive is consumed and
    /// closed before the rewritten file replaces the original.
    pub(crate) fn rewrite(self) -> Rewrite {
        Rewrite::new(self)
    }

    pub(crate) fn into_parts(self) -> (PathBuf, ZipReader) {
        (self.path, self.zip)
    }
}
