//! Atomic Archive Rewriter.
//!
//! Streams every entry of the source archive into a temporary file in the same
//! directory, substituting the entries being replaced, then renames the
//! temporary file over the original. Untouched entries are raw-copied so their
//! compressed bytes and headers come through verbatim.
//!
//! If anything fails before the rename, the temporary file is deleted when it
//! is dropped and the original file is never touched.

use super::{Archive, ZipReader, path, preallocation};
use crate::error::{self, ErrorKind, Result};
use exn::ResultExt;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::instrument;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

type Transform = Box<dyn FnOnce(Vec<u8>) -> Result<Vec<u8>>>;

/// A pending rewrite of one archive.
///
/// Entry names given to [`replace`](Self::replace), [`upsert`](Self::upsert)
/// and [`remove`](Self::remove) are matched after normalization.
pub(crate) struct Rewrite {
    archive: Archive,
    // Keyed by normalized entry name.
    replacements: HashMap<String, Transform>,
    additions: Vec<(String, Vec<u8>)>,
    removals: HashSet<String>,
}
impl Rewrite {
    pub(super) fn new(archive: Archive) -> Self {
        Self { archive, replacements: HashMap::new(), additions: Vec::new(), removals: HashSet::new() }
    }

    /// Replaces an existing entry's content. Committing fails with
    /// [`ErrorKind::NotFound`] if the archive has no such entry.
    pub(crate) fn replace(self, name: &str, content: Vec<u8>) -> Self {
        self.replace_with(name, move |_| Ok(content))
    }

    /// Replaces an existing entry with the result of `transform`, which
    /// receives the entry's current decompressed content while the archive is
    /// being streamed.
    pub(crate) fn replace_with(
        mut self,
        name: &str,
        transform: impl FnOnce(Vec<u8>) -> Result<Vec<u8>> + 'static,
    ) -> Self {
        let key = path::normalize(name);
        self.removals.remove(&key);
        self.replacements.insert(key, Box::new(transform));
        self
    }

    /// Replaces the entry if it exists, otherwise appends it as a new entry
    /// after all existing ones.
    pub(crate) fn upsert(self, name: &str, content: Vec<u8>) -> Self {
        if self.archive.find(name).is_some() {
            return self.replace(name, content);
        }
        let mut this = self;
        let name = path::normalize(name);
        this.removals.remove(&name);
        this.additions.retain(|(existing, _)| *existing != name);
        this.additions.push((name, content));
        this
    }

    /// Drops an entry from the rewritten archive. Entries that are also being
    /// replaced or added are kept.
    pub(crate) fn remove(mut self, name: &str) -> Self {
        let key = path::normalize(name);
        if !self.replacements.contains_key(&key) && !self.additions.iter().any(|(added, _)| *added == key) {
            self.removals.insert(key);
        }
        self
    }

    /// Streams the rewritten archive to a temporary file and atomically
    /// renames it over the original.
    pub(crate) fn commit(self) -> Result<()> {
        self.commit_through(BufWriter::new)
    }

    /// [`commit`](Self::commit), writing the temporary file through whatever
    /// `sink` wraps around it.
    #[instrument(level = "trace", skip_all, fields(path = %self.archive.path().display()))]
    fn commit_through<W: Write + Seek>(self, sink: impl FnOnce(File) -> W) -> Result<()> {
        let Self { archive, mut replacements, additions, removals } = self;
        let (target, mut zip) = archive.into_parts();
        let dir = target.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(".bindery-")
            .suffix(".epub")
            .tempfile_in(dir)
            .map_err(|e| error::io(e, dir))?;

        let handle = temp.as_file().try_clone().map_err(|e| error::io(e, temp.path()))?;
        let mut writer = ZipWriter::new(sink(handle));
        let copied = stream_entries(&mut zip, &mut writer, &mut replacements, &removals)?;
        if let Some(missing) = replacements.into_keys().next() {
            exn::bail!(ErrorKind::NotFound(missing));
        }
        for (name, content) in &additions {
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(name.as_str(), options).or_raise(|| ErrorKind::Io)?;
            writer.write_all(content).map_err(|e| error::io(e, temp.path()))?;
        }
        let mut sink = writer.finish().or_raise(|| ErrorKind::Io)?;
        sink.flush().map_err(|e| error::io(e, temp.path()))?;
        drop(sink);
        finalize(temp, zip, &target)?;
        tracing::debug!(
            copied,
            added = additions.len(),
            removed = removals.len(),
            "Archive rewritten"
        );
        Ok(())
    }
}

/// Copies every source entry into `writer`, returning how many were copied
/// untouched. Consumed replacements are removed from `replacements`.
fn stream_entries<W: Write + Seek>(
    zip: &mut ZipReader,
    writer: &mut ZipWriter<W>,
    replacements: &mut HashMap<String, Transform>,
    removals: &HashSet<String>,
) -> Result<usize> {
    let mut copied = 0;
    for index in 0..zip.len() {
        let Some(name) = zip.name_for_index(index).map(str::to_string) else {
            continue;
        };
        let key = path::normalize(&name);
        if removals.contains(&key) {
            tracing::trace!(entry = %name, "Dropping entry");
            continue;
        }
        match replacements.remove(&key) {
            Some(transform) => {
                let mut entry = zip.by_index(index).or_raise(|| ErrorKind::InvalidArchive)?;
                let mut content = Vec::with_capacity(preallocation(entry.size()));
                entry.read_to_end(&mut content).or_raise(|| ErrorKind::InvalidArchive)?;
                let mut options = SimpleFileOptions::default().compression_method(match entry.compression() {
                    CompressionMethod::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                });
                if let Some(modified) = entry.last_modified() {
                    options = options.last_modified_time(modified);
                }
                if let Some(mode) = entry.unix_mode() {
                    options = options.unix_permissions(mode);
                }
                drop(entry);
                let content = transform(content)?;
                tracing::trace!(entry = %name, bytes = content.len(), "Replacing entry");
                writer.start_file(name.as_str(), options).or_raise(|| ErrorKind::Io)?;
                writer.write_all(&content).or_raise(|| ErrorKind::Io)?;
            },
            None => {
                let entry = zip.by_index_raw(index).or_raise(|| ErrorKind::InvalidArchive)?;
                writer.raw_copy_file(entry).or_raise(|| ErrorKind::Io)?;
                copied += 1;
            },
        }
    }
    Ok(copied)
}

/// Gives the temporary file the original's permissions, closes the source
/// archive and renames the temporary file over the original.
fn finalize(temp: NamedTempFile, source: ZipReader, target: &Path) -> Result<()> {
    let file: &File = temp.as_file();
    file.sync_all().map_err(|e| error::io(e, temp.path()))?;
    let permissions = std::fs::metadata(target).map_err(|e| error::io(e, target))?.permissions();
    file.set_permissions(permissions).map_err(|e| error::io(e, temp.path()))?;
    drop(source);
    temp.persist(target).map_err(|e| error::io(e.error, target))?;
    Ok(())
}
