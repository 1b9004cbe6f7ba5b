//! Cover Locator.
//!
//! Strategies run in a fixed order and the first one that finds an existing
//! image wins:
//!
//! 1. `cover.jpg` next to the EPUB on disk,
//! 2. a manifest item named `cover.jpg`, `cover.jpeg` or `cover.png`,
//! 3. any entry with "cover" or "folder" in its name and an image extension,
//! 4. the package document's declaration (`cover-image` property, then the
//!    `<meta name="cover">` pointer).
//!
//! Only the first rule looks outside the archive. The candidate lister marks
//! the current cover with the manifest-backed rules alone (2 and 4), so an
//! image that merely has "cover" in its name is never reported as current.

use super::{has_image_extension, is_preferred_name, write_atomic};
use crate::archive::{Archive, path};
use crate::consts::CANONICAL_COVER_NAME;
use crate::error::{self, ErrorKind, Result};
use crate::models::CoverSource;
use crate::opf::PackageDocument;
use crate::opf::manifest::Manifest;
use exn::OptionExt;
use std::path::{Path, PathBuf};
use tracing::instrument;

type Strategy = fn(&CoverView<'_>) -> Option<String>;

const IN_ARCHIVE: [(CoverSource, Strategy); 3] = [
    (CoverSource::ManifestFileName, by_manifest_file_name),
    (CoverSource::EntryName, by_entry_name),
    (CoverSource::Declared, by_declaration),
];

const MANIFEST_ONLY: [(CoverSource, Strategy); 2] = [
    (CoverSource::ManifestFileName, by_manifest_file_name),
    (CoverSource::Declared, by_declaration),
];

/// What the in-archive strategies can see: entry names and, when the package
/// document could be read, its manifest.
pub(crate) struct CoverView<'a> {
    names: &'a [String],
    package: Option<(&'a PackageDocument, &'a Manifest)>,
}
impl<'a> CoverView<'a> {
    pub(crate) fn new(names: &'a [String], package: Option<(&'a PackageDocument, &'a Manifest)>) -> Self {
        Self { names, package }
    }

    /// The stored entry name matching `wanted` after normalization.
    fn find(&self, wanted: &str) -> Option<String> {
        let wanted = path::normalize(wanted);
        self.names.iter().find(|name| !wanted.is_empty() && path::normalize(name) == wanted).cloned()
    }

    /// The entry the in-archive strategies pick, and which strategy picked it.
    pub(crate) fn current(&self) -> Option<(CoverSource, String)> {
        self.first_match(&IN_ARCHIVE)
    }

    /// Like [`current`](Self::current), but only trusting what the manifest
    /// says about the cover.
    pub(crate) fn declared(&self) -> Option<(CoverSource, String)> {
        self.first_match(&MANIFEST_ONLY)
    }

    fn first_match(&self, strategies: &[(CoverSource, Strategy)]) -> Option<(CoverSource, String)> {
        strategies.iter().find_map(|(source, strategy)| {
            let entry = strategy(self)?;
            tracing::trace!(%source, entry = %entry, "Cover strategy matched");
            Some((*source, entry))
        })
    }
}

fn by_manifest_file_name(view: &CoverView<'_>) -> Option<String> {
    let (doc, manifest) = view.package?;
    manifest
        .items
        .iter()
        .filter(|item| is_preferred_name(&item.href))
        .find_map(|item| view.find(&manifest.resolve(doc, item)))
}

fn by_entry_name(view: &CoverView<'_>) -> Option<String> {
    view.names
        .iter()
        .find(|name| {
            let lower = name.to_ascii_lowercase();
            (lower.contains("cover") || lower.contains("folder")) && has_image_extension(&lower)
        })
        .cloned()
}

fn by_declaration(view: &CoverView<'_>) -> Option<String> {
    let (doc, manifest) = view.package?;
    let item = manifest.declared_cover()?;
    view.find(&manifest.resolve(doc, item)).or_else(|| view.find(&item.href))
}

pub(super) fn sibling_cover(epub: &Path) -> PathBuf {
    epub.parent().unwrap_or(Path::new("")).join(CANONICAL_COVER_NAME)
}

/// Finds the best cover for the book and returns its bytes untouched.
#[instrument(level = "trace", skip_all, fields(path = %epub.display()))]
pub(crate) fn locate(epub: &Path) -> Result<(CoverSource, Vec<u8>)> {
    let sibling = sibling_cover(epub);
    if sibling.is_file() {
        let bytes = std::fs::read(&sibling).map_err(|e| error::io(e, &sibling))?;
        return Ok((CoverSource::SiblingFile, bytes));
    }

    let mut archive = Archive::open(epub)?;
    let names = archive.names();
    let package = match archive.package().and_then(|doc| Manifest::parse(&doc).map(|manifest| (doc, manifest))) {
        Ok(package) => Some(package),
        Err(e) if e.is_soft_scan_failure() => {
            tracing::debug!(error = ?e, "No usable package document; searching entry names only");
            None
        },
        Err(e) => return Err(e),
    };
    let view = CoverView::new(&names, package.as_ref().map(|(doc, manifest)| (doc, manifest)));
    let (source, entry) = view.current().ok_or_raise(|| ErrorKind::CoverNotFound)?;
    let bytes = archive.read(&entry)?;
    Ok((source, bytes))
}

/// Locates the cover and copies its bytes to `target`.
pub(crate) fn extract(epub: &Path, target: &Path) -> Result<CoverSource> {
    let (source, bytes) = locate(epub)?;
    write_atomic(target, &bytes)?;
    tracing::debug!(%source, target = %target.display(), bytes = bytes.len(), "Extracted cover");
    Ok(source)
}
