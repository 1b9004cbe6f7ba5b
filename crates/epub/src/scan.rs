//! Per-book records for a bulk library scan.
//!
//! A scan must not stop at one broken book: when the package document or its
//! metadata block cannot be found, the summary falls back to the file name.

use crate::error::Result;
use std::path::{Component, Path};
use tracing::instrument;

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// What a catalog stores for one book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookSummary {
    pub title: String,
    pub author: String,
    pub description: String,
    /// Set when the title came from the file name.
    pub metadata_missing: bool,
}
impl BookSummary {
    /// Reads the book's title, author and description.
    ///
    /// Soft failures ([`ErrorKind::is_soft_scan_failure`]) and books without a
    /// title produce a fallback summary titled after the file stem. Anything
    /// else, such as a missing or unreadable file, is returned as an error.
    ///
    /// [`ErrorKind::is_soft_scan_failure`]: crate::error::ErrorKind::is_soft_scan_failure
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_epub(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match crate::read_metadata(path) {
            Ok(fields) if !fields.title.is_empty() => Ok(Self {
                title: fields.title,
                author: fields.author,
                description: fields.description,
                metadata_missing: false,
            }),
            Ok(_) => {
                tracing::warn!("Book has no title; using file name");
                Ok(Self::fallback(path))
            },
            Err(e) if e.is_soft_scan_failure() => {
                tracing::warn!(error = ?e, "Metadata missing; using file name");
                Ok(Self::fallback(path))
            },
            Err(e) => Err(e),
        }
    }

    fn fallback(path: &Path) -> Self {
        let title = path.file_stem().map(|stem| stem.to_string_lossy().to_string()).unwrap_or_default();
        Self { title, author: UNKNOWN_AUTHOR.to_string(), description: String::new(), metadata_missing: true }
    }
}

/// Category and subcategory taken from the first two directories between the
/// library root and the book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathCategories {
    pub category: String,
    pub subcategory: String,
}

/// Directory-derived categories for a book; both empty when the book sits
/// directly in `root` or outside it.
pub fn categories_from_path(root: impl AsRef<Path>, book: impl AsRef<Path>) -> PathCategories {
    let Ok(relative) = book.as_ref().strip_prefix(root.as_ref()) else {
        return PathCategories::default();
    };
    let mut dirs = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().trim().to_string()),
            _ => None,
        });
    PathCategories { category: dirs.next().unwrap_or_default(), subcategory: dirs.next().unwrap_or_default() }
}
