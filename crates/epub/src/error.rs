//! EPUB Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Every failure the engine can report is
//! one variant of the closed [`ErrorKind`] enum, so callers match on the kind
//! (`matches!(&*err, ErrorKind::PackageNotFound)`) rather than on messages.

use derive_more::{Display, Error};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Neither `META-INF/container.xml` nor any `.opf` entry points at a
    /// package document.
    #[display("package document not found")]
    PackageNotFound,
    /// The package document has no `<metadata>` element.
    #[display("metadata section not found in package document")]
    MetadataSectionNotFound,
    /// The package document has no `<manifest>` element.
    #[display("manifest section not found in package document")]
    ManifestSectionNotFound,
    /// A metadata write would not have touched a single field.
    #[display("no metadata changes applied")]
    NoChangesApplied,
    /// The bytes are not an image that can be decoded.
    #[display("image could not be decoded")]
    ImageDecodeFailed,
    /// No cover image could be located by any strategy.
    #[display("no cover found")]
    CoverNotFound,
    /// A file on disk or an entry inside the archive does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The filesystem rejected a read or write.
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// The file is not a readable zip archive.
    #[display("invalid or corrupted archive")]
    InvalidArchive,
    /// The package document (or container descriptor) is not parseable XML.
    #[display("malformed package document")]
    InvalidPackage,
    /// Any other archive or filesystem failure.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }

    /// Stable identifier for the error kind, suitable for API responses and
    /// exit-code mapping. Never changes between releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PackageNotFound => "package_not_found",
            Self::MetadataSectionNotFound => "metadata_section_not_found",
            Self::ManifestSectionNotFound => "manifest_section_not_found",
            Self::NoChangesApplied => "no_changes_applied",
            Self::ImageDecodeFailed => "image_decode_failed",
            Self::CoverNotFound => "cover_not_found",
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::InvalidArchive => "invalid_archive",
            Self::InvalidPackage => "invalid_package",
            Self::Io => "io",
        }
    }

    /// Failures a bulk scan tolerates by falling back to the file name as the
    /// book title.
    pub fn is_soft_scan_failure(&self) -> bool {
        matches!(
            self,
            Self::PackageNotFound | Self::MetadataSectionNotFound | Self::InvalidPackage | Self::InvalidArchive
        )
    }
}

/// Classify a filesystem error against the path it happened on, keeping the
/// original [`IoError`] as a child in the error tree.
#[track_caller]
pub(crate) fn io(err: IoError, path: &Path) -> Error {
    let kind = match err.kind() {
        IoErrorKind::NotFound => ErrorKind::NotFound(path.display().to_string()),
        IoErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        _ => ErrorKind::Io,
    };
    exn::Exn::from(err).raise(kind)
}
