//! Cover Change.
//!
//! The whole of a cover replacement: the chosen image is converted to JPEG
//! once, that JPEG refreshes the cover cache, and (when asked) it becomes the
//! book's canonical cover and the `cover.jpg` next to the EPUB on disk.

use super::locate::sibling_cover;
use super::{CoverCache, candidates, imaging, write, write_atomic};
use crate::error::Result;
use crate::models::CoverSelection;
use std::path::Path;
use tracing::instrument;

/// Where a cover change lands besides the converted image itself.
#[derive(Debug, Clone, Copy)]
pub struct CoverTargets<'a> {
    /// Cache to refresh, with the book's catalog id.
    pub cache: Option<(&'a CoverCache, u64)>,
    /// Rewrite the archive and the sibling `cover.jpg` as well.
    pub write_to_epub: bool,
}

/// Converts the selected image to JPEG and installs it everywhere `targets`
/// names, returning the JPEG bytes.
#[instrument(level = "trace", skip_all, fields(path = %epub.display(), write_to_epub = targets.write_to_epub))]
pub(crate) fn apply(epub: &Path, selection: &CoverSelection, targets: CoverTargets<'_>) -> Result<Vec<u8>> {
    let jpeg = match selection {
        CoverSelection::Entry(entry) => imaging::convert_to_jpeg(&candidates::read(epub, entry)?.0)?,
        CoverSelection::Bytes(bytes) => imaging::convert_to_jpeg(bytes)?,
    };

    if let Some((cache, id)) = targets.cache {
        cache.store(id, &jpeg)?;
    }
    if targets.write_to_epub {
        match selection {
            CoverSelection::Entry(_) => write::write(epub, selection)?,
            CoverSelection::Bytes(_) => write::write(epub, &CoverSelection::Bytes(jpeg.clone()))?,
        }
        let sibling = sibling_cover(epub);
        write_atomic(&sibling, &jpeg)?;
        tracing::debug!(sibling = %sibling.display(), "Updated sibling cover");
    }
    Ok(jpeg)
}
