//! Cover Candidate Lister.

use super::imaging;
use super::locate::CoverView;
use super::media_type_for;
use crate::archive::{Archive, path};
use crate::error::{ErrorKind, Result};
use crate::models::CoverCandidate;
use crate::opf::manifest::Manifest;
use std::path::Path;
use tracing::instrument;

/// Every JPEG or PNG in the manifest whose header decodes, narrowed to
/// portrait-shaped images of a usable size when there are any.
#[instrument(level = "trace", skip_all, fields(path = %epub.display()))]
pub(crate) fn list(epub: &Path) -> Result<Vec<CoverCandidate>> {
    let mut archive = Archive::open(epub)?;
    let doc = archive.package()?;
    let manifest = Manifest::parse(&doc)?;
    let names = archive.names();
    let current = CoverView::new(&names, Some((&doc, &manifest)))
        .declared()
        .map(|(_, entry)| path::normalize(&entry));

    let mut all: Vec<CoverCandidate> = Vec::new();
    for item in manifest.items.iter().filter(|item| item.is_cover_image_type()) {
        let zip_path = manifest.resolve(&doc, item);
        if zip_path.is_empty() || all.iter().any(|candidate| candidate.zip_path == zip_path) {
            continue;
        }
        let dimensions = archive.read(&zip_path).and_then(|bytes| imaging::dimensions(&bytes));
        let (width, height) = match dimensions {
            Ok(dimensions) => dimensions,
            Err(e) => {
                tracing::trace!(entry = %zip_path, error = ?e, "Skipping unreadable image");
                continue;
            },
        };
        all.push(CoverCandidate {
            display_name: item.file_name().to_string(),
            media_type: item.media_type.trim().to_ascii_lowercase(),
            width,
            height,
            is_current: current.as_deref() == Some(zip_path.as_str()),
            zip_path,
        });
    }

    let suitable: Vec<CoverCandidate> = all.iter().filter(|candidate| candidate.is_suitable()).cloned().collect();
    tracing::debug!(images = all.len(), suitable = suitable.len(), "Listed cover candidates");
    Ok(if suitable.is_empty() { all } else { suitable })
}

/// Raw bytes of one entry and the media type its extension implies.
#[instrument(level = "trace", skip_all, fields(path = %epub.display(), entry = zip_path))]
pub(crate) fn read(epub: &Path, zip_path: &str) -> Result<(Vec<u8>, &'static str)> {
    if path::normalize(zip_path).is_empty() {
        exn::bail!(ErrorKind::NotFound(zip_path.to_string()));
    }
    let mut archive = Archive::open(epub)?;
    let bytes = archive.read(zip_path)?;
    Ok((bytes, media_type_for(zip_path)))
}
