//! Cover Writer.
//!
//! Installs the selected image as the canonical cover: re-encoded to
//! `<package dir>/cover.jpg`, referenced by exactly one manifest item and one
//! `<meta name="cover">` marker. Every other image the package marked as its
//! cover is dropped from both the manifest and the archive.

use super::imaging::{self, Encoding};
use super::is_preferred_name;
use crate::archive::{Archive, path};
use crate::consts::{
    CANONICAL_COVER_ID, CANONICAL_COVER_NAME, COVER_IMAGE_PROPERTY, COVER_META_NAME, ITEM_TAG_REGEX,
};
use crate::error::Result;
use crate::models::{CoverSelection, ManifestItem};
use crate::opf::manifest::Manifest;
use crate::opf::write::set_meta_name_content;
use crate::opf::{PackageDocument, attribute};
use crate::text::escape_value;
use regex::bytes::Captures;
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use tracing::instrument;

#[instrument(level = "trace", skip_all, fields(path = %epub.display()))]
pub(crate) fn write(epub: &Path, selection: &CoverSelection) -> Result<()> {
    let mut archive = Archive::open(epub)?;
    let doc = archive.package()?;
    let manifest = Manifest::parse(&doc)?;
    let dir = doc.dir();
    let canonical = path::resolve(&dir, CANONICAL_COVER_NAME);

    let raw: Cow<'_, [u8]> = match selection {
        CoverSelection::Entry(entry) => Cow::Owned(archive.read(entry)?),
        CoverSelection::Bytes(bytes) => Cow::Borrowed(bytes),
    };
    let encoded = imaging::encode(&imaging::decode(&raw)?, Encoding::for_path(&canonical))?;

    let mut removals = previous_covers(&doc, &manifest);
    removals.remove(&canonical);
    let package = with_canonical_references(&doc, &path::relative_to(&dir, &canonical), &removals)?;

    tracing::debug!(canonical = %canonical, replaced = removals.len(), bytes = encoded.len(), "Writing canonical cover");
    let rewrite = removals
        .iter()
        .fold(archive.rewrite(), |rewrite, entry| rewrite.remove(entry))
        .replace(doc.path(), package)
        .upsert(&canonical, encoded);
    rewrite.commit()
}

/// Normalized entry names of every image the package currently marks as a
/// cover.
fn previous_covers(doc: &PackageDocument, manifest: &Manifest) -> HashSet<String> {
    manifest
        .items
        .iter()
        .filter(|item| item.has_property(COVER_IMAGE_PROPERTY) || is_preferred_name(&item.href))
        .chain(manifest.declared_cover())
        .map(|item| manifest.resolve(doc, item))
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// The package document with a single cover marker in the metadata block and
/// a single cover item in the manifest.
fn with_canonical_references(doc: &PackageDocument, href: &str, removals: &HashSet<String>) -> Result<Vec<u8>> {
    let metadata = doc.metadata_span()?;
    let manifest = doc.manifest_span()?;

    let (meta_block, _) = set_meta_name_content(doc.slice(&metadata), COVER_META_NAME, CANONICAL_COVER_ID);

    let dir = doc.dir();
    let mut manifest_block = ITEM_TAG_REGEX
        .replace_all(doc.slice(&manifest), |caps: &Captures<'_>| {
            let tag = &caps[0];
            let item = ManifestItem {
                id: attribute(tag, "id").unwrap_or_default(),
                href: attribute(tag, "href").unwrap_or_default(),
                media_type: String::new(),
                properties: attribute(tag, "properties").unwrap_or_default(),
            };
            let is_cover = item.id.trim().eq_ignore_ascii_case(CANONICAL_COVER_ID)
                || item.has_property(COVER_IMAGE_PROPERTY)
                || is_preferred_name(&item.href)
                || removals.contains(&path::resolve(&dir, &item.href));
            if is_cover { Vec::new() } else { tag.to_vec() }
        })
        .into_owned();
    let item = format!(
        "\n<item id=\"{CANONICAL_COVER_ID}\" href=\"{}\" media-type=\"image/jpeg\" properties=\"{COVER_IMAGE_PROPERTY}\"/>",
        escape_value(href)
    );
    manifest_block.extend_from_slice(item.as_bytes());

    Ok(doc.splice(vec![(metadata, meta_block), (manifest, manifest_block)]))
}
