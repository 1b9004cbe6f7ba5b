//! Surgical metadata and cover rewriting for EPUB archives.
//!
//! Every operation opens the archive fresh, works on the package document as
//! raw bytes, and (for writes) replaces the file atomically. Bytes outside the
//! patched regions of the package document are never re-serialized.

mod archive;
mod consts;
pub mod cover;
pub mod error;
pub mod models;
mod opf;
pub mod scan;
mod text;
#[cfg(test)]
mod testing;

use std::path::Path;
use tracing::instrument;

use crate::archive::Archive;
pub use crate::cover::{CoverCache, CoverTargets, convert_to_jpeg};
use crate::error::Result;
use crate::models::{CoverCandidate, CoverSelection, CoverSource, MetadataFields, MetadataUpdate};
pub use crate::scan::{BookSummary, PathCategories, categories_from_path};

/// Reads the bibliographic fields of the book at `path`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_metadata(path: impl AsRef<Path>) -> Result<MetadataFields> {
    let mut archive = Archive::open(path)?;
    archive.package()?.read_fields()
}

/// Writes every field of `update` into the book's package document and
/// returns the fields as read back from the rewritten file.
///
/// Empty fields delete their tags. Fails with
/// [`ErrorKind::NoChangesApplied`](error::ErrorKind::NoChangesApplied) when
/// the update would not touch anything; the file is then left as it was.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn write_metadata(path: impl AsRef<Path>, update: &MetadataUpdate) -> Result<MetadataFields> {
    let path = path.as_ref();
    let mut archive = Archive::open(path)?;
    let doc = archive.package()?;
    let content = doc.with_fields(update)?;
    tracing::debug!(package = doc.path(), bytes = content.len(), "Rewriting package document");
    archive.rewrite().replace(doc.path(), content).commit()?;
    read_metadata(path)
}

/// Finds the book's cover and copies its bytes, unconverted, to `target`.
#[instrument(skip_all, fields(path = %path.as_ref().display(), target = %target.as_ref().display()))]
pub fn locate_and_extract_cover(path: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<CoverSource> {
    cover::locate::extract(path.as_ref(), target.as_ref())
}

/// Images in the manifest that could serve as the cover.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn list_cover_candidates(path: impl AsRef<Path>) -> Result<Vec<CoverCandidate>> {
    cover::candidates::list(path.as_ref())
}

/// Raw bytes of the entry at `zip_path`, with the media type its extension
/// implies.
#[instrument(skip_all, fields(path = %path.as_ref().display(), entry = zip_path))]
pub fn read_cover_candidate(path: impl AsRef<Path>, zip_path: &str) -> Result<(Vec<u8>, &'static str)> {
    cover::candidates::read(path.as_ref(), zip_path)
}

/// Installs `selection` as the book's only cover.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn write_cover(path: impl AsRef<Path>, selection: &CoverSelection) -> Result<()> {
    cover::write::write(path.as_ref(), selection)
}

/// Converts `selection` to JPEG and installs it wherever `targets` says: the
/// cover cache, and optionally the book plus the `cover.jpg` beside it.
/// Returns the JPEG bytes.
///
/// Nothing is written if the image cannot be read or decoded.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn change_cover(path: impl AsRef<Path>, selection: &CoverSelection, targets: CoverTargets<'_>) -> Result<Vec<u8>> {
    cover::change::apply(path.as_ref(), selection, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{EpubBuilder, entries, init_tracing, jpeg, opf, png};

    const METADATA: &str = r#"
    <dc:title>Old Title</dc:title>
    <dc:creator opf:role="aut">Old Author</dc:creator>
    <dc:language>en</dc:language>
    <dc:subject>Fiction</dc:subject>
    <meta name="cover" content="art"/>"#;
    const MANIFEST: &str = r#"
    <item id="text" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="art" href="images/art.png" media-type="image/png"/>
    <item id="small" href="images/small.png" media-type="image/png"/>"#;

    fn book(dir: &Path) -> std::path::PathBuf {
        init_tracing();
        EpubBuilder::new()
            .opf("OEBPS/content.opf", &opf(METADATA, MANIFEST))
            .entry("OEBPS/text/ch1.xhtml", b"<html><body>Chapter one</body></html>")
            .entry("OEBPS/images/art.png", png(300, 450))
            .entry("OEBPS/images/small.png", png(100, 100))
            .write(dir, "book.epub")
    }

    fn update() -> MetadataUpdate {
        MetadataUpdate {
            title: "Ærø & <Sons> \"Quoted\" 'single'".to_string(),
            author: "José Ñúñez & Co".to_string(),
            language: "es".to_string(),
            identifier: "urn:isbn:9780000000001".to_string(),
            publisher: "Pub <lishing>".to_string(),
            date: "2024-02-29".to_string(),
            description: "Fish & chips > peas".to_string(),
            subjects: vec!["Sci-Fi".to_string(), "Space & Time".to_string(), "Sci-Fi".to_string()],
            series: "Dune™".to_string(),
            series_index: "1.5".to_string(),
        }
    }

    #[test]
    fn metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let epub = book(dir.path());

        let written = write_metadata(&epub, &update()).unwrap();

        let expected = MetadataFields {
            subjects: vec!["Sci-Fi".to_string(), "Space & Time".to_string()],
            ..update()
        };
        assert_eq!(written, expected);
        assert_eq!(read_metadata(&epub).unwrap(), expected);
    }

    #[test]
    fn repeated_writes_do_not_duplicate_tags() {
        let dir = tempfile::tempdir().unwrap();
        let epub = book(dir.path());

        write_metadata(&epub, &update()).unwrap();
        if let Err(err) = write_metadata(&epub, &update()) {
            assert_eq!(*err, ErrorKind::NoChangesApplied);
        }

        let opf = entries(&epub).into_iter().find(|(name, _)| name == "OEBPS/content.opf").unwrap().1;
        let opf = String::from_utf8(opf).unwrap();
        for tag in ["<dc:title", "<dc:creator", "<dc:language", "<dc:identifier", "<dc:publisher", "<dc:date"] {
            assert_eq!(opf.matches(tag).count(), 1, "{tag}");
        }
        assert_eq!(opf.matches("<dc:subject").count(), 2);
        assert_eq!(opf.matches("name=\"calibre:series\"").count(), 1);
        assert_eq!(opf.matches("name=\"calibre:series_index\"").count(), 1);
    }

    #[test]
    fn metadata_write_keeps_other_entries() {
        let dir = tempfile::tempdir().unwrap();
        let epub = book(dir.path());
        let before = entries(&epub);

        write_metadata(&epub, &MetadataUpdate { title: "New".to_string(), ..Default::default() }).unwrap();

        let after = entries(&epub);
        assert_eq!(after.len(), before.len());
        for ((old_name, old_bytes), (new_name, new_bytes)) in before.iter().zip(&after) {
            assert_eq!(old_name, new_name);
            if old_name != "OEBPS/content.opf" {
                assert_eq!(old_bytes, new_bytes, "{old_name}");
            }
        }
    }

    #[test]
    fn unchanged_write_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let epub = EpubBuilder::new().opf("content.opf", &opf("", "")).write(dir.path(), "book.epub");
        let original = std::fs::read(&epub).unwrap();

        let err = write_metadata(&epub, &MetadataUpdate::default()).unwrap_err();

        assert_eq!(*err, ErrorKind::NoChangesApplied);
        assert_eq!(std::fs::read(&epub).unwrap(), original);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn sibling_cover_wins_over_declared_cover() {
        let dir = tempfile::tempdir().unwrap();
        let epub = book(dir.path());
        let sibling = jpeg(40, 60);
        std::fs::write(dir.path().join("cover.jpg"), &sibling).unwrap();

        let cache = CoverCache::new(dir.path().join("covers"));
        let source = locate_and_extract_cover(&epub, cache.path_for(7)).unwrap();

        assert_eq!(source, CoverSource::SiblingFile);
        assert_eq!(std::fs::read(cache.path_for(7)).unwrap(), sibling);
    }

    #[test]
    fn candidates_then_cover_change() {
        let dir = tempfile::tempdir().unwrap();
        let epub = book(dir.path());

        let candidates = list_cover_candidates(&epub).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_current);
        let (bytes, media_type) = read_cover_candidate(&epub, &candidates[0].zip_path).unwrap();
        assert_eq!(media_type, "image/png");

        write_cover(&epub, &CoverSelection::Bytes(bytes)).unwrap();

        let names: Vec<_> = entries(&epub).into_iter().map(|(name, _)| name).collect();
        assert!(names.contains(&"OEBPS/cover.jpg".to_string()));
        assert!(!names.contains(&"OEBPS/images/art.png".to_string()));
        let target = dir.path().join("cache.jpg");
        assert_eq!(locate_and_extract_cover(&epub, &target).unwrap(), CoverSource::ManifestFileName);
        assert_eq!(read_metadata(&epub).unwrap().title, "Old Title");
    }

    #[test]
    fn cover_change_reaches_cache_book_and_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let epub = book(dir.path());
        std::fs::write(dir.path().join("cover.jpg"), jpeg(40, 60)).unwrap();
        let cache = CoverCache::new(dir.path().join("covers"));

        let targets = CoverTargets { cache: Some((&cache, 9)), write_to_epub: true };
        let selection = CoverSelection::Bytes(png(300, 450));
        let converted = change_cover(&epub, &selection, targets).unwrap();

        assert_eq!(converted, convert_to_jpeg(&png(300, 450)).unwrap());
        assert_eq!(std::fs::read(cache.path_for(9)).unwrap(), converted);
        let extracted = dir.path().join("extracted.jpg");
        assert_eq!(locate_and_extract_cover(&epub, &extracted).unwrap(), CoverSource::SiblingFile);
        assert_eq!(std::fs::read(&extracted).unwrap(), converted);
        let installed = entries(&epub).into_iter().find(|(name, _)| name == "OEBPS/cover.jpg").unwrap().1;
        assert_eq!(&installed[..2], [0xFF, 0xD8]);
    }

    #[test]
    fn rewriting_read_fields_keeps_only_the_first_creator() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = r#"
    <dc:title>Title</dc:title>
    <dc:creator>First Author</dc:creator>
    <dc:creator>Second Author</dc:creator>
    <dc:description><p>Rich <b>text</b></p></dc:description>"#;
        let epub = EpubBuilder::new().opf("content.opf", &opf(metadata, "")).write(dir.path(), "book.epub");

        let current = read_metadata(&epub).unwrap();
        write_metadata(&epub, &MetadataUpdate { title: "Renamed".to_string(), ..current }).unwrap();

        let opf = entries(&epub).into_iter().find(|(name, _)| name == "content.opf").unwrap().1;
        let opf = String::from_utf8(opf).unwrap();
        assert_eq!(opf.matches("<dc:creator").count(), 1);
        assert!(!opf.contains("Second Author"));
        assert!(!opf.contains("<b>"));
        let fields = read_metadata(&epub).unwrap();
        assert_eq!(fields.author, "First Author");
        assert_eq!(fields.description, "Rich text");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn value() -> impl Strategy<Value = String> {
            "[a-zA-Z0-9 &<>\"';#éñ™ー]{0,16}".prop_map(|value| value.trim().to_string())
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn written_fields_read_back(
                title in value(),
                author in value(),
                publisher in value(),
                description in value(),
                subjects in proptest::collection::vec(value(), 0..4),
                series in value(),
            ) {
                let dir = tempfile::tempdir().unwrap();
                let epub = book(dir.path());
                let update = MetadataUpdate {
                    title,
                    author,
                    publisher,
                    description,
                    subjects,
                    series,
                    ..Default::default()
                };

                let written = match write_metadata(&epub, &update) {
                    Ok(written) => written,
                    Err(err) if *err == ErrorKind::NoChangesApplied => read_metadata(&epub).unwrap(),
                    Err(err) => panic!("{err:?}"),
                };

                let mut subjects: Vec<String> = Vec::new();
                for subject in update.subjects.iter().filter(|s| !s.is_empty()) {
                    if !subjects.contains(subject) {
                        subjects.push(subject.clone());
                    }
                }
                prop_assert_eq!(written, MetadataFields { subjects, ..update });
            }
        }
    }
}
