//! Manifest parsing.
//!
//! Only the parts of the package document needed for cover handling are
//! collected: every manifest `<item>` and the EPUB 2 `<meta name="cover">`
//! pointer.

use super::PackageDocument;
use crate::archive::path;
use crate::consts::{COVER_IMAGE_PROPERTY, COVER_META_NAME};
use crate::error::{ErrorKind, Result};
use crate::models::ManifestItem;
use crate::text::unescape_lenient;
use exn::ResultExt;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

#[derive(Debug, Default)]
pub(crate) struct Manifest {
    pub(crate) items: Vec<ManifestItem>,
    /// `content` of the first `<meta name="cover">` in the metadata block.
    pub(crate) cover_pointer: Option<String>,
}
impl Manifest {
    pub(crate) fn parse(doc: &PackageDocument) -> Result<Self> {
        let mut reader = Reader::from_reader(doc.content());
        reader.config_mut().trim_text(true);
        reader.config_mut().check_end_names = false;

        let mut manifest = Self::default();
        let mut in_metadata = false;
        let mut in_manifest = false;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).or_raise(|| ErrorKind::InvalidPackage)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"metadata" => in_metadata = true,
                    b"manifest" => in_manifest = true,
                    _ => manifest.visit(&e, in_metadata, in_manifest)?,
                },
                Event::Empty(e) => manifest.visit(&e, in_metadata, in_manifest)?,
                Event::End(e) => match e.local_name().as_ref() {
                    b"metadata" => in_metadata = false,
                    b"manifest" => in_manifest = false,
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }
        Ok(manifest)
    }

    fn visit(&mut self, e: &BytesStart<'_>, in_metadata: bool, in_manifest: bool) -> Result<()> {
        match e.local_name().as_ref() {
            b"item" if in_manifest => {
                let mut item = ManifestItem::default();
                for (key, value) in attributes(e)? {
                    match key.as_str() {
                        "id" => item.id = value,
                        "href" => item.href = value,
                        "media-type" => item.media_type = value,
                        "properties" => item.properties = value,
                        _ => {},
                    }
                }
                self.items.push(item);
            },
            b"meta" if in_metadata && self.cover_pointer.is_none() => {
                let attributes = attributes(e)?;
                let is_cover = attributes
                    .iter()
                    .any(|(key, value)| key == "name" && value.trim().eq_ignore_ascii_case(COVER_META_NAME));
                if is_cover {
                    self.cover_pointer = attributes
                        .into_iter()
                        .find(|(key, _)| key == "content")
                        .map(|(_, value)| value.trim().to_string())
                        .filter(|value| !value.is_empty());
                }
            },
            _ => {},
        }
        Ok(())
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// The package document's declared cover: an item with the `cover-image`
    /// property, else the item the `<meta name="cover">` pointer names.
    pub(crate) fn declared_cover(&self) -> Option<&ManifestItem> {
        self.items
            .iter()
            .find(|item| item.has_property(COVER_IMAGE_PROPERTY))
            .or_else(|| self.cover_pointer.as_deref().and_then(|id| self.by_id(id)))
    }

    /// Full entry name of an item, resolved against the package document's
    /// directory.
    pub(crate) fn resolve(&self, doc: &PackageDocument, item: &ManifestItem) -> String {
        path::resolve(&doc.dir(), &item.href)
    }
}

/// Attributes by lowercased local name, values unescaped.
fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    e.attributes()
        .with_checks(false)
        .map(|attr| {
            let attr = attr.or_raise(|| ErrorKind::InvalidPackage)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
            let value = unescape_lenient(&String::from_utf8_lossy(&attr.value)).trim().to_string();
            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Title</dc:title>
    <meta name="Cover" content=" img-cover "/>
  </metadata>
  <opf:manifest xmlns:opf="http://www.idpf.org/2007/opf">
    <opf:item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="img-cover" href="images/front&amp;back.jpg" media-type="image/jpeg"></item>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
  </opf:manifest>
</package>"#;

    fn parse(content: &str) -> Manifest {
        Manifest::parse(&PackageDocument::new("OEBPS/content.opf", content.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn collects_items_and_pointer() {
        let manifest = parse(OPF);
        let ids: Vec<_> = manifest.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["ncx", "img-cover", "nav"]);
        assert_eq!(manifest.cover_pointer.as_deref(), Some("img-cover"));
        let cover = manifest.declared_cover().unwrap();
        assert_eq!(cover.href, "images/front&back.jpg");
        assert_eq!(cover.media_type, "image/jpeg");
        assert_eq!(manifest.items[2].properties, "nav");
    }

    #[test]
    fn property_wins_over_pointer() {
        let manifest = parse(
            r#"<package><metadata><meta name="cover" content="a"/></metadata><manifest>
                <item id="a" href="a.jpg" media-type="image/jpeg"/>
                <item id="b" href="b.jpg" media-type="image/jpeg" properties="cover-image"/>
            </manifest></package>"#,
        );
        assert_eq!(manifest.declared_cover().unwrap().id, "b");
    }

    #[test]
    fn items_outside_manifest_are_ignored() {
        let manifest = parse(r#"<package><spine><item id="x" href="x.jpg"/></spine><manifest/></package>"#);
        assert!(manifest.items.is_empty());
        assert!(manifest.declared_cover().is_none());
    }

    #[test]
    fn resolves_against_package_dir() {
        let doc = PackageDocument::new("OEBPS/content.opf", OPF.as_bytes().to_vec());
        let manifest = Manifest::parse(&doc).unwrap();
        let cover = manifest.declared_cover().unwrap();
        assert_eq!(manifest.resolve(&doc, cover), "OEBPS/images/front&back.jpg");
    }

    #[test]
    fn malformed_document() {
        let doc = PackageDocument::new("content.opf", b"<package><manifest><item id=\"a></manifest>".to_vec());
        let err = Manifest::parse(&doc).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidPackage);
    }
}
