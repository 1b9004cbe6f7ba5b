use regex::bytes::Regex;
use std::sync::LazyLock;

// Optional XML namespace prefix on an element name, e.g. the `opf:` in `<opf:metadata>`.
const NS_PREFIX: &str = "(?:[A-Za-z_][A-Za-z0-9_.-]*:)?";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Fixed location of the container descriptor.
pub(crate) const CONTAINER_PATH: &str = "META-INF/container.xml";
/// File name of the canonical cover, relative to the package document's directory.
pub(crate) const CANONICAL_COVER_NAME: &str = "cover.jpg";
/// Manifest `id` (and metadata pointer) of the canonical cover.
pub(crate) const CANONICAL_COVER_ID: &str = "cover-image";
/// Both the EPUB 3 manifest property and the canonical cover's `id`.
pub(crate) const COVER_IMAGE_PROPERTY: &str = "cover-image";
/// `<meta name="cover">` is the EPUB 2 cover pointer.
pub(crate) const COVER_META_NAME: &str = "cover";
pub(crate) const SERIES_META_NAME: &str = "calibre:series";
pub(crate) const SERIES_INDEX_META_NAME: &str = "calibre:series_index";
pub(crate) const JPEG_QUALITY: u8 = 90;

// All patterns run with Unicode disabled so they work on package documents
// that are not valid UTF-8; every tag and attribute name involved is ASCII.
// Name characters are explicit ASCII ranges rather than `\w`, so what a
// pattern matches does not change with the regex features a build enables.
regex!(
    METADATA_BLOCK_REGEX,
    format!(r"(?is-u)<{NS_PREFIX}metadata\b[^>]*>(.*?)</{NS_PREFIX}metadata>").as_str()
);
regex!(
    MANIFEST_BLOCK_REGEX,
    format!(r"(?is-u)<{NS_PREFIX}manifest\b[^>]*>(.*?)</{NS_PREFIX}manifest>").as_str()
);
regex!(META_TAG_REGEX, format!(r"(?is-u)<{NS_PREFIX}meta\b[^>]*?/?>").as_str());
regex!(ITEM_TAG_REGEX, format!(r"(?is-u)<{NS_PREFIX}item\b[^>]*?/?>").as_str());
regex!(ATTRIBUTE_REGEX, r#"(?s-u)([A-Za-z_][A-Za-z0-9_:.-]*)[ \t\r\n]*=[ \t\r\n]*(?:"([^"]*)"|'([^']*)')"#);
regex!(MARKUP_REGEX, r"(?is-u)<[^>]+>");
