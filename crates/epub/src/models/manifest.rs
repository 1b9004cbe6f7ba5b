use crate::archive::path;

/// One `<item>` of the package document's `<manifest>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManifestItem {
    pub id: String,
    /// As written in the package document, relative to its directory.
    pub href: String,
    pub media_type: String,
    /// Space-separated property list (`cover-image`, `nav`, ...).
    pub properties: String,
}
impl ManifestItem {
    /// Case-insensitive membership test on the `properties` list.
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.split_ascii_whitespace().any(|p| p.eq_ignore_ascii_case(property))
    }

    pub fn file_name(&self) -> &str {
        path::file_name(&self.href)
    }

    /// Whether the item is a JPEG or PNG image.
    pub fn is_cover_image_type(&self) -> bool {
        matches!(self.media_type.trim().to_ascii_lowercase().as_str(), "image/jpeg" | "image/jpg" | "image/png")
    }
}
