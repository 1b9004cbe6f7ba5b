/// Bibliographic fields read from, and written to, a package document's
/// `<metadata>` block.
///
/// Empty strings mean "absent". Used as both the read model and the write
/// request ([`MetadataUpdate`]): writing an empty field deletes that field's
/// tags from the package document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MetadataFields {
    pub title: String,
    /// First `dc:creator`.
    pub author: String,
    pub language: String,
    /// ISBN-flavoured identifier when there is one, otherwise the first.
    pub identifier: String,
    pub publisher: String,
    pub date: String,
    pub description: String,
    /// Ordered, without duplicates.
    pub subjects: Vec<String>,
    /// `calibre:series`
    pub series: String,
    /// `calibre:series_index`, kept as written.
    pub series_index: String,
}

/// Write-request shape of [`MetadataFields`]; every field is written.
pub type MetadataUpdate = MetadataFields;

impl MetadataFields {
    /// True when no field holds a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
