use std::fmt::{Display, Formatter, Result as FmtResult};

/// One image inside the archive that could serve as the book's cover.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoverCandidate {
    /// Normalized entry name inside the archive.
    pub zip_path: String,
    /// File name, for presentation.
    pub display_name: String,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
    /// Whether this is the image the cover locator would pick.
    pub is_current: bool,
}
impl CoverCandidate {
    /// Whether the image is large enough and portrait-shaped enough to be a
    /// book cover.
    pub fn is_suitable(&self) -> bool {
        const MIN_WIDTH: u32 = 240;
        const MIN_HEIGHT: u32 = 320;
        const RATIO: (f64, f64) = (0.55, 0.85);

        if self.width < MIN_WIDTH || self.height < MIN_HEIGHT {
            return false;
        }
        let ratio = f64::from(self.width) / f64::from(self.height);
        (RATIO.0..=RATIO.1).contains(&ratio)
    }
}

/// The image a cover write should install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSelection {
    /// An image already inside the archive, by entry name.
    Entry(String),
    /// Raw image bytes from outside the archive (an upload, a download).
    Bytes(Vec<u8>),
}

/// Which cover locator strategy produced a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoverSource {
    /// `cover.jpg` next to the EPUB on disk.
    SiblingFile,
    /// A manifest item named `cover.jpg`, `cover.jpeg` or `cover.png`.
    ManifestFileName,
    /// Any entry with "cover" or "folder" in its name.
    EntryName,
    /// The package document's own cover declaration.
    Declared,
}
impl CoverSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverSource::SiblingFile => "sibling file",
            CoverSource::ManifestFileName => "manifest file name",
            CoverSource::EntryName => "entry name",
            CoverSource::Declared => "package declaration",
        }
    }
}
impl Display for CoverSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
