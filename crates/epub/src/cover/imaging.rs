//! Image probing, decoding and re-encoding.

use crate::consts::JPEG_QUALITY;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Output encodings for a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoding {
    Jpeg,
    Png,
}
impl Encoding {
    /// PNG for `.png` paths, JPEG for everything else.
    pub(crate) fn for_path(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".png") { Self::Png } else { Self::Jpeg }
    }

    pub(crate) fn media_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Width and height from the image header alone; the pixel data is never
/// decoded.
pub(crate) fn dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .or_raise(|| ErrorKind::ImageDecodeFailed)?
        .into_dimensions()
        .or_raise(|| ErrorKind::ImageDecodeFailed)?;
    if width == 0 || height == 0 {
        exn::bail!(ErrorKind::ImageDecodeFailed);
    }
    Ok((width, height))
}

pub(crate) fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).or_raise(|| ErrorKind::ImageDecodeFailed)
}

pub(crate) fn encode(image: &DynamicImage, encoding: Encoding) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match encoding {
        Encoding::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb).or_raise(|| ErrorKind::Io)?;
        },
        Encoding::Png => {
            image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).or_raise(|| ErrorKind::Io)?;
        },
    }
    Ok(out)
}

/// Decodes any supported image and re-encodes it as JPEG (quality 90).
pub fn convert_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>> {
    encode(&decode(bytes)?, Encoding::Jpeg)
}
