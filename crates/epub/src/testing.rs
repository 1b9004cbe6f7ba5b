//! Fixture EPUBs and images for unit tests.

use crate::consts::CONTAINER_PATH;
use image::{ImageFormat, Rgba, RgbaImage};
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Default)]
pub(crate) struct EpubBuilder {
    container: Option<String>,
    entries: Vec<(String, Vec<u8>)>,
}
impl EpubBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Writes a `META-INF/container.xml` pointing at `package_path`.
    pub(crate) fn container(mut self, package_path: &str) -> Self {
        self.container = Some(package_path.to_string());
        self
    }

    pub(crate) fn entry(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), content.as_ref().to_vec()));
        self
    }

    /// Adds the package document and points the container descriptor at it.
    pub(crate) fn opf(self, path: &str, xml: &str) -> Self {
        self.container(path).entry(path, xml)
    }

    /// Writes the archive to `dir/name`. The `mimetype` entry always comes
    /// first and is stored uncompressed.
    pub(crate) fn write(self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        if let Some(package) = &self.container {
            zip.start_file(CONTAINER_PATH, deflated).unwrap();
            zip.write_all(container_xml(package).as_bytes()).unwrap();
        }
        for (name, content) in &self.entries {
            zip.start_file(name.as_str(), deflated).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
        path
    }
}

fn container_xml(package: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{package}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
    )
}

/// A package document with the given `<metadata>` and `<manifest>` contents.
pub(crate) fn opf(metadata: &str, manifest: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">{metadata}
  </metadata>
  <manifest>{manifest}
  </manifest>
  <spine toc="ncx"/>
</package>
"#
    )
}

/// Every entry's name and decompressed bytes, in archive order.
pub(crate) fn entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|index| {
            let mut entry = zip.by_index(index).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}

/// A PNG with an alpha channel.
pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]));
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
    out
}

pub(crate) fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([40, 40, 200]));
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg).unwrap();
    out
}

/// Routes engine logs through the test harness's captured output.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("bindery_epub=debug"))
        .try_init();
}
