//! Container Locator.
//!
//! Finds the package document through `META-INF/container.xml`, falling back
//! to the first `.opf` entry when the descriptor is missing, malformed, or
//! names no rootfile.

use super::Archive;
use crate::consts::CONTAINER_PATH;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::instrument;

#[instrument(level = "trace", skip_all, fields(path = %archive.path().display()))]
pub(super) fn locate(archive: &mut Archive) -> Result<String> {
    let declared = match archive.find(CONTAINER_PATH) {
        Some(name) => match archive.read(&name).and_then(|xml| first_rootfile(&xml)) {
            Ok(found) => found,
            Err(e) if matches!(&*e, ErrorKind::InvalidPackage) => {
                tracing::warn!(error = ?e, "Malformed container descriptor; searching for a package document");
                None
            },
            Err(e) => return Err(e),
        },
        None => None,
    };
    if let Some(path) = declared {
        tracing::trace!(package = %path, "Package document declared by container descriptor");
        return Ok(path);
    }
    let fallback = archive
        .names()
        .into_iter()
        .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
        .ok_or_raise(|| ErrorKind::PackageNotFound)?;
    tracing::debug!(package = %fallback, "Package document found by extension");
    Ok(fallback)
}

/// The `full-path` of the first `<rootfile>` in a container descriptor, if it
/// names one.
fn first_rootfile(xml: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).or_raise(|| ErrorKind::InvalidPackage)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                for attr in e.attributes().with_checks(false) {
                    let attr = attr.or_raise(|| ErrorKind::InvalidPackage)?;
                    if attr.key.local_name().as_ref() == b"full-path" {
                        let value = String::from_utf8_lossy(&attr.value).trim().to_string();
                        return Ok(Some(value).filter(|v| !v.is_empty()));
                    }
                }
                return Ok(None);
            },
            Event::Eof => return Ok(None),
            _ => {},
        }
        buf.clear();
    }
}
