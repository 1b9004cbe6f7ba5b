//! Metadata and manifest block locators.

use super::PackageDocument;
use crate::consts::{MANIFEST_BLOCK_REGEX, METADATA_BLOCK_REGEX};
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use regex::bytes::Regex;
use std::ops::Range;

/// Byte range of an element's inner content within the package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}
impl Span {
    fn find(regex: &Regex, content: &[u8]) -> Option<Self> {
        let inner = regex.captures(content)?.get(1)?;
        Some(Self { start: inner.start(), end: inner.end() })
    }

    pub(crate) fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl PackageDocument {
    /// Inner span of the first `<metadata>` element, with or without a
    /// namespace prefix.
    pub(crate) fn metadata_span(&self) -> Result<Span> {
        Span::find(&METADATA_BLOCK_REGEX, self.content()).ok_or_raise(|| ErrorKind::MetadataSectionNotFound)
    }

    /// Inner span of the first `<manifest>` element.
    pub(crate) fn manifest_span(&self) -> Result<Span> {
        Span::find(&MANIFEST_BLOCK_REGEX, self.content()).ok_or_raise(|| ErrorKind::ManifestSectionNotFound)
    }

    pub(crate) fn slice(&self, span: &Span) -> &[u8] {
        &self.content()[span.range()]
    }

    /// A copy of the document with the bytes of each span replaced. Spans must
    /// not overlap; everything outside them is carried over byte for byte.
    pub(crate) fn splice(&self, mut patches: Vec<(Span, Vec<u8>)>) -> Vec<u8> {
        patches.sort_by_key(|(span, _)| span.start);
        let content = self.content();
        let mut out = Vec::with_capacity(content.len() + patches.iter().map(|(_, bytes)| bytes.len()).sum::<usize>());
        let mut cursor = 0;
        for (span, bytes) in patches {
            out.extend_from_slice(&content[cursor..span.start]);
            out.extend_from_slice(&bytes);
            cursor = span.end;
        }
        out.extend_from_slice(&content[cursor..]);
        out
    }
}
