//! Field Reader.
//!
//! Every field is looked up as `dc:<tag>` first and as a bare `<tag>` second.
//! Values are stripped of nested markup and unescaped.

use super::{DcTag, PackageDocument, attribute};
use crate::consts::{META_TAG_REGEX, SERIES_INDEX_META_NAME, SERIES_META_NAME};
use crate::error::Result;
use crate::models::MetadataFields;
use crate::text::clean_value;

impl PackageDocument {
    /// Reads every managed field from the `<metadata>` block.
    pub(crate) fn read_fields(&self) -> Result<MetadataFields> {
        let span = self.metadata_span()?;
        Ok(read_fields(self.slice(&span)))
    }
}

pub(crate) fn read_fields(block: &[u8]) -> MetadataFields {
    MetadataFields {
        title: first_value(block, DcTag::Title),
        author: first_value(block, DcTag::Creator),
        language: first_value(block, DcTag::Language),
        identifier: preferred_identifier(block),
        publisher: first_value(block, DcTag::Publisher),
        date: first_value(block, DcTag::Date),
        description: first_value(block, DcTag::Description),
        subjects: all_values(block, DcTag::Subject),
        series: meta_content(block, SERIES_META_NAME),
        series_index: meta_content(block, SERIES_INDEX_META_NAME),
    }
}

/// Cleaned content of the first element in the first spelling that occurs at
/// all.
fn first_value(block: &[u8], tag: DcTag) -> String {
    tag.forms()
        .iter()
        .find_map(|form| form.regex.captures(block))
        .map(|caps| clean_value(&caps[2]))
        .unwrap_or_default()
}

/// Every non-empty value across both spellings, first occurrence kept.
fn all_values(block: &[u8], tag: DcTag) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for form in tag.forms() {
        for caps in form.regex.captures_iter(block) {
            let value = clean_value(&caps[2]);
            if !value.is_empty() && !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

/// The first identifier mentioning "isbn" in its attributes (`opf:scheme`,
/// `id`) or its value; otherwise the first non-empty identifier.
fn preferred_identifier(block: &[u8]) -> String {
    let identifiers = DcTag::Identifier
        .forms()
        .iter()
        .flat_map(|form| form.regex.captures_iter(block))
        .filter_map(|caps| {
            let value = clean_value(&caps[2]);
            if value.is_empty() {
                return None;
            }
            let mentions_isbn = contains_isbn(&caps[1]) || contains_isbn(value.as_bytes());
            Some((value, mentions_isbn))
        });

    let mut first = None;
    for (value, mentions_isbn) in identifiers {
        if mentions_isbn {
            return value;
        }
        first.get_or_insert(value);
    }
    first.unwrap_or_default()
}

fn contains_isbn(haystack: &[u8]) -> bool {
    haystack.windows(4).any(|window| window.eq_ignore_ascii_case(b"isbn"))
}

/// `content` of the first `<meta>` whose `name` matches, ignoring case and
/// surrounding whitespace.
fn meta_content(block: &[u8], name: &str) -> String {
    META_TAG_REGEX
        .find_iter(block)
        .map(|tag| tag.as_bytes())
        .find(|tag| attribute(tag, "name").is_some_and(|found| found.trim().eq_ignore_ascii_case(name)))
        .and_then(|tag| attribute(tag, "content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}
