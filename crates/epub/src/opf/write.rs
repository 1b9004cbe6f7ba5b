//! Field Mutator.
//!
//! Three primitives patch the `<metadata>` block's bytes; each returns the new
//! buffer and whether anything was removed or added. Removed tags leave no
//! trace and new tags are appended at the end of the block, so everything the
//! update does not manage stays exactly where it was.

use super::{DcTag, PackageDocument, attribute};
use crate::consts::{META_TAG_REGEX, SERIES_INDEX_META_NAME, SERIES_META_NAME};
use crate::error::{ErrorKind, Result};
use crate::models::MetadataUpdate;
use crate::text::escape_value;
use regex::bytes::Captures;

impl PackageDocument {
    /// The whole package document with `update` applied to its metadata
    /// block.
    pub(crate) fn with_fields(&self, update: &MetadataUpdate) -> Result<Vec<u8>> {
        let span = self.metadata_span()?;
        let block = apply_update(self.slice(&span), update)?;
        Ok(self.splice(vec![(span, block)]))
    }
}

/// Writes every field of `update` into a metadata block. Fails with
/// [`ErrorKind::NoChangesApplied`] if not a single tag was removed or added.
pub(crate) fn apply_update(block: &[u8], update: &MetadataUpdate) -> Result<Vec<u8>> {
    let singles = [
        (DcTag::Title, &update.title),
        (DcTag::Creator, &update.author),
        (DcTag::Language, &update.language),
        (DcTag::Identifier, &update.identifier),
        (DcTag::Publisher, &update.publisher),
        (DcTag::Date, &update.date),
        (DcTag::Description, &update.description),
    ];

    let mut buffer = block.to_vec();
    let mut changed = false;
    for (tag, value) in singles {
        let (next, touched) = set_single_tag(&buffer, tag, value);
        buffer = next;
        changed |= touched;
    }
    let (next, touched) = set_multi_tag(&buffer, DcTag::Subject, &update.subjects);
    buffer = next;
    changed |= touched;
    for (name, value) in [(SERIES_META_NAME, &update.series), (SERIES_INDEX_META_NAME, &update.series_index)] {
        let (next, touched) = set_meta_name_content(&buffer, name, value);
        buffer = next;
        changed |= touched;
    }

    if !changed {
        exn::bail!(ErrorKind::NoChangesApplied);
    }
    Ok(buffer)
}

/// Removes every element of `tag` in either spelling and, for a non-empty
/// value, appends one element spelled like the first one removed (`dc:` when
/// there was none).
pub(crate) fn set_single_tag(block: &[u8], tag: DcTag, value: &str) -> (Vec<u8>, bool) {
    let value = value.trim();
    let forms = tag.forms();
    let mut buffer = block.to_vec();
    let mut spelling = None;
    for form in forms {
        if form.regex.is_match(&buffer) {
            buffer = form.regex.replace_all(&buffer, &b""[..]).into_owned();
            spelling.get_or_insert(form.name.as_str());
        }
    }
    let changed = spelling.is_some() || !value.is_empty();
    if !value.is_empty() {
        append_element(&mut buffer, spelling.unwrap_or(forms[0].name.as_str()), value);
    }
    (buffer, changed)
}

/// Removes every element of `tag` in either spelling and appends one element
/// per distinct non-empty value. Bare spelling is kept if the block used it.
pub(crate) fn set_multi_tag(block: &[u8], tag: DcTag, values: &[String]) -> (Vec<u8>, bool) {
    let [qualified, bare] = tag.forms();
    let mut buffer = block.to_vec();
    let mut changed = false;
    let mut spelling = qualified.name.as_str();
    for form in [qualified, bare] {
        if form.regex.is_match(&buffer) {
            buffer = form.regex.replace_all(&buffer, &b""[..]).into_owned();
            spelling = form.name.as_str();
            changed = true;
        }
    }

    let mut written: Vec<&str> = Vec::new();
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if written.contains(&value) {
            continue;
        }
        append_element(&mut buffer, spelling, value);
        written.push(value);
        changed = true;
    }
    (buffer, changed)
}

/// Removes every `<meta>` whose `name` matches (ignoring case, surrounding
/// whitespace and any namespace prefix on the element) and, for a non-empty
/// value, appends one `<meta name=".." content=".."/>`.
pub(crate) fn set_meta_name_content(block: &[u8], name: &str, value: &str) -> (Vec<u8>, bool) {
    let value = value.trim();
    let mut removed = 0;
    let mut buffer = META_TAG_REGEX
        .replace_all(block, |caps: &Captures<'_>| {
            let tag = &caps[0];
            if attribute(tag, "name").is_some_and(|found| found.trim().eq_ignore_ascii_case(name)) {
                removed += 1;
                Vec::new()
            } else {
                tag.to_vec()
            }
        })
        .into_owned();
    if !value.is_empty() {
        let element = format!("\n<meta name=\"{name}\" content=\"{}\"/>", escape_value(value));
        buffer.extend_from_slice(element.as_bytes());
    }
    (buffer, removed > 0 || !value.is_empty())
}

fn append_element(buffer: &mut Vec<u8>, name: &str, value: &str) {
    let element = format!("\n<{name}>{}</{name}>", escape_value(value));
    buffer.extend_from_slice(element.as_bytes());
}
