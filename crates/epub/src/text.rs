//! Text cleanup shared by the read and write paths.
//!
//! Package documents in the wild mix XML entities, HTML entities and stray
//! ampersands freely, so unescaping is lenient: anything that does not resolve
//! to a known entity is left exactly as written.

use crate::consts::MARKUP_REGEX;
use memchr::memchr;
use quick_xml::escape::{escape, resolve_html5_entity, resolve_predefined_entity};
use std::borrow::Cow;

// Longest named entity in the HTML5 table is 32 bytes (`&CounterClockwiseContourIntegral;`).
const MAX_ENTITY_LEN: usize = 32;

/// Strips nested markup from raw element content, unescapes entities and
/// trims surrounding whitespace.
pub(crate) fn clean_value(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let stripped = MARKUP_REGEX.replace_all(trimmed.as_bytes(), &b""[..]);
    let stripped = String::from_utf8_lossy(&stripped);
    unescape_lenient(&stripped).trim().to_string()
}

/// Escapes a value for insertion as element text or a double-quoted attribute.
pub(crate) fn escape_value(value: &str) -> Cow<'_, str> {
    escape(value)
}

/// Resolves `&name;`, `&#NN;` and `&#xHH;` references, leaving anything
/// unresolvable untouched.
pub(crate) fn unescape_lenient(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return Cow::Borrowed(input);
    };
    let mut out = String::with_capacity(input.len());
    out.push_str(&input[..first]);
    let mut rest = &input[first..];
    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let window = &rest.as_bytes()[1..rest.len().min(MAX_ENTITY_LEN + 2)];
        let resolved = memchr(b';', window).and_then(|semi| {
            let entity = &rest[1..=semi];
            resolve_entity(entity).map(|value| (value, semi + 2))
        });
        match resolved {
            Some((value, consumed)) => {
                out.push_str(&value);
                rest = &rest[consumed..];
            },
            None => {
                out.push('&');
                rest = &rest[1..];
            },
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn resolve_entity(entity: &str) -> Option<Cow<'static, str>> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(|c| Cow::Owned(c.to_string()));
    }
    resolve_predefined_entity(entity).or_else(|| resolve_html5_entity(entity)).map(Cow::Borrowed)
}
