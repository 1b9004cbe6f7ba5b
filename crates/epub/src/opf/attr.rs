use crate::consts::ATTRIBUTE_REGEX;
use crate::text::unescape_lenient;

/// Value of the attribute `name` in a raw start tag, unescaped. Names match
/// case-insensitively and ignore any namespace prefix (`opf:name` matches
/// `name`).
pub(crate) fn attribute(tag: &[u8], name: &str) -> Option<String> {
    ATTRIBUTE_REGEX.captures_iter(tag).find_map(|caps| {
        let key = &caps[1];
        let local = key.rsplit(|b| *b == b':').next().unwrap_or(key);
        if !local.eq_ignore_ascii_case(name.as_bytes()) {
            return None;
        }
        let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_bytes()).unwrap_or_default();
        Some(unescape_lenient(&String::from_utf8_lossy(value)).into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(br#"<meta name="cover" content="img1"/>"#, "name", Some("cover"))]
    #[case(br#"<meta name='cover' content='img1'/>"#, "content", Some("img1"))]
    #[case(br#"<opf:meta opf:name = "cover" />"#, "name", Some("cover"))]
    #[case(br#"<meta NAME="calibre:series" CONTENT="Saga &amp; Co"/>"#, "content", Some("Saga & Co"))]
    #[case(br#"<meta property="dcterms:modified">2020</meta>"#, "name", None)]
    #[case(br#"<item id="x" href="a.jpg" media-type="image/jpeg"/>"#, "media-type", Some("image/jpeg"))]
    #[case(b"<meta name=\"caf\xe9\" content=\"x\"/>", "content", Some("x"))]
    #[case(b"<meta\n\tname\n=\n'cover'/>", "name", Some("cover"))]
    fn reads_attributes(#[case] tag: &[u8], #[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(attribute(tag, name).as_deref(), expected);
    }

    #[test]
    fn pattern_spans_name_and_quoted_value() {
        let tag = br#"<meta xml:lang="en" name="cover"/>"#;
        let pairs: Vec<&[u8]> = ATTRIBUTE_REGEX.find_iter(tag).map(|m| m.as_bytes()).collect();
        assert_eq!(pairs, vec![&br#"xml:lang="en""#[..], &br#"name="cover""#[..]]);
    }
}
