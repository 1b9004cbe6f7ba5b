//! Zip entry path normalization.
//!
//! Entry names inside an EPUB are always `/`-separated and relative to the
//! archive root, but manifest `href`s in the wild contain `./`, `../`,
//! backslashes and doubled separators. Everything is compared in the
//! normalized form produced here.

/// Normalizes a zip entry path: backslashes become `/`, `.` segments and empty
/// segments are dropped, `..` pops the previous segment (and is discarded at
/// the root rather than escaping it).
///
/// Returns an empty string when nothing remains.
///
/// ```text
/// "OEBPS\\images\\cover.jpg"   → "OEBPS/images/cover.jpg"
/// "./OEBPS//text/../cover.jpg" → "OEBPS/cover.jpg"
/// "/cover.jpg"                 → "cover.jpg"
/// ```
pub fn normalize(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Directory portion of a normalized entry path, empty for root-level entries.
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Final segment of an entry path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once(['/', '\\']).map(|(_, name)| name).unwrap_or(path).trim()
}

/// Resolves a manifest `href` against the package document's directory.
pub fn resolve(base_dir: &str, href: &str) -> String {
    if base_dir.is_empty() {
        normalize(href)
    } else {
        normalize(&format!("{base_dir}/{href}"))
    }
}

/// Inverse of [`resolve`] for entries inside `base_dir`: the `href` a manifest
/// item in the package document would use to point at `full_path`.
///
/// Entries outside `base_dir` fall back to their bare file name.
pub fn relative_to(base_dir: &str, full_path: &str) -> String {
    let base_dir = normalize(base_dir);
    let full_path = normalize(full_path);
    if base_dir.is_empty() {
        return full_path;
    }
    match full_path.strip_prefix(&base_dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(relative) => relative.to_string(),
        None => file_name(&full_path).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("OEBPS/content.opf", "OEBPS/content.opf")]
    #[case("OEBPS\\images\\cover.jpg", "OEBPS/images/cover.jpg")]
    #[case("./OEBPS//text/../cover.jpg", "OEBPS/cover.jpg")]
    #[case("/cover.jpg", "cover.jpg")]
    #[case("  spaced/cover.png  ", "spaced/cover.png")]
    #[case("../../escape.jpg", "escape.jpg")]
    #[case(".", "")]
    #[case("", "")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("OEBPS/content.opf", "OEBPS")]
    #[case("a/b/content.opf", "a/b")]
    #[case("content.opf", "")]
    fn test_parent(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parent(input), expected);
    }

    #[rstest]
    #[case("OEBPS", "images/cover.jpg", "OEBPS/images/cover.jpg")]
    #[case("OEBPS/text", "../images/cover.jpg", "OEBPS/images/cover.jpg")]
    #[case("", "cover.jpg", "cover.jpg")]
    #[case("OEBPS", "./cover.jpg", "OEBPS/cover.jpg")]
    fn test_resolve(#[case] base: &str, #[case] href: &str, #[case] expected: &str) {
        assert_eq!(resolve(base, href), expected);
    }

    #[rstest]
    #[case("OEBPS", "OEBPS/cover.jpg", "cover.jpg")]
    #[case("OEBPS", "OEBPS/images/cover.jpg", "images/cover.jpg")]
    #[case("", "cover.jpg", "cover.jpg")]
    #[case("OEBPS", "Other/cover.jpg", "cover.jpg")]
    #[case("OEB", "OEBPS/cover.jpg", "cover.jpg")]
    fn test_relative_to(#[case] base: &str, #[case] full: &str, #[case] expected: &str) {
        assert_eq!(relative_to(base, full), expected);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("OEBPS/images/Cover.JPG"), "Cover.JPG");
        assert_eq!(file_name("cover.png"), "cover.png");
        assert_eq!(file_name("images\\cover.png"), "cover.png");
    }
}
