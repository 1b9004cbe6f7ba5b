//! The package document (OPF) and the text-level tools that read and patch it.
//!
//! Nothing here builds an XML tree. Reads and writes work on byte spans of the
//! original document so that formatting, comments and whitespace outside the
//! patched tags survive untouched.

mod attr;
pub(crate) mod manifest;
pub(crate) mod read;
pub(crate) mod span;
pub(crate) mod write;

pub(crate) use self::attr::attribute;
use crate::archive::path;
use regex::bytes::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// The raw package document and its location inside the archive. Loaded fresh
/// for every operation.
#[derive(Debug, Clone)]
pub(crate) struct PackageDocument {
    path: String,
    content: Vec<u8>,
}
impl PackageDocument {
    pub(crate) fn new(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self { path: path.into(), content }
    }

    /// Entry name of the package document, exactly as stored in the archive.
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Normalized directory containing the package document; manifest
    /// `href`s resolve against it.
    pub(crate) fn dir(&self) -> String {
        path::parent(&path::normalize(&self.path)).to_string()
    }

    pub(crate) fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Dublin Core elements managed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum DcTag {
    Title,
    Creator,
    Language,
    Identifier,
    Publisher,
    Date,
    Description,
    Subject,
}
impl DcTag {
    const ALL: [DcTag; 8] = [
        DcTag::Title,
        DcTag::Creator,
        DcTag::Language,
        DcTag::Identifier,
        DcTag::Publisher,
        DcTag::Date,
        DcTag::Description,
        DcTag::Subject,
    ];

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            DcTag::Title => "title",
            DcTag::Creator => "creator",
            DcTag::Language => "language",
            DcTag::Identifier => "identifier",
            DcTag::Publisher => "publisher",
            DcTag::Date => "date",
            DcTag::Description => "description",
            DcTag::Subject => "subject",
        }
    }

    /// Element patterns for this tag in lookup order: the `dc:`-qualified form,
    /// then the bare form. Group 1 captures the attributes, group 2 the content.
    pub(crate) fn forms(&self) -> &'static [TagForm; 2] {
        &TAG_FORMS[self]
    }
}

/// One spelling of a Dublin Core element (`dc:title` or `title`) and the
/// pattern matching a complete element in that spelling.
pub(crate) struct TagForm {
    pub(crate) name: String,
    pub(crate) regex: Regex,
}
impl TagForm {
    fn new(name: String) -> Self {
        let escaped = regex::escape(&name);
        let regex = Regex::new(&format!(r"(?is-u)<{escaped}\b([^>]*)>(.*?)</{escaped}>")).unwrap();
        Self { name, regex }
    }
}

static TAG_FORMS: LazyLock<HashMap<DcTag, [TagForm; 2]>> = LazyLock::new(|| {
    DcTag::ALL
        .into_iter()
        .map(|tag| {
            let bare = tag.as_str().to_string();
            (tag, [TagForm::new(format!("dc:{bare}")), TagForm::new(bare)])
        })
        .collect()
});
