use bindery_epub::models::{MetadataFields, MetadataUpdate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Edit EPUB metadata and covers in place.
#[derive(Debug, Parser)]
#[command(name = "bindery", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (`.toml`, `.yaml`, `.yml` or `.json`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read or change bibliographic metadata.
    #[command(subcommand)]
    Metadata(MetadataCommand),
    /// Inspect, extract or replace the cover image.
    #[command(subcommand)]
    Cover(CoverCommand),
    /// Title, author and description as a library scan would record them.
    Summary {
        #[arg(required = true)]
        epubs: Vec<PathBuf>,
        /// Library root, for directory-derived categories.
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum MetadataCommand {
    Show { epub: PathBuf },
    /// Change the fields given and write back the rest as read.
    ///
    /// Fields not given are carried over as `metadata show` reports them:
    /// only the first creator and the preferred identifier survive, every
    /// other creator or identifier is dropped, and tags nested inside a value
    /// are stripped to plain text.
    Edit {
        epub: PathBuf,
        #[command(flatten)]
        fields: FieldArgs,
    },
}

#[derive(Debug, Default, Args)]
pub struct FieldArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub identifier: Option<String>,
    #[arg(long)]
    pub publisher: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Replaces every subject; repeat for more than one.
    #[arg(long = "subject")]
    pub subjects: Vec<String>,
    #[arg(long)]
    pub series: Option<String>,
    #[arg(long)]
    pub series_index: Option<String>,
}
impl FieldArgs {
    /// The update that changes the given fields of `current` and repeats the
    /// rest. An empty string deletes a field.
    ///
    /// `current` is a read model, so the update holds a single creator and a
    /// single identifier; writing it collapses any others.
    pub fn overlay(self, current: MetadataFields) -> MetadataUpdate {
        MetadataUpdate {
            title: self.title.unwrap_or(current.title),
            author: self.author.unwrap_or(current.author),
            language: self.language.unwrap_or(current.language),
            identifier: self.identifier.unwrap_or(current.identifier),
            publisher: self.publisher.unwrap_or(current.publisher),
            date: self.date.unwrap_or(current.date),
            description: self.description.unwrap_or(current.description),
            subjects: if self.subjects.is_empty() { current.subjects } else { self.subjects },
            series: self.series.unwrap_or(current.series),
            series_index: self.series_index.unwrap_or(current.series_index),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CoverCommand {
    /// Images that could serve as the cover; `*` marks the current one.
    List { epub: PathBuf },
    /// Copy the located cover into the cover cache as `<ID>.jpg`.
    Extract {
        epub: PathBuf,
        #[arg(long)]
        id: u64,
    },
    /// Copy one entry out of the archive.
    Export { epub: PathBuf, zip_path: String, out: PathBuf },
    /// Install a new cover, from an entry in the archive or an image file.
    ///
    /// The image is converted to JPEG, written into the book as its only
    /// cover and copied to `cover.jpg` beside it. With `--id` the cover cache
    /// is refreshed too.
    Set {
        epub: PathBuf,
        #[command(flatten)]
        source: CoverArgs,
        /// Catalog id whose cached cover to replace.
        #[arg(long)]
        id: Option<u64>,
        /// Only refresh the cached cover; leave the book and its directory alone.
        #[arg(long, requires = "id")]
        cache_only: bool,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct CoverArgs {
    #[arg(long)]
    pub entry: Option<String>,
    #[arg(long)]
    pub file: Option<PathBuf>,
}
