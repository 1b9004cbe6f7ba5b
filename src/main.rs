mod cli;

use crate::cli::{Cli, Command, CoverArgs, CoverCommand, MetadataCommand};
use bindery_config::Config;
use bindery_epub::error::ErrorKind;
use bindery_epub::models::{CoverSelection, MetadataFields};
use bindery_epub::{BookSummary, CoverCache, CoverTargets, categories_from_path};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// A command failure, kept as the error tree of whichever layer raised it.
#[derive(Debug)]
enum Failure {
    Config(bindery_config::error::Error),
    Epub(bindery_epub::error::Error),
    Output(std::io::Error),
}
impl From<bindery_config::error::Error> for Failure {
    fn from(err: bindery_config::error::Error) -> Self {
        Self::Config(err)
    }
}
impl From<bindery_epub::error::Error> for Failure {
    fn from(err: bindery_epub::error::Error) -> Self {
        Self::Epub(err)
    }
}
impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Self::Output(err)
    }
}
impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Epub(err) => exit_code(err),
            Self::Output(err) if err.kind() == std::io::ErrorKind::PermissionDenied => 77,
            Self::Config(_) | Self::Output(_) => 1,
        }
    }
}

/// Exit status for an engine error, grouped by its stable code.
fn exit_code(kind: &ErrorKind) -> u8 {
    match kind.code() {
        "permission_denied" => 77,
        "not_found" | "package_not_found" | "cover_not_found" => 66,
        "metadata_section_not_found"
        | "manifest_section_not_found"
        | "invalid_archive"
        | "invalid_package"
        | "image_decode_failed" => 65,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return report(&Failure::from(err)),
    };

    let default_filter = if cli.verbose { "debug" } else { config.log.filter.as_str() };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => report(&failure),
    }
}

fn report(failure: &Failure) -> ExitCode {
    match failure {
        Failure::Config(err) => eprintln!("{err:?}"),
        Failure::Epub(err) => eprintln!("{err:?}"),
        Failure::Output(err) => eprintln!("{err}"),
    }
    ExitCode::from(failure.exit_code())
}

fn run(command: Command, config: &Config) -> Result<(), Failure> {
    match command {
        Command::Metadata(MetadataCommand::Show { epub }) => print_fields(&bindery_epub::read_metadata(&epub)?),
        Command::Metadata(MetadataCommand::Edit { epub, fields }) => {
            let update = fields.overlay(bindery_epub::read_metadata(&epub)?);
            print_fields(&bindery_epub::write_metadata(&epub, &update)?);
        },
        Command::Cover(command) => cover(command, config)?,
        Command::Summary { epubs, root } => {
            for epub in epubs {
                summary(&epub, root.as_deref(), config)?;
            }
        },
    }
    Ok(())
}

fn cover(command: CoverCommand, config: &Config) -> Result<(), Failure> {
    match command {
        CoverCommand::List { epub } => {
            for candidate in bindery_epub::list_cover_candidates(&epub)? {
                let marker = if candidate.is_current { "*" } else { " " };
                println!(
                    "{marker} {}\t{}x{}\t{}",
                    candidate.zip_path, candidate.width, candidate.height, candidate.media_type
                );
            }
        },
        CoverCommand::Extract { epub, id } => {
            let target = CoverCache::new(&config.covers.directory).path_for(id);
            let source = bindery_epub::locate_and_extract_cover(&epub, &target)?;
            println!("{} (from {source})", target.display());
        },
        CoverCommand::Export { epub, zip_path, out } => {
            let (bytes, media_type) = bindery_epub::read_cover_candidate(&epub, &zip_path)?;
            std::fs::write(&out, &bytes)?;
            println!("{} ({media_type}, {} bytes)", out.display(), bytes.len());
        },
        CoverCommand::Set { epub, source, id, cache_only } => {
            let CoverArgs { entry, file } = source;
            let selection = match entry {
                Some(entry) => CoverSelection::Entry(entry),
                None => CoverSelection::Bytes(std::fs::read(file.unwrap_or_default())?),
            };
            let cache = CoverCache::new(&config.covers.directory);
            let targets = CoverTargets { cache: id.map(|id| (&cache, id)), write_to_epub: !cache_only };
            let jpeg = bindery_epub::change_cover(&epub, &selection, targets)?;
            if let Some(id) = id {
                println!("{} ({} bytes)", cache.path_for(id).display(), jpeg.len());
            }
        },
    }
    Ok(())
}

fn summary(epub: &Path, root: Option<&Path>, config: &Config) -> Result<(), Failure> {
    let book = BookSummary::from_epub(epub)?;
    println!("{}", epub.display());
    println!("  title:       {}", book.title);
    println!("  author:      {}", book.author);
    if !book.description.is_empty() {
        println!("  description: {}", book.description);
    }
    if book.metadata_missing {
        println!("  (metadata missing; title taken from file name)");
    }
    if let Some(root) = root.filter(|_| config.scan.category_from_path) {
        let categories = categories_from_path(root, epub);
        println!("  category:    {}", categories.category);
        println!("  subcategory: {}", categories.subcategory);
    }
    Ok(())
}

fn print_fields(fields: &MetadataFields) {
    if fields.is_empty() {
        println!("(no metadata)");
        return;
    }
    let rows = [
        ("title", &fields.title),
        ("author", &fields.author),
        ("language", &fields.language),
        ("identifier", &fields.identifier),
        ("publisher", &fields.publisher),
        ("date", &fields.date),
        ("description", &fields.description),
        ("series", &fields.series),
        ("series index", &fields.series_index),
    ];
    for (label, value) in rows.into_iter().filter(|(_, value)| !value.is_empty()) {
        println!("{label:<12} {value}");
    }
    for subject in &fields.subjects {
        println!("{:<12} {subject}", "subject");
    }
}
