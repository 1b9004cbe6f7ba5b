//! Layered configuration for bindery.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. built-in defaults,
//! 2. `bindery.toml` in the platform configuration directory,
//! 3. an explicit file (`.toml`, `.yaml`/`.yml` or `.json`),
//! 4. `BINDERY_` environment variables, with `__` between nested keys
//!    (`BINDERY_COVERS__DIRECTORY=/var/cache/covers`).
//!
//! The legacy `CATEGORY_FROM_PATH` switch sits just below the `BINDERY_`
//! variables.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

const APPLICATION: &str = "bindery";
const FILE_NAME: &str = "bindery.toml";
const ENV_PREFIX: &str = "BINDERY_";
const LEGACY_CATEGORY_FLAG: &str = "CATEGORY_FROM_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub covers: CoversConfig,
    pub scan: ScanConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoversConfig {
    /// Cover cache directory; one `<id>.jpg` per book.
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Derive category and subcategory from the directories between the
    /// library root and each book.
    pub category_from_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for CoversConfig {
    fn default() -> Self {
        let directory = ProjectDirs::from("", "", APPLICATION)
            .map(|dirs| dirs.cache_dir().join("covers"))
            .unwrap_or_else(|| PathBuf::from("covers"));
        Self { directory }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "warn".to_string() }
    }
}

impl Config {
    /// Loads every layer and validates the merged result.
    #[instrument(skip_all, fields(explicit = ?explicit))]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let legacy = std::env::var(LEGACY_CATEGORY_FLAG).ok().map(|value| parse_flag(&value));
        let figment = layered(user_file().as_deref(), explicit, legacy)?.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Extracts and validates a configuration from an already-assembled
    /// [`Figment`].
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(covers = %config.covers.directory.display(), "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.covers.directory.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("covers.directory must not be empty".to_string()));
        }
        if self.log.filter.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("log.filter must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Interprets an on/off switch: `1`, `true`, `yes` and `on` (trimmed, any
/// case) are on; everything else is off.
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    ["1", "true", "yes", "on"].iter().any(|on| value.eq_ignore_ascii_case(on))
}

fn user_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().join(FILE_NAME))
}

/// Every layer below the `BINDERY_` environment variables.
fn layered(user: Option<&Path>, explicit: Option<&Path>, legacy: Option<bool>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(user) = user {
        figment = figment.merge(Toml::file(user));
    }
    if let Some(explicit) = explicit {
        std::fs::metadata(explicit).or_raise(|| ErrorKind::Load)?;
        let extension = explicit.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
        figment = match extension.as_str() {
            "toml" => figment.merge(Toml::file(explicit)),
            "yaml" | "yml" => figment.merge(Yaml::file(explicit)),
            "json" => figment.merge(Json::file(explicit)),
            _ => exn::bail!(ErrorKind::Invalid(format!("unsupported configuration format: {}", explicit.display()))),
        };
    }
    if let Some(enabled) = legacy {
        figment = figment.merge(Serialized::default("scan.category_from_path", enabled));
    }
    Ok(figment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let config = Config::from_figment(&layered(None, None, None).unwrap()).unwrap();
        assert_eq!(config.log.filter, "warn");
        assert!(!config.scan.category_from_path);
        assert!(config.covers.directory.ends_with("covers"));
    }

    #[rstest]
    #[case("bindery.toml", "[covers]\ndirectory = \"/srv/covers\"\n[scan]\ncategory_from_path = true\n")]
    #[case("bindery.yaml", "covers:\n  directory: /srv/covers\nscan:\n  category_from_path: true\n")]
    #[case("bindery.json", r#"{"covers": {"directory": "/srv/covers"}, "scan": {"category_from_path": true}}"#)]
    fn explicit_file_formats(#[case] name: &str, #[case] content: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();

        let config = Config::from_figment(&layered(None, Some(&path), None).unwrap()).unwrap();

        assert_eq!(config.covers.directory, PathBuf::from("/srv/covers"));
        assert!(config.scan.category_from_path);
        assert_eq!(config.log.filter, "warn");
    }

    #[test]
    fn explicit_file_overrides_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&user, "[log]\nfilter = \"info\"\n[covers]\ndirectory = \"/user\"\n").unwrap();
        std::fs::write(&explicit, "[covers]\ndirectory = \"/explicit\"\n").unwrap();

        let config = Config::from_figment(&layered(Some(&user), Some(&explicit), None).unwrap()).unwrap();

        assert_eq!(config.covers.directory, PathBuf::from("/explicit"));
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn missing_user_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let figment = layered(Some(&dir.path().join("absent.toml")), None, None).unwrap();
        assert!(Config::from_figment(&figment).is_ok());
    }

    #[test]
    fn missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = layered(None, Some(&dir.path().join("absent.toml")), None).unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }

    #[test]
    fn unsupported_format_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.ini");
        std::fs::write(&path, "").unwrap();
        let err = layered(None, Some(&path), None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn legacy_flag_overrides_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.toml");
        std::fs::write(&path, "[scan]\ncategory_from_path = true\n").unwrap();

        let config = Config::from_figment(&layered(None, Some(&path), Some(false)).unwrap()).unwrap();

        assert!(!config.scan.category_from_path);
    }

    #[test]
    fn malformed_values_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.toml");
        std::fs::write(&path, "[scan]\ncategory_from_path = \"sometimes\"\n").unwrap();

        let err = Config::from_figment(&layered(None, Some(&path), None).unwrap()).unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }

    #[test]
    fn empty_filter_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.toml");
        std::fs::write(&path, "[log]\nfilter = \"  \"\n").unwrap();

        let err = Config::from_figment(&layered(None, Some(&path), None).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(message) if message.contains("log.filter")));
    }

    #[rstest]
    #[case("1", true)]
    #[case(" TRUE ", true)]
    #[case("Yes", true)]
    #[case("on", true)]
    #[case("0", false)]
    #[case("off", false)]
    #[case("", false)]
    #[case("enabled", false)]
    fn flags(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(parse_flag(value), expected);
    }
}
