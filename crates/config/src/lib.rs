//! Layered configuration for folio.
//!
//! Values are merged from, in increasing priority:
//! 1. built-in defaults,
//! 2. a configuration file (`folio.toml`, `folio.yaml` or `folio.json`),
//! 3. environment variables prefixed with `FOLIO_`, nested with `__`
//!    (`FOLIO_SORT__KEY=date`).
//!
//! Only `directory` has no default.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Prefix of environment variables read by [`Config::figment`].
pub const ENV_PREFIX: &str = "FOLIO_";
/// File names searched (in order) when no explicit file is given.
pub const DEFAULT_FILES: [&str; 4] = ["folio.toml", "folio.yaml", "folio.yml", "folio.json"];
const CACHE_FILE_NAME: &str = "folio.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Content root.
    pub directory: PathBuf,
    /// Content file suffix, including the leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Front matter delimiter regex. The first capture group is the header.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// File base name left out of collections (the error document).
    #[serde(default = "default_reserved")]
    pub reserved: String,
    #[serde(default)]
    pub sort: SortConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Front matter key to order collections by. Enumeration order if unset.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// SQLite database file. Defaults to the platform cache directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    /// Location of the cache database, falling back to the platform cache
    /// directory (e.g. `~/.cache/folio/folio.sqlite` on Linux), and to the
    /// working directory when there is no home directory to speak of.
    pub fn path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match directories::ProjectDirs::from("", "", "folio") {
            Some(dirs) => dirs.cache_dir().join(CACHE_FILE_NAME),
            None => PathBuf::from(CACHE_FILE_NAME),
        }
    }
}

fn default_extension() -> String {
    folio_storage::backend::DEFAULT_EXTENSION.to_string()
}

fn default_delimiter() -> String {
    folio_codec::DEFAULT_DELIMITER.to_string()
}

fn default_reserved() -> String {
    folio_storage::backend::DEFAULT_RESERVED.to_string()
}

impl Config {
    /// Defaults for everything, content served from `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            extension: default_extension(),
            delimiter: default_delimiter(),
            reserved: default_reserved(),
            sort: SortConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Load from the standard layers. An explicit `file` must exist; without
    /// one the first of [`DEFAULT_FILES`] found in the working directory is
    /// used, if any.
    #[instrument]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(file)?)
    }

    /// The standard layers as a [`Figment`], for callers who want to merge
    /// their own providers on top.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new();
        match file {
            Some(path) => figment = Self::merge_file(figment, path, true)?,
            None => {
                if let Some(path) = DEFAULT_FILES.iter().map(Path::new).find(|path| path.is_file()) {
                    figment = Self::merge_file(figment, path, false)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn merge_file(figment: Figment, path: &Path, required: bool) -> Result<Figment> {
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(path).required(required)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path).required(required)),
            Some("json") => figment.merge(Json::file(path).required(required)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        })
    }

    /// Extract and validate a configuration from any figment.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(directory = %config.directory.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "directory", reason: "must not be empty" });
        }
        if !self.extension.starts_with('.') || self.extension.len() < 2 {
            exn::bail!(ErrorKind::Invalid { field: "extension", reason: "must be a dot followed by a suffix" });
        }
        if self.extension.contains('/') {
            exn::bail!(ErrorKind::Invalid { field: "extension", reason: "must not contain a path separator" });
        }
        if self.delimiter.is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "delimiter", reason: "must not be empty" });
        }
        if self.reserved.is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "reserved", reason: "must not be empty" });
        }
        if self.sort.key.as_deref().is_some_and(str::is_empty) {
            exn::bail!(ErrorKind::Invalid { field: "sort.key", reason: "must not be empty when set" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn from_toml(toml: &str) -> Result<Config> {
        Config::from_figment(&Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("directory = \"/srv/content\"").unwrap();
        assert_eq!(config, Config::new("/srv/content"));
        assert_eq!(config.extension, ".md");
        assert_eq!(config.reserved, "404");
        assert_eq!(config.sort.key, None);
        assert_eq!(config.sort.direction, Direction::Asc);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_directory_is_required() {
        let err = from_toml("extension = \".md\"").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[test]
    fn test_nested_tables() {
        let config = from_toml(
            r#"
                directory = "content"
                [sort]
                key = "date"
                direction = "desc"
                [cache]
                enabled = true
                path = "/tmp/folio.sqlite"
            "#,
        )
        .unwrap();
        assert_eq!(config.sort.key.as_deref(), Some("date"));
        assert_eq!(config.sort.direction, Direction::Desc);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.path(), PathBuf::from("/tmp/folio.sqlite"));
    }

    #[rstest]
    #[case("extension = \"md\"", "extension")]
    #[case("extension = \".\"", "extension")]
    #[case("reserved = \"\"", "reserved")]
    #[case("delimiter = \"\"", "delimiter")]
    #[case("sort = { key = \"\" }", "sort.key")]
    fn test_invalid_values(#[case] extra: &str, #[case] expected: &str) {
        let err = from_toml(&format!("directory = \"content\"\n{extra}")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid { field, .. } if *field == expected));
    }

    #[test]
    fn test_unknown_direction_fails_to_load() {
        let err = from_toml("directory = \"content\"\nsort = { direction = \"sideways\" }").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[rstest]
    #[case("folio.toml", "directory = \"from-toml\"\n", "from-toml")]
    #[case("folio.yaml", "directory: from-yaml\n", "from-yaml")]
    #[case("folio.json", "{\"directory\": \"from-json\"}", "from-json")]
    fn test_load_file_formats(#[case] name: &str, #[case] contents: &str, #[case] expected: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.directory, PathBuf::from(expected));
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("folio.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[test]
    fn test_unsupported_format() {
        let err = Config::figment(Some(Path::new("folio.ini"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_environment_overrides_file() {
        // SAFETY: the variable names are unique to this test.
        unsafe {
            std::env::set_var("FOLIO_CONFIG_TEST_SORT__KEY", "date");
            std::env::set_var("FOLIO_CONFIG_TEST_CACHE__ENABLED", "true");
        }
        // Providers are read when merged, not when extracted.
        let figment = Figment::new()
            .merge(Toml::string("directory = \"content\"\n[sort]\nkey = \"title\""))
            .merge(Env::prefixed("FOLIO_CONFIG_TEST_").split("__"));
        unsafe {
            std::env::remove_var("FOLIO_CONFIG_TEST_SORT__KEY");
            std::env::remove_var("FOLIO_CONFIG_TEST_CACHE__ENABLED");
        }
        let config = Config::from_figment(&figment).unwrap();
        assert_eq!(config.sort.key.as_deref(), Some("date"));
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_default_cache_path() {
        let path = CacheConfig::default().path();
        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some("folio.sqlite"));
    }
}
