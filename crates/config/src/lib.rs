//! Layered configuration for findit.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A TOML file: the path given on the command line, otherwise
//!    `config.toml` in the platform configuration directory if it exists.
//! 3. `FINDIT_`-prefixed environment variables, with `__` separating nested
//!    keys (`FINDIT_SCAN__CONCURRENCY=4`, `FINDIT_STORAGE__KIND=s3`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APPLICATION: &str = "findit";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "FINDIT_";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

/// Where findit looks for a configuration file when none is given.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn default_data_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => std::env::temp_dir().join(APPLICATION),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Which object store holds the containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Containers are directories below `root`.
    Local { root: PathBuf },
    /// Containers are buckets of an S3-compatible service.
    S3 {
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
        key_id: String,
        key_secret: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            root: default_data_dir().join("blobs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// SQLite database file holding every result table.
    pub path: PathBuf,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("findit.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Blobs fetched and processed at the same time.
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter level; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl Config {
    /// Load and validate configuration from every source.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used only if a file is there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::Invalid(format!("configuration file not found: {}", path.display())))
            },
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };
        match &file {
            Some(file) => tracing::debug!(path = %file.display(), "loading configuration file"),
            None => tracing::debug!("no configuration file, using defaults and environment"),
        }
        Self::from_figment(Self::figment(file.as_deref()))
    }

    /// The provider stack behind [`Config::load`].
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate configuration from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.storage {
            StorageConfig::Local { root } if !root.is_absolute() => {
                exn::bail!(ErrorKind::Invalid(format!(
                    "storage.root must be an absolute path: {}",
                    root.display()
                )));
            },
            StorageConfig::Local { .. } => {},
            StorageConfig::S3 {
                region,
                key_id,
                key_secret,
                ..
            } => {
                for (field, value) in [("region", region), ("key_id", key_id), ("key_secret", key_secret)] {
                    if value.trim().is_empty() {
                        exn::bail!(ErrorKind::Invalid(format!("storage.{field} must not be empty")));
                    }
                }
            },
        }
        if self.scan.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("scan.concurrency must be at least 1".to_string()));
        }
        if !LOG_LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
            exn::bail!(ErrorKind::Invalid(format!("unknown log level: {}", self.log.level)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn from_toml(toml: &str) -> Result<Config> {
        Config::from_figment(Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml)))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.scan.concurrency, 1);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Compact);
        assert!(matches!(config.storage, StorageConfig::Local { .. }));
    }

    #[test]
    fn test_local_storage_from_toml() {
        let config = from_toml(
            r#"
                [storage]
                kind = "local"
                root = "/srv/blobs"

                [records]
                path = "results.sqlite3"

                [scan]
                concurrency = 8

                [log]
                level = "debug"
                format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Local {
                root: PathBuf::from("/srv/blobs")
            }
        );
        assert_eq!(config.records.path, PathBuf::from("results.sqlite3"));
        assert_eq!(config.scan.concurrency, 8);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_s3_storage_from_toml() {
        let config = from_toml(
            r#"
                [storage]
                kind = "s3"
                region = "eu-west-1"
                endpoint = "http://127.0.0.1:9000"
                key_id = "id"
                key_secret = "secret"
            "#,
        )
        .unwrap();
        let StorageConfig::S3 { region, endpoint, prefix, .. } = config.storage else {
            panic!("expected s3 storage");
        };
        assert_eq!(region, "eu-west-1");
        assert_eq!(endpoint.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(prefix, None);
    }

    #[rstest]
    #[case::relative_root("[storage]\nkind = \"local\"\nroot = \"blobs\"")]
    #[case::zero_concurrency("[scan]\nconcurrency = 0")]
    #[case::unknown_level("[log]\nlevel = \"loud\"")]
    #[case::empty_key("[storage]\nkind = \"s3\"\nregion = \"us-east-1\"\nkey_id = \"\"\nkey_secret = \"s\"")]
    fn test_invalid_config(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[rstest]
    #[case::unknown_kind("[storage]\nkind = \"ftp\"")]
    #[case::missing_s3_fields("[storage]\nkind = \"s3\"")]
    #[case::wrong_type("[scan]\nconcurrency = \"many\"")]
    fn test_unloadable_config(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("findit.toml", "[scan]\nconcurrency = 2\n\n[log]\nlevel = \"warn\"")?;
            jail.set_env("FINDIT_SCAN__CONCURRENCY", "6");
            let config = Config::load(Some(&jail.directory().join("findit.toml"))).unwrap();
            assert_eq!(config.scan.concurrency, 6);
            assert_eq!(config.log.level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_environment_selects_s3() {
        Jail::expect_with(|jail| {
            jail.set_env("FINDIT_STORAGE__KIND", "s3");
            jail.set_env("FINDIT_STORAGE__REGION", "us-east-1");
            jail.set_env("FINDIT_STORAGE__KEY_ID", "id");
            jail.set_env("FINDIT_STORAGE__KEY_SECRET", "secret");
            let config = Config::from_figment(Config::figment(None)).unwrap();
            assert!(matches!(config.storage, StorageConfig::S3 { .. }));
            Ok(())
        });
    }
}
