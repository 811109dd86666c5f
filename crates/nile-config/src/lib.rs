use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "nile.toml";

const DEFAULT_MAX_AGE_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Longest accepted session lifetime: ten years.
pub const MAX_SESSION_MAX_AGE_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait SecretStore: Send + Sync {
    fn get(&self, secret_ref: &str) -> Result<String, ConfigError>;
}

pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, secret_ref: &str) -> Result<String, ConfigError> {
        std::env::var(secret_ref)
            .map_err(|_| ConfigError::NotFound(format!("missing secret env var {secret_ref}")))
    }
}

impl SecretStore for BTreeMap<String, String> {
    fn get(&self, secret_ref: &str) -> Result<String, ConfigError> {
        BTreeMap::get(self, secret_ref)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(format!("missing secret {secret_ref}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub secret_ref: Option<String>,
    pub max_age_seconds: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret_ref: None,
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
        }
    }
}

impl SessionSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NileConfig {
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

impl NileConfig {
    /// Look up the session signing secret. A missing or empty secret yields `None`.
    pub fn signing_secret(&self, secrets: &dyn SecretStore) -> Option<String> {
        let secret_ref = self.session.secret_ref.as_deref()?;
        match secrets.get(secret_ref) {
            Ok(secret) if !secret.is_empty() => Some(secret),
            Ok(_) => {
                warn!(secret_ref, "signing secret is empty");
                None
            }
            Err(e) => {
                warn!(error = %e, "signing secret unavailable");
                None
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    session: RawSession,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
struct RawSession {
    secret_ref: Option<String>,
    max_age_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
}

pub fn validate_config(config: &NileConfig) -> Result<(), ConfigError> {
    if config.session.max_age_seconds == 0 {
        return Err(ConfigError::Validation(
            "session.max_age_seconds must be greater than zero".to_string(),
        ));
    }
    if config.session.max_age_seconds > MAX_SESSION_MAX_AGE_SECONDS {
        return Err(ConfigError::Validation(format!(
            "session.max_age_seconds must be at most {MAX_SESSION_MAX_AGE_SECONDS}"
        )));
    }
    if config
        .session
        .secret_ref
        .as_deref()
        .is_some_and(|r| r.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "session.secret_ref must not be empty".to_string(),
        ));
    }
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::Validation(
            "logging.level must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("nile")
    } else {
        PathBuf::from(".nile")
    }
}

/// Load `nile.toml` from `dir`, falling back to defaults when it does not exist.
pub fn load_config_from_dir(dir: &Path) -> Result<NileConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(NileConfig::default());
    }
    load_config_from_file(&path)
}

pub fn load_config_from_file(path: &Path) -> Result<NileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
        .map_err(|e| ConfigError::Validation(format!("{}: {e}", path.display())))
}

pub fn parse_config(content: &str) -> Result<NileConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| ConfigError::Validation(format!("invalid TOML: {e}")))?;

    let defaults = NileConfig::default();
    let config = NileConfig {
        session: SessionSettings {
            secret_ref: raw.session.secret_ref,
            max_age_seconds: raw
                .session
                .max_age_seconds
                .unwrap_or(defaults.session.max_age_seconds),
        },
        logging: LoggingSettings {
            level: raw.logging.level.unwrap_or(defaults.logging.level),
        },
    };

    validate_config(&config)?;
    Ok(config)
}

/// Write a starter `nile.toml` into `dir`. An existing file is kept unless `force` is set.
pub fn write_default_config(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        return Ok(path);
    }
    fs::write(&path, include_str!("../config/nile.toml.example")).map_err(|source| {
        ConfigError::Io {
            path: path.clone(),
            source,
        }
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, NileConfig::default());
        assert_eq!(config.session.max_age(), Duration::from_secs(2_592_000));
    }

    #[test]
    fn example_file_parses() {
        let config = parse_config(include_str!("../config/nile.toml.example")).unwrap();
        assert_eq!(config.session.secret_ref.as_deref(), Some("NILEDB_SECRET"));
        assert_eq!(config.session.max_age_seconds, 2_592_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_max_age_is_rejected() {
        let err = parse_config("[session]\nmax_age_seconds = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn oversized_max_age_is_rejected() {
        for raw in ["400000000", "9223372036854775807", "18446744073709551615"] {
            let err = parse_config(&format!("[session]\nmax_age_seconds = {raw}\n")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "{raw}");
        }

        let at_cap = format!("[session]\nmax_age_seconds = {MAX_SESSION_MAX_AGE_SECONDS}\n");
        assert_eq!(
            parse_config(&at_cap).unwrap().session.max_age_seconds,
            MAX_SESSION_MAX_AGE_SECONDS
        );
    }

    #[test]
    fn read_failure_keeps_io_source() {
        use std::error::Error as _;

        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from_file(&dir.path().join("absent.toml")).unwrap_err();
        let ConfigError::Io { path, source } = &err else {
            panic!("expected io error, got {err:?}");
        };
        assert!(path.ends_with("absent.toml"));
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.source().is_some());
    }

    #[test]
    fn blank_secret_ref_is_rejected() {
        assert!(parse_config("[session]\nsecret_ref = \" \"\n").is_err());
    }

    #[test]
    fn bad_toml_is_rejected() {
        assert!(matches!(
            parse_config("[session"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn signing_secret_lookup() {
        let mut secrets = BTreeMap::new();
        secrets.insert("SIGNING".to_string(), "s3cret".to_string());
        secrets.insert("BLANK".to_string(), String::new());

        let mut config = NileConfig::default();
        assert_eq!(config.signing_secret(&secrets), None);

        config.session.secret_ref = Some("SIGNING".to_string());
        assert_eq!(config.signing_secret(&secrets).as_deref(), Some("s3cret"));

        config.session.secret_ref = Some("BLANK".to_string());
        assert_eq!(config.signing_secret(&secrets), None);

        config.session.secret_ref = Some("MISSING".to_string());
        assert_eq!(config.signing_secret(&secrets), None);
    }

    #[test]
    fn missing_dir_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config_from_dir(dir.path()).unwrap(), NileConfig::default());
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_default_config(dir.path(), false).unwrap();
        assert!(path.ends_with(CONFIG_FILE));

        fs::write(&path, "[session]\nmax_age_seconds = 60\n").unwrap();
        write_default_config(dir.path(), false).unwrap();
        let config = load_config_from_dir(dir.path()).unwrap();
        assert_eq!(config.session.max_age_seconds, 60);

        write_default_config(dir.path(), true).unwrap();
        let config = load_config_from_dir(dir.path()).unwrap();
        assert_eq!(config.session.max_age_seconds, 2_592_000);
    }
}
