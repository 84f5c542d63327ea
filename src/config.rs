//! Process configuration (spec §6.1): `~/.repolex/config/config.json`.
//!
//! Grounded on the teacher's [`crate::store`]-adjacent `ServerConfig`
//! pattern (`examples/samyama-ai-samyama-graph/src/protocol/server.rs`): a
//! plain `serde`-derived struct with a `Default` impl carrying the spec's
//! named defaults, loaded with `serde_json` and falling back silently to
//! defaults for any key the file omits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RepolexError, RepolexResult};

/// Top-level on-disk layout root, `<HOME>/.repolex` by default (spec §6.1).
pub fn default_home_dir() -> PathBuf {
    dirs_home().join(".repolex")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepolexConfig {
    /// Where `oxigraph/`, `exports/`, `logs/` live, relative to nothing
    /// (always absolute): defaults to `<HOME>/.repolex`.
    pub data_dir: PathBuf,
    pub sparql_timeout_ms: u64,
    pub sparql_row_cap: usize,
    pub sparql_max_query_chars: usize,
    pub search_cache_capacity: usize,
}

impl Default for RepolexConfig {
    fn default() -> Self {
        Self {
            data_dir: default_home_dir(),
            sparql_timeout_ms: 30_000,
            sparql_row_cap: 100_000,
            sparql_max_query_chars: 10_000,
            search_cache_capacity: 50,
        }
    }
}

impl RepolexConfig {
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir.join("config").join("config.json")
    }

    pub fn oxigraph_dir(&self) -> PathBuf {
        self.data_dir.join("oxigraph")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.data_dir.join("repos")
    }

    /// Load `config/config.json` under `data_dir`. A missing file is not an
    /// error — callers get [`RepolexConfig::default`] with `data_dir` set to
    /// the path they asked for. A malformed file is a Validation error:
    /// the caller supplies a corrected value (spec §7).
    pub fn load(data_dir: impl AsRef<Path>) -> RepolexResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let path = data_dir.join("config").join("config.json");
        if !path.exists() {
            info!(path = %path.display(), "no config file found, using defaults");
            return Ok(Self {
                data_dir,
                ..Self::default()
            });
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            RepolexError::storage(format!("reading {}: {e}", path.display()))
        })?;
        let mut cfg: Self = serde_json::from_str(&raw).map_err(|e| {
            RepolexError::validation(format!("invalid config at {}: {e}", path.display()))
                .with_suggestion("fix or delete the config file; a missing file falls back to defaults")
        })?;
        cfg.data_dir = data_dir;
        Ok(cfg)
    }

    pub fn load_default() -> RepolexResult<Self> {
        Self::load(default_home_dir())
    }

    /// Write the current configuration back to `config/config.json`,
    /// creating parent directories as needed.
    pub fn save(&self) -> RepolexResult<()> {
        let path = self.config_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RepolexError::storage(format!("creating {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RepolexError::storage(e.to_string()))?;
        std::fs::write(&path, json)
            .map_err(|e| RepolexError::storage(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    /// Create the on-disk layout directories (spec §6.1) if they don't
    /// already exist.
    pub fn ensure_layout(&self) -> RepolexResult<()> {
        for dir in [
            self.repos_dir(),
            self.oxigraph_dir(),
            self.exports_dir(),
            self.logs_dir(),
            self.config_file_path().parent().unwrap().to_path_buf(),
        ] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| RepolexError::storage(format!("creating {}: {e}", dir.display())))?;
        }
        info!(data_dir = %self.data_dir.display(), "on-disk layout ensured");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = RepolexConfig::load(tmp.path()).unwrap();
        assert_eq!(cfg.sparql_row_cap, 100_000);
        assert_eq!(cfg.data_dir, tmp.path());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = RepolexConfig::load(tmp.path()).unwrap();
        cfg.sparql_timeout_ms = 5_000;
        cfg.save().unwrap();

        let reloaded = RepolexConfig::load(tmp.path()).unwrap();
        assert_eq!(reloaded.sparql_timeout_ms, 5_000);
    }

    #[test]
    fn malformed_config_is_a_validation_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("config")).unwrap();
        std::fs::write(tmp.path().join("config").join("config.json"), "{not json").unwrap();
        let err = RepolexConfig::load(tmp.path()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }
}
