//! Client configuration and submitter factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use judgearc_core::catalog::MemoryCatalog;
use judgearc_core::store::SqliteStore;
use judgearc_core::traits::JudgmentSubmitter;
use judgearc_core::writer::{RecordWriter, StoreSubmitter};

use crate::http::{HttpSubmitter, DEFAULT_TIMEOUT_SECS};

/// Where completed trials are sent.
///
/// Note: Custom Debug impl masks the token and nonce to keep them out of logs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SubmitterConfig {
    /// Remote judgment endpoint.
    Http {
        base_url: String,
        #[serde(default)]
        auth_token: Option<String>,
        /// Anti-forgery token sent with every submission.
        #[serde(default)]
        nonce: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
    /// Write straight into the local database.
    #[default]
    Local,
}

impl std::fmt::Debug for SubmitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitterConfig::Http {
                base_url,
                auth_token,
                nonce,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("auth_token", &auth_token.as_ref().map(|_| "***"))
                .field("nonce", &nonce.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            SubmitterConfig::Local => f.write_str("Local"),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level judgearc configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgearcConfig {
    #[serde(default)]
    pub submitter: SubmitterConfig,
    /// SQLite database holding judgment records.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Published content catalog (JSON).
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
    /// Rater id for local submissions.
    #[serde(default)]
    pub rater: Option<u64>,
    /// Output directory for progress reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from("judgearc.db")
}
fn default_catalog() -> PathBuf {
    PathBuf::from("catalog.json")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./judgearc-reports")
}

impl Default for JudgearcConfig {
    fn default() -> Self {
        Self {
            submitter: SubmitterConfig::default(),
            database: default_database(),
            catalog: default_catalog(),
            rater: None,
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let value = std::env::var(&result[start + 2..start + end]).unwrap_or_default();
        result.replace_range(start..start + end + 1, &value);
    }
    result
}

fn resolve_submitter_config(config: &SubmitterConfig) -> SubmitterConfig {
    match config {
        SubmitterConfig::Http {
            base_url,
            auth_token,
            nonce,
            timeout_secs,
        } => SubmitterConfig::Http {
            base_url: resolve_env_vars(base_url),
            auth_token: auth_token.as_deref().map(resolve_env_vars),
            nonce: nonce.as_deref().map(resolve_env_vars),
            timeout_secs: *timeout_secs,
        },
        SubmitterConfig::Local => SubmitterConfig::Local,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `judgearc.toml` in the current directory
/// 2. `~/.config/judgearc/config.toml`
///
/// Environment variable overrides: `JUDGEARC_TOKEN`, `JUDGEARC_USER`.
pub fn load_config() -> Result<JudgearcConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<JudgearcConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("judgearc.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<JudgearcConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => JudgearcConfig::default(),
    };

    if let Ok(token) = std::env::var("JUDGEARC_TOKEN") {
        if let SubmitterConfig::Http { auth_token, .. } = &mut config.submitter {
            *auth_token = Some(token);
        }
    }
    if let Ok(user) = std::env::var("JUDGEARC_USER") {
        let id = user
            .trim()
            .parse::<u64>()
            .with_context(|| format!("JUDGEARC_USER is not a rater id: {user}"))?;
        config.rater = Some(id);
    }

    config.submitter = resolve_submitter_config(&config.submitter);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("judgearc"))
}

/// Create the submitter selected by the configuration.
///
/// The local submitter opens the configured database and catalog and
/// attributes every judgment to `config.rater`.
pub fn create_submitter(config: &JudgearcConfig) -> Result<Arc<dyn JudgmentSubmitter>> {
    match &config.submitter {
        SubmitterConfig::Http {
            base_url,
            auth_token,
            nonce,
            timeout_secs,
        } => Ok(Arc::new(HttpSubmitter::new(
            base_url,
            auth_token.clone(),
            nonce.clone(),
            *timeout_secs,
        )?)),
        SubmitterConfig::Local => {
            let store = SqliteStore::open(&config.database)?;
            let catalog = MemoryCatalog::load_json(&config.catalog)?;
            let writer = RecordWriter::new(Arc::new(store), Arc::new(catalog));
            Ok(Arc::new(StoreSubmitter::new(writer, config.rater)))
        }
    }
}
