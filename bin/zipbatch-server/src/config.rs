//! Server configuration.
//!
//! Settings come from an optional TOML file named by `ZIPBATCH_CONFIG`, then
//! from `ZIPBATCH_*` environment variables, which win over the file. Every
//! field has a default so the server starts without either.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use zipbatch_core::ServiceConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Runtime configuration for zipbatch-server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// Base URL clients use to reach this server. Archive links are built
    /// from it. Defaults to `http://<bind_address>`.
    pub public_base_url: Option<String>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origins. `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    pub enable_swagger: bool,

    /// How long shutdown waits for running archive jobs.
    pub shutdown_grace_secs: u64,

    /// Deadline for a handler to produce its response; 408 afterwards.
    pub request_timeout_secs: u64,

    /// Deadline for receiving a request body.
    pub read_timeout_secs: u64,

    /// How long open connections get to finish once a shutdown signal
    /// arrives. Connections still open afterwards are dropped.
    pub http_drain_secs: u64,

    pub max_active_tasks: usize,
    pub max_files_per_task: usize,
    pub allowed_extensions: Vec<String>,
    pub archive_directory: PathBuf,
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            bind_address: "0.0.0.0:8080".to_owned(),
            public_base_url: None,
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            enable_swagger: true,
            shutdown_grace_secs: 5,
            request_timeout_secs: 30,
            read_timeout_secs: 15,
            http_drain_secs: 5,
            max_active_tasks: service.max_active_tasks,
            max_files_per_task: service.max_files_per_task,
            allowed_extensions: service.allowed_extensions,
            archive_directory: service.archive_directory,
            fetch_timeout_secs: service.fetch_timeout.as_secs(),
        }
    }
}

impl Config {
    /// Load from the optional config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = match lookup("ZIPBATCH_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.apply_env(&lookup)?;
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("ZIPBATCH_BIND") {
            self.bind_address = v;
        }
        if let Some(v) = lookup("ZIPBATCH_PUBLIC_URL") {
            self.public_base_url = Some(v);
        }
        if let Some(v) = lookup("ZIPBATCH_LOG") {
            self.log_level = v;
        }
        if let Some(v) = lookup("ZIPBATCH_LOG_JSON") {
            self.log_json = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("ZIPBATCH_CORS_ORIGINS") {
            self.cors_allowed_origins = Some(v);
        }
        if let Some(v) = lookup("ZIPBATCH_ENABLE_SWAGGER") {
            self.enable_swagger = !(v == "0" || v.eq_ignore_ascii_case("false"));
        }
        if let Some(v) = lookup("ZIPBATCH_ALLOWED_EXTENSIONS") {
            self.allowed_extensions = v
                .split(',')
                .map(str::trim)
                .filter(|ext| !ext.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(v) = lookup("ZIPBATCH_ARCHIVE_DIR") {
            self.archive_directory = PathBuf::from(v);
        }

        parse_env(lookup, "ZIPBATCH_SHUTDOWN_GRACE_SECS", &mut self.shutdown_grace_secs)?;
        parse_env(lookup, "ZIPBATCH_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs)?;
        parse_env(lookup, "ZIPBATCH_READ_TIMEOUT_SECS", &mut self.read_timeout_secs)?;
        parse_env(lookup, "ZIPBATCH_HTTP_DRAIN_SECS", &mut self.http_drain_secs)?;
        parse_env(lookup, "ZIPBATCH_MAX_ACTIVE_TASKS", &mut self.max_active_tasks)?;
        parse_env(lookup, "ZIPBATCH_MAX_FILES_PER_TASK", &mut self.max_files_per_task)?;
        parse_env(lookup, "ZIPBATCH_FETCH_TIMEOUT_SECS", &mut self.fetch_timeout_secs)?;

        if self.max_files_per_task == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_files_per_task",
                value: "0".to_owned(),
            });
        }
        Ok(())
    }

    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_address))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn http_drain(&self) -> Duration {
        Duration::from_secs(self.http_drain_secs)
    }

    /// Settings handed to the task service and archiver.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_active_tasks: self.max_active_tasks,
            max_files_per_task: self.max_files_per_task,
            allowed_extensions: self.allowed_extensions.clone(),
            archive_directory: self.archive_directory.clone(),
            public_base_url: self.public_base_url(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(key) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value })?;
    }
    Ok(())
}
