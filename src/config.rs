//! Configuration of the snapshot orchestrator.
//!
//! Goals:
//! - Single immutable value handed to `SnapshotOrchestrator::new()`; no implicit
//!   process-wide path lookups after construction.
//! - Env lookups only happen when the caller asks for them (`from_env()`).
//! - Intermediate dump paths are derived from `working_dir` at build time unless
//!   explicitly overridden, so a built config never has an absent path.
//!
//! Env variables (all optional):
//! - SP_WORKING_DIR        — working directory (default `<temp_dir>/statepack`)
//! - SP_RELATIONAL_DUMP    — relational intermediate file (default `<working_dir>/current.sql`)
//! - SP_SEARCH_DUMP        — search intermediate file (default `<working_dir>/current.idx`)
//! - SP_USE_CACHE          — 0|1|true|false|on|off|yes|no (default off)
//! - SP_ARCHIVE            — default archive path for capture/restore
//! - SP_ENV                — environment prefix for generated names (default "development")
//! - SP_CACHE_WINDOW_SECS  — freshness window in seconds (default 60)
//! - SP_COMPRESSION        — none|gzip|zstd (default gzip)
//! - SP_EXCLUSIVE_LOCK     — hold `<working_dir>/LOCK` during capture/restore (default off)

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

use crate::archive::Compression;
use crate::consts::{
    DEFAULT_CACHE_WINDOW_SECS, DEFAULT_ENVIRONMENT, DEFAULT_WORKDIR_NAME, RELATIONAL_DUMP_FILE,
    SEARCH_DUMP_FILE,
};
use crate::error::SnapError;

/// Resolved, immutable configuration.
#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    working_dir: PathBuf,
    relational_dump_path: PathBuf,
    search_dump_path: PathBuf,
    use_cache: bool,
    archive_path: Option<PathBuf>,
    environment: String,
    cache_window: Duration,
    compression: Compression,
    exclusive_lock: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfigBuilder::new().build()
    }
}

impl SnapshotConfig {
    pub fn builder() -> SnapshotConfigBuilder {
        SnapshotConfigBuilder::new()
    }

    /// Defaults overridden by SP_* environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(SnapshotConfigBuilder::from_env()?.build())
    }

    /// Directory for intermediate artifacts and generated archives.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn relational_dump_path(&self) -> &Path {
        &self.relational_dump_path
    }

    pub fn search_dump_path(&self) -> &Path {
        &self.search_dump_path
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Configured default archive (used when the caller passes no path).
    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn cache_window(&self) -> Duration {
        self.cache_window
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn exclusive_lock(&self) -> bool {
        self.exclusive_lock
    }
}

impl fmt::Display for SnapshotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SnapshotConfig {{ \
             working_dir: {}, \
             relational_dump_path: {}, \
             search_dump_path: {}, \
             use_cache: {}, \
             archive_path: {}, \
             environment: {}, \
             cache_window_secs: {}, \
             compression: {}, \
             exclusive_lock: {} \
             }}",
            self.working_dir.display(),
            self.relational_dump_path.display(),
            self.search_dump_path.display(),
            self.use_cache,
            self.archive_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default(generated)".to_string()),
            self.environment,
            self.cache_window.as_secs(),
            self.compression,
            self.exclusive_lock,
        )
    }
}

/// Builder: collects overrides, resolves derived paths in `build()`.
#[derive(Clone, Debug, Default)]
pub struct SnapshotConfigBuilder {
    working_dir: Option<PathBuf>,
    relational_dump_path: Option<PathBuf>,
    search_dump_path: Option<PathBuf>,
    use_cache: bool,
    archive_path: Option<PathBuf>,
    environment: Option<String>,
    cache_window: Option<Duration>,
    compression: Compression,
    exclusive_lock: bool,
}

impl SnapshotConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from SP_* environment variables.
    pub fn from_env() -> Result<Self> {
        let mut b = Self::default();

        if let Some(s) = env_nonempty("SP_WORKING_DIR") {
            b.working_dir = Some(PathBuf::from(s));
        }
        if let Some(s) = env_nonempty("SP_RELATIONAL_DUMP") {
            b.relational_dump_path = Some(PathBuf::from(s));
        }
        if let Some(s) = env_nonempty("SP_SEARCH_DUMP") {
            b.search_dump_path = Some(PathBuf::from(s));
        }
        if let Some(s) = env_nonempty("SP_USE_CACHE") {
            b.use_cache = parse_flag("SP_USE_CACHE", &s)?;
        }
        if let Some(s) = env_nonempty("SP_ARCHIVE") {
            b.archive_path = Some(PathBuf::from(s));
        }
        if let Some(s) = env_nonempty("SP_ENV") {
            b.environment = Some(s);
        }
        if let Some(s) = env_nonempty("SP_CACHE_WINDOW_SECS") {
            let secs = s.parse::<u64>().map_err(|e| {
                SnapError::config(format!("invalid SP_CACHE_WINDOW_SECS='{}': {}", s, e))
            })?;
            b.cache_window = Some(Duration::from_secs(secs));
        }
        if let Some(s) = env_nonempty("SP_COMPRESSION") {
            b.compression = s.parse::<Compression>()?;
        }
        if let Some(s) = env_nonempty("SP_EXCLUSIVE_LOCK") {
            b.exclusive_lock = parse_flag("SP_EXCLUSIVE_LOCK", &s)?;
        }

        Ok(b)
    }

    pub fn working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn relational_dump_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.relational_dump_path = Some(path.into());
        self
    }

    pub fn search_dump_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.search_dump_path = Some(path.into());
        self
    }

    pub fn use_cache(mut self, on: bool) -> Self {
        self.use_cache = on;
        self
    }

    pub fn archive_path<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.archive_path = path.map(Into::into);
        self
    }

    pub fn environment<S: Into<String>>(mut self, env: S) -> Self {
        self.environment = Some(env.into());
        self
    }

    pub fn cache_window(mut self, window: Duration) -> Self {
        self.cache_window = Some(window);
        self
    }

    pub fn compression(mut self, c: Compression) -> Self {
        self.compression = c;
        self
    }

    pub fn exclusive_lock(mut self, on: bool) -> Self {
        self.exclusive_lock = on;
        self
    }

    /// Finish the builder: derive missing paths from `working_dir`.
    pub fn build(self) -> SnapshotConfig {
        let working_dir = self
            .working_dir
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_WORKDIR_NAME));
        let relational_dump_path = self
            .relational_dump_path
            .unwrap_or_else(|| working_dir.join(RELATIONAL_DUMP_FILE));
        let search_dump_path = self
            .search_dump_path
            .unwrap_or_else(|| working_dir.join(SEARCH_DUMP_FILE));

        SnapshotConfig {
            working_dir,
            relational_dump_path,
            search_dump_path,
            use_cache: self.use_cache,
            archive_path: self.archive_path,
            environment: self
                .environment
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            cache_window: self
                .cache_window
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_CACHE_WINDOW_SECS)),
            compression: self.compression,
            exclusive_lock: self.exclusive_lock,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) => {
            let s = v.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Err(_) => None,
    }
}

fn parse_flag(key: &str, v: &str) -> Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(SnapError::config(format!("invalid {}='{}' (expected 0|1|true|false)", key, v)).into()),
    }
}
