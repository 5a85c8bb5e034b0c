//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// == Defaults ==
pub const DEFAULT_MAX_ENTRIES: usize = 20;
/// Two hours
pub const DEFAULT_TTL_SECS: u64 = 7200;
pub const DEFAULT_CACHE_DIR: &str = ".dump_cache";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_WATCH_DEBOUNCE_MS: u64 = 100;

// == Cache Config ==
/// Settings shared by every category cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Hard capacity bound per cache (must be positive)
    pub max_entries: usize,
    /// Entry lifetime in seconds, 0 = never expires
    pub ttl_secs: u64,
    /// Whether entries should be written to `cache_dir` (not implemented by this crate)
    pub persist_to_disk: bool,
    /// Directory used when persistence is enabled
    pub cache_dir: PathBuf,
    /// Make concurrent misses on one key wait for a single computation
    pub coalesce_misses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_secs: DEFAULT_TTL_SECS,
            persist_to_disk: false,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            coalesce_misses: false,
        }
    }
}

impl CacheConfig {
    /// Loads cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Capacity per category cache (default: 20, 0 is ignored)
    /// - `CACHE_TTL` - Entry lifetime in seconds, 0 disables expiry (default: 7200)
    /// - `PERSIST_TO_DISK` - `true`/`false` (default: false)
    /// - `CACHE_DIR` - Persistence directory (default: `.dump_cache`)
    /// - `COALESCE_MISSES` - `true`/`false` (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_parse::<usize>("MAX_ENTRIES")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_entries),
            ttl_secs: env_parse("CACHE_TTL").unwrap_or(defaults.ttl_secs),
            persist_to_disk: env_parse("PERSIST_TO_DISK").unwrap_or(defaults.persist_to_disk),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            coalesce_misses: env_parse("COALESCE_MISSES").unwrap_or(defaults.coalesce_misses),
        }
    }
}

// == Config ==
/// Process configuration for the cache service binary.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings applied to every category cache
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Background TTL sweep interval in seconds
    pub cleanup_interval: u64,
    /// Quiet period before a burst of file notifications triggers invalidation
    pub watch_debounce_ms: u64,
    /// Files watched from startup
    pub watch_paths: Vec<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - Everything read by [`CacheConfig::from_env`]
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - TTL sweep frequency in seconds (default: 60)
    /// - `WATCH_DEBOUNCE_MS` - Debounce window in milliseconds (default: 100)
    /// - `WATCH_PATHS` - Comma-separated dump files to watch (default: none)
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            server_port: env_parse("SERVER_PORT").unwrap_or(DEFAULT_SERVER_PORT),
            cleanup_interval: env_parse::<u64>("CLEANUP_INTERVAL")
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS),
            watch_debounce_ms: env_parse("WATCH_DEBOUNCE_MS").unwrap_or(DEFAULT_WATCH_DEBOUNCE_MS),
            watch_paths: env::var("WATCH_PATHS")
                .map(|v| parse_path_list(&v))
                .unwrap_or_default(),
        }
    }

    /// Debounce window as a [`Duration`].
    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: DEFAULT_SERVER_PORT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL_SECS,
            watch_debounce_ms: DEFAULT_WATCH_DEBOUNCE_MS,
            watch_paths: Vec::new(),
        }
    }
}

// == Helpers ==
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Splits a comma-separated list of paths, skipping blanks.
fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}
