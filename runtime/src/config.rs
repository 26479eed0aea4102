//! Runtime settings resolved from `PRICEWATCH_*` environment variables.
//!
//! Settings are resolved once at startup; CLI flags override individual fields
//! before the value is handed to the orchestrator.

use crate::acquire::AcquisitionConfig;
use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::session::SessionConfig;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_NAV_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ELEMENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BOOTSTRAP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_POSTAL_CODE: &str = "94310";
const DEFAULT_SETTLE_MILLIS: u64 = 1_000;
const DEFAULT_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Desktop Chrome user agent; headless defaults are routinely served a bot wall.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36";

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database holding the observation history.
    pub db_path: PathBuf,
    /// Optional JSON catalog; the built-in catalog is used when absent.
    pub catalog_path: Option<PathBuf>,
    /// Explicit browser binary; otherwise discovered.
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    /// Per-strategy wait for a price element.
    pub element_timeout: Duration,
    /// Per-step wait for consent and locale widgets.
    pub bootstrap_timeout: Duration,
    pub max_attempts: u32,
    pub postal_code: String,
    /// Pause after bootstrap clicks so overlays can settle.
    pub settle_delay: Duration,
    /// Period between `watch` cycles.
    pub check_interval: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            db_path: read_env_path("PRICEWATCH_DB").unwrap_or_else(default_db_path),
            catalog_path: read_env_path("PRICEWATCH_CATALOG"),
            chromium_path: read_env_path("PRICEWATCH_CHROMIUM_PATH"),
            headless: read_env_bool("PRICEWATCH_HEADLESS", true),
            user_agent: read_env_string("PRICEWATCH_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            navigation_timeout: Duration::from_secs(
                read_env_u64("PRICEWATCH_NAV_TIMEOUT_SECS", DEFAULT_NAV_TIMEOUT_SECS).max(1),
            ),
            element_timeout: Duration::from_secs(read_env_u64(
                "PRICEWATCH_ELEMENT_TIMEOUT_SECS",
                DEFAULT_ELEMENT_TIMEOUT_SECS,
            )),
            bootstrap_timeout: Duration::from_secs(read_env_u64(
                "PRICEWATCH_BOOTSTRAP_TIMEOUT_SECS",
                DEFAULT_BOOTSTRAP_TIMEOUT_SECS,
            )),
            max_attempts: read_env_u32("PRICEWATCH_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),
            postal_code: read_env_string("PRICEWATCH_POSTAL_CODE")
                .unwrap_or_else(|| DEFAULT_POSTAL_CODE.to_string()),
            settle_delay: Duration::from_millis(read_env_u64(
                "PRICEWATCH_SETTLE_MILLIS",
                DEFAULT_SETTLE_MILLIS,
            )),
            check_interval: Duration::from_secs(
                read_env_u64("PRICEWATCH_INTERVAL_SECS", DEFAULT_INTERVAL_SECS).max(1),
            ),
        }
    }

    /// Load the configured catalog, falling back to the built-in one.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::builtin()),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            navigation_timeout: self.navigation_timeout,
            bootstrap_timeout: self.bootstrap_timeout,
            settle_delay: self.settle_delay,
            postal_code: self.postal_code.clone(),
            ..SessionConfig::default()
        }
    }

    pub fn acquisition_config(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            max_attempts: self.max_attempts,
            element_timeout: self.element_timeout,
            session: self.session_config(),
        }
    }
}

/// `~/.pricewatch/prices.db`.
pub fn default_db_path() -> PathBuf {
    data_dir().join("prices.db")
}

/// `~/.pricewatch`, or `./.pricewatch` without a home directory.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pricewatch")
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_env_path(name: &str) -> Option<PathBuf> {
    read_env_string(name).map(PathBuf::from)
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    read_env_string(name)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn read_env_u32(name: &str, default: u32) -> u32 {
    read_env_string(name)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_env_bool(name: &str, default: bool) -> bool {
    match read_env_string(name).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
