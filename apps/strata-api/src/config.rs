//! # Application Configuration
//!
//! Configuration loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`STRATA_*`)
//! 2. Defaults (this file)
//!
//! | Variable                     | Default                          |
//! |------------------------------|----------------------------------|
//! | `STRATA_BIND_ADDR`           | `127.0.0.1:3080`                 |
//! | `STRATA_DB_PATH`             | platform data dir / `strata.db`  |
//! | `STRATA_STORE_NAME`          | `Strata POS`                     |
//! | `STRATA_STORE_ADDRESS`       | none; lines separated by `\|`    |
//! | `STRATA_STORE_PHONE`         | none                             |
//! | `STRATA_CURRENCY_SYMBOL`     | `$`                              |
//! | `STRATA_RECEIPT_WIDTH`       | `42`                             |
//! | `STRATA_LOYALTY_POINT_VALUE` | none (loyalty disabled)          |
//! | `STRATA_LOYALTY_EARN_RATE`   | none (loyalty disabled)          |
//! | `STRATA_SESSION_IDLE_SECS`   | `28800` (8 hours)                |
//!
//! ## Thread Safety
//! Configuration is read-only after initialization and shared behind an `Arc`.

use directories::ProjectDirs;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use strata_core::{LoyaltyConfig, StoreConfig};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3080";
const DEFAULT_RECEIPT_WIDTH: usize = 42;
const DEFAULT_SESSION_IDLE_SECS: u64 = 8 * 60 * 60;

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Could not determine app data directory; set STRATA_DB_PATH")]
    NoDataDirectory,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,

    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Store identity printed on receipts.
    pub store: StoreConfig,

    /// Characters per line for rendered receipt text.
    pub receipt_width: usize,

    /// `None` disables earning and redemption.
    pub loyalty: Option<LoyaltyConfig>,

    /// How long an unused terminal session with an empty cart is kept.
    pub session_idle: Duration,
}

impl AppConfig {
    /// Loads configuration from `STRATA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = var("STRATA_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "STRATA_BIND_ADDR",
                reason: e.to_string(),
            })?;

        let database_path = match var("STRATA_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        let defaults = StoreConfig::default();
        let store = StoreConfig {
            company_name: var("STRATA_STORE_NAME").unwrap_or(defaults.company_name),
            address_lines: var("STRATA_STORE_ADDRESS")
                .map(|a| {
                    a.split('|')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            phone: var("STRATA_STORE_PHONE"),
            currency_symbol: var("STRATA_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            logo: None,
        };

        let receipt_width = match var("STRATA_RECEIPT_WIDTH") {
            Some(w) => w.parse::<usize>().ok().filter(|w| (24..=80).contains(w)).ok_or(
                ConfigError::Invalid {
                    key: "STRATA_RECEIPT_WIDTH",
                    reason: format!("'{}' is not a width between 24 and 80", w),
                },
            )?,
            None => DEFAULT_RECEIPT_WIDTH,
        };

        let session_idle = match var("STRATA_SESSION_IDLE_SECS") {
            Some(secs) => secs.parse::<u64>().ok().filter(|s| *s > 0).map(Duration::from_secs).ok_or(
                ConfigError::Invalid {
                    key: "STRATA_SESSION_IDLE_SECS",
                    reason: format!("'{}' is not a positive number of seconds", secs),
                },
            )?,
            None => Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        };

        let loyalty = match (var("STRATA_LOYALTY_POINT_VALUE"), var("STRATA_LOYALTY_EARN_RATE")) {
            (Some(point_value), Some(earn_rate)) => {
                let point_value = parse_rate("STRATA_LOYALTY_POINT_VALUE", &point_value)?;
                let earn_rate = parse_rate("STRATA_LOYALTY_EARN_RATE", &earn_rate)?;
                let config = LoyaltyConfig::new(point_value, earn_rate).map_err(|e| {
                    ConfigError::Invalid {
                        key: "STRATA_LOYALTY_*",
                        reason: e.to_string(),
                    }
                })?;
                Some(config)
            }
            _ => {
                warn!(
                    "STRATA_LOYALTY_POINT_VALUE and STRATA_LOYALTY_EARN_RATE not both set; loyalty disabled"
                );
                None
            }
        };

        Ok(AppConfig {
            bind_addr,
            database_path,
            store,
            receipt_width,
            loyalty,
            session_idle,
        })
    }
}

fn parse_rate(key: &'static str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("'{}': {}", value, e),
    })
}

/// Platform data directory for the database file.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.strata.pos/strata.db`
/// - **Windows**: `%APPDATA%\strata\pos\data\strata.db`
/// - **Linux**: `~/.local/share/pos/strata.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "strata", "pos").ok_or(ConfigError::NoDataDirectory)?;
    Ok(dirs.data_dir().join("strata.db"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("STRATA_DB_PATH", "/tmp/strata-test.db")]).unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.database_path, PathBuf::from("/tmp/strata-test.db"));
        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(config.receipt_width, 42);
        assert!(config.loyalty.is_none());
        assert_eq!(config.session_idle, Duration::from_secs(28_800));
    }

    #[test]
    fn test_store_overrides() {
        let config = load(&[
            ("STRATA_DB_PATH", ":memory:"),
            ("STRATA_STORE_NAME", "Northside Outfitters"),
            ("STRATA_STORE_ADDRESS", "12 Harbour St | Portside, PS 4000"),
            ("STRATA_STORE_PHONE", "555-0100"),
            ("STRATA_CURRENCY_SYMBOL", "€"),
        ])
        .unwrap();

        assert_eq!(config.store.company_name, "Northside Outfitters");
        assert_eq!(config.store.address_lines, vec!["12 Harbour St", "Portside, PS 4000"]);
        assert_eq!(config.store.phone.as_deref(), Some("555-0100"));
        assert_eq!(config.store.currency_symbol, "€");
    }

    #[test]
    fn test_loyalty_needs_both_rates() {
        let only_one = load(&[
            ("STRATA_DB_PATH", ":memory:"),
            ("STRATA_LOYALTY_POINT_VALUE", "0.01"),
        ])
        .unwrap();
        assert!(only_one.loyalty.is_none());

        let both = load(&[
            ("STRATA_DB_PATH", ":memory:"),
            ("STRATA_LOYALTY_POINT_VALUE", "0.01"),
            ("STRATA_LOYALTY_EARN_RATE", "1"),
        ])
        .unwrap();
        let loyalty = both.loyalty.unwrap();
        assert_eq!(loyalty.point_value(), Decimal::new(1, 2));
        assert_eq!(loyalty.earn_rate(), Decimal::ONE);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            load(&[("STRATA_DB_PATH", ":memory:"), ("STRATA_BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "STRATA_BIND_ADDR", .. })
        ));
        assert!(matches!(
            load(&[
                ("STRATA_DB_PATH", ":memory:"),
                ("STRATA_LOYALTY_POINT_VALUE", "zero"),
                ("STRATA_LOYALTY_EARN_RATE", "1"),
            ]),
            Err(ConfigError::Invalid { key: "STRATA_LOYALTY_POINT_VALUE", .. })
        ));
        assert!(matches!(
            load(&[
                ("STRATA_DB_PATH", ":memory:"),
                ("STRATA_LOYALTY_POINT_VALUE", "0"),
                ("STRATA_LOYALTY_EARN_RATE", "1"),
            ]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[("STRATA_DB_PATH", ":memory:"), ("STRATA_RECEIPT_WIDTH", "7")]),
            Err(ConfigError::Invalid { key: "STRATA_RECEIPT_WIDTH", .. })
        ));
        assert!(matches!(
            load(&[("STRATA_DB_PATH", ":memory:"), ("STRATA_SESSION_IDLE_SECS", "0")]),
            Err(ConfigError::Invalid { key: "STRATA_SESSION_IDLE_SECS", .. })
        ));
    }
}
