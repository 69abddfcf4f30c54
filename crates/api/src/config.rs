//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use common::TaxRate;

/// Log output format for the service binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// How new order identifiers are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderIdScheme {
    /// `ORD-<uuid>`.
    #[default]
    Uuid,
    /// `ORD-000001`, continuing after the highest stored number.
    Sequential,
}

impl OrderIdScheme {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("sequential") {
            OrderIdScheme::Sequential
        } else {
            OrderIdScheme::Uuid
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATA_DIR` — directory for the file store; unset keeps everything in memory
/// - `TAX_RATE_BPS` — sales tax in basis points (default: `800`)
/// - `ORDER_IDS` — `uuid` or `sequential` (default: `uuid`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub data_dir: Option<PathBuf>,
    pub tax_rate: TaxRate,
    pub order_ids: OrderIdScheme,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            data_dir: lookup("DATA_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            tax_rate: lookup("TAX_RATE_BPS")
                .and_then(|bps| bps.parse().ok())
                .map(TaxRate::from_basis_points)
                .unwrap_or(defaults.tax_rate),
            order_ids: lookup("ORDER_IDS")
                .map(|scheme| OrderIdScheme::parse(&scheme))
                .unwrap_or_default(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            data_dir: None,
            tax_rate: TaxRate::STANDARD,
            order_ids: OrderIdScheme::Uuid,
        }
    }
}
