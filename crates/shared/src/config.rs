//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Document numbering formats.
    #[serde(default)]
    pub numbering: NumberingConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Format of one kind of document number.
///
/// The n-th document of a party (n starting at 1) is numbered
/// `prefix + zero_pad(base + n - 1, width)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NumberFormatConfig {
    /// Literal prefix, e.g. `PAY-`.
    #[serde(default)]
    pub prefix: String,
    /// Minimum digit count; `0` disables padding.
    pub width: usize,
    /// Number given to the first document.
    pub base: u64,
}

impl NumberFormatConfig {
    fn new(prefix: &str, width: usize, base: u64) -> Self {
        Self {
            prefix: prefix.to_string(),
            width,
            base,
        }
    }
}

/// Numbering formats per document kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NumberingConfig {
    /// Client invoices.
    #[serde(default = "default_invoice_format")]
    pub invoice: NumberFormatConfig,
    /// Payments received from clients.
    #[serde(default = "default_client_payment_format")]
    pub client_payment: NumberFormatConfig,
    /// Payments made to suppliers.
    #[serde(default = "default_supplier_payment_format")]
    pub supplier_payment: NumberFormatConfig,
    /// Quotes.
    #[serde(default = "default_quote_format")]
    pub quote: NumberFormatConfig,
    /// Credit and debit notes.
    #[serde(default = "default_note_format")]
    pub note: NumberFormatConfig,
}

fn default_invoice_format() -> NumberFormatConfig {
    NumberFormatConfig::new("", 6, 1000)
}

fn default_client_payment_format() -> NumberFormatConfig {
    NumberFormatConfig::new("", 6, 1000)
}

fn default_supplier_payment_format() -> NumberFormatConfig {
    NumberFormatConfig::new("PAY-", 6, 1)
}

fn default_quote_format() -> NumberFormatConfig {
    NumberFormatConfig::new("", 0, 1000)
}

fn default_note_format() -> NumberFormatConfig {
    NumberFormatConfig::new("", 5, 1)
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            invoice: default_invoice_format(),
            client_payment: default_client_payment_format(),
            supplier_payment: default_supplier_payment_format(),
            quote: default_quote_format(),
            note: default_note_format(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "billfold=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BILLFOLD").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
