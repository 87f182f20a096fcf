use config::{Config, ConfigError, Environment, File};
use ethers::types::Address;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Default dedup window: one confirmation cycle with margin.
pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 180_000;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub execution: ExecutionConfig,
    pub database: DatabaseConfig,
    pub dry_run: DryRunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Chain the relayer fills orders on (e.g., 137 for Polygon)
    pub chain_id: u64,
    /// JSON-RPC endpoint used for gas price queries
    pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// How long a digest stays reserved after a fill attempt starts
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
    /// Preferred profit tokens, most preferred first
    #[serde(default)]
    pub profit_tokens: Vec<Address>,
    /// Receiver contract handed to every fill
    pub receiver: Address,
    /// Address that collects the profit
    pub profit_receiver: Address,
    /// Gas prices above this cap are treated as unavailable
    #[serde(default)]
    pub max_gas_price_gwei: Option<Decimal>,
}

fn default_dedup_window_ms() -> u64 {
    DEFAULT_DEDUP_WINDOW_MS
}

impl ExecutionConfig {
    pub fn dedup_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.dedup_window_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DryRunConfig {
    /// Enable dry run mode (no transactions are sent)
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("execution.dedup_window_ms", DEFAULT_DEDUP_WINDOW_MS)?
            .set_default("database.max_connections", 5)?
            .set_default("dry_run.enabled", true)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("RELAYER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // RELAYER_CHAIN__RPC_URL, RELAYER_EXECUTION__PROFIT_TOKENS=0xa,0xb, ...
            .add_source(
                Environment::with_prefix("RELAYER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("execution.profit_tokens")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.chain.chain_id == 0 {
            errors.push("chain_id must be non-zero".to_string());
        }

        if self.chain.rpc_url.trim().is_empty() {
            errors.push("rpc_url must be set".to_string());
        }

        if self.execution.dedup_window_ms == 0 {
            errors.push("dedup_window_ms must be positive".to_string());
        }

        if self.execution.profit_tokens.is_empty() {
            errors.push(
                "profit_tokens is empty; every order would keep the output token".to_string(),
            );
        }

        if let Some(cap) = self.execution.max_gas_price_gwei {
            if cap <= Decimal::ZERO {
                errors.push("max_gas_price_gwei must be positive".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate everything a fill needs on top of [`AppConfig::validate`]
    pub fn validate_for_execution(&self) -> Result<(), Vec<String>> {
        let mut errors = self.validate().err().unwrap_or_default();

        if self.execution.profit_receiver == Address::zero() {
            errors.push("profit_receiver must not be the zero address".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
