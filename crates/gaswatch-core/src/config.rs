//! Configuration management for gaswatch
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file,
//! `GASWATCH__SECTION__KEY` environment variables, then the flat variables
//! older deployments already set (`ETHERSCAN_API_KEY`, `GAS_FEE_THRESHOLD`, ...).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Operator;

/// Placeholder values shipped in old container templates; treated as unset.
const PLACEHOLDER_TOKEN: &str = "default_token";
const PLACEHOLDER_CHAT_ID: &str = "default_chat_id";
const PLACEHOLDER_API_KEY: &str = "default_api_key";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Price source configuration
    pub source: SourceConfig,

    /// Threshold and scheduling configuration
    pub alerting: AlertingConfig,

    /// Persisted state configuration
    pub storage: StorageConfig,

    /// Telegram notification configuration
    pub telegram: TelegramConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("GASWATCH")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Config = builder.build()?.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Apply the flat environment variables understood by earlier deployments
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ETHERSCAN_API_KEY") {
            self.source.api_key = key;
        }

        if let Some(raw) = lookup("GAS_FEE_THRESHOLD") {
            match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => self.alerting.gas_fee_threshold = value,
                _ => warn!(
                    value = %raw,
                    fallback = self.alerting.gas_fee_threshold,
                    "Invalid GAS_FEE_THRESHOLD value"
                ),
            }
        }

        if let Some(raw) = lookup("CHECK_INTERVAL") {
            match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => self.alerting.check_interval_seconds = value,
                _ => warn!(
                    value = %raw,
                    fallback = self.alerting.check_interval_seconds,
                    "Invalid CHECK_INTERVAL value"
                ),
            }
        }

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }

        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }

        if let Some(path) = lookup("STATE_FILE_PATH") {
            self.storage.state_file = Some(PathBuf::from(path));
        }
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if !self.alerting.gas_fee_threshold.is_finite() {
            return Err(Error::config("alerting.gas_fee_threshold must be a finite number"));
        }
        if self.alerting.check_interval_seconds == 0 {
            return Err(Error::config("alerting.check_interval_seconds must be positive"));
        }
        if self.source.timeout_seconds == 0 {
            return Err(Error::config("source.timeout_seconds must be positive"));
        }
        if self.source.api_url.trim().is_empty() {
            return Err(Error::config("source.api_url must not be empty"));
        }
        Ok(())
    }
}

/// Gas oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Oracle endpoint (Etherscan API V2)
    pub api_url: String,
    /// Chain queried through the V2 endpoint (`1` is Ethereum mainnet)
    pub chain_id: u64,
    /// Etherscan API key (empty means unauthenticated)
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl SourceConfig {
    /// The API key, unless it is empty or a template placeholder
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty() && key != PLACEHOLDER_API_KEY).then_some(key)
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.etherscan.io/v2/api".to_string(),
            chain_id: 1,
            api_key: String::new(),
            timeout_seconds: 30,
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Threshold on the proposed gas price, gwei
    pub gas_fee_threshold: f64,
    /// Comparison that fires the alert (`lt`: alert when the price drops below)
    pub operator: Operator,
    /// Seconds between checks in watch mode
    pub check_interval_seconds: u64,
    /// Send a notification when the price cannot be retrieved
    pub notify_on_failure: bool,
}

impl AlertingConfig {
    /// Interval between checks in watch mode
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            gas_fee_threshold: 100.0,
            operator: Operator::Lt,
            check_interval_seconds: 300,
            notify_on_failure: true,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Mounted data directory
    pub data_dir: PathBuf,
    /// Explicit path of the alert state file
    pub state_file: Option<PathBuf>,
    /// Observation log file name, relative to `data_dir`
    pub observations_file: String,
}

impl StorageConfig {
    /// Resolved path of the alert state file
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("notified_state.txt"))
    }

    /// Resolved path of the observation log
    pub fn observations_path(&self) -> PathBuf {
        self.data_dir.join(&self.observations_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/data"),
            state_file: None,
            observations_file: "observations.jsonl".to_string(),
        }
    }
}

/// Telegram configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: Option<String>,
    /// Destination chat
    pub chat_id: Option<String>,
    /// Bot API base URL
    pub api_base: String,
}

impl TelegramConfig {
    /// Token and chat id, when both are set to real values
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != PLACEHOLDER_TOKEN)?;
        let chat_id = self
            .chat_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != PLACEHOLDER_CHAT_ID)?;
        Some((token, chat_id))
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    /// Serializes tests that read or write the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Sets variables for the duration of a test and removes them on drop
    struct ScopedEnv {
        keys: Vec<String>,
        _lock: MutexGuard<'static, ()>,
    }

    impl ScopedEnv {
        fn set(pairs: &[(&str, &str)]) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            for (key, value) in pairs {
                std::env::set_var(key, value);
            }
            Self {
                keys: pairs.iter().map(|(k, _)| (*k).to_string()).collect(),
                _lock: lock,
            }
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            for key in &self.keys {
                std::env::remove_var(key);
            }
        }
    }

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "{content}").unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.alerting.gas_fee_threshold, 100.0);
        assert_eq!(config.alerting.check_interval(), Duration::from_secs(300));
        assert_eq!(
            config.storage.state_path(),
            PathBuf::from("/data/notified_state.txt")
        );
        assert_eq!(
            config.storage.observations_path(),
            PathBuf::from("/data/observations.jsonl")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_env_overrides() {
        let mut config = Config::default();
        config.apply_legacy_env(env(&[
            ("ETHERSCAN_API_KEY", "abc"),
            ("GAS_FEE_THRESHOLD", "12.5"),
            ("CHECK_INTERVAL", "60"),
            ("TELEGRAM_BOT_TOKEN", "123:xyz"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("STATE_FILE_PATH", "/tmp/state.txt"),
        ]));

        assert_eq!(config.source.api_key(), Some("abc"));
        assert_eq!(config.alerting.gas_fee_threshold, 12.5);
        assert_eq!(config.alerting.check_interval_seconds, 60);
        assert_eq!(config.telegram.credentials(), Some(("123:xyz", "42")));
        assert_eq!(config.storage.state_path(), PathBuf::from("/tmp/state.txt"));
    }

    #[test]
    fn test_invalid_legacy_numbers_keep_defaults() {
        let mut config = Config::default();
        config.apply_legacy_env(env(&[
            ("GAS_FEE_THRESHOLD", "cheap"),
            ("CHECK_INTERVAL", "0"),
        ]));

        assert_eq!(config.alerting.gas_fee_threshold, 100.0);
        assert_eq!(config.alerting.check_interval_seconds, 300);
    }

    #[test]
    fn test_placeholders_are_not_credentials() {
        let mut config = Config::default();
        config.apply_legacy_env(env(&[
            ("ETHERSCAN_API_KEY", "default_api_key"),
            ("TELEGRAM_BOT_TOKEN", "default_token"),
            ("TELEGRAM_CHAT_ID", "default_chat_id"),
        ]));

        assert_eq!(config.source.api_key(), None);
        assert_eq!(config.telegram.credentials(), None);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.source.timeout_seconds = 0;

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_non_finite_threshold() {
        for threshold in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut config = Config::default();
            config.alerting.gas_fee_threshold = threshold;

            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.alerting.check_interval_seconds = 0;

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let _env = ScopedEnv::set(&[]);
        let file = toml_file(
            r#"
[alerting]
gas_fee_threshold = 7.5

[storage]
data_dir = "/srv/gaswatch"
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.alerting.gas_fee_threshold, 7.5);
        assert_eq!(config.alerting.check_interval_seconds, 300);
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/gaswatch"));
    }

    #[test]
    fn test_load_reads_prefixed_env() {
        let _env = ScopedEnv::set(&[
            ("GASWATCH__ALERTING__GAS_FEE_THRESHOLD", "25"),
            ("GASWATCH__TELEGRAM__CHAT_ID", "-100123"),
            ("GASWATCH__SOURCE__CHAIN_ID", "8453"),
        ]);

        let config = Config::load(None).unwrap();

        assert_eq!(config.alerting.gas_fee_threshold, 25.0);
        assert_eq!(config.telegram.chat_id.as_deref(), Some("-100123"));
        assert_eq!(config.source.chain_id, 8453);
    }

    #[test]
    fn test_legacy_env_beats_file_and_prefixed_env() {
        let _env = ScopedEnv::set(&[
            ("GASWATCH__ALERTING__CHECK_INTERVAL_SECONDS", "90"),
            ("GAS_FEE_THRESHOLD", "12"),
            ("CHECK_INTERVAL", "45"),
        ]);
        let file = toml_file(
            r#"
[alerting]
gas_fee_threshold = 7.5
check_interval_seconds = 600
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.alerting.gas_fee_threshold, 12.0);
        assert_eq!(config.alerting.check_interval_seconds, 45);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let _env = ScopedEnv::set(&[]);
        let file = toml_file(
            r#"
[source]
timeout_seconds = 0
"#,
        );

        assert!(matches!(
            Config::load(Some(file.path())),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_default_source_is_etherscan_v2_mainnet() {
        let source = SourceConfig::default();

        assert_eq!(source.api_url, "https://api.etherscan.io/v2/api");
        assert_eq!(source.chain_id, 1);
    }
}
