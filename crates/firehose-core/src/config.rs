use crate::backoff::{BackoffSpec, BackoffTable, Growth};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// App credentials: four opaque secret strings, passed through to the
/// request signer and never interpreted by the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

/// Growth law for one backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthKind {
    Linear,
    Exponential,
}

/// One backoff curve as it appears in config.toml. Times are in seconds;
/// `step_secs` applies to linear curves, `factor` to exponential ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffConfig {
    pub initial_secs: f64,
    pub kind: GrowthKind,
    #[serde(default)]
    pub step_secs: f64,
    #[serde(default)]
    pub factor: f64,
    pub max_secs: f64,
}

impl BackoffConfig {
    fn to_spec(self) -> BackoffSpec {
        BackoffSpec {
            initial_delay: Duration::from_secs_f64(self.initial_secs),
            growth: match self.kind {
                GrowthKind::Linear => Growth::Linear {
                    step: Duration::from_secs_f64(self.step_secs),
                },
                GrowthKind::Exponential => Growth::Exponential {
                    factor: self.factor,
                },
            },
            max_delay: Duration::from_secs_f64(self.max_secs),
        }
    }
}

/// The three backoff curves, keyed the way the vendor documents them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffTableConfig {
    pub tcp: BackoffConfig,
    pub http: BackoffConfig,
    pub http_420: BackoffConfig,
}

impl Default for BackoffTableConfig {
    fn default() -> Self {
        Self {
            tcp: BackoffConfig {
                initial_secs: 0.0,
                kind: GrowthKind::Linear,
                step_secs: 0.25,
                factor: 0.0,
                max_secs: 16.0,
            },
            http: BackoffConfig {
                initial_secs: 5.0,
                kind: GrowthKind::Exponential,
                step_secs: 0.0,
                factor: 2.0,
                max_secs: 320.0,
            },
            http_420: BackoffConfig {
                initial_secs: 60.0,
                kind: GrowthKind::Exponential,
                step_secs: 0.0,
                factor: 2.0,
                max_secs: 600.0,
            },
        }
    }
}

impl BackoffTableConfig {
    pub fn to_table(self) -> BackoffTable {
        BackoffTable {
            tcp: self.tcp.to_spec(),
            http: self.http.to_spec(),
            http_420: self.http_420.to_spec(),
        }
    }
}

/// Global configuration loaded from `~/.config/firehose/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Streaming endpoint URL.
    pub endpoint: String,
    /// Vendor-specific filter parameters sent as the POST form body.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Emit a progress log entry every this many valid records.
    pub window_size: u64,
    /// Treat the connection as dead after this long without data
    /// (keep-alives included).
    pub stall_timeout_secs: u64,
    /// Fixed delay before retrying a connect-phase timeout; not governed by
    /// the backoff controller.
    pub connect_retry_delay_secs: f64,
    #[serde(default)]
    pub backoff: BackoffTableConfig,
    #[serde(default)]
    pub credentials: Credentials,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://stream.twitter.com/1.1/statuses/filter.json".to_string(),
            params: BTreeMap::new(),
            window_size: 1000,
            stall_timeout_secs: 90,
            connect_retry_delay_secs: 0.5,
            backoff: BackoffTableConfig::default(),
            credentials: Credentials::default(),
        }
    }
}

impl StreamConfig {
    /// Sanity checks for values a hand-edited config file can get wrong.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.window_size > 0,
            "window_size must be positive (got 0)"
        );
        Ok(())
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.connect_retry_delay_secs)
    }

    pub fn param_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("firehose")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<StreamConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = StreamConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: StreamConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Category;

    #[test]
    fn default_config_values() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.window_size, 1000);
        assert_eq!(cfg.stall_timeout_secs, 90);
        assert!((cfg.connect_retry_delay_secs - 0.5).abs() < 1e-9);
        assert!(cfg.params.is_empty());
    }

    #[test]
    fn default_backoff_table_converts_to_vendor_defaults() {
        let table = BackoffTableConfig::default().to_table();
        assert_eq!(table, BackoffTable::default());
        assert_eq!(
            table.spec(Category::Http420).initial_delay,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = StreamConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: StreamConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.endpoint, cfg.endpoint);
        assert_eq!(parsed.window_size, cfg.window_size);
        assert_eq!(parsed.backoff.to_table(), cfg.backoff.to_table());
    }

    #[test]
    fn zero_window_size_is_rejected() {
        let mut cfg = StreamConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.window_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            endpoint = "https://stream.example.com/filter.json"
            window_size = 50
            stall_timeout_secs = 30
            connect_retry_delay_secs = 1.0

            [params]
            track = "rust,curl"

            [backoff.tcp]
            initial_secs = 0.0
            kind = "linear"
            step_secs = 0.5
            max_secs = 8.0

            [backoff.http]
            initial_secs = 2.0
            kind = "exponential"
            factor = 3.0
            max_secs = 100.0

            [backoff.http_420]
            initial_secs = 10.0
            kind = "exponential"
            factor = 2.0
            max_secs = 60.0

            [credentials]
            consumer_key = "ck"
            consumer_secret = "cs"
            access_token = "at"
            access_token_secret = "ats"
        "#;
        let cfg: StreamConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.window_size, 50);
        assert_eq!(cfg.params["track"], "rust,curl");
        assert_eq!(cfg.credentials.access_token, "at");
        let table = cfg.backoff.to_table();
        assert_eq!(
            table.tcp.growth,
            Growth::Linear {
                step: Duration::from_millis(500)
            }
        );
        assert_eq!(table.http.max_delay, Duration::from_secs(100));
    }
}
