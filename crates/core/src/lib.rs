pub mod domain;
pub mod filter;
pub mod gateway;
pub mod upstream;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_ICEBERG_ENV_FILE: &str = "config/.env.iceberg";
    const DEFAULT_PIPELINE_PATH: &str = "/v1/pipeline/run";
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub analytics_base_url: Option<String>,
        pub analytics_api_key: Option<String>,
        pub analytics_pipeline_path: Option<String>,
        pub analytics_timeout_secs: Option<u64>,
        pub iceberg_detector_url: Option<String>,
        pub iceberg_env_file: Option<String>,
        pub binance_api_key: Option<String>,
        pub binance_api_secret: Option<String>,
        pub arbitrage_monitor_url: Option<String>,
        pub upstream_timeout_secs: Option<u64>,
        pub sentry_dsn: Option<String>,
    }

    fn secs_from_env(var: &str) -> anyhow::Result<Option<u64>> {
        std::env::var(var)
            .ok()
            .map(|s| s.trim().parse::<u64>())
            .transpose()
            .with_context(|| format!("{var} must be a whole number of seconds"))
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                analytics_base_url: std::env::var("ANALYTICS_BASE_URL").ok(),
                analytics_api_key: std::env::var("ANALYTICS_API_KEY").ok(),
                analytics_pipeline_path: std::env::var("ANALYTICS_PIPELINE_PATH")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                analytics_timeout_secs: secs_from_env("ANALYTICS_TIMEOUT_SECS")?,
                iceberg_detector_url: std::env::var("ICEBERG_DETECTOR_URL").ok(),
                iceberg_env_file: std::env::var("ICEBERG_ENV_FILE").ok(),
                binance_api_key: std::env::var("BINANCE_API_KEY").ok(),
                binance_api_secret: std::env::var("BINANCE_API_SECRET").ok(),
                arbitrage_monitor_url: std::env::var("ARBITRAGE_MONITOR_URL").ok(),
                upstream_timeout_secs: secs_from_env("UPSTREAM_TIMEOUT_SECS")?,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        /// Layers the detector's credentials file under these settings. Values
        /// already set win; the process environment is never modified.
        pub fn with_iceberg_env(&self) -> anyhow::Result<Self> {
            let mut layered = self.clone();
            let path = self.iceberg_env_file();
            if !path.exists() {
                return Ok(layered);
            }

            let entries = dotenvy::from_path_iter(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            for entry in entries {
                let (key, value) =
                    entry.with_context(|| format!("failed to parse {}", path.display()))?;
                let slot = match key.as_str() {
                    "BINANCE_API_KEY" => &mut layered.binance_api_key,
                    "BINANCE_API_SECRET" => &mut layered.binance_api_secret,
                    "ICEBERG_DETECTOR_URL" => &mut layered.iceberg_detector_url,
                    _ => continue,
                };
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
            Ok(layered)
        }

        pub fn iceberg_env_file(&self) -> PathBuf {
            PathBuf::from(
                self.iceberg_env_file
                    .as_deref()
                    .unwrap_or(DEFAULT_ICEBERG_ENV_FILE),
            )
        }

        pub fn analytics_pipeline_path(&self) -> &str {
            self.analytics_pipeline_path
                .as_deref()
                .unwrap_or(DEFAULT_PIPELINE_PATH)
        }

        pub fn analytics_timeout(&self) -> Duration {
            Duration::from_secs(self.analytics_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
        }

        pub fn upstream_timeout(&self) -> Duration {
            Duration::from_secs(self.upstream_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
        }

        pub fn require_analytics_base_url(&self) -> anyhow::Result<&str> {
            self.analytics_base_url
                .as_deref()
                .context("ANALYTICS_BASE_URL is required")
        }

        pub fn require_iceberg_detector_url(&self) -> anyhow::Result<&str> {
            self.iceberg_detector_url
                .as_deref()
                .context("ICEBERG_DETECTOR_URL is required")
        }

        pub fn require_binance_credentials(&self) -> anyhow::Result<(&str, &str)> {
            let key = self
                .binance_api_key
                .as_deref()
                .context("BINANCE_API_KEY is required")?;
            let secret = self
                .binance_api_secret
                .as_deref()
                .context("BINANCE_API_SECRET is required")?;
            Ok((key, secret))
        }

        pub fn require_arbitrage_monitor_url(&self) -> anyhow::Result<&str> {
            self.arbitrage_monitor_url
                .as_deref()
                .context("ARBITRAGE_MONITOR_URL is required")
        }
    }

}
