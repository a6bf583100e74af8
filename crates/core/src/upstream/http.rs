use crate::config::Settings;
use crate::upstream::output::Output;
use crate::upstream::{AnalyticsPipeline, ArbitrageMonitor, Detector, PipelineOutput};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

const ICEBERG_PATH: &str = "/v1/iceberg";
const ARBITRAGE_PATH: &str = "/v1/arbitrage";

fn build_http(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build upstream http client")
}

fn join_url(base_url: &str, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Emits a plain-text body to `out`, one line at a time.
fn emit_body(out: &mut Output, body: &str) {
    for line in body.lines() {
        out.emit(line);
    }
}

#[derive(Debug, Clone)]
pub struct HttpAnalyticsPipeline {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
}

impl HttpAnalyticsPipeline {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_analytics_base_url()?.to_string();
        Ok(Self {
            http: build_http(settings.analytics_timeout())?,
            base_url,
            api_key: settings.analytics_api_key.clone(),
            path: settings.analytics_pipeline_path().to_string(),
        })
    }

    fn url(&self) -> String {
        join_url(&self.base_url, &self.path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl AnalyticsPipeline for HttpAnalyticsPipeline {
    fn name(&self) -> &'static str {
        "analytics_http"
    }

    async fn run_pipeline(&self) -> Result<PipelineOutput> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .send()
            .await
            .context("analytics pipeline request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read analytics pipeline response")?;
        if !status.is_success() {
            anyhow::bail!("analytics pipeline HTTP {status}: {text}");
        }

        serde_json::from_str::<PipelineOutput>(&text)
            .with_context(|| format!("analytics pipeline response is not a pipeline result: {text}"))
    }
}

#[derive(Debug, Clone)]
pub struct HttpIcebergDetector {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpIcebergDetector {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let settings = settings.with_iceberg_env()?;
        let (api_key, api_secret) = settings.require_binance_credentials()?;
        let base_url = settings.require_iceberg_detector_url()?;

        // The secret travels as a header, so only TLS endpoints may receive it.
        let url = reqwest::Url::parse(base_url)
            .with_context(|| format!("ICEBERG_DETECTOR_URL is not a valid URL: {base_url}"))?;
        if url.scheme() != "https" {
            anyhow::bail!("ICEBERG_DETECTOR_URL must use https when Binance credentials are attached");
        }

        Ok(Self {
            http: build_http(settings.upstream_timeout())?,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-binance-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "x-binance-api-secret",
            HeaderValue::from_str(&self.api_secret)?,
        );
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl Detector for HttpIcebergDetector {
    async fn detect(&self, symbol: &str, out: &mut Output) -> Result<()> {
        let res = self
            .http
            .get(join_url(&self.base_url, ICEBERG_PATH))
            .headers(self.headers()?)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .context("iceberg detector request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read iceberg detector response")?;
        if !status.is_success() {
            anyhow::bail!("iceberg detector HTTP {status}: {text}");
        }

        emit_body(out, &text);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpArbitrageMonitor {
    http: reqwest::Client,
    base_url: String,
}

impl HttpArbitrageMonitor {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_arbitrage_monitor_url()?.to_string();
        Ok(Self {
            http: build_http(settings.upstream_timeout())?,
            base_url,
        })
    }
}

#[async_trait::async_trait]
impl ArbitrageMonitor for HttpArbitrageMonitor {
    async fn watch(&self, exchanges: &[String], out: &mut Output) -> Result<()> {
        let res = self
            .http
            .get(join_url(&self.base_url, ARBITRAGE_PATH))
            .query(&[("exchanges", exchanges.join(","))])
            .send()
            .await
            .context("arbitrage monitor request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read arbitrage monitor response")?;
        if !status.is_success() {
            anyhow::bail!("arbitrage monitor HTTP {status}: {text}");
        }

        emit_body(out, &text);
        Ok(())
    }
}
