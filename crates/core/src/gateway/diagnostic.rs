use crate::config::Settings;
use crate::upstream::http::HttpIcebergDetector;
use crate::upstream::output::capture;
use crate::upstream::{Detector, DetectorFactory, DetectorRun};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_DIAGNOSTIC_SYMBOL: &str = "BTCUSDT";

pub const NO_OUTPUT_MESSAGE: &str = "Iceberg detector ran, but produced no output.";

pub const NOT_CONFIGURED_MESSAGE: &str = "Iceberg detector is not configured on this deployment. \
     Set BINANCE_API_KEY / BINANCE_API_SECRET in config/.env.iceberg \
     and ensure the file is available at runtime.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DiagnosticOutcome {
    Ok { output: String },
    Error { message: String },
}

impl DiagnosticOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, DiagnosticOutcome::Ok { .. })
    }
}

/// Turns the detector's emitted text into a structured outcome.
#[derive(Clone)]
pub struct DiagnosticProxy {
    detector: DetectorFactory,
}

impl DiagnosticProxy {
    pub fn new(detector: DetectorFactory) -> Self {
        Self { detector }
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self::new(Arc::new(move || -> anyhow::Result<Arc<dyn Detector>> {
            let detector = HttpIcebergDetector::from_settings(&settings)?;
            Ok(Arc::new(detector))
        }))
    }

    pub async fn run_diagnostic(&self, symbol: &str) -> DiagnosticOutcome {
        match self.run_captured(symbol).await {
            Ok(text) => {
                let output = text.trim();
                let output = if output.is_empty() {
                    NO_OUTPUT_MESSAGE.to_string()
                } else {
                    output.to_string()
                };
                tracing::info!(%symbol, bytes = output.len(), "iceberg detector completed");
                DiagnosticOutcome::Ok { output }
            }
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(%symbol, error = %format!("{err:#}"), "iceberg detector failed");
                DiagnosticOutcome::Error {
                    message: NOT_CONFIGURED_MESSAGE.to_string(),
                }
            }
        }
    }

    async fn run_captured(&self, symbol: &str) -> anyhow::Result<String> {
        capture(Arc::new(DetectorRun {
            detector: Arc::clone(&self.detector),
            symbol: symbol.to_string(),
        }))
        .await
    }
}
