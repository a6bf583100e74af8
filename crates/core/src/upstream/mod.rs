//! Capabilities owned by external collaborators. The gateway only depends on
//! these traits; concrete clients live in [`http`].

pub mod http;
pub mod output;

use anyhow::Context;
use output::{Output, OutputCapability};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineOutput {
    #[serde(default)]
    recommendations: Option<Vec<Value>>,
}

impl PipelineOutput {
    pub fn new(recommendations: Vec<Value>) -> Self {
        Self {
            recommendations: Some(recommendations),
        }
    }

    /// Raw, unfiltered recommendation mappings. A null field reads as empty.
    pub fn recommendations(&self) -> &[Value] {
        self.recommendations.as_deref().unwrap_or_default()
    }
}

#[async_trait::async_trait]
pub trait AnalyticsPipeline: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_pipeline(&self) -> anyhow::Result<PipelineOutput>;
}

#[async_trait::async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, symbol: &str, out: &mut Output) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait ArbitrageMonitor: Send + Sync {
    async fn watch(&self, exchanges: &[String], out: &mut Output) -> anyhow::Result<()>;
}

/// Collaborators are resolved per call so a missing credential only affects the
/// call that needs it.
pub type PipelineFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn AnalyticsPipeline>> + Send + Sync>;
pub type DetectorFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn Detector>> + Send + Sync>;

/// One detector run bound to its target symbol. The detector is resolved when
/// the run starts, so construction failures surface through the run itself.
pub struct DetectorRun {
    pub detector: DetectorFactory,
    pub symbol: String,
}

#[async_trait::async_trait]
impl OutputCapability for DetectorRun {
    async fn run(&self, out: &mut Output) -> anyhow::Result<()> {
        let detector = (self.detector)().context("iceberg detector is not available")?;
        detector.detect(&self.symbol, out).await
    }
}

/// One arbitrage scan over a fixed exchange set.
pub struct ArbitrageRun {
    pub monitor: Arc<dyn ArbitrageMonitor>,
    pub exchanges: Vec<String>,
}

#[async_trait::async_trait]
impl OutputCapability for ArbitrageRun {
    async fn run(&self, out: &mut Output) -> anyhow::Result<()> {
        self.monitor.watch(&self.exchanges, out).await
    }
}
