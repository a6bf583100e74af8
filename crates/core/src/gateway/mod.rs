pub mod demo;
pub mod diagnostic;

use crate::config::Settings;
use crate::domain::contract::records_from_loose;
use crate::domain::criteria::FilterCriteria;
use crate::domain::recommendation::{PipelineResult, RecommendationRecord};
use crate::filter;
use crate::upstream::http::HttpAnalyticsPipeline;
use crate::upstream::{AnalyticsPipeline, PipelineFactory};
use anyhow::{anyhow, Context};
use std::sync::Arc;

/// Serves recommendations from the live pipeline when it works and from the demo
/// dataset when it does not. Callers never observe an upstream failure.
#[derive(Clone)]
pub struct RecommendationGateway {
    pipeline: PipelineFactory,
}

impl RecommendationGateway {
    pub fn new(pipeline: PipelineFactory) -> Self {
        Self { pipeline }
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self::new(Arc::new(move || -> anyhow::Result<Arc<dyn AnalyticsPipeline>> {
            let pipeline = HttpAnalyticsPipeline::from_settings(&settings)?;
            Ok(Arc::new(pipeline))
        }))
    }

    pub async fn get_recommendations(&self, criteria: &FilterCriteria) -> PipelineResult {
        match self.fetch_live().await {
            Ok(records) => {
                let recommendations = filter::apply(records, criteria);
                tracing::info!(
                    mode = "live",
                    count = recommendations.len(),
                    "served recommendations"
                );
                PipelineResult::live(recommendations)
            }
            Err(failure) => {
                failure.report();
                let recommendations = filter::apply(demo::demo_recommendations(), criteria);
                tracing::info!(
                    mode = "demo",
                    count = recommendations.len(),
                    "served recommendations"
                );
                PipelineResult::demo(demo::DEMO_MODE_MESSAGE, recommendations)
            }
        }
    }

    async fn fetch_live(&self) -> Result<Vec<RecommendationRecord>, LiveFailure> {
        let factory = Arc::clone(&self.pipeline);
        let handle = tokio::spawn(async move {
            let pipeline = factory()
                .context("analytics pipeline is not available")
                .map_err(LiveFailure::Unavailable)?;
            let output = pipeline
                .run_pipeline()
                .await
                .with_context(|| format!("{} run failed", pipeline.name()))
                .map_err(LiveFailure::Unavailable)?;
            records_from_loose(output.recommendations())
                .context("malformed pipeline output")
                .map_err(LiveFailure::Fault)
        });

        match handle.await {
            Ok(res) => res,
            Err(join_err) if join_err.is_panic() => {
                Err(LiveFailure::Fault(anyhow!("analytics pipeline panicked")))
            }
            Err(join_err) => Err(LiveFailure::Unavailable(anyhow!(
                "analytics pipeline task failed: {join_err}"
            ))),
        }
    }
}

/// Why the live path was not served.
#[derive(Debug)]
enum LiveFailure {
    /// Unconfigured or unreachable pipeline. Routine during outages.
    Unavailable(anyhow::Error),
    /// A panic or output that breaks the record contract.
    Fault(anyhow::Error),
}

impl LiveFailure {
    fn is_fault(&self) -> bool {
        matches!(self, LiveFailure::Fault(_))
    }

    fn error(&self) -> &anyhow::Error {
        match self {
            LiveFailure::Unavailable(err) | LiveFailure::Fault(err) => err,
        }
    }

    /// Only faults reach Sentry; outages are logged and served from demo data.
    fn report(&self) {
        let err = self.error();
        if self.is_fault() {
            sentry_anyhow::capture_anyhow(err);
            tracing::error!(
                error = %format!("{err:#}"),
                "live pipeline misbehaved; falling back to static demo data"
            );
        } else {
            tracing::warn!(
                error = %format!("{err:#}"),
                "live pipeline unavailable; falling back to static demo data"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::{MaxRisk, Mode, Status};
    use crate::upstream::PipelineOutput;
    use serde_json::{json, Value};

    struct StaticPipeline(Vec<Value>);

    #[async_trait::async_trait]
    impl AnalyticsPipeline for StaticPipeline {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn run_pipeline(&self) -> anyhow::Result<PipelineOutput> {
            Ok(PipelineOutput::new(self.0.clone()))
        }
    }

    struct FailingPipeline;

    #[async_trait::async_trait]
    impl AnalyticsPipeline for FailingPipeline {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn run_pipeline(&self) -> anyhow::Result<PipelineOutput> {
            anyhow::bail!("CMC_API_KEY missing")
        }
    }

    struct PanickingPipeline;

    #[async_trait::async_trait]
    impl AnalyticsPipeline for PanickingPipeline {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn run_pipeline(&self) -> anyhow::Result<PipelineOutput> {
            panic!("index out of bounds")
        }
    }

    fn gateway_with(pipeline: impl AnalyticsPipeline + 'static) -> RecommendationGateway {
        let pipeline: Arc<dyn AnalyticsPipeline> = Arc::new(pipeline);
        RecommendationGateway::new(Arc::new(move || -> anyhow::Result<Arc<dyn AnalyticsPipeline>> {
            Ok(Arc::clone(&pipeline))
        }))
    }

    fn symbols(result: &PipelineResult) -> Vec<&str> {
        result
            .recommendations
            .iter()
            .map(|r| r.symbol.as_str())
            .collect()
    }

    fn assert_demo(result: &PipelineResult) {
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.mode, Some(Mode::Demo));
        assert_eq!(result.message.as_deref(), Some(demo::DEMO_MODE_MESSAGE));
    }

    #[tokio::test]
    async fn failing_pipeline_serves_full_demo_dataset() {
        let gateway = gateway_with(FailingPipeline);
        let result = gateway.get_recommendations(&FilterCriteria::default()).await;
        assert_demo(&result);
        assert_eq!(result.recommendations, demo::demo_recommendations());

        let confidences: Vec<f64> = result.recommendations.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![0.91, 0.83, 0.74]);
    }

    #[tokio::test]
    async fn unresolvable_pipeline_falls_back() {
        let gateway = RecommendationGateway::new(Arc::new(
            || -> anyhow::Result<Arc<dyn AnalyticsPipeline>> { anyhow::bail!("no credentials") },
        ));
        let result = gateway.get_recommendations(&FilterCriteria::default()).await;
        assert_demo(&result);
    }

    #[tokio::test]
    async fn settings_without_analytics_url_fall_back() {
        let gateway = RecommendationGateway::from_settings(Settings::default());
        let result = gateway.get_recommendations(&FilterCriteria::default()).await;
        assert_demo(&result);
    }

    #[tokio::test]
    async fn panicking_pipeline_falls_back() {
        let gateway = gateway_with(PanickingPipeline);
        let result = gateway.get_recommendations(&FilterCriteria::default()).await;
        assert_demo(&result);
        assert_eq!(result.recommendations.len(), 3);
    }

    #[tokio::test]
    async fn demo_fallback_is_filtered() {
        let gateway = gateway_with(FailingPipeline);

        let c = FilterCriteria::new(2, MaxRisk::Medium, 0.8, None);
        let result = gateway.get_recommendations(&c).await;
        assert_demo(&result);
        assert_eq!(symbols(&result), vec!["BTC", "ETH"]);

        let c = FilterCriteria::new(5, MaxRisk::Any, 0.0, Some("sol".into()));
        assert_eq!(symbols(&gateway.get_recommendations(&c).await), vec!["SOL"]);

        let c = FilterCriteria::new(5, MaxRisk::Low, 0.0, None);
        assert!(gateway.get_recommendations(&c).await.recommendations.is_empty());
    }

    #[tokio::test]
    async fn live_records_are_normalized_and_filtered() {
        let gateway = gateway_with(StaticPipeline(vec![
            json!({"symbol": "DOGE", "risk_level": "high", "confidence": "0.66"}),
            json!({"symbol": "ADA", "risk_level": "low", "confidence": "n/a"}),
            json!({"symbol": "XRP", "risk_level": "unknown", "confidence": 0.9}),
            json!({"symbol": "DOT", "risk_level": "medium", "confidence": 0.7,
                   "metrics": {"price": 7.1, "percent_change_24h": -0.4}}),
        ]));

        let result = gateway.get_recommendations(&FilterCriteria::default()).await;
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.mode, Some(Mode::Live));
        assert_eq!(result.message, None);
        assert_eq!(symbols(&result), vec!["DOGE", "ADA", "XRP", "DOT"]);
        assert_eq!(result.recommendations[0].confidence, 0.66);
        assert_eq!(result.recommendations[1].confidence, 0.0);

        let c = FilterCriteria::new(5, MaxRisk::Medium, 0.5, None);
        let result = gateway.get_recommendations(&c).await;
        assert_eq!(symbols(&result), vec!["DOT"]);
    }

    #[tokio::test]
    async fn empty_live_result_stays_live() {
        let gateway = gateway_with(StaticPipeline(vec![]));
        let result = gateway.get_recommendations(&FilterCriteria::default()).await;
        assert_eq!(result.mode, Some(Mode::Live));
        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn only_panics_and_malformed_output_count_as_faults() {
        let unconfigured = RecommendationGateway::new(Arc::new(
            || -> anyhow::Result<Arc<dyn AnalyticsPipeline>> { anyhow::bail!("no credentials") },
        ));
        let cases = [
            (unconfigured, false),
            (RecommendationGateway::from_settings(Settings::default()), false),
            (gateway_with(FailingPipeline), false),
            (gateway_with(PanickingPipeline), true),
            (gateway_with(StaticPipeline(vec![json!("ETH")])), true),
        ];
        for (i, (gateway, fault)) in cases.into_iter().enumerate() {
            let failure = gateway.fetch_live().await.unwrap_err();
            assert_eq!(failure.is_fault(), fault, "case {i}: {failure:?}");
        }

        assert!(gateway_with(StaticPipeline(vec![])).fetch_live().await.is_ok());
    }

    #[tokio::test]
    async fn malformed_live_data_falls_back() {
        let gateway = gateway_with(StaticPipeline(vec![json!({"symbol": "BTC"}), json!("ETH")]));
        let result = gateway.get_recommendations(&FilterCriteria::default()).await;
        assert_demo(&result);
    }
}
