use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cryptobot_core::config::Settings;
use cryptobot_core::domain::criteria::{FilterCriteria, DEFAULT_TOP_N};
use cryptobot_core::domain::recommendation::{MaxRisk, Mode};
use cryptobot_core::gateway::diagnostic::{DiagnosticOutcome, DiagnosticProxy, DEFAULT_DIAGNOSTIC_SYMBOL};
use cryptobot_core::gateway::RecommendationGateway;
use cryptobot_core::upstream::http::HttpArbitrageMonitor;
use cryptobot_core::upstream::output::{Output, OutputCapability};
use cryptobot_core::upstream::{ArbitrageMonitor, ArbitrageRun};

#[derive(Debug, Parser)]
#[command(name = "cryptobot", about = "Crypto Bot CLI")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Get investment recommendations.
    Recommendations(RecommendationsArgs),

    /// Detect iceberg orders.
    Iceberg {
        /// Symbol to analyze.
        #[arg(long, default_value = DEFAULT_DIAGNOSTIC_SYMBOL)]
        symbol: String,
    },

    /// Check for arbitrage opportunities.
    Arbitrage {
        /// Exchanges to check.
        #[arg(long, num_args = 1.., default_values = ["binance", "kraken"])]
        exchanges: Vec<String>,
    },
}

#[derive(Debug, clap::Args)]
struct RecommendationsArgs {
    /// Number of recommendations to return (clamped to 1..=20).
    #[arg(long = "top-n", alias = "top_n", default_value_t = DEFAULT_TOP_N, allow_negative_numbers = true)]
    top_n: i64,

    /// Maximum risk level.
    #[arg(long = "max-risk", alias = "max_risk", value_enum, default_value_t = RiskArg::Any)]
    max_risk: RiskArg,

    /// Minimum confidence level.
    #[arg(long = "min-confidence", alias = "min_confidence", default_value_t = 0.0, allow_negative_numbers = true)]
    min_confidence: f64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RiskArg {
    #[value(name = "Any")]
    Any,
    #[value(name = "Low")]
    Low,
    #[value(name = "Medium")]
    Medium,
    #[value(name = "High")]
    High,
}

impl From<RiskArg> for MaxRisk {
    fn from(value: RiskArg) -> Self {
        match value {
            RiskArg::Any => MaxRisk::Any,
            RiskArg::Low => MaxRisk::Low,
            RiskArg::Medium => MaxRisk::Medium,
            RiskArg::High => MaxRisk::High,
        }
    }
}

impl RecommendationsArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.top_n, self.max_risk.into(), self.min_confidence, None)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Some(Command::Recommendations(rec_args)) => {
            let gateway = RecommendationGateway::from_settings(settings);
            recommendations(&gateway, &rec_args, &mut std::io::stdout()).await
        }
        Some(Command::Iceberg { symbol }) => {
            let proxy = DiagnosticProxy::from_settings(settings);
            iceberg(&proxy, &symbol, &mut std::io::stdout()).await
        }
        Some(Command::Arbitrage { exchanges }) => {
            let monitor = HttpArbitrageMonitor::from_settings(&settings)?;
            arbitrage(Arc::new(monitor), exchanges, &mut Output::stdout()).await
        }
        None => {
            Args::command().print_help()?;
            Ok(())
        }
    }
}

async fn recommendations(
    gateway: &RecommendationGateway,
    args: &RecommendationsArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    writeln!(out, "Fetching recommendations...")?;

    let result = gateway.get_recommendations(&args.criteria()).await;

    if result.mode == Some(Mode::Demo) {
        if let Some(message) = &result.message {
            eprintln!("{message}");
        }
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&result.recommendations)?)?;
    Ok(())
}

async fn iceberg(proxy: &DiagnosticProxy, symbol: &str, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Detecting iceberg orders for {symbol}...")?;

    match proxy.run_diagnostic(symbol).await {
        DiagnosticOutcome::Ok { output } => {
            writeln!(out, "{output}")?;
            Ok(())
        }
        DiagnosticOutcome::Error { message } => anyhow::bail!(message),
    }
}

async fn arbitrage(
    monitor: Arc<dyn ArbitrageMonitor>,
    exchanges: Vec<String>,
    out: &mut Output,
) -> anyhow::Result<()> {
    out.emit(format!(
        "Checking for arbitrage opportunities on {}...",
        exchanges.join(", ")
    ));

    // Output goes straight to the caller's channel; this path is not captured.
    ArbitrageRun { monitor, exchanges }.run(out).await
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptobot_core::gateway::diagnostic::NOT_CONFIGURED_MESSAGE;
    use cryptobot_core::upstream::{AnalyticsPipeline, Detector, PipelineOutput};
    use serde_json::{json, Value};

    struct DownPipeline;

    #[async_trait::async_trait]
    impl AnalyticsPipeline for DownPipeline {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn run_pipeline(&self) -> anyhow::Result<PipelineOutput> {
            anyhow::bail!("connection refused")
        }
    }

    struct LivePipeline;

    #[async_trait::async_trait]
    impl AnalyticsPipeline for LivePipeline {
        fn name(&self) -> &'static str {
            "live"
        }

        async fn run_pipeline(&self) -> anyhow::Result<PipelineOutput> {
            Ok(PipelineOutput::new(vec![
                json!({"symbol": "AVAX", "name": "Avalanche", "risk_level": "High", "confidence": 0.9}),
                json!({"symbol": "LINK", "name": "Chainlink", "risk_level": "Low", "confidence": 0.6}),
            ]))
        }
    }

    struct EchoDetector;

    #[async_trait::async_trait]
    impl Detector for EchoDetector {
        async fn detect(&self, symbol: &str, out: &mut Output) -> anyhow::Result<()> {
            out.emit(format!("{symbol}: no hidden liquidity"));
            Ok(())
        }
    }

    struct EchoMonitor;

    #[async_trait::async_trait]
    impl ArbitrageMonitor for EchoMonitor {
        async fn watch(&self, exchanges: &[String], out: &mut Output) -> anyhow::Result<()> {
            out.emit(format!("spread {}: 0.2%", exchanges.join("/")));
            Ok(())
        }
    }

    fn gateway_with(pipeline: impl AnalyticsPipeline + 'static) -> RecommendationGateway {
        let pipeline: Arc<dyn AnalyticsPipeline> = Arc::new(pipeline);
        RecommendationGateway::new(Arc::new(move || -> anyhow::Result<Arc<dyn AnalyticsPipeline>> {
            Ok(Arc::clone(&pipeline))
        }))
    }

    fn rec_args(argv: &[&str]) -> RecommendationsArgs {
        let Some(Command::Recommendations(args)) = parse(argv).command else {
            panic!("expected recommendations");
        };
        args
    }

    /// Runs the recommendations command and returns the printed symbols.
    async fn printed_symbols(gateway: &RecommendationGateway, argv: &[&str]) -> Vec<String> {
        let mut buf = Vec::new();
        recommendations(gateway, &rec_args(argv), &mut buf).await.unwrap();
        let text = String::from_utf8(buf).unwrap();
        let (header, body) = text.split_once('\n').unwrap();
        assert_eq!(header, "Fetching recommendations...");
        let records: Value = serde_json::from_str(body).unwrap();
        records
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["symbol"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn recommendations_print_demo_data_when_upstream_is_down() {
        let gateway = gateway_with(DownPipeline);
        assert_eq!(
            printed_symbols(&gateway, &["cryptobot", "recommendations"]).await,
            vec!["BTC", "ETH", "SOL"]
        );
        assert_eq!(
            printed_symbols(
                &gateway,
                &["cryptobot", "recommendations", "--top-n", "2", "--max-risk", "Medium"]
            )
            .await,
            vec!["BTC", "ETH"]
        );
    }

    #[tokio::test]
    async fn recommendations_print_filtered_live_data() {
        let gateway = gateway_with(LivePipeline);
        assert_eq!(
            printed_symbols(&gateway, &["cryptobot", "recommendations", "--max-risk", "Low"]).await,
            vec!["LINK"]
        );
    }

    #[tokio::test]
    async fn iceberg_without_credentials_fails_with_remediation() {
        let proxy = DiagnosticProxy::new(Arc::new(|| -> anyhow::Result<Arc<dyn Detector>> {
            anyhow::bail!("BINANCE_API_KEY is required")
        }));
        let mut buf = Vec::new();
        let err = iceberg(&proxy, "BTCUSDT", &mut buf).await.unwrap_err();
        assert_eq!(err.to_string(), NOT_CONFIGURED_MESSAGE);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Detecting iceberg orders for BTCUSDT...\n"
        );
    }

    #[tokio::test]
    async fn iceberg_prints_detector_output() {
        let detector: Arc<dyn Detector> = Arc::new(EchoDetector);
        let proxy = DiagnosticProxy::new(Arc::new(move || -> anyhow::Result<Arc<dyn Detector>> {
            Ok(Arc::clone(&detector))
        }));
        let mut buf = Vec::new();
        iceberg(&proxy, "ETHUSDT", &mut buf).await.unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Detecting iceberg orders for ETHUSDT...\nETHUSDT: no hidden liquidity\n"
        );
    }

    #[tokio::test]
    async fn arbitrage_writes_monitor_output_to_channel() {
        let mut out = Output::capture();
        arbitrage(
            Arc::new(EchoMonitor),
            vec!["binance".into(), "kraken".into()],
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(
            out.into_captured(),
            "Checking for arbitrage opportunities on binance, kraken...\nspread binance/kraken: 0.2%\n"
        );
    }

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn recommendations_defaults() {
        let Some(Command::Recommendations(args)) = parse(&["cryptobot", "recommendations"]).command
        else {
            panic!("expected recommendations");
        };
        assert_eq!(args.criteria(), FilterCriteria::default());
    }

    #[test]
    fn recommendations_flags_build_clamped_criteria() {
        let Some(Command::Recommendations(args)) = parse(&[
            "cryptobot",
            "recommendations",
            "--top_n",
            "0",
            "--max-risk",
            "Medium",
            "--min-confidence",
            "0.8",
        ])
        .command
        else {
            panic!("expected recommendations");
        };
        let c = args.criteria();
        assert_eq!(c.top_n(), 1);
        assert_eq!(c.max_risk(), MaxRisk::Medium);
        assert_eq!(c.min_confidence(), 0.8);
        assert_eq!(c.symbol(), None);
    }

    #[test]
    fn unknown_risk_label_is_rejected() {
        assert!(Args::try_parse_from(["cryptobot", "recommendations", "--max-risk", "Extreme"]).is_err());
        assert!(Args::try_parse_from(["cryptobot", "recommendations", "--top-n", "many"]).is_err());
    }

    #[test]
    fn iceberg_and_arbitrage_defaults() {
        let Some(Command::Iceberg { symbol }) = parse(&["cryptobot", "iceberg"]).command else {
            panic!("expected iceberg");
        };
        assert_eq!(symbol, "BTCUSDT");

        let Some(Command::Arbitrage { exchanges }) = parse(&["cryptobot", "arbitrage"]).command else {
            panic!("expected arbitrage");
        };
        assert_eq!(exchanges, vec!["binance", "kraken"]);

        let Some(Command::Arbitrage { exchanges }) =
            parse(&["cryptobot", "arbitrage", "--exchanges", "coinbase", "kraken", "bitstamp"]).command
        else {
            panic!("expected arbitrage");
        };
        assert_eq!(exchanges, vec!["coinbase", "kraken", "bitstamp"]);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
