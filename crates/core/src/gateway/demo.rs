use crate::domain::recommendation::{Metrics, RecommendationRecord};

pub const DEMO_MODE_MESSAGE: &str =
    "Running in demo mode – live APIs / credentials are not configured on this server.";

/// Fixed substitute dataset served whenever the live pipeline is unavailable.
pub fn demo_recommendations() -> Vec<RecommendationRecord> {
    vec![
        demo("BTC", "Bitcoin", "STRONG BUY", "Medium", 0.91, 68000.0, 2.35),
        demo("ETH", "Ethereum", "BUY", "Medium", 0.83, 3400.0, 1.12),
        demo("SOL", "Solana", "MODERATE BUY", "High", 0.74, 150.0, 4.8),
    ]
}

fn demo(
    symbol: &str,
    name: &str,
    call: &str,
    risk: &str,
    confidence: f64,
    price: f64,
    percent_change_24h: f64,
) -> RecommendationRecord {
    RecommendationRecord {
        symbol: symbol.to_string(),
        name: name.to_string(),
        recommendation: call.to_string(),
        risk_level: risk.to_string(),
        potential: "High".to_string(),
        confidence,
        metrics: Some(Metrics {
            price,
            percent_change_24h,
        }),
    }
}
