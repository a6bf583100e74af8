use crate::domain::criteria::{clamp_top_n, FilterCriteria};
use crate::domain::recommendation::{RecommendationRecord, RiskLevel};

/// Reduces `records` to those satisfying `criteria`, preserving input order.
///
/// Confidence is normalized before it is compared; truncation to `top_n` runs last.
pub fn apply(records: Vec<RecommendationRecord>, criteria: &FilterCriteria) -> Vec<RecommendationRecord> {
    let symbol = criteria.symbol().map(str::to_uppercase);
    let ceiling = criteria.max_risk().ceiling();
    let top_n = clamp_top_n(criteria.top_n() as i64);

    records
        .into_iter()
        .map(normalize)
        .filter(|r| match &symbol {
            Some(sym) => r.symbol.to_uppercase() == *sym,
            None => true,
        })
        .filter(|r| r.confidence >= criteria.min_confidence())
        .filter(|r| match ceiling {
            // Unrecognized labels never pass an explicit ceiling.
            Some(max) => RiskLevel::from_label(&r.risk_level)
                .is_some_and(|risk| risk.ordinal() <= max.ordinal()),
            None => true,
        })
        .take(top_n)
        .collect()
}

fn normalize(mut record: RecommendationRecord) -> RecommendationRecord {
    if !record.confidence.is_finite() {
        record.confidence = 0.0;
    }
    record
}
