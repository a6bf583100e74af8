use crate::domain::recommendation::MaxRisk;

pub const DEFAULT_TOP_N: i64 = 5;
pub const MIN_TOP_N: usize = 1;
pub const MAX_TOP_N: usize = 20;

/// Caller constraints for one request. Built once at the surface boundary and
/// read-only afterwards; `top_n` is always within `MIN_TOP_N..=MAX_TOP_N`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    top_n: usize,
    max_risk: MaxRisk,
    min_confidence: f64,
    symbol: Option<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N, MaxRisk::Any, 0.0, None)
    }
}

impl FilterCriteria {
    pub fn new(top_n: i64, max_risk: MaxRisk, min_confidence: f64, symbol: Option<String>) -> Self {
        Self {
            top_n: clamp_top_n(top_n),
            max_risk,
            min_confidence,
            symbol: symbol.filter(|s| !s.is_empty()),
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn max_risk(&self) -> MaxRisk {
        self.max_risk
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }
}

pub fn clamp_top_n(top_n: i64) -> usize {
    top_n.clamp(MIN_TOP_N as i64, MAX_TOP_N as i64) as usize
}
