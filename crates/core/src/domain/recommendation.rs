use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub symbol: String,
    pub name: String,
    pub recommendation: String,
    pub risk_level: String,
    pub potential: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub price: f64,
    pub percent_change_24h: f64,
}

/// Risk buckets in their fixed total order (Low < Medium < High).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn ordinal(self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
        }
    }

    /// Title-cases the label before matching, so "medium" and "MEDIUM" both map to
    /// `Medium`. Anything else (including padded labels) is unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        match title_case(label).as_str() {
            "Low" => Some(RiskLevel::Low),
            "Medium" => Some(RiskLevel::Medium),
            "High" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

/// Upper bound accepted by the risk filter. `Any` disables the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaxRisk {
    #[default]
    Any,
    Low,
    Medium,
    High,
}

impl MaxRisk {
    pub const LABELS: [&'static str; 4] = ["Any", "Low", "Medium", "High"];

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Any" => Some(MaxRisk::Any),
            "Low" => Some(MaxRisk::Low),
            "Medium" => Some(MaxRisk::Medium),
            "High" => Some(MaxRisk::High),
            _ => None,
        }
    }

    pub fn ceiling(self) -> Option<RiskLevel> {
        match self {
            MaxRisk::Any => None,
            MaxRisk::Low => Some(RiskLevel::Low),
            MaxRisk::Medium => Some(RiskLevel::Medium),
            MaxRisk::High => Some(RiskLevel::High),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recommendations: Vec<RecommendationRecord>,
}

impl PipelineResult {
    pub fn live(recommendations: Vec<RecommendationRecord>) -> Self {
        Self {
            status: Status::Ok,
            mode: Some(Mode::Live),
            message: None,
            recommendations,
        }
    }

    pub fn demo(message: impl Into<String>, recommendations: Vec<RecommendationRecord>) -> Self {
        Self {
            status: Status::Ok,
            mode: Some(Mode::Demo),
            message: Some(message.into()),
            recommendations,
        }
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(c);
            prev_is_alpha = false;
        }
    }
    out
}
