//! Pure transforms from an evaluation payload to the report dashboard model.

use serde::Serialize;
use serde_json::{Map, Value};
use shared::protocol::EvaluationPayload;

pub mod handoff;
pub mod opportunity;
pub mod render;

pub use handoff::{decode_report_data, encode_report_link, sample_payload, DecodeError};
pub use opportunity::{
    suggest_opportunity, suggest_with_rules, OpportunityCategory, OpportunityRule, DEFAULT_RULES,
};

/// Outer ring of the radar chart, independent of the scores achieved.
pub const RADAR_SCALE_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PerformanceTier {
    Exceptional,
    Excellent,
    Proficient,
    Developing,
    Emerging,
}

impl PerformanceTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Exceptional => "Exceptional",
            Self::Excellent => "Excellent",
            Self::Proficient => "Proficient",
            Self::Developing => "Developing",
            Self::Emerging => "Emerging",
        }
    }
}

/// Inclusive lower bounds, highest first. Everything below the last bound is
/// [`PerformanceTier::Emerging`].
pub const TIER_THRESHOLDS: [(f64, PerformanceTier); 4] = [
    (90.0, PerformanceTier::Exceptional),
    (80.0, PerformanceTier::Excellent),
    (70.0, PerformanceTier::Proficient),
    (60.0, PerformanceTier::Developing),
];

/// NaN and negative inputs fall through every threshold to `Emerging`.
pub fn classify(percentage: impl Into<f64>) -> PerformanceTier {
    let percentage = percentage.into();
    TIER_THRESHOLDS
        .iter()
        .find(|(lower_bound, _)| percentage >= *lower_bound)
        .map(|(_, tier)| *tier)
        .unwrap_or(PerformanceTier::Emerging)
}

/// `round(100 * total / max)` clamped into `0..=100`.
///
/// Returns 0 when either side is absent, `max` is zero, or the ratio is not
/// finite.
pub fn percentage(total: Option<f64>, max: Option<f64>) -> u8 {
    let (Some(total), Some(max)) = (total, max) else {
        return 0;
    };
    if max == 0.0 {
        return 0;
    }

    let value = (100.0 * total / max).round();
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, 100.0) as u8
}

/// Numeric reading of an untrusted JSON value.
///
/// Numbers pass through, numeric strings are parsed after trimming, booleans
/// read as 1 and 0. Everything else, including non-finite results, is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    number.filter(|n| n.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarPoint {
    pub category: String,
    pub value: f64,
    pub scale_max: f64,
}

/// One point per score category, in payload order.
///
/// A score that cannot be read as a number is reported as `0.0`; the series
/// never carries a non-numeric value.
pub fn to_radar_series(scores: &Map<String, Value>) -> Vec<RadarPoint> {
    scores
        .iter()
        .map(|(category, raw)| RadarPoint {
            category: category.clone(),
            value: coerce_number(raw).unwrap_or(0.0),
            scale_max: RADAR_SCALE_MAX,
        })
        .collect()
}

/// Coaching line per category score: inclusive lower bounds, highest first.
pub const INSIGHT_BANDS: [(f64, &str); 3] = [
    (75.0, "You are strong here — keep up the great work."),
    (50.0, "There is room to grow. Focused practice will help."),
    (30.0, "Consider dedicating regular time to improve this skill."),
];

pub const LOW_SCORE_INSIGHT: &str =
    "This area would benefit from attention; small steps yield big gains.";

pub fn category_insight(value: f64) -> &'static str {
    INSIGHT_BANDS
        .iter()
        .find(|(lower_bound, _)| value >= *lower_bound)
        .map(|(_, insight)| *insight)
        .unwrap_or(LOW_SCORE_INSIGHT)
}

/// Per-category card shown under the radar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCard {
    pub category: String,
    pub value: f64,
    pub tier: PerformanceTier,
    pub insight: &'static str,
}

/// Each radar point classified on its own, with the same tiers as the overall
/// percentage.
pub fn category_breakdown(series: &[RadarPoint]) -> Vec<CategoryCard> {
    series
        .iter()
        .map(|point| CategoryCard {
            category: point.category.clone(),
            value: point.value,
            tier: classify(point.value),
            insight: category_insight(point.value),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub evidence: String,
    pub category: OpportunityCategory,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportViewModel {
    pub total: f64,
    pub max: Option<f64>,
    pub percentage: u8,
    pub tier: PerformanceTier,
    pub radar_series: Vec<RadarPoint>,
    pub category_breakdown: Vec<CategoryCard>,
    pub opportunities: Vec<Opportunity>,
}

impl ReportViewModel {
    pub fn feedback_count(&self) -> usize {
        self.opportunities.len()
    }
}

pub fn build_report_view_model(payload: &EvaluationPayload) -> ReportViewModel {
    let total = payload.total.as_ref().and_then(coerce_number).unwrap_or(0.0);
    let max = payload.max.as_ref().and_then(coerce_number);
    let percentage = percentage(Some(total), max);

    let radar_series = payload
        .scores_map()
        .map(to_radar_series)
        .unwrap_or_default();
    let category_breakdown = category_breakdown(&radar_series);

    let opportunities = payload
        .feedback_items()
        .iter()
        .map(|item| {
            let (evidence, usable) = match item {
                Value::String(text) => (text.clone(), Some(text.as_str())),
                other => (other.to_string(), None),
            };
            let suggestion = suggest_with_rules(DEFAULT_RULES, usable);
            Opportunity {
                evidence,
                category: suggestion.category,
                suggestion: suggestion.text.to_string(),
            }
        })
        .collect();

    ReportViewModel {
        total,
        max,
        percentage,
        tier: classify(percentage),
        radar_series,
        category_breakdown,
        opportunities,
    }
}

/// State of the report stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportView {
    Ready(ReportViewModel),
    NoData { reason: Option<DecodeError> },
}

/// Builds the report stage from whatever the navigation boundary handed over.
///
/// Absent or undecodable data degrades to [`ReportView::NoData`].
pub fn load_report(raw: Option<&str>) -> ReportView {
    let Some(raw) = raw else {
        return ReportView::NoData { reason: None };
    };

    match decode_report_data(raw) {
        Ok(payload) => ReportView::Ready(build_report_view_model(&payload)),
        Err(error) => {
            tracing::warn!(%error, "failed to decode evaluation hand-off data");
            ReportView::NoData {
                reason: Some(error),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
