use serde::{Deserialize, Serialize};

/// Canonical insight record the render layer consumes, whether it came
/// from the insight service or was synthesized locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub summary: String,
    pub chart_type: String,
    pub trend: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub comparison_insights: Option<String>,
    pub temporal_analysis: Option<String>,
    pub anomalies: Vec<String>,
    pub sample_size: Option<u64>,
}

impl InsightResult {
    pub const DEFAULT_TREND: &'static str = "Stable";

    /// A result carrying only summary text.
    pub fn summary_only(summary: impl Into<String>, chart_type: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            chart_type: chart_type.into(),
            trend: Self::DEFAULT_TREND.to_string(),
            key_findings: Vec::new(),
            recommendations: Vec::new(),
            comparison_insights: None,
            temporal_analysis: None,
            anomalies: Vec::new(),
            sample_size: None,
        }
    }
}
