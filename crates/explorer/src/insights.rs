//! Insight Reconciler: maps every insight payload the backend produces
//! onto one [`InsightResult`], and synthesizes one locally when the
//! insight service is unavailable.
//!
//! Known wire shapes:
//! - a bare string
//! - `{ "insights": "...", ... }`
//! - `{ "insights": { "insight": ..., "key_findings": [...], ... }, "sample_size" | "analyzed_sample": n }`
//!
//! The filtered-data variant is the last one without `sample_size`.
//! Anything else is rejected with [`ReconcileError::UnknownShape`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use tracity_core::{ChartType, InsightResult};

use crate::error::ReconcileError;
use crate::templating::{self, FileFacts, TemplateRenderer};

pub const UNAVAILABLE: &str = "Unable to load insights at this time.";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireInsight {
    Text(String),
    Envelope(Envelope),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    insights: EnvelopeBody,
    #[serde(default)]
    sample_size: Option<u64>,
    #[serde(default)]
    analyzed_sample: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvelopeBody {
    Text(String),
    Body(Body),
}

#[derive(Debug, Default, Deserialize)]
struct Body {
    #[serde(default)]
    insight: Option<String>,
    #[serde(default)]
    chart_type: Option<String>,
    #[serde(default)]
    trend: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    key_findings: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    recommendations: Vec<String>,
    #[serde(default)]
    comparison_insights: Option<TextOrList>,
    #[serde(default, deserialize_with = "null_default")]
    state_comparisons: Vec<String>,
    #[serde(default)]
    temporal_analysis: Option<TextOrList>,
    #[serde(default, deserialize_with = "null_default")]
    anomalies: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    anomaly_detection: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    fn joined(self) -> Option<String> {
        let text = match self {
            TextOrList::Text(s) => s,
            TextOrList::List(items) => items.join(" "),
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn joined(items: Vec<String>) -> Option<String> {
    (!items.is_empty()).then(|| items.join(" "))
}

/// Normalize a raw insight payload. `selected` fills in a missing chart type.
pub fn normalize(raw: &Value, selected: ChartType) -> Result<InsightResult, ReconcileError> {
    let wire = WireInsight::deserialize(raw).map_err(|_| ReconcileError::UnknownShape(describe(raw)))?;

    match wire {
        WireInsight::Text(text) => Ok(InsightResult::summary_only(text, selected.as_str())),
        WireInsight::Envelope(Envelope {
            insights,
            sample_size,
            analyzed_sample,
        }) => {
            let sample_size = sample_size.or(analyzed_sample);
            let mut result = match insights {
                EnvelopeBody::Text(text) => InsightResult::summary_only(text, selected.as_str()),
                EnvelopeBody::Body(body) => from_body(body, selected),
            };
            result.sample_size = sample_size;
            Ok(result)
        }
    }
}

fn from_body(body: Body, selected: ChartType) -> InsightResult {
    let comparison_insights = body
        .comparison_insights
        .and_then(TextOrList::joined)
        .or_else(|| joined(body.state_comparisons));
    let anomalies = if body.anomalies.is_empty() {
        body.anomaly_detection
    } else {
        body.anomalies
    };

    InsightResult {
        summary: body.insight.unwrap_or_default(),
        chart_type: body
            .chart_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| selected.as_str().to_string()),
        trend: body
            .trend
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| InsightResult::DEFAULT_TREND.to_string()),
        key_findings: body.key_findings,
        recommendations: body.recommendations,
        comparison_insights,
        temporal_analysis: body.temporal_analysis.and_then(TextOrList::joined),
        anomalies,
        sample_size: None,
    }
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}

/// The fixed message shown when a public source's insights failed.
pub fn unavailable(selected: ChartType) -> InsightResult {
    InsightResult::summary_only(UNAVAILABLE, selected.as_str())
}

/// Deterministic insights for an uploaded file the insight service
/// could not score.
pub fn synthesize_for_file(facts: &FileFacts) -> Result<InsightResult, ReconcileError> {
    let renderer = TemplateRenderer::new();
    let own = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    Ok(InsightResult {
        summary: renderer.render(templating::SUMMARY, facts)?,
        chart_type: facts.chart_type.clone(),
        trend: InsightResult::DEFAULT_TREND.to_string(),
        key_findings: renderer.render_all(templating::KEY_FINDINGS, facts)?,
        recommendations: own(templating::RECOMMENDATIONS),
        comparison_insights: Some(templating::COMPARISONS.join(" ")),
        temporal_analysis: Some(templating::TEMPORAL.join(" ")),
        anomalies: own(templating::ANOMALIES),
        sample_size: None,
    })
}
