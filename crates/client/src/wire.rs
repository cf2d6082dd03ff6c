//! Request and response bodies exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracity_core::{ChartType, PublicDataset, Record, SortOrder, UserFile, VisualizationResult};

// ── Requests ──────────────────────────────────────────────────

/// Query string for `GET /visualize/{collection}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualizeQuery {
    pub states: Vec<String>,
    pub years: Vec<i32>,
    /// `None` accepts the server default.
    pub limit: Option<u32>,
}

impl VisualizeQuery {
    /// Comma-joined query pairs; empty parts are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.states.is_empty() {
            pairs.push(("states", self.states.join(",")));
        }
        if !self.years.is_empty() {
            let years: Vec<String> = self.years.iter().map(|y| y.to_string()).collect();
            pairs.push(("years", years.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Body of `POST /data/filtered`. Empty selections travel as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterRequest {
    pub collection: String,
    pub states: Option<Vec<String>>,
    pub years: Option<Vec<i32>>,
    pub crime_types: Option<Vec<String>>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub limit: u32,
}

/// Body of `POST /insights/enhanced`: the filter plus the chart the user
/// is looking at, so the text can reference it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedInsightRequest {
    #[serde(flatten)]
    pub filter: FilterRequest,
    pub chart_type: ChartType,
}

/// Body of `POST /user/data/filtered/{file_id}`. Never carries category facets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFilterRequest {
    pub file_id: String,
    /// Mirrors `file_id`; the backend validates user and public filters
    /// against one schema that requires a collection.
    pub collection: String,
    pub states: Option<Vec<String>>,
    pub years: Option<Vec<i32>>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub limit: u32,
}

/// Scoring context for `POST /user/insights/{file_id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInsightRequest {
    pub chart_type: ChartType,
    pub filename: String,
    pub record_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub captcha_answer: i64,
}

// ── Responses ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Captcha {
    pub question: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: String,
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub record_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartRecommendations {
    pub recommended: Option<String>,
}

/// Shape shared by `/visualize`, `/data/filtered` and `/user/data/filtered`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisualizationBody {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub chart_recommendations: Option<ChartRecommendations>,
    pub total_count: Option<u64>,
    pub returned_count: Option<u64>,
}

impl VisualizationBody {
    /// Convert into the domain result; `chart_override` replaces the
    /// remote recommendation (user files keep the user's chart).
    pub fn into_result(self, chart_override: Option<ChartType>) -> VisualizationResult {
        let recommended = chart_override.unwrap_or_else(|| {
            ChartType::from_recommendation(
                self.chart_recommendations
                    .as_ref()
                    .and_then(|r| r.recommended.as_deref()),
            )
        });
        VisualizationResult {
            rows: self.data,
            recommended_chart_type: recommended,
            total_count: self.total_count,
            returned_count: self.returned_count,
        }
    }
}

impl From<VisualizationBody> for VisualizationResult {
    fn from(body: VisualizationBody) -> Self {
        body.into_result(None)
    }
}

/// `GET /user/data/{file_id}`: every row of an uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserFileData {
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub record_count: u64,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_type: Option<String>,
}

impl UserFileData {
    /// Rows shown with the bar chart and the file's record count as both totals.
    pub fn to_visualization(&self) -> VisualizationResult {
        VisualizationResult {
            rows: self.data.clone(),
            recommended_chart_type: ChartType::Bar,
            total_count: Some(self.record_count),
            returned_count: Some(self.record_count),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilesBody {
    #[serde(default)]
    pub files: Vec<UserFile>,
}

/// The dataset list is a bare JSON array.
pub type DatasetsBody = Vec<PublicDataset>;

/// FastAPI error body. `detail` is a string for handled errors and a
/// list of objects for schema validation failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn opt_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(tracity_core::source::timestamp::parse))
}
