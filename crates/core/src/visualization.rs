use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One row as returned by the backend.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Doughnut,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [ChartType::Bar, ChartType::Line, ChartType::Pie, ChartType::Doughnut];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
        }
    }

    /// Map a remote recommendation onto a renderable type. Anything the
    /// renderer does not support (e.g. "scatter") falls back to bar.
    pub fn from_recommendation(raw: Option<&str>) -> Self {
        raw.and_then(|r| r.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "pie" => Ok(ChartType::Pie),
            "doughnut" => Ok(ChartType::Doughnut),
            other => Err(format!("unsupported chart type: {other}")),
        }
    }
}

/// Render-ready rows plus the chart the backend recommends for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationResult {
    pub rows: Vec<Record>,
    pub recommended_chart_type: ChartType,
    /// Present only for filtered/paginated responses.
    pub total_count: Option<u64>,
    pub returned_count: Option<u64>,
}

impl VisualizationResult {
    /// Empty-rows result shown when a fetch fails.
    pub fn fallback() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display label; without a total the source's own record count is shown.
    pub fn record_label(&self, source_record_count: u64) -> String {
        match self.total_count {
            Some(total) if total > 0 => format!(
                "{} of {} records",
                self.returned_count.unwrap_or(self.rows.len() as u64),
                total
            ),
            _ => format!("{} total records", source_record_count),
        }
    }
}
