//! Minijinja rendering of the locally synthesized insight text.
//!
//! Templates are fixed strings, so a fresh [`minijinja::Environment`] is
//! built per render call, the same way ad-hoc templates are rendered
//! elsewhere.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::error::ReconcileError;

/// Facts about an uploaded file available without the insight service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFacts {
    pub filename: String,
    pub record_count: u64,
    /// RFC 3339; rendered through the `short_date` filter.
    pub upload_date: Option<String>,
    pub file_type: Option<String>,
    pub chart_type: String,
}

impl FileFacts {
    pub fn new(
        filename: impl Into<String>,
        record_count: u64,
        upload_date: Option<DateTime<Utc>>,
        file_type: Option<String>,
        chart_type: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        let file_type = file_type.filter(|t| !t.is_empty()).or_else(|| {
            std::path::Path::new(&filename)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string)
        });
        Self {
            filename,
            record_count,
            upload_date: upload_date.map(|d| d.to_rfc3339()),
            file_type,
            chart_type: chart_type.into(),
        }
    }
}

pub const SUMMARY: &str = "Comprehensive analysis of your uploaded file \"{{ filename }}\" with {{ record_count }} records. The data has been processed and is ready for visualization with advanced filtering capabilities.";

pub const KEY_FINDINGS: &[&str] = &[
    "Dataset contains {{ record_count }} total records",
    "File uploaded on {{ upload_date | short_date }}",
    "Data type: {{ (file_type or 'unknown') | upper }}",
    "Data structure has been optimized for visualization",
    "Recommended chart type: {{ chart_type }}",
];

pub const RECOMMENDATIONS: &[&str] = &[
    "Explore different chart types (bar, line, pie, doughnut) to find optimal visualization",
    "Use state-of-the-art filtering options to focus on specific data segments",
    "Compare your data patterns with public datasets available",
    "Consider temporal analysis if your data contains time-based information",
];

pub const COMPARISONS: &[&str] = &[
    "Your uploaded data complements the existing public datasets",
    "Data can be cross-referenced with AQI, Crime, Literacy, and Power consumption datasets",
];

pub const TEMPORAL: &[&str] = &[
    "If time-based data is present, trends can be analyzed over different periods",
    "Seasonal patterns and anomalies can be detected through advanced analytics",
];

pub const ANOMALIES: &[&str] = &[
    "Statistical outliers are automatically identified during processing",
    "Unusual patterns are flagged for further investigation",
];

#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("short_date", short_date_filter);
        env
    }

    pub fn render(&self, template: &str, facts: &FileFacts) -> Result<String, ReconcileError> {
        Self::build_env()
            .render_str(template, facts)
            .map_err(|e| ReconcileError::Template(e.to_string()))
    }

    pub fn render_all(&self, templates: &[&str], facts: &FileFacts) -> Result<Vec<String>, ReconcileError> {
        templates.iter().map(|t| self.render(t, facts)).collect()
    }

    /// Check a template parses without evaluating it.
    pub fn validate(&self, template: &str) -> Result<(), ReconcileError> {
        let env = Self::build_env();
        env.template_from_str(template)
            .map_err(|e| ReconcileError::Template(e.to_string()))?;
        Ok(())
    }
}

/// `M/D/YYYY`; missing or unparseable dates render as "an unknown date".
fn short_date_filter(value: Option<String>) -> String {
    value
        .as_deref()
        .and_then(tracity_core::source::timestamp::parse)
        .map(|d| format!("{}/{}/{}", d.month(), d.day(), d.year()))
        .unwrap_or_else(|| "an unknown date".to_string())
}
