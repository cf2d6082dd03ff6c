//! Request Composer: turns (active source, filter state) into remote
//! calls and issues them in the order each protocol needs.
//!
//! The composer never touches explorer state. It returns raw outcomes so
//! the caller can drop them when they arrive stale.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use tracity_client::wire::{
    EnhancedInsightRequest, FilterRequest, UserFileData, UserFilterRequest, UserInsightRequest,
    VisualizeQuery,
};
use tracity_client::{ApiError, Backend};
use tracity_core::config::LimitsConfig;
use tracity_core::{Breadth, ChartType, FilterState, VisualizationResult};

use crate::session::SessionContext;

/// Row limits per breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLimits {
    pub unfiltered_full: u32,
    pub filtered_narrow: u32,
    pub filtered_full: u32,
}

impl RowLimits {
    /// Unfiltered fetches omit the limit when narrow so the server
    /// default applies.
    pub fn unfiltered(&self, breadth: Breadth) -> Option<u32> {
        match breadth {
            Breadth::Narrow => None,
            Breadth::Full => Some(self.unfiltered_full),
        }
    }

    pub fn filtered(&self, breadth: Breadth) -> u32 {
        match breadth {
            Breadth::Narrow => self.filtered_narrow,
            Breadth::Full => self.filtered_full,
        }
    }
}

impl From<&LimitsConfig> for RowLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            unfiltered_full: config.unfiltered_full,
            filtered_narrow: config.filtered_narrow,
            filtered_full: config.filtered_full,
        }
    }
}

impl Default for RowLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

fn nullable<T: Clone>(set: &IndexSet<T>) -> Option<Vec<T>> {
    if set.is_empty() {
        None
    } else {
        Some(set.iter().cloned().collect())
    }
}

// ── Request builders ──────────────────────────────────────────

pub fn visualize_query(filter: &FilterState, limits: &RowLimits) -> VisualizeQuery {
    VisualizeQuery {
        states: Vec::new(),
        years: Vec::new(),
        limit: limits.unfiltered(filter.breadth),
    }
}

pub fn public_filter(collection: &str, filter: &FilterState, limits: &RowLimits) -> FilterRequest {
    FilterRequest {
        collection: collection.to_string(),
        states: nullable(&filter.selected_states),
        years: nullable(&filter.selected_years),
        crime_types: nullable(&filter.selected_categories),
        sort_by: filter.sort_key().map(str::to_string),
        sort_order: filter.sort_order,
        limit: limits.filtered(filter.breadth),
    }
}

pub fn enhanced(filter: FilterRequest, chart_type: ChartType) -> EnhancedInsightRequest {
    EnhancedInsightRequest { filter, chart_type }
}

pub fn user_filter(file_id: &str, filter: &FilterState, limits: &RowLimits) -> UserFilterRequest {
    UserFilterRequest {
        file_id: file_id.to_string(),
        collection: file_id.to_string(),
        states: nullable(&filter.selected_states),
        years: nullable(&filter.selected_years),
        sort_by: filter.sort_key().map(str::to_string),
        sort_order: filter.sort_order,
        limit: limits.filtered(filter.breadth),
    }
}

pub fn user_insight(data: &UserFileData, chart_type: ChartType) -> UserInsightRequest {
    UserInsightRequest {
        chart_type,
        filename: data.filename.clone(),
        record_count: data.record_count,
    }
}

// ── Protocols ─────────────────────────────────────────────────

/// Outcome of a filtered public fetch. `insights` is `None` when the
/// filter call failed and the insight call was never issued.
#[derive(Debug)]
pub struct FilteredFetch {
    pub visualization: Result<VisualizationResult, ApiError>,
    pub insights: Option<Result<Value, ApiError>>,
}

/// Outcome of opening a user file.
#[derive(Debug)]
pub struct UserFetch {
    pub data: Result<UserFileData, ApiError>,
    pub insights: Option<Result<Value, ApiError>>,
}

pub struct Composer<'a> {
    backend: &'a dyn Backend,
    session: &'a SessionContext,
    limits: RowLimits,
}

impl<'a> Composer<'a> {
    pub fn new(backend: &'a dyn Backend, session: &'a SessionContext, limits: RowLimits) -> Self {
        Self {
            backend,
            session,
            limits,
        }
    }

    /// Visualization and insights are independent; issue both at once.
    pub async fn public_unfiltered(
        &self,
        collection: &str,
        filter: &FilterState,
    ) -> (Result<VisualizationResult, ApiError>, Result<Value, ApiError>) {
        let query = visualize_query(filter, &self.limits);
        debug!(collection, limit = ?query.limit, "Fetching visualization and insights");
        tokio::join!(
            self.backend.visualize(collection, &query),
            self.backend.insights(collection),
        )
    }

    /// Filter first; the insight request then carries the same payload
    /// plus the chart in view.
    pub async fn public_filtered(
        &self,
        collection: &str,
        filter: &FilterState,
        chart_type: ChartType,
    ) -> FilteredFetch {
        let request = public_filter(collection, filter, &self.limits);
        debug!(collection, limit = request.limit, "Fetching filtered data");
        let visualization = self.backend.filtered_data(&request).await;
        if visualization.is_err() {
            return FilteredFetch {
                visualization,
                insights: None,
            };
        }
        let insights = self
            .backend
            .enhanced_insights(&enhanced(request, chart_type))
            .await;
        FilteredFetch {
            visualization,
            insights: Some(insights),
        }
    }

    /// Rows first; insights only once the rows arrived, scored with the
    /// file's name and size.
    pub async fn user_unfiltered(&self, file_id: &str, chart_type: ChartType) -> UserFetch {
        let auth = self.session.auth_headers();
        debug!(file_id, "Fetching user file rows");
        let data = self.backend.user_data(&auth, file_id).await;
        let insights = match &data {
            Ok(data) => Some(
                self.backend
                    .user_insights(&auth, file_id, &user_insight(data, chart_type))
                    .await,
            ),
            Err(_) => None,
        };
        UserFetch { data, insights }
    }

    pub async fn user_filtered(
        &self,
        file_id: &str,
        filter: &FilterState,
    ) -> Result<VisualizationResult, ApiError> {
        let request = user_filter(file_id, filter, &self.limits);
        debug!(file_id, limit = request.limit, "Fetching filtered user data");
        self.backend
            .user_filtered_data(&self.session.auth_headers(), &request)
            .await
    }
}
