//! The orchestrator state machine.
//!
//! Every response is applied only if the `Ticket` captured at dispatch
//! still matches the state: `source_epoch` moves on every source switch,
//! `generation` on every composed fetch. Late responses are dropped, not
//! cancelled.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use tracity_client::wire::{Captcha, UploadReceipt};
use tracity_client::{ApiError, Backend};
use tracity_core::config::LimitsConfig;
use tracity_core::{
    Breadth, ChartType, DataSource, Dimension, Facet, FilterState, InsightResult, Metadata,
    PlatformStats, Record, SortOrder, SourceKind, UploadFile, VisualizationResult,
};

use crate::catalog::{self, DataSourceCatalog};
use crate::composer::{Composer, RowLimits};
use crate::error::ExplorerError;
use crate::insights;
use crate::metadata;
use crate::session::{Identity, SessionContext};
use crate::templating::FileFacts;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// How an orchestrator operation settled. The state already holds a
/// success or fallback value when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// Every call succeeded.
    Ready,
    /// At least one call failed and fallback content was applied.
    Degraded,
    /// A newer selection superseded this one; nothing was applied.
    Stale,
    /// A user-scoped call had no valid credential.
    LoginRequired,
    /// There was nothing to do (no active source).
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    source_epoch: u64,
    generation: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExplorerState {
    pub catalog: DataSourceCatalog,
    pub active: Option<DataSource>,
    pub metadata: Option<Metadata>,
    pub metadata_phase: FetchPhase,
    pub filter: FilterState,
    pub visualization: Option<VisualizationResult>,
    pub insights: Option<InsightResult>,
    pub data_phase: FetchPhase,
    pub chart_type: ChartType,
    #[serde(skip)]
    source_epoch: u64,
    #[serde(skip)]
    generation: u64,
}

/// What the chart component consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderModel {
    pub source: Option<DataSource>,
    pub phase: FetchPhase,
    pub chart_type: ChartType,
    pub year_separated: bool,
    pub rows: Vec<Record>,
    pub record_label: Option<String>,
    pub insights: Option<InsightResult>,
}

impl ExplorerState {
    fn ticket(&self) -> Ticket {
        Ticket {
            source_epoch: self.source_epoch,
            generation: self.generation,
        }
    }

    fn is_current_source(&self, ticket: Ticket) -> bool {
        self.source_epoch == ticket.source_epoch
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.ticket() == ticket
    }

    /// Forget everything about the previous source and make `source` active.
    fn activate(&mut self, source: DataSource) -> Ticket {
        self.filter.clear_all();
        self.metadata = None;
        self.visualization = None;
        self.insights = None;
        self.active = Some(source);
        self.metadata_phase = FetchPhase::Loading;
        self.data_phase = FetchPhase::Idle;
        self.source_epoch += 1;
        self.generation += 1;
        self.ticket()
    }

    fn deactivate(&mut self) {
        self.filter.clear_all();
        self.metadata = None;
        self.visualization = None;
        self.insights = None;
        self.active = None;
        self.metadata_phase = FetchPhase::Idle;
        self.data_phase = FetchPhase::Idle;
        self.source_epoch += 1;
        self.generation += 1;
    }

    /// Selections are emptied and results dropped before the new
    /// metadata becomes visible.
    fn publish_metadata(&mut self, metadata: Metadata) {
        self.filter.clear_selections();
        self.visualization = None;
        self.insights = None;
        self.metadata = Some(metadata);
        self.metadata_phase = FetchPhase::Ready;
    }

    /// Clear results synchronously and stamp a new generation.
    fn dispatch(&mut self) -> Option<Dispatch> {
        let source = self.active.clone()?;
        let prior_insights = self.insights.take();
        self.visualization = None;
        self.data_phase = FetchPhase::Loading;
        self.generation += 1;
        Some(Dispatch {
            ticket: self.ticket(),
            source,
            filter: self.filter.clone(),
            chart_type: self.chart_type,
            prior_insights,
        })
    }

    pub fn render_model(&self) -> RenderModel {
        let record_label = match (&self.visualization, &self.active) {
            (Some(viz), Some(source)) => Some(viz.record_label(self.catalog.record_count(source))),
            _ => None,
        };
        RenderModel {
            source: self.active.clone(),
            phase: self.data_phase,
            chart_type: self.chart_type,
            year_separated: self.filter.year_separated,
            rows: self
                .visualization
                .as_ref()
                .map(|v| v.rows.clone())
                .unwrap_or_default(),
            record_label,
            insights: self.insights.clone(),
        }
    }
}

struct Dispatch {
    ticket: Ticket,
    source: DataSource,
    filter: FilterState,
    chart_type: ChartType,
    prior_insights: Option<InsightResult>,
}

#[derive(Debug, Default)]
struct Outcome {
    degraded: bool,
    login_required: bool,
}

impl Outcome {
    fn record(&mut self, e: &ApiError) {
        if e.requires_login() {
            self.login_required = true;
        } else {
            self.degraded = true;
        }
    }

    fn settled(&self) -> Settled {
        if self.login_required {
            Settled::LoginRequired
        } else if self.degraded {
            Settled::Degraded
        } else {
            Settled::Ready
        }
    }
}

/// Normalized insights, or `None` (logged) when the call or the payload failed.
fn reconcile(raw: Result<Value, ApiError>, chart_type: ChartType, outcome: &mut Outcome) -> Option<InsightResult> {
    match raw {
        Ok(value) => match insights::normalize(&value, chart_type) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(error = %e, "Discarding insight payload");
                outcome.degraded = true;
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "Insight fetch failed");
            outcome.record(&e);
            None
        }
    }
}

pub struct Explorer {
    backend: Arc<dyn Backend>,
    session: Arc<SessionContext>,
    limits: RowLimits,
    upload_max_bytes: u64,
    state: RwLock<ExplorerState>,
}

impl Explorer {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionContext>, limits: &LimitsConfig) -> Self {
        Self {
            backend,
            session,
            limits: RowLimits::from(limits),
            upload_max_bytes: limits.upload_max_bytes,
            state: RwLock::new(ExplorerState::default()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn composer(&self) -> Composer<'_> {
        Composer::new(self.backend.as_ref(), &self.session, self.limits)
    }

    pub async fn snapshot(&self) -> ExplorerState {
        self.state.read().await.clone()
    }

    pub async fn render_model(&self) -> RenderModel {
        self.state.read().await.render_model()
    }

    // ── Catalog ───────────────────────────────────────────────

    /// Fetch the public datasets and (when signed in) the user's files.
    pub async fn refresh_catalog(&self) -> Settled {
        let (datasets, files) = tokio::join!(
            catalog::fetch_datasets(self.backend.as_ref()),
            catalog::fetch_user_files(self.backend.as_ref(), &self.session),
        );

        let mut outcome = Outcome::default();
        let datasets = datasets.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch datasets");
            outcome.degraded = true;
            Vec::new()
        });
        let user_files = files.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch user files");
            Vec::new()
        });

        self.state.write().await.catalog = DataSourceCatalog { datasets, user_files };
        outcome.settled()
    }

    /// Initial load: refresh the catalog and activate the first dataset.
    pub async fn load_catalog(&self) -> Settled {
        let refreshed = self.refresh_catalog().await;
        let first = self.state.read().await.catalog.first_dataset();
        match first {
            Some(source) => match self.select_source(source).await {
                Settled::Ready => refreshed,
                other => other,
            },
            None if refreshed == Settled::Ready => Settled::Idle,
            None => refreshed,
        }
    }

    pub async fn refresh_user_files(&self) -> Settled {
        match catalog::fetch_user_files(self.backend.as_ref(), &self.session).await {
            Ok(files) => {
                self.state.write().await.catalog.user_files = files;
                Settled::Ready
            }
            Err(e) => {
                warn!(error = %e, "User file list rejected");
                self.state.write().await.catalog.user_files.clear();
                Settled::LoginRequired
            }
        }
    }

    pub async fn stats(&self) -> PlatformStats {
        catalog::fetch_stats(self.backend.as_ref()).await
    }

    /// Activate a catalog entry by id. `None` when the catalog has no such entry.
    pub async fn select_by_id(&self, kind: SourceKind, id: &str) -> Option<Settled> {
        let source = {
            let st = self.state.read().await;
            match kind {
                SourceKind::Public => st.catalog.find_dataset(id),
                SourceKind::User => st.catalog.find_file(id),
            }
        }?;
        Some(self.select_source(source).await)
    }

    // ── Source switching ──────────────────────────────────────

    /// Clear, activate, resolve metadata, then fetch unfiltered data.
    pub async fn select_source(&self, source: DataSource) -> Settled {
        let ticket = self.state.write().await.activate(source.clone());
        info!(kind = ?source.kind(), id = %source.id(), "Activated data source");

        let resolved = metadata::resolve(self.backend.as_ref(), &self.session, &source).await;

        let mut metadata_failed = false;
        let dispatch = {
            let mut st = self.state.write().await;
            if !st.is_current_source(ticket) {
                debug!(id = %source.id(), "Dropping stale metadata response");
                return Settled::Stale;
            }
            match resolved {
                Ok(md) => st.publish_metadata(md),
                Err(e) => {
                    warn!(id = %source.id(), error = %e, "Metadata fetch failed");
                    st.metadata = None;
                    st.metadata_phase = FetchPhase::Failed;
                    if e.requires_login() {
                        st.data_phase = FetchPhase::Failed;
                        return Settled::LoginRequired;
                    }
                    metadata_failed = true;
                }
            }
            st.dispatch()
        };

        let settled = match dispatch {
            Some(d) => self.run_unfiltered(d).await,
            None => Settled::Idle,
        };
        match settled {
            Settled::Ready if metadata_failed => Settled::Degraded,
            other => other,
        }
    }

    async fn run_unfiltered(&self, d: Dispatch) -> Settled {
        match &d.source {
            DataSource::Public(dataset) => {
                let (viz, raw) = self
                    .composer()
                    .public_unfiltered(&dataset.collection, &d.filter)
                    .await;

                let mut st = self.state.write().await;
                if !st.is_current(d.ticket) {
                    debug!(collection = %dataset.collection, generation = d.ticket.generation, "Dropping stale response");
                    return Settled::Stale;
                }

                let mut outcome = Outcome::default();
                match viz {
                    Ok(viz) => {
                        st.chart_type = viz.recommended_chart_type;
                        st.visualization = Some(viz);
                        st.data_phase = FetchPhase::Ready;
                    }
                    Err(e) => {
                        warn!(collection = %dataset.collection, error = %e, "Visualization fetch failed");
                        outcome.record(&e);
                        st.chart_type = ChartType::Bar;
                        st.visualization = Some(VisualizationResult::fallback());
                        st.data_phase = FetchPhase::Failed;
                    }
                }
                let chart_type = st.chart_type;
                st.insights = Some(
                    reconcile(raw, chart_type, &mut outcome)
                        .unwrap_or_else(|| insights::unavailable(chart_type)),
                );
                outcome.settled()
            }
            DataSource::User(file) => {
                let fetch = self
                    .composer()
                    .user_unfiltered(&file.file_id, d.chart_type)
                    .await;

                let mut st = self.state.write().await;
                if !st.is_current(d.ticket) {
                    debug!(file_id = %file.file_id, generation = d.ticket.generation, "Dropping stale response");
                    return Settled::Stale;
                }

                let mut outcome = Outcome::default();
                match fetch.data {
                    Ok(data) => {
                        st.visualization = Some(data.to_visualization());
                        st.data_phase = FetchPhase::Ready;
                        let scored = fetch
                            .insights
                            .and_then(|raw| reconcile(raw, d.chart_type, &mut outcome));
                        let result = scored.unwrap_or_else(|| {
                            let facts = FileFacts::new(
                                data.filename.clone(),
                                data.record_count,
                                data.upload_date.or(Some(file.upload_date)),
                                data.file_type.clone().or_else(|| Some(file.file_type.clone())),
                                d.chart_type.as_str(),
                            );
                            insights::synthesize_for_file(&facts).unwrap_or_else(|e| {
                                warn!(error = %e, "Fallback insight rendering failed");
                                insights::unavailable(d.chart_type)
                            })
                        });
                        st.insights = Some(result);
                    }
                    Err(e) => {
                        warn!(file_id = %file.file_id, error = %e, "User file fetch failed");
                        outcome.record(&e);
                        st.visualization = Some(VisualizationResult::fallback());
                        st.insights = Some(insights::unavailable(d.chart_type));
                        st.data_phase = FetchPhase::Failed;
                    }
                }
                outcome.settled()
            }
        }
    }

    // ── Filter transitions ────────────────────────────────────

    /// Returns whether the selection changed. No-op without metadata.
    pub async fn toggle(&self, facet: &Facet) -> bool {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        match &st.metadata {
            Some(md) => st.filter.toggle(md, facet),
            None => false,
        }
    }

    pub async fn select_all(&self, dimension: Dimension) {
        let mut guard = self.state.write().await;
        let st = &mut *guard;
        if let Some(md) = &st.metadata {
            st.filter.select_all(md, dimension);
        }
    }

    pub async fn clear(&self, dimension: Dimension) {
        self.state.write().await.filter.clear(dimension);
    }

    /// Empty every selection, reset sorting, and refetch unfiltered once.
    pub async fn clear_all(&self) -> Settled {
        let dispatch = {
            let mut st = self.state.write().await;
            st.filter.clear_all();
            st.dispatch()
        };
        match dispatch {
            Some(d) => self.run_unfiltered(d).await,
            None => Settled::Idle,
        }
    }

    pub async fn set_sort(&self, sort_by: Option<String>, sort_order: SortOrder) {
        let mut st = self.state.write().await;
        st.filter.sort_by = sort_by;
        st.filter.sort_order = sort_order;
    }

    pub async fn set_breadth(&self, breadth: Breadth) {
        self.state.write().await.filter.breadth = breadth;
    }

    pub async fn set_year_separated(&self, year_separated: bool) {
        self.state.write().await.filter.year_separated = year_separated;
    }

    pub async fn select_chart_type(&self, chart_type: ChartType) {
        self.state.write().await.chart_type = chart_type;
    }

    // ── Filtered fetch ────────────────────────────────────────

    /// Fetch the active source with the current filters. Insights that
    /// were on screen survive when no fresh ones arrive.
    pub async fn apply_filters(&self) -> Settled {
        let Some(d) = self.state.write().await.dispatch() else {
            return Settled::Idle;
        };

        match &d.source {
            DataSource::Public(dataset) => {
                let fetch = self
                    .composer()
                    .public_filtered(&dataset.collection, &d.filter, d.chart_type)
                    .await;

                let mut st = self.state.write().await;
                if !st.is_current(d.ticket) {
                    debug!(collection = %dataset.collection, generation = d.ticket.generation, "Dropping stale filtered response");
                    return Settled::Stale;
                }

                let mut outcome = Outcome::default();
                match fetch.visualization {
                    Ok(viz) => {
                        st.visualization = Some(viz);
                        st.data_phase = FetchPhase::Ready;
                    }
                    Err(e) => {
                        warn!(collection = %dataset.collection, error = %e, "Filtered fetch failed");
                        outcome.record(&e);
                        st.visualization = Some(VisualizationResult::fallback());
                        st.data_phase = FetchPhase::Failed;
                    }
                }
                let fresh = fetch
                    .insights
                    .and_then(|raw| reconcile(raw, d.chart_type, &mut outcome));
                st.insights = fresh
                    .or(d.prior_insights)
                    .or_else(|| Some(insights::unavailable(d.chart_type)));
                outcome.settled()
            }
            DataSource::User(file) => {
                let viz = self.composer().user_filtered(&file.file_id, &d.filter).await;

                let mut st = self.state.write().await;
                if !st.is_current(d.ticket) {
                    debug!(file_id = %file.file_id, generation = d.ticket.generation, "Dropping stale filtered response");
                    return Settled::Stale;
                }

                let mut outcome = Outcome::default();
                match viz {
                    Ok(mut viz) => {
                        viz.recommended_chart_type = d.chart_type;
                        st.visualization = Some(viz);
                        st.data_phase = FetchPhase::Ready;
                    }
                    Err(e) => {
                        warn!(file_id = %file.file_id, error = %e, "Filtered user fetch failed");
                        outcome.record(&e);
                        st.visualization = Some(VisualizationResult::fallback());
                        st.data_phase = FetchPhase::Failed;
                    }
                }
                st.insights = d
                    .prior_insights
                    .or_else(|| Some(insights::unavailable(d.chart_type)));
                outcome.settled()
            }
        }
    }

    // ── Account actions ───────────────────────────────────────

    /// Validate locally, upload, then refresh the user's file list.
    pub async fn upload(&self, file: UploadFile) -> Result<UploadReceipt, ExplorerError> {
        file.validate(self.upload_max_bytes)?;
        let receipt = self
            .backend
            .upload(&self.session.auth_headers(), &file)
            .await?;
        info!(file_id = %receipt.file_id, filename = %receipt.filename, records = receipt.record_count, "Uploaded file");
        self.refresh_user_files().await;
        Ok(receipt)
    }

    /// Challenge to show before `login`.
    pub async fn captcha(&self) -> Result<Captcha, ExplorerError> {
        Ok(self.backend.captcha().await?)
    }

    pub async fn login(&self, email: &str, password: &str, captcha_answer: i64) -> Result<Identity, ExplorerError> {
        let identity = self
            .session
            .exchange(self.backend.as_ref(), email, password, captcha_answer)
            .await?;
        self.refresh_user_files().await;
        Ok(identity)
    }

    /// Sign out and forget the user's files, deactivating one if active.
    pub async fn logout(&self) {
        self.session.logout(self.backend.as_ref()).await;
        let mut st = self.state.write().await;
        st.catalog.user_files.clear();
        if matches!(st.active, Some(DataSource::User(_))) {
            st.deactivate();
        }
    }
}
