//! Data Source Catalog: the ordered public datasets plus the signed-in
//! user's uploaded files.

use serde::Serialize;
use tracing::{debug, warn};

use tracity_client::{ApiError, Backend};
use tracity_core::{DataSource, PlatformStats, PublicDataset, UserFile};

use crate::session::SessionContext;

/// Canonical display order; collections not listed follow in backend order.
pub const DATASET_ORDER: &[&str] = &["crimes", "power_consumption", "aqi", "literacy"];

/// Collections that hold application records rather than data.
pub const EXCLUDED_COLLECTIONS: &[&str] = &["user_profiles", "status_checks", "datasets", "user_files", "users"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataSourceCatalog {
    pub datasets: Vec<PublicDataset>,
    pub user_files: Vec<UserFile>,
}

impl DataSourceCatalog {
    /// First dataset in canonical order, activated on initial load.
    pub fn first_dataset(&self) -> Option<DataSource> {
        self.datasets.first().cloned().map(DataSource::Public)
    }

    pub fn find_dataset(&self, collection: &str) -> Option<DataSource> {
        self.datasets
            .iter()
            .find(|d| d.collection == collection)
            .cloned()
            .map(DataSource::Public)
    }

    pub fn find_file(&self, file_id: &str) -> Option<DataSource> {
        self.user_files
            .iter()
            .find(|f| f.file_id == file_id)
            .cloned()
            .map(DataSource::User)
    }

    /// Catalog record count for the source, used when a result has no total.
    pub fn record_count(&self, source: &DataSource) -> u64 {
        match source {
            DataSource::Public(d) => self
                .datasets
                .iter()
                .find(|x| x.collection == d.collection)
                .map_or(d.record_count, |x| x.record_count),
            DataSource::User(f) => self
                .user_files
                .iter()
                .find(|x| x.file_id == f.file_id)
                .map_or(f.record_count, |x| x.record_count),
        }
    }
}

/// Drop excluded collections, then put known ones in canonical order.
/// The sort is stable, so unknown collections keep their relative order.
pub fn order_datasets(datasets: Vec<PublicDataset>) -> Vec<PublicDataset> {
    let mut kept: Vec<PublicDataset> = datasets
        .into_iter()
        .filter(|d| !EXCLUDED_COLLECTIONS.contains(&d.collection.as_str()))
        .collect();
    kept.sort_by_key(|d| {
        DATASET_ORDER
            .iter()
            .position(|c| *c == d.collection)
            .unwrap_or(DATASET_ORDER.len())
    });
    kept
}

pub async fn fetch_datasets(backend: &dyn Backend) -> Result<Vec<PublicDataset>, ApiError> {
    let datasets = order_datasets(backend.datasets().await?);
    debug!(count = datasets.len(), "Fetched public datasets");
    Ok(datasets)
}

/// The user's files, or an empty list when signed out. Only a rejected
/// credential is reported as an error.
pub async fn fetch_user_files(
    backend: &dyn Backend,
    session: &SessionContext,
) -> Result<Vec<UserFile>, ApiError> {
    if !session.is_authenticated() {
        return Ok(Vec::new());
    }
    match backend.user_files(&session.auth_headers()).await {
        Ok(files) => {
            debug!(count = files.len(), "Fetched user files");
            Ok(files)
        }
        Err(e) if e.requires_login() => Err(e),
        Err(e) => {
            warn!(error = %e, "Failed to fetch user files");
            Ok(Vec::new())
        }
    }
}

/// Landing-page counters, or fixed defaults when the endpoint fails.
pub async fn fetch_stats(backend: &dyn Backend) -> PlatformStats {
    match backend.stats().await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(error = %e, "Failed to fetch platform stats, using defaults");
            PlatformStats::default()
        }
    }
}
