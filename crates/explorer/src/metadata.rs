//! Metadata Resolver: fetches the filterable dimensions of a source.
//!
//! Publishing the result, and resetting the selections that depended on
//! the previous metadata, happens in the explorer under its state lock.

use tracing::debug;

use tracity_client::{ApiError, Backend};
use tracity_core::{DataSource, Metadata};

use crate::session::SessionContext;

/// Fetch metadata for a public collection or a user file. User files
/// need a credential and fail with [`ApiError::Unauthorized`] without one.
pub async fn resolve(
    backend: &dyn Backend,
    session: &SessionContext,
    source: &DataSource,
) -> Result<Metadata, ApiError> {
    match source {
        DataSource::Public(dataset) => {
            debug!(collection = %dataset.collection, "Resolving metadata");
            backend.metadata(&dataset.collection).await
        }
        DataSource::User(file) => {
            debug!(file_id = %file.file_id, "Resolving user file metadata");
            backend.user_metadata(&session.auth_headers(), &file.file_id).await
        }
    }
}
