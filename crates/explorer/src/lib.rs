//! Filter-driven visualization orchestrator for the TRACITY dashboard.
//!
//! The [`Explorer`] owns the active data source, its metadata and filter
//! selections, and the latest visualization and insight results. Every
//! operation settles into a success or fallback state; remote failures
//! are reported through [`Settled`] rather than propagated.

pub mod catalog;
pub mod composer;
pub mod error;
pub mod explorer;
pub mod insights;
pub mod metadata;
pub mod session;
pub mod templating;

pub use catalog::DataSourceCatalog;
pub use composer::RowLimits;
pub use error::{ExplorerError, ReconcileError, SessionError};
pub use explorer::{Explorer, ExplorerState, FetchPhase, RenderModel, Settled};
pub use session::{FileSessionStore, Identity, MemorySessionStore, SessionContext, SessionStore};
