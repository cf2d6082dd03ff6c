//! Client side of the TRACITY REST API.
//!
//! This crate provides:
//! - `Backend` trait covering every remote operation the explorer needs
//! - Wire request/response types and their mapping onto the domain model
//! - `HttpBackend`, the reqwest implementation
//! - `ApiError`, the failure taxonomy shared by all calls

pub mod backend;
pub mod error;
pub mod http;
pub mod wire;

pub use backend::{AuthHeaders, Backend};
pub use error::ApiError;
pub use http::HttpBackend;
