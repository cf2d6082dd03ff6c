//! The remote API as seen by the explorer.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracity_core::{Metadata, PlatformStats, PublicDataset, UploadFile, UserFile, VisualizationResult};

use crate::error::ApiError;
use crate::wire::{
    Captcha, EnhancedInsightRequest, FilterRequest, LoginRequest, LoginResponse, UploadReceipt,
    UserFileData, UserFilterRequest, UserInsightRequest, VisualizeQuery,
};

/// Headers attached to user-scoped requests. Empty when signed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders(BTreeMap<String, String>);

impl AuthHeaders {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bearer(token: &str) -> Self {
        Self(BTreeMap::from([(
            "Authorization".to_string(),
            format!("Bearer {token}"),
        )]))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Fail fast for auth-required calls made without a credential.
    pub fn require(&self) -> Result<&Self, ApiError> {
        if self.is_empty() {
            Err(ApiError::Unauthorized)
        } else {
            Ok(self)
        }
    }
}

/// Every remote operation the orchestrator composes.
///
/// Insight endpoints return the raw JSON body: its shape varies by
/// endpoint and is normalized by the caller.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /datasets`
    async fn datasets(&self) -> Result<Vec<PublicDataset>, ApiError>;

    /// `GET /stats`
    async fn stats(&self) -> Result<PlatformStats, ApiError>;

    /// `GET /metadata/{collection}`
    async fn metadata(&self, collection: &str) -> Result<Metadata, ApiError>;

    /// `GET /user/metadata/{file_id}`
    async fn user_metadata(&self, auth: &AuthHeaders, file_id: &str) -> Result<Metadata, ApiError>;

    /// `GET /visualize/{collection}`
    async fn visualize(&self, collection: &str, query: &VisualizeQuery) -> Result<VisualizationResult, ApiError>;

    /// `GET /insights/{collection}`
    async fn insights(&self, collection: &str) -> Result<Value, ApiError>;

    /// `POST /data/filtered`
    async fn filtered_data(&self, request: &FilterRequest) -> Result<VisualizationResult, ApiError>;

    /// `POST /insights/enhanced`
    async fn enhanced_insights(&self, request: &EnhancedInsightRequest) -> Result<Value, ApiError>;

    /// `GET /user/data/{file_id}`
    async fn user_data(&self, auth: &AuthHeaders, file_id: &str) -> Result<UserFileData, ApiError>;

    /// `POST /user/data/filtered/{file_id}`
    async fn user_filtered_data(
        &self,
        auth: &AuthHeaders,
        request: &UserFilterRequest,
    ) -> Result<VisualizationResult, ApiError>;

    /// `POST /user/insights/{file_id}`
    async fn user_insights(
        &self,
        auth: &AuthHeaders,
        file_id: &str,
        request: &UserInsightRequest,
    ) -> Result<Value, ApiError>;

    /// `GET /user/files`
    async fn user_files(&self, auth: &AuthHeaders) -> Result<Vec<UserFile>, ApiError>;

    /// `POST /upload` (multipart, field `file`)
    async fn upload(&self, auth: &AuthHeaders, file: &UploadFile) -> Result<UploadReceipt, ApiError>;

    /// `GET /captcha`
    async fn captcha(&self) -> Result<Captcha, ApiError>;

    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    /// `POST /logout`
    async fn logout(&self, auth: &AuthHeaders) -> Result<(), ApiError>;
}
