//! reqwest implementation of [`Backend`].
//!
//! Every call maps a transport failure to [`ApiError::Network`], a
//! non-2xx status to [`ApiError::Rejected`] (carrying the FastAPI
//! `detail` when present) and an unexpected body to [`ApiError::Decode`].

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use tracity_core::config::BackendConfig;
use tracity_core::{Metadata, PlatformStats, PublicDataset, UploadFile, UserFile, VisualizationResult};

use crate::backend::{AuthHeaders, Backend};
use crate::error::ApiError;
use crate::wire::{
    Captcha, DatasetsBody, EnhancedInsightRequest, ErrorBody, FilterRequest, LoginRequest,
    LoginResponse, UploadReceipt, UserFileData, UserFilesBody, UserFilterRequest,
    UserInsightRequest, VisualizationBody, VisualizeQuery,
};

/// Client for the TRACITY REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a client with reqwest defaults (no request timeout).
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::new();
        Self { base_url, http }
    }

    /// Create a client with the configured per-request timeout, so a
    /// stalled backend settles as a network failure instead of hanging.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            base_url: config.base_url(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Network(format!("invalid backend url '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("backend url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn with_auth(request: RequestBuilder, auth: &AuthHeaders) -> RequestBuilder {
        auth.iter()
            .fold(request, |req, (name, value)| req.header(name, value))
    }

    /// Send the request and decode a JSON success body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &'static str,
    ) -> Result<T, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message())
                .unwrap_or(body);
            debug!(what, %status, message = %message, "backend rejected request");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(format!("{what}: {e}")))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn datasets(&self) -> Result<Vec<PublicDataset>, ApiError> {
        let url = self.endpoint(&["datasets"])?;
        let body: DatasetsBody = self.execute(self.http.get(url), "datasets").await?;
        Ok(body)
    }

    async fn stats(&self) -> Result<PlatformStats, ApiError> {
        let url = self.endpoint(&["stats"])?;
        self.execute(self.http.get(url), "stats").await
    }

    async fn metadata(&self, collection: &str) -> Result<Metadata, ApiError> {
        let url = self.endpoint(&["metadata", collection])?;
        self.execute(self.http.get(url), "metadata").await
    }

    async fn user_metadata(&self, auth: &AuthHeaders, file_id: &str) -> Result<Metadata, ApiError> {
        let auth = auth.require()?;
        let url = self.endpoint(&["user", "metadata", file_id])?;
        self.execute(Self::with_auth(self.http.get(url), auth), "user metadata")
            .await
    }

    async fn visualize(&self, collection: &str, query: &VisualizeQuery) -> Result<VisualizationResult, ApiError> {
        let url = self.endpoint(&["visualize", collection])?;
        let body: VisualizationBody = self
            .execute(self.http.get(url).query(&query.to_pairs()), "visualize")
            .await?;
        Ok(body.into())
    }

    async fn insights(&self, collection: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&["insights", collection])?;
        self.execute(self.http.get(url), "insights").await
    }

    async fn filtered_data(&self, request: &FilterRequest) -> Result<VisualizationResult, ApiError> {
        let url = self.endpoint(&["data", "filtered"])?;
        let body: VisualizationBody = self
            .execute(self.http.post(url).json(request), "filtered data")
            .await?;
        Ok(body.into())
    }

    async fn enhanced_insights(&self, request: &EnhancedInsightRequest) -> Result<Value, ApiError> {
        let url = self.endpoint(&["insights", "enhanced"])?;
        self.execute(self.http.post(url).json(request), "enhanced insights")
            .await
    }

    async fn user_data(&self, auth: &AuthHeaders, file_id: &str) -> Result<UserFileData, ApiError> {
        let auth = auth.require()?;
        let url = self.endpoint(&["user", "data", file_id])?;
        self.execute(Self::with_auth(self.http.get(url), auth), "user data")
            .await
    }

    async fn user_filtered_data(
        &self,
        auth: &AuthHeaders,
        request: &UserFilterRequest,
    ) -> Result<VisualizationResult, ApiError> {
        let auth = auth.require()?;
        let url = self.endpoint(&["user", "data", "filtered", &request.file_id])?;
        let body: VisualizationBody = self
            .execute(
                Self::with_auth(self.http.post(url).json(request), auth),
                "user filtered data",
            )
            .await?;
        // Filtered user rows carry no recommendation; the caller keeps
        // whatever chart the user selected.
        Ok(body.into())
    }

    async fn user_insights(
        &self,
        auth: &AuthHeaders,
        file_id: &str,
        request: &UserInsightRequest,
    ) -> Result<Value, ApiError> {
        let auth = auth.require()?;
        let url = self.endpoint(&["user", "insights", file_id])?;
        self.execute(
            Self::with_auth(self.http.post(url).json(request), auth),
            "user insights",
        )
        .await
    }

    async fn user_files(&self, auth: &AuthHeaders) -> Result<Vec<UserFile>, ApiError> {
        let auth = auth.require()?;
        let url = self.endpoint(&["user", "files"])?;
        let body: UserFilesBody = self
            .execute(Self::with_auth(self.http.get(url), auth), "user files")
            .await?;
        Ok(body.files)
    }

    async fn upload(&self, auth: &AuthHeaders, file: &UploadFile) -> Result<UploadReceipt, ApiError> {
        let auth = auth.require()?;
        let url = self.endpoint(&["upload"])?;
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(file.mime_type())?;
        let form = reqwest::multipart::Form::new().part("file", part);
        self.execute(Self::with_auth(self.http.post(url).multipart(form), auth), "upload")
            .await
    }

    async fn captcha(&self) -> Result<Captcha, ApiError> {
        let url = self.endpoint(&["captcha"])?;
        self.execute(self.http.get(url), "captcha").await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&["login"])?;
        self.execute(self.http.post(url).json(request), "login").await
    }

    async fn logout(&self, auth: &AuthHeaders) -> Result<(), ApiError> {
        let auth = auth.require()?;
        let url = self.endpoint(&["logout"])?;
        let _: Value = self
            .execute(Self::with_auth(self.http.post(url), auth), "logout")
            .await?;
        Ok(())
    }
}
