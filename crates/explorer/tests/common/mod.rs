//! In-memory backend for driving the explorer without a network.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use tracity_client::wire::{
    Captcha, EnhancedInsightRequest, FilterRequest, LoginRequest, LoginResponse, UploadReceipt,
    UserFileData, UserFilterRequest, UserInsightRequest, VisualizeQuery,
};
use tracity_client::{ApiError, AuthHeaders, Backend};
use tracity_core::{
    ChartType, Metadata, PlatformStats, PublicDataset, Record, UploadFile, UserFile,
    VisualizationResult,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Datasets,
    Stats,
    Metadata(String),
    UserMetadata(String),
    Visualize(String, VisualizeQuery),
    Insights(String),
    Filtered(FilterRequest),
    Enhanced(EnhancedInsightRequest),
    UserData(String),
    UserFiltered(UserFilterRequest),
    UserInsights(String, UserInsightRequest),
    UserFiles,
    Upload(String),
    Captcha,
    Login(String),
    Logout,
}

/// Endpoints a test can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Datasets,
    Stats,
    Metadata,
    Visualize,
    Insights,
    Filtered,
    Enhanced,
    UserData,
    UserInsights,
    Upload,
    Logout,
}

/// Holds a visualize or metadata call for one collection until released.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct MockBackend {
    pub datasets: Vec<PublicDataset>,
    pub files: Vec<UserFile>,
    pub metadata: HashMap<String, Metadata>,
    pub rows: HashMap<String, Vec<Record>>,
    pub recommendations: HashMap<String, &'static str>,
    failing: Mutex<HashSet<Endpoint>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    metadata_gates: Mutex<HashMap<String, Arc<Gate>>>,
    calls: Mutex<Vec<Call>>,
}

pub fn row(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn dataset(collection: &str, record_count: u64) -> PublicDataset {
    PublicDataset {
        collection: collection.to_string(),
        name: collection.replace('_', " "),
        description: String::new(),
        record_count,
    }
}

pub fn metadata(states: &[&str], years: &[i32], categories: Option<&[&str]>) -> Metadata {
    Metadata {
        available_states: states.iter().map(|s| s.to_string()).collect(),
        available_years: years.iter().copied().collect(),
        special_filters: categories
            .map(|c| {
                [(
                    "crime_types".to_string(),
                    c.iter().map(|s| s.to_string()).collect(),
                )]
                .into_iter()
                .collect()
            })
            .unwrap_or_default(),
    }
}

pub fn user_file(file_id: &str, filename: &str, record_count: u64) -> UserFile {
    UserFile {
        file_id: file_id.to_string(),
        filename: filename.to_string(),
        file_type: "csv".to_string(),
        record_count,
        upload_date: tracity_core::source::timestamp::parse("2024-06-01T08:00:00").unwrap(),
    }
}

impl MockBackend {
    /// Four public datasets (served out of order, plus a registry
    /// collection) and one uploaded file.
    pub fn standard() -> Self {
        let mut backend = Self {
            datasets: vec![
                dataset("literacy", 36),
                dataset("users", 3),
                dataset("aqi", 500),
                dataset("crimes", 900),
                dataset("power_consumption", 120),
            ],
            files: vec![user_file("f-1", "sales.csv", 2)],
            ..Default::default()
        };
        backend.metadata.insert(
            "crimes".into(),
            metadata(&["Kerala", "Punjab", "Goa"], &[2019, 2020], Some(&["Theft", "Fraud"])),
        );
        backend
            .metadata
            .insert("aqi".into(), metadata(&["Delhi", "Goa"], &[2021], None));
        backend
            .metadata
            .insert("f-1".into(), metadata(&["North", "South"], &[2024], None));
        backend.rows.insert(
            "crimes".into(),
            vec![row(&[("state", json!("Kerala")), ("cases_reported", json!(120))])],
        );
        backend.rows.insert(
            "aqi".into(),
            vec![row(&[("state", json!("Delhi")), ("aqi", json!(310))])],
        );
        backend.rows.insert(
            "f-1".into(),
            vec![
                row(&[("region", json!("North")), ("sales", json!(10))]),
                row(&[("region", json!("South")), ("sales", json!(7))]),
            ],
        );
        backend.recommendations.insert("crimes".into(), "line");
        backend.recommendations.insert("aqi".into(), "scatter");
        backend
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.failing.lock().unwrap().insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.failing.lock().unwrap().remove(&endpoint);
    }

    pub fn gate(&self, collection: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(collection.to_string(), gate.clone());
        gate
    }

    pub fn gate_metadata(&self, collection: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.metadata_gates
            .lock()
            .unwrap()
            .insert(collection.to_string(), gate.clone());
        gate
    }

    async fn pass(gates: &Mutex<HashMap<String, Arc<Gate>>>, key: &str) {
        let gate = gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        if self.failing.lock().unwrap().contains(&endpoint) {
            Err(ApiError::Network("connection refused".into()))
        } else {
            Ok(())
        }
    }

    fn rows_for(&self, id: &str) -> Vec<Record> {
        self.rows.get(id).cloned().unwrap_or_default()
    }

    fn insight_body(id: &str) -> Value {
        json!({
            "collection": id,
            "insights": {
                "insight": format!("{id} insight"),
                "trend": "increasing",
                "key_findings": [format!("{id} finding")],
                "recommendations": ["Continue monitoring"],
                "anomalies": []
            },
            "sample_size": 50
        })
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn datasets(&self) -> Result<Vec<PublicDataset>, ApiError> {
        self.record(Call::Datasets);
        self.check(Endpoint::Datasets)?;
        Ok(self.datasets.clone())
    }

    async fn stats(&self) -> Result<PlatformStats, ApiError> {
        self.record(Call::Stats);
        self.check(Endpoint::Stats)?;
        Ok(PlatformStats {
            total_visualizations: 1,
            total_users: 2,
            total_datasets: 4,
            total_insights: 3,
        })
    }

    async fn metadata(&self, collection: &str) -> Result<Metadata, ApiError> {
        self.record(Call::Metadata(collection.to_string()));
        Self::pass(&self.metadata_gates, collection).await;
        self.check(Endpoint::Metadata)?;
        self.metadata.get(collection).cloned().ok_or(ApiError::Rejected {
            status: 404,
            message: "Collection not found".into(),
        })
    }

    async fn user_metadata(&self, auth: &AuthHeaders, file_id: &str) -> Result<Metadata, ApiError> {
        self.record(Call::UserMetadata(file_id.to_string()));
        auth.require()?;
        self.check(Endpoint::Metadata)?;
        self.metadata.get(file_id).cloned().ok_or(ApiError::Rejected {
            status: 404,
            message: "File not found".into(),
        })
    }

    async fn visualize(&self, collection: &str, query: &VisualizeQuery) -> Result<VisualizationResult, ApiError> {
        self.record(Call::Visualize(collection.to_string(), query.clone()));
        Self::pass(&self.gates, collection).await;
        self.check(Endpoint::Visualize)?;
        Ok(VisualizationResult {
            rows: self.rows_for(collection),
            recommended_chart_type: ChartType::from_recommendation(
                self.recommendations.get(collection).copied(),
            ),
            total_count: None,
            returned_count: None,
        })
    }

    async fn insights(&self, collection: &str) -> Result<Value, ApiError> {
        self.record(Call::Insights(collection.to_string()));
        self.check(Endpoint::Insights)?;
        Ok(Self::insight_body(collection))
    }

    async fn filtered_data(&self, request: &FilterRequest) -> Result<VisualizationResult, ApiError> {
        self.record(Call::Filtered(request.clone()));
        self.check(Endpoint::Filtered)?;
        let rows = self.rows_for(&request.collection);
        Ok(VisualizationResult {
            recommended_chart_type: ChartType::Bar,
            total_count: Some(rows.len() as u64 + 40),
            returned_count: Some(rows.len() as u64),
            rows,
        })
    }

    async fn enhanced_insights(&self, request: &EnhancedInsightRequest) -> Result<Value, ApiError> {
        self.record(Call::Enhanced(request.clone()));
        self.check(Endpoint::Enhanced)?;
        Ok(json!({
            "collection": request.filter.collection,
            "analyzed_sample": 12,
            "insights": {
                "insight": "filtered insight",
                "chart_type": request.chart_type.as_str(),
                "trend": "decreasing"
            }
        }))
    }

    async fn user_data(&self, auth: &AuthHeaders, file_id: &str) -> Result<UserFileData, ApiError> {
        self.record(Call::UserData(file_id.to_string()));
        auth.require()?;
        self.check(Endpoint::UserData)?;
        let file = self
            .files
            .iter()
            .find(|f| f.file_id == file_id)
            .ok_or(ApiError::Rejected {
                status: 404,
                message: "File not found".into(),
            })?;
        Ok(UserFileData {
            file_id: file.file_id.clone(),
            filename: file.filename.clone(),
            data: self.rows_for(file_id),
            record_count: file.record_count,
            upload_date: Some(file.upload_date),
            file_type: Some(file.file_type.clone()),
        })
    }

    async fn user_filtered_data(
        &self,
        auth: &AuthHeaders,
        request: &UserFilterRequest,
    ) -> Result<VisualizationResult, ApiError> {
        self.record(Call::UserFiltered(request.clone()));
        auth.require()?;
        self.check(Endpoint::Filtered)?;
        let rows = self.rows_for(&request.file_id);
        Ok(VisualizationResult {
            recommended_chart_type: ChartType::Bar,
            total_count: Some(rows.len() as u64),
            returned_count: Some(rows.len() as u64),
            rows,
        })
    }

    async fn user_insights(
        &self,
        auth: &AuthHeaders,
        file_id: &str,
        request: &UserInsightRequest,
    ) -> Result<Value, ApiError> {
        self.record(Call::UserInsights(file_id.to_string(), request.clone()));
        auth.require()?;
        self.check(Endpoint::UserInsights)?;
        Ok(json!({
            "insights": {
                "insight": format!("scored {}", request.filename),
                "chart_type": request.chart_type.as_str(),
                "state_comparisons": ["North leads."],
                "anomaly_detection": ["Row 2 is an outlier"]
            },
            "sample_size": request.record_count
        }))
    }

    async fn user_files(&self, auth: &AuthHeaders) -> Result<Vec<UserFile>, ApiError> {
        self.record(Call::UserFiles);
        auth.require()?;
        Ok(self.files.clone())
    }

    async fn upload(&self, auth: &AuthHeaders, file: &UploadFile) -> Result<UploadReceipt, ApiError> {
        self.record(Call::Upload(file.filename.clone()));
        auth.require()?;
        self.check(Endpoint::Upload)?;
        Ok(UploadReceipt {
            message: "File uploaded successfully".into(),
            file_id: "f-new".into(),
            filename: file.filename.clone(),
            record_count: 3,
        })
    }

    async fn captcha(&self) -> Result<Captcha, ApiError> {
        self.record(Call::Captcha);
        Ok(Captcha {
            question: "What is 3 + 4?".into(),
            session_id: "c-1".into(),
        })
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.record(Call::Login(request.email.clone()));
        if request.captcha_answer != 7 {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Invalid captcha answer".into(),
            });
        }
        Ok(LoginResponse {
            token: "tok-fresh".into(),
            user_id: "u-1".into(),
            email: request.email.clone(),
            message: "Login successful".into(),
        })
    }

    async fn logout(&self, auth: &AuthHeaders) -> Result<(), ApiError> {
        self.record(Call::Logout);
        auth.require()?;
        self.check(Endpoint::Logout)
    }
}
