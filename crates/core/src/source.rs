//! Data sources the explorer can activate: curated public datasets and
//! files the signed-in user uploaded.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A curated collection served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicDataset {
    pub collection: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub record_count: u64,
}

/// A CSV/JSON file uploaded by the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFile {
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub record_count: u64,
    #[serde(with = "timestamp")]
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Public,
    User,
}

/// The active source driving filters, visualization and insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    Public(PublicDataset),
    User(UserFile),
}

impl DataSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            DataSource::Public(_) => SourceKind::Public,
            DataSource::User(_) => SourceKind::User,
        }
    }

    /// Collection name or file id.
    pub fn id(&self) -> &str {
        match self {
            DataSource::Public(d) => &d.collection,
            DataSource::User(f) => &f.file_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            DataSource::Public(d) => &d.name,
            DataSource::User(f) => &f.filename,
        }
    }

    pub fn record_count(&self) -> u64 {
        match self {
            DataSource::Public(d) => d.record_count,
            DataSource::User(f) => f.record_count,
        }
    }

    /// Whether two sources denote the same remote entity.
    pub fn same_as(&self, other: &DataSource) -> bool {
        self.kind() == other.kind() && self.id() == other.id()
    }
}

/// Timestamps from the backend are ISO 8601, with or without an offset.
/// Naive values are taken as UTC.
pub mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
