//! Survey response records and the record-source seam
//!
//! Records arrive already fetched; the core never subscribes to live
//! updates. A host refreshes its data however it likes and hands the
//! display a fresh snapshot.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Raw answer for an attribute: surveys store numbers or strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

/// Borrowed view of one answer, as handed to the normalizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> From<&'a AttributeValue> for FieldValue<'a> {
    fn from(value: &'a AttributeValue) -> Self {
        match value {
            AttributeValue::Number(n) => FieldValue::Number(*n),
            AttributeValue::Text(s) => FieldValue::Text(s),
        }
    }
}

/// One survey submission
///
/// Immutable once created. Field names follow the survey API's camelCase
/// JSON; attributes the typed struct does not know about land in `extra`
/// so catalog overrides can still address them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub id: Uuid,

    #[serde(default)]
    pub years_at_organization: Option<AttributeValue>,

    #[serde(default)]
    pub learning_style: Option<String>,

    #[serde(default)]
    pub shaped_by: Option<String>,

    #[serde(default)]
    pub peak_performance: Option<String>,

    #[serde(default)]
    pub motivation: Option<String>,

    #[serde(default)]
    pub is_test_data: bool,

    #[serde(default = "flowviz_common::time::now")]
    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ResponseRecord {
    /// Empty record with a fresh id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            years_at_organization: None,
            learning_style: None,
            shaped_by: None,
            peak_performance: None,
            motivation: None,
            is_test_data: false,
            created_at: flowviz_common::time::now(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_years(mut self, years: f64) -> Self {
        self.years_at_organization = Some(AttributeValue::Number(years));
        self
    }

    /// Set a text answer by catalog field name
    pub fn with_answer(mut self, field: &str, answer: &str) -> Self {
        let answer = answer.to_string();
        match field {
            "years_at_organization" => {
                self.years_at_organization = Some(AttributeValue::Text(answer))
            }
            "learning_style" => self.learning_style = Some(answer),
            "shaped_by" => self.shaped_by = Some(answer),
            "peak_performance" => self.peak_performance = Some(answer),
            "motivation" => self.motivation = Some(answer),
            other => {
                self.extra
                    .insert(other.to_string(), serde_json::Value::String(answer));
            }
        }
        self
    }

    pub fn as_test_data(mut self) -> Self {
        self.is_test_data = true;
        self
    }

    /// Raw answer for a catalog field name, None when absent or null
    pub fn value(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "years_at_organization" => self.years_at_organization.as_ref().map(FieldValue::from),
            "learning_style" => self.learning_style.as_deref().map(FieldValue::Text),
            "shaped_by" => self.shaped_by.as_deref().map(FieldValue::Text),
            "peak_performance" => self.peak_performance.as_deref().map(FieldValue::Text),
            "motivation" => self.motivation.as_deref().map(FieldValue::Text),
            other => match self.extra.get(other)? {
                serde_json::Value::Number(n) => n.as_f64().map(FieldValue::Number),
                serde_json::Value::String(s) => Some(FieldValue::Text(s)),
                serde_json::Value::Bool(true) => Some(FieldValue::Text("true")),
                serde_json::Value::Bool(false) => Some(FieldValue::Text("false")),
                _ => None,
            },
        }
    }

    /// Whether the record survives the test-data filter
    pub fn is_eligible(&self, include_test_data: bool) -> bool {
        include_test_data || !self.is_test_data
    }
}

impl Default for ResponseRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter applied when pulling records from a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub include_test_data: bool,
}

/// Pull-based data source handing the core a synchronous snapshot
pub trait RecordSource: Send + Sync {
    fn responses(&self, filter: RecordFilter) -> Vec<ResponseRecord>;
}

/// In-memory snapshot of responses
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    records: Vec<ResponseRecord>,
}

impl SnapshotSource {
    pub fn new(records: Vec<ResponseRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of responses
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<ResponseRecord> = serde_json::from_str(json)?;
        Ok(Self { records })
    }

    /// Load a JSON array of responses from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Records(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content).map_err(|e| {
            Error::Records(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ResponseRecord> {
        self.records
    }
}

impl RecordSource for SnapshotSource {
    fn responses(&self, filter: RecordFilter) -> Vec<ResponseRecord> {
        self.records
            .iter()
            .filter(|r| r.is_eligible(filter.include_test_data))
            .cloned()
            .collect()
    }
}
