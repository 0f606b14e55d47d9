//! Category Normalizer
//!
//! Maps a raw answer to exactly one label of a catalog field. Pure and
//! infallible for data: out-of-domain numbers fail closed into the first
//! bucket, missing answers become `Unknown`, and labels outside the
//! declared set pass through unchanged. Each fallback is reported as a
//! `QualityIssue` so callers can count it.

use crate::catalog::{CategoryField, FieldCatalog, FieldKind, UNKNOWN_LABEL};
use crate::error::Result;
use crate::record::{FieldValue, ResponseRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Data-quality condition hit while normalizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    /// Answer absent, null or blank, or a categorical `Unknown`; mapped to `Unknown`
    Missing,
    /// Numeric field got a negative, non-finite or non-numeric value;
    /// mapped to the first bucket
    OutOfDomain,
    /// Categorical answer not in the declared label set; passed through
    UnknownLabel,
}

/// Result of normalizing one answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub label: String,
    pub issue: Option<QualityIssue>,
}

impl Normalized {
    fn clean(label: &str) -> Self {
        Self {
            label: label.to_string(),
            issue: None,
        }
    }

    fn flagged(label: &str, issue: QualityIssue) -> Self {
        Self {
            label: label.to_string(),
            issue: Some(issue),
        }
    }
}

/// Normalizer bound to a catalog
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'c> {
    catalog: &'c FieldCatalog,
}

impl<'c> Normalizer<'c> {
    pub fn new(catalog: &'c FieldCatalog) -> Self {
        Self { catalog }
    }

    /// Normalize `record`'s answer for `field_name`
    ///
    /// Errors only when the field is not in the catalog.
    pub fn normalize(&self, record: &ResponseRecord, field_name: &str) -> Result<Normalized> {
        let field = self.catalog.field(field_name)?;
        Ok(normalize_value(field, record.value(field_name)))
    }
}

/// Normalize a raw value against a field definition
pub fn normalize_value(field: &CategoryField, value: Option<FieldValue<'_>>) -> Normalized {
    match &field.kind {
        FieldKind::Bucketed { .. } => normalize_bucketed(field, value),
        FieldKind::Categorical { .. } => normalize_categorical(field, value),
    }
}

fn normalize_bucketed(field: &CategoryField, value: Option<FieldValue<'_>>) -> Normalized {
    let fallback = field.fallback_bucket().unwrap_or(UNKNOWN_LABEL);

    let number = match value {
        None => return Normalized::flagged(UNKNOWN_LABEL, QualityIssue::Missing),
        Some(FieldValue::Text(text)) if text.trim().is_empty() => {
            return Normalized::flagged(UNKNOWN_LABEL, QualityIssue::Missing)
        }
        Some(FieldValue::Number(n)) => n,
        Some(FieldValue::Text(text)) => match text.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return Normalized::flagged(fallback, QualityIssue::OutOfDomain),
        },
    };

    match field.bucket_for(number) {
        Some(label) => Normalized::clean(label),
        None => Normalized::flagged(fallback, QualityIssue::OutOfDomain),
    }
}

fn normalize_categorical(field: &CategoryField, value: Option<FieldValue<'_>>) -> Normalized {
    let label = match value {
        None => return Normalized::flagged(UNKNOWN_LABEL, QualityIssue::Missing),
        // `Unknown` is reserved, so an answer spelling it out is a non-answer
        Some(FieldValue::Text(text)) if text.trim().is_empty() || text.trim() == UNKNOWN_LABEL => {
            return Normalized::flagged(UNKNOWN_LABEL, QualityIssue::Missing)
        }
        Some(FieldValue::Text(text)) => text.to_string(),
        Some(FieldValue::Number(n)) if n.fract() == 0.0 && n.is_finite() => format!("{:.0}", n),
        Some(FieldValue::Number(n)) => n.to_string(),
    };

    if field.is_declared(&label) {
        Normalized {
            label,
            issue: None,
        }
    } else {
        Normalized {
            label,
            issue: Some(QualityIssue::UnknownLabel),
        }
    }
}

/// Per-field counts of data-quality fallbacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldQuality {
    pub missing: usize,
    pub out_of_domain: usize,
    pub unknown_label: usize,
}

impl FieldQuality {
    pub fn total(&self) -> usize {
        self.missing + self.out_of_domain + self.unknown_label
    }
}

/// Data-quality counters gathered during one aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQualityReport {
    fields: BTreeMap<String, FieldQuality>,
}

impl DataQualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: &str, issue: QualityIssue) {
        let entry = self.fields.entry(field.to_string()).or_default();
        match issue {
            QualityIssue::Missing => entry.missing += 1,
            QualityIssue::OutOfDomain => entry.out_of_domain += 1,
            QualityIssue::UnknownLabel => entry.unknown_label += 1,
        }
    }

    /// Counts for one field (zero when nothing was recorded)
    pub fn field(&self, name: &str) -> FieldQuality {
        self.fields.get(name).copied().unwrap_or_default()
    }

    /// Total fallbacks across all fields
    pub fn total(&self) -> usize {
        self.fields.values().map(FieldQuality::total).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Emit one warning per affected field
    pub fn log_summary(&self) {
        for (field, quality) in &self.fields {
            if quality.total() > 0 {
                warn!(
                    "Data quality for '{}': {} missing, {} out of domain, {} unknown label",
                    field, quality.missing, quality.out_of_domain, quality.unknown_label
                );
            }
        }
    }
}
