//! Field catalog
//!
//! Enumerates the survey dimensions a diagram can be built from. Each
//! field either buckets a numeric answer (lower bounds inclusive) or holds
//! a closed set of categorical labels. The catalog order doubles as the
//! sequencer's field rotation.

use crate::error::{Error, Result};
use flowviz_common::config::{FieldDefinition, TomlConfig};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Explicit label for missing/null answers
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Built-in survey catalog
static SURVEY_CATALOG: Lazy<FieldCatalog> = Lazy::new(|| FieldCatalog {
    fields: vec![
        CategoryField::bucketed(
            "years_at_organization",
            "Years at Organization",
            &[("0-5", 0.0), ("6-10", 6.0), ("11-15", 11.0), ("16-20", 16.0), ("20+", 21.0)],
        ),
        CategoryField::categorical(
            "learning_style",
            "Learning Style",
            &["visual", "auditory", "kinesthetic", "reading_writing"],
        ),
        CategoryField::categorical(
            "shaped_by",
            "Shaped By",
            &["mentor", "challenge", "failure", "success", "team", "other"],
        ),
        CategoryField::categorical(
            "peak_performance",
            "Peak Performance",
            &["morning", "afternoon", "evening", "night"],
        ),
        CategoryField::categorical(
            "motivation",
            "Motivation",
            &["impact", "growth", "recognition", "purpose", "curiosity", "autonomy"],
        ),
    ],
});

/// One numeric bucket; values `>= lower` (and below the next bucket's
/// lower bound) fall into it
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub lower: f64,
}

/// How a field turns a raw answer into a label
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Numeric answer mapped through ascending breakpoints.
    /// The first bucket also receives out-of-domain values.
    Bucketed { buckets: Vec<Bucket> },
    /// Free answer checked against a closed label set
    Categorical { labels: Vec<String> },
}

/// A named, enumerable dimension of a response
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryField {
    pub name: String,
    pub title: String,
    pub kind: FieldKind,
    /// Declared labels in canonical display order
    ordered_labels: Vec<String>,
}

impl CategoryField {
    /// Create a bucketed numeric field from `(label, inclusive lower bound)` pairs
    pub fn bucketed(name: &str, title: &str, buckets: &[(&str, f64)]) -> Self {
        let buckets: Vec<Bucket> = buckets
            .iter()
            .map(|(label, lower)| Bucket {
                label: (*label).to_string(),
                lower: *lower,
            })
            .collect();
        let ordered_labels = buckets.iter().map(|b| b.label.clone()).collect();
        Self {
            name: name.to_string(),
            title: title.to_string(),
            kind: FieldKind::Bucketed { buckets },
            ordered_labels,
        }
    }

    /// Create a categorical field; display order is lexicographic
    pub fn categorical(name: &str, title: &str, labels: &[&str]) -> Self {
        let labels: Vec<String> = labels.iter().map(|l| (*l).to_string()).collect();
        let mut ordered_labels = labels.clone();
        ordered_labels.sort();
        Self {
            name: name.to_string(),
            title: title.to_string(),
            kind: FieldKind::Categorical { labels },
            ordered_labels,
        }
    }

    /// Declared labels in canonical order (bucket order or lexicographic)
    pub fn declared_labels(&self) -> &[String] {
        &self.ordered_labels
    }

    /// True if `label` belongs to the declared set
    pub fn is_declared(&self, label: &str) -> bool {
        self.ordered_labels.iter().any(|l| l == label)
    }

    pub fn is_bucketed(&self) -> bool {
        matches!(self.kind, FieldKind::Bucketed { .. })
    }

    /// Bucket label for a finite value at or above the first lower bound
    ///
    /// Returns None for NaN/infinite values and values below the domain;
    /// the normalizer decides the fallback for those.
    pub fn bucket_for(&self, value: f64) -> Option<&str> {
        let FieldKind::Bucketed { buckets } = &self.kind else {
            return None;
        };
        if !value.is_finite() {
            return None;
        }
        buckets
            .iter()
            .rev()
            .find(|b| value >= b.lower)
            .map(|b| b.label.as_str())
    }

    /// Fail-closed bucket (the first one)
    pub fn fallback_bucket(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Bucketed { buckets } => buckets.first().map(|b| b.label.as_str()),
            FieldKind::Categorical { .. } => None,
        }
    }

    fn from_definition(def: &FieldDefinition) -> Result<Self> {
        let title = def.title.clone().unwrap_or_else(|| def.name.clone());
        match (&def.labels, &def.buckets) {
            (Some(labels), None) => {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                Ok(Self::categorical(&def.name, &title, &labels))
            }
            (None, Some(buckets)) => {
                let buckets: Vec<(&str, f64)> =
                    buckets.iter().map(|b| (b.label.as_str(), b.lower)).collect();
                Ok(Self::bucketed(&def.name, &title, &buckets))
            }
            _ => Err(Error::Catalog(format!(
                "field '{}' must define exactly one of labels or buckets",
                def.name
            ))),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Catalog("field name must not be empty".to_string()));
        }
        if self.ordered_labels.is_empty() {
            return Err(Error::Catalog(format!("field '{}' has no labels", self.name)));
        }

        let mut seen = HashSet::new();
        for label in &self.ordered_labels {
            if label == UNKNOWN_LABEL {
                return Err(Error::Catalog(format!(
                    "field '{}' declares the reserved label '{}'",
                    self.name, UNKNOWN_LABEL
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(Error::Catalog(format!(
                    "field '{}' declares label '{}' twice",
                    self.name, label
                )));
            }
        }

        if let FieldKind::Bucketed { buckets } = &self.kind {
            for pair in buckets.windows(2) {
                if !(pair[0].lower.is_finite() && pair[1].lower > pair[0].lower) {
                    return Err(Error::Catalog(format!(
                        "field '{}' bucket bounds must be finite and strictly increasing ({} then {})",
                        self.name, pair[0].lower, pair[1].lower
                    )));
                }
            }
            if buckets.iter().any(|b| !b.lower.is_finite()) {
                return Err(Error::Catalog(format!(
                    "field '{}' has a non-finite bucket bound",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

/// Ordered, validated set of category fields
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCatalog {
    fields: Vec<CategoryField>,
}

impl FieldCatalog {
    /// Build a catalog, validating every field
    ///
    /// At least two fields are required: a diagram always pairs two
    /// different fields.
    pub fn new(fields: Vec<CategoryField>) -> Result<Self> {
        if fields.len() < 2 {
            return Err(Error::Catalog(format!(
                "catalog needs at least two fields, got {}",
                fields.len()
            )));
        }

        let mut names = HashSet::new();
        for field in &fields {
            field.validate()?;
            if !names.insert(field.name.as_str()) {
                return Err(Error::Catalog(format!("field '{}' defined twice", field.name)));
            }
        }

        Ok(Self { fields })
    }

    /// The built-in five-question survey catalog
    pub fn survey() -> &'static FieldCatalog {
        &SURVEY_CATALOG
    }

    /// Build from raw config definitions
    pub fn from_definitions(definitions: &[FieldDefinition]) -> Result<Self> {
        let fields = definitions
            .iter()
            .map(CategoryField::from_definition)
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields)
    }

    /// Catalog for a loaded config: the override when present, else the survey
    pub fn from_config(config: &TomlConfig) -> Result<Self> {
        if config.fields.is_empty() {
            Ok(Self::survey().clone())
        } else {
            Self::from_definitions(&config.fields)
        }
    }

    /// Look up a field, failing on unknown names
    pub fn field(&self, name: &str) -> Result<&CategoryField> {
        self.get(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&CategoryField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Rotation index of a field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn fields(&self) -> &[CategoryField] {
        &self.fields
    }

    /// Field names in rotation order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowviz_common::config::BucketDefinition;

    #[test]
    fn test_survey_catalog_is_valid() {
        let survey = FieldCatalog::survey();
        assert_eq!(survey.len(), 5);
        assert!(FieldCatalog::new(survey.fields().to_vec()).is_ok());
        assert_eq!(
            survey.names().collect::<Vec<_>>(),
            vec![
                "years_at_organization",
                "learning_style",
                "shaped_by",
                "peak_performance",
                "motivation"
            ]
        );
    }

    #[test]
    fn test_bucketed_labels_keep_bucket_order() {
        let years = FieldCatalog::survey().field("years_at_organization").unwrap();
        assert!(years.is_bucketed());
        assert_eq!(
            years.declared_labels(),
            &["0-5", "6-10", "11-15", "16-20", "20+"]
        );
    }

    #[test]
    fn test_categorical_labels_are_lexicographic() {
        let style = FieldCatalog::survey().field("learning_style").unwrap();
        assert_eq!(
            style.declared_labels(),
            &["auditory", "kinesthetic", "reading_writing", "visual"]
        );
        assert!(style.is_declared("visual"));
        assert!(!style.is_declared("Visual"));
    }

    #[test]
    fn test_bucket_for_lower_bound_inclusive() {
        let years = FieldCatalog::survey().field("years_at_organization").unwrap();
        assert_eq!(years.bucket_for(0.0), Some("0-5"));
        assert_eq!(years.bucket_for(5.0), Some("0-5"));
        assert_eq!(years.bucket_for(5.5), Some("0-5"));
        assert_eq!(years.bucket_for(6.0), Some("6-10"));
        assert_eq!(years.bucket_for(20.0), Some("16-20"));
        assert_eq!(years.bucket_for(21.0), Some("20+"));
        assert_eq!(years.bucket_for(45.0), Some("20+"));
        assert_eq!(years.bucket_for(-1.0), None);
        assert_eq!(years.bucket_for(f64::NAN), None);
        assert_eq!(years.fallback_bucket(), Some("0-5"));
    }

    #[test]
    fn test_unknown_field_lookup_fails() {
        let err = FieldCatalog::survey().field("favorite_color").unwrap_err();
        assert!(matches!(err, Error::UnknownField(name) if name == "favorite_color"));
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_reserved_label() {
        let dup_field = FieldCatalog::new(vec![
            CategoryField::categorical("a", "A", &["x"]),
            CategoryField::categorical("a", "A again", &["y"]),
        ]);
        assert!(matches!(dup_field, Err(Error::Catalog(_))));

        let dup_label = FieldCatalog::new(vec![
            CategoryField::categorical("a", "A", &["x", "x"]),
            CategoryField::categorical("b", "B", &["y"]),
        ]);
        assert!(matches!(dup_label, Err(Error::Catalog(_))));

        let reserved = FieldCatalog::new(vec![
            CategoryField::categorical("a", "A", &["Unknown"]),
            CategoryField::categorical("b", "B", &["y"]),
        ]);
        assert!(matches!(reserved, Err(Error::Catalog(_))));
    }

    #[test]
    fn test_catalog_rejects_unsorted_buckets_and_single_field() {
        let unsorted = FieldCatalog::new(vec![
            CategoryField::bucketed("n", "N", &[("low", 5.0), ("high", 1.0)]),
            CategoryField::categorical("b", "B", &["y"]),
        ]);
        assert!(matches!(unsorted, Err(Error::Catalog(_))));

        let single = FieldCatalog::new(vec![CategoryField::categorical("a", "A", &["x"])]);
        assert!(matches!(single, Err(Error::Catalog(_))));
    }

    #[test]
    fn test_from_definitions() {
        let catalog = FieldCatalog::from_definitions(&[
            FieldDefinition {
                name: "team".to_string(),
                title: None,
                labels: Some(vec!["engineering".to_string(), "design".to_string()]),
                buckets: None,
            },
            FieldDefinition {
                name: "tenure".to_string(),
                title: Some("Tenure".to_string()),
                labels: None,
                buckets: Some(vec![
                    BucketDefinition { label: "new".to_string(), lower: 0.0 },
                    BucketDefinition { label: "veteran".to_string(), lower: 5.0 },
                ]),
            },
        ])
        .unwrap();

        let team = catalog.field("team").unwrap();
        assert_eq!(team.title, "team");
        assert_eq!(team.declared_labels(), &["design", "engineering"]);
        assert_eq!(catalog.field("tenure").unwrap().bucket_for(7.0), Some("veteran"));
        assert_eq!(catalog.position("tenure"), Some(1));
    }

    #[test]
    fn test_definition_needs_exactly_one_kind() {
        let result = FieldCatalog::from_definitions(&[
            FieldDefinition {
                name: "broken".to_string(),
                title: None,
                labels: None,
                buckets: None,
            },
            FieldDefinition {
                name: "ok".to_string(),
                title: None,
                labels: Some(vec!["x".to_string()]),
                buckets: None,
            },
        ]);
        assert!(matches!(result, Err(Error::Catalog(_))));
    }

    #[test]
    fn test_from_config_defaults_to_survey() {
        let catalog = FieldCatalog::from_config(&TomlConfig::default()).unwrap();
        assert_eq!(&catalog, FieldCatalog::survey());
    }
}
