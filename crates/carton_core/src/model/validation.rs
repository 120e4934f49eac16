//! Declarative field validation for entity types.
//!
//! # Responsibility
//! - Collect field-level failures into an ordered, serializable report.
//! - Provide the rule helpers entity types compose inside `Validate::check`.
//!
//! # Invariants
//! - `Validate::check` must not mutate the entity or touch the store.
//! - Reports are produced fresh per call and never persisted.
//! - Rule helpers append errors in call order; ordering is stable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as the host application knows it.
    pub field: String,
    /// Human-readable failure message.
    pub message: String,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregate result of running an entity's validation rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one failure against `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// An empty report means the entity is admissible.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All failures, in rule evaluation order.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "valid");
        }
        let rendered = self
            .errors
            .iter()
            .map(FieldError::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{rendered}")
    }
}

/// Declarative validation contract implemented by entity types.
pub trait Validate {
    /// Runs every rule against current field values and returns the
    /// aggregate report. Pure; no store access, no mutation.
    fn check(&self) -> ValidationReport;
}

/// Rule helpers composed by `Validate::check` implementations.
///
/// Each helper appends a `FieldError` to the report when its rule fails and
/// does nothing otherwise, so a `check` body reads as a flat rule list.
pub mod rules {
    use super::{Regex, ValidationReport};

    /// The field must contain at least one non-whitespace character.
    pub fn required(report: &mut ValidationReport, field: &str, value: &str) {
        if value.trim().is_empty() {
            report.push(field, format!("{field} is required"));
        }
    }

    /// The field must not exceed `max` characters.
    pub fn max_len(report: &mut ValidationReport, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            report.push(field, format!("{field} must be at most {max} characters"));
        }
    }

    /// The field must contain at least `min` characters.
    pub fn min_len(report: &mut ValidationReport, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            report.push(field, format!("{field} must be at least {min} characters"));
        }
    }

    /// The field must match `pattern`. Empty values are skipped so the rule
    /// composes with `required` instead of double-reporting.
    pub fn matches(
        report: &mut ValidationReport,
        field: &str,
        value: &str,
        pattern: &Regex,
        expectation: &str,
    ) {
        if !value.is_empty() && !pattern.is_match(value) {
            report.push(field, format!("{field} must be {expectation}"));
        }
    }

    /// The numeric field must lie inside `min..=max`.
    pub fn in_range(report: &mut ValidationReport, field: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            report.push(field, format!("{field} must be between {min} and {max}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{rules, Regex, ValidationReport};

    #[test]
    fn empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert_eq!(report.to_string(), "valid");
    }

    #[test]
    fn errors_preserve_rule_order() {
        let mut report = ValidationReport::new();
        rules::required(&mut report, "name", "");
        rules::in_range(&mut report, "age", 200, 0, 150);

        assert!(!report.is_valid());
        let fields: Vec<_> = report.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["name", "age"]);
    }

    #[test]
    fn matches_skips_empty_values() {
        let pattern = Regex::new(r"^[a-z]+$").unwrap();
        let mut report = ValidationReport::new();
        rules::matches(&mut report, "slug", "", &pattern, "lowercase letters");
        assert!(report.is_valid());

        rules::matches(&mut report, "slug", "Bad!", &pattern, "lowercase letters");
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].message.contains("lowercase letters"));
    }

    #[test]
    fn length_rules_count_characters_not_bytes() {
        let mut report = ValidationReport::new();
        rules::max_len(&mut report, "name", "äöü", 3);
        rules::min_len(&mut report, "name", "äöü", 4);
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].message.contains("at least 4"));
    }

    #[test]
    fn report_round_trips_through_json() {
        let mut report = ValidationReport::new();
        rules::required(&mut report, "name", " ");
        let json = serde_json::to_string(&report).unwrap();
        let parsed: ValidationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
