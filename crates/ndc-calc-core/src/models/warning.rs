//! Actionable warnings attached to match and calculation results.

use serde::{Deserialize, Serialize};

/// Warning severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Machine-readable warning category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    /// An inactive NDC was present among the candidates
    InactiveNdc,
    /// Package lookup returned nothing
    NoPackagesFound,
    /// Only inactive packages were available
    NoActivePackages,
    /// Matching failed; no recommendation could be made
    NoMatch,
    /// Matching was not attempted because no quantity was determined
    MatchingSkipped,
    /// Directions parsed with a caveat
    ParseCaveat,
    /// Computed quantity looks unusual
    QuantityReasonableness,
    /// Directive unit disagrees with the recommended package's dosage form
    DosageFormMismatch,
    /// Recommended combination is short of the target
    Underfill,
    /// Recommendation falls outside the tolerance window
    ToleranceExceeded,
    /// A candidate package record could not be used
    InvalidPackage,
    /// Recommended package is past its marketing end date
    MarketingEnded,
}

/// A single warning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    /// Unique warning ID
    pub id: String,
    /// Warning category
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    /// Severity
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Structured details for the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Warning {
    /// Create a new warning with a fresh ID.
    pub fn new(warning_type: WarningType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            warning_type,
            severity,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured details.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
