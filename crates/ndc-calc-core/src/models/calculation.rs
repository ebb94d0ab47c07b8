//! Calculation request and result models.

use serde::{Deserialize, Serialize};

use super::directive::ParsedDirective;
use super::matching::{Combination, MatchQuality};
use super::package::PackageSet;
use super::warning::{Severity, Warning, WarningType};

/// Input to a single calculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalculationRequest {
    /// Drug name to resolve (ignored when `ndc` is supplied)
    pub drug_name: Option<String>,
    /// NDC supplied directly by the caller
    pub ndc: Option<String>,
    /// Free-text directions (SIG)
    pub directions: Option<String>,
    /// Days the dispensed quantity should last
    pub days_supply: Option<u32>,
    /// Explicit quantity; skips parsing and quantity calculation
    pub quantity: Option<f64>,
}

impl CalculationRequest {
    /// Start a request that resolves a drug by name.
    pub fn for_drug(drug_name: impl Into<String>) -> Self {
        Self {
            drug_name: Some(drug_name.into()),
            ..Self::default()
        }
    }

    /// Start a request for a specific NDC.
    pub fn for_ndc(ndc: impl Into<String>) -> Self {
        Self {
            ndc: Some(ndc.into()),
            ..Self::default()
        }
    }

    pub fn with_directions(mut self, directions: impl Into<String>) -> Self {
        self.directions = Some(directions.into());
        self
    }

    pub fn with_days_supply(mut self, days_supply: u32) -> Self {
        self.days_supply = Some(days_supply);
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// Where a normalization came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationSource {
    /// Drug name resolved to an RxNorm concept
    Rxnorm,
    /// Caller supplied the NDC directly
    DirectNdc,
}

/// Drug identity resolved before package lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizationResult {
    pub source: NormalizationSource,
    /// RxCUI or equivalent concept identifier
    pub identifier: Option<String>,
    pub resolved_name: Option<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
    pub ndc: Option<String>,
}

impl NormalizationResult {
    /// Pass-through normalization for a caller-supplied NDC.
    pub fn direct_ndc(ndc: impl Into<String>) -> Self {
        Self {
            source: NormalizationSource::DirectNdc,
            identifier: None,
            resolved_name: None,
            dosage_form: None,
            strength: None,
            ndc: Some(ndc.into()),
        }
    }

    /// Normalization to an RxNorm concept.
    pub fn rxnorm(identifier: impl Into<String>, resolved_name: impl Into<String>) -> Self {
        Self {
            source: NormalizationSource::Rxnorm,
            identifier: Some(identifier.into()),
            resolved_name: Some(resolved_name.into()),
            dosage_form: None,
            strength: None,
            ndc: None,
        }
    }
}

/// How the dispense quantity was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuantitySource {
    /// Supplied by the caller verbatim
    Explicit,
    /// Computed from directions and days supply
    Calculated,
    /// Directions parsed, but no days supply to compute from
    NotDetermined,
}

/// Quantity stage output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationDetails {
    pub source: QuantitySource,
    pub parsed_directive: Option<ParsedDirective>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    /// e.g. `1 tablet x 2/day x 30 days = 60 tablet`
    pub breakdown: Option<String>,
}

/// One line of a recommended combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageLine {
    pub ndc: String,
    pub manufacturer: String,
    pub package_size: u32,
    pub count: u32,
}

/// A combination as presented to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    /// Primary NDC to dispense
    pub ndc: String,
    /// Total package units
    pub package_count: u32,
    pub total_quantity: u32,
    pub overfill_percent: f64,
    pub match_quality: MatchQuality,
    pub score: f64,
    pub breakdown: Vec<PackageLine>,
}

impl From<&Combination> for Recommendation {
    fn from(combination: &Combination) -> Self {
        Self {
            ndc: combination.primary_ndc().unwrap_or_default().to_string(),
            package_count: combination.unit_count(),
            total_quantity: combination.total_quantity,
            overfill_percent: combination.overfill_percent,
            match_quality: combination.match_quality,
            score: combination.score,
            breakdown: combination
                .packages
                .iter()
                .map(|unit| PackageLine {
                    ndc: unit.package.code.clone(),
                    manufacturer: unit.package.manufacturer.clone(),
                    package_size: unit.package.package_size,
                    count: unit.count,
                })
                .collect(),
        }
    }
}

/// Overall outcome of a calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalculationStatus {
    Success,
    Partial,
    Error,
}

impl CalculationStatus {
    /// Derive the status of a completed (non-aborted) pipeline.
    pub fn from_warnings(warnings: &[Warning]) -> Self {
        if warnings.iter().any(|w| w.severity == Severity::Error) {
            CalculationStatus::Error
        } else if !warnings.is_empty() {
            CalculationStatus::Partial
        } else {
            CalculationStatus::Success
        }
    }
}

/// Pipeline stage that aborted a calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StageErrorType {
    NormalizationFailed,
    SigParsingFailed,
    QuantityCalculationFailed,
    PackageFetchFailed,
    UnexpectedError,
}

/// Hard failure that stopped the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageError {
    #[serde(rename = "type")]
    pub error_type: StageErrorType,
    pub message: String,
    /// Snapshot of the failing stage's inputs
    pub context: serde_json::Value,
}

/// The single auditable object produced per calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationResult {
    /// Unique result ID
    pub id: String,
    /// RFC 3339 creation timestamp
    pub timestamp: String,
    pub status: CalculationStatus,
    /// Request as received
    pub inputs: CalculationRequest,
    pub normalization: Option<NormalizationResult>,
    pub calculation: Option<CalculationDetails>,
    pub packages: Option<PackageSet>,
    pub recommendation: Option<Recommendation>,
    pub alternatives: Vec<Recommendation>,
    pub warnings: Vec<Warning>,
    pub error: Option<StageError>,
}

impl CalculationResult {
    /// Empty result for a request, stamped with a fresh ID and the current time.
    pub fn new(inputs: CalculationRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: CalculationStatus::Success,
            inputs,
            normalization: None,
            calculation: None,
            packages: None,
            recommendation: None,
            alternatives: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Warnings of a given type.
    pub fn warnings_of(&self, warning_type: WarningType) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.warning_type == warning_type)
            .collect()
    }

    /// Quantity the pipeline settled on, if any.
    pub fn quantity(&self) -> Option<f64> {
        self.calculation.as_ref().and_then(|c| c.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_warnings() {
        assert_eq!(CalculationStatus::from_warnings(&[]), CalculationStatus::Success);

        let info = Warning::new(WarningType::ParseCaveat, Severity::Info, "note");
        assert_eq!(
            CalculationStatus::from_warnings(&[info.clone()]),
            CalculationStatus::Partial
        );

        let error = Warning::new(WarningType::NoMatch, Severity::Error, "broken");
        assert_eq!(
            CalculationStatus::from_warnings(&[info, error]),
            CalculationStatus::Error
        );
    }

    #[test]
    fn test_request_builders() {
        let request = CalculationRequest::for_drug("lisinopril")
            .with_directions("Take 1 tablet daily")
            .with_days_supply(30);
        assert_eq!(request.drug_name.as_deref(), Some("lisinopril"));
        assert_eq!(request.days_supply, Some(30));
        assert!(request.ndc.is_none());
        assert!(request.quantity.is_none());
    }

    #[test]
    fn test_warning_serializes_type_field() {
        let warning = Warning::new(WarningType::InactiveNdc, Severity::Warning, "inactive")
            .with_data(serde_json::json!({"ndc": "12345-6789-1"}));
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "inactive_ndc");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["data"]["ndc"], "12345-6789-1");
    }
}
