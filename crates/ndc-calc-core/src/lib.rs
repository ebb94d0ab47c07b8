//! NDC Calc Core Library
//!
//! Turns prescription directions and a days supply into a dispense quantity,
//! then picks the NDC package combination that best covers it.
//!
//! # Architecture
//!
//! ```text
//!  CalculationRequest
//!         │
//!         ▼
//!  DrugNormalizer ──────── drug name → RxCUI (or NDC passthrough)
//!         │
//!         ▼
//!  SigParser ───────────── "Take 1 tab PO BID" → {dose, frequency, unit}
//!         │
//!         ▼
//!  quantity::calculate ─── dose × frequency × days → rounded quantity
//!         │
//!         ▼
//!  PackageSource ───────── active / inactive packages for the concept
//!         │
//!         ▼
//!  PackageMatcher ──────── ranked package combinations within tolerance
//!         │
//!         ▼
//!  CalculationResult (status, warnings, recommendation, alternatives)
//! ```
//!
//! # Core Principle
//!
//! **Every request produces a result.** Failures are recorded on the result
//! instead of being raised to the caller.
//!
//! # Modules
//!
//! - [`vocabulary`]: Units, dosage forms, frequencies and NDC codec
//! - [`parser`]: SIG parser strategy chain
//! - [`quantity`]: Quantity calculation and reasonableness checks
//! - [`matcher`]: Package combination search and ranking
//! - [`orchestrator`]: End-to-end pipeline over injected collaborators
//! - [`db`]: SQLite drug directory with FTS5 search
//! - [`config`]: TOML engine configuration
//! - [`models`]: Domain types

pub mod config;
pub mod db;
pub mod matcher;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod quantity;
pub mod vocabulary;

// Re-export commonly used types
pub use config::EngineConfig;
pub use db::{Database, LocalDirectory};
pub use matcher::{MatcherConfig, PackageMatch, PackageMatcher};
pub use models::{
    CalculationRequest, CalculationResult, CalculationStatus, DrugConcept, Frequency,
    NormalizationResult, PackageRecord, PackageSet, PackageStatus, ParsedDirective, Warning,
    WarningType,
};
pub use orchestrator::{CalculationOrchestrator, DrugNormalizer, PackageKey, PackageSource};
pub use parser::SigParser;
pub use vocabulary::Ndc;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum NdcCalcError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Could not parse directions: {0}")]
    ParseError(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("No package match: {0}")]
    MatchError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl From<db::DbError> for NdcCalcError {
    fn from(e: db::DbError) -> Self {
        NdcCalcError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for NdcCalcError {
    fn from(e: serde_json::Error) -> Self {
        NdcCalcError::SerializationError(e.to_string())
    }
}

impl From<parser::ParseError> for NdcCalcError {
    fn from(e: parser::ParseError) -> Self {
        NdcCalcError::ParseError(e.to_string())
    }
}

impl From<quantity::QuantityError> for NdcCalcError {
    fn from(e: quantity::QuantityError) -> Self {
        NdcCalcError::CalculationError(e.to_string())
    }
}

impl From<matcher::MatchError> for NdcCalcError {
    fn from(e: matcher::MatchError) -> Self {
        NdcCalcError::MatchError(e.to_string())
    }
}

impl From<vocabulary::NdcError> for NdcCalcError {
    fn from(e: vocabulary::NdcError) -> Self {
        NdcCalcError::InvalidInput(e.to_string())
    }
}

impl From<config::ConfigError> for NdcCalcError {
    fn from(e: config::ConfigError) -> Self {
        NdcCalcError::InvalidInput(e.to_string())
    }
}

impl From<std::io::Error> for NdcCalcError {
    fn from(e: std::io::Error) -> Self {
        NdcCalcError::RuntimeError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for NdcCalcError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        NdcCalcError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Stateless Functions (exported to FFI)
// =========================================================================

/// Parse free-text directions into dose, frequency and unit.
#[uniffi::export]
pub fn parse_directions(text: String) -> Result<FfiParsedDirective, NdcCalcError> {
    let directive = parser::parse_directions(&text)?;
    Ok(directive.into())
}

/// Parse directions and compute the quantity for a days supply.
#[uniffi::export]
pub fn calculate_quantity(
    directions: String,
    days_supply: u32,
) -> Result<FfiQuantity, NdcCalcError> {
    let directive = parser::parse_directions(&directions)?;
    let quantity = quantity::calculate(&directive, days_supply)?;
    Ok(quantity.into())
}

/// Validate an NDC and return its 11-digit form.
#[uniffi::export]
pub fn normalize_ndc(ndc: String) -> Result<String, NdcCalcError> {
    Ok(vocabulary::normalize_ndc(&ndc)?)
}

/// Pick the best package combination for a target quantity.
#[uniffi::export]
pub fn match_packages(
    target_quantity: f64,
    packages: Vec<FfiPackage>,
) -> Result<FfiPackageMatch, NdcCalcError> {
    let records = packages
        .into_iter()
        .map(PackageRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let matched = matcher::match_packages(target_quantity, &records)?;
    Ok(matched.into())
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a drug directory at the given path.
#[uniffi::export]
pub fn open_directory(path: String) -> Result<Arc<NdcCalcCore>, NdcCalcError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(NdcCalcCore::new(db, EngineConfig::default())))
}

/// Open a drug directory with engine settings read from a TOML string.
#[uniffi::export]
pub fn open_directory_with_config(
    path: String,
    config_toml: String,
) -> Result<Arc<NdcCalcCore>, NdcCalcError> {
    let config = EngineConfig::from_toml_str(&config_toml)?;
    let db = Database::open(&path)?;
    Ok(Arc::new(NdcCalcCore::new(db, config)))
}

/// Create an in-memory drug directory (for testing).
#[uniffi::export]
pub fn open_directory_in_memory() -> Result<Arc<NdcCalcCore>, NdcCalcError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(NdcCalcCore::new(db, EngineConfig::default())))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe drug directory and calculator for FFI.
#[derive(uniffi::Object)]
pub struct NdcCalcCore {
    db: Arc<Mutex<Database>>,
    config: EngineConfig,
}

impl NdcCalcCore {
    fn new(db: Database, config: EngineConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config,
        }
    }
}

#[uniffi::export]
impl NdcCalcCore {
    // =========================================================================
    // Directory Operations
    // =========================================================================

    /// Add or update a drug concept.
    pub fn upsert_concept(&self, concept: FfiConcept) -> Result<(), NdcCalcError> {
        let db = self.db.lock()?;
        db.upsert_concept(&concept.into())?;
        Ok(())
    }

    /// Get a drug concept by RxCUI.
    pub fn get_concept(&self, rxcui: String) -> Result<Option<FfiConcept>, NdcCalcError> {
        let db = self.db.lock()?;
        let concept = db.get_concept(&rxcui)?;
        Ok(concept.map(|c| c.into()))
    }

    /// Add or update a package under a concept.
    pub fn upsert_package(&self, rxcui: String, package: FfiPackage) -> Result<(), NdcCalcError> {
        let record = PackageRecord::try_from(package)?;
        let db = self.db.lock()?;
        db.upsert_package(&rxcui, &record)?;
        Ok(())
    }

    /// Search concepts by name or synonym.
    pub fn search_concepts(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiConceptMatch>, NdcCalcError> {
        let db = self.db.lock()?;
        let matches = db.search_concepts(&query, limit as usize)?;
        Ok(matches.into_iter().map(|m| m.into()).collect())
    }

    // =========================================================================
    // Calculation
    // =========================================================================

    /// Run a calculation against this directory.
    ///
    /// Takes a JSON-encoded `CalculationRequest` and returns the
    /// JSON-encoded `CalculationResult`.
    pub fn calculate_json(&self, request_json: String) -> Result<String, NdcCalcError> {
        let request: CalculationRequest = serde_json::from_str(&request_json)?;

        let directory = LocalDirectory::from_shared(Arc::clone(&self.db));
        let orchestrator =
            CalculationOrchestrator::with_config(directory.clone(), directory, self.config.clone());

        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let result = runtime.block_on(orchestrator.calculate(request));
        Ok(result.to_json()?)
    }
}

// =========================================================================
// FFI-safe Types
// =========================================================================

/// FFI-safe parsed directions.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiParsedDirective {
    pub dose: f64,
    /// None for as-needed directions
    pub frequency_per_day: Option<f64>,
    pub as_needed: bool,
    pub unit: String,
    pub strategy: String,
    pub canonical_sig: String,
    pub notes: Vec<String>,
}

impl From<ParsedDirective> for FfiParsedDirective {
    fn from(directive: ParsedDirective) -> Self {
        Self {
            canonical_sig: directive.canonical_sig(),
            dose: directive.dose,
            frequency_per_day: directive.frequency.per_day(),
            as_needed: directive.frequency.is_as_needed(),
            strategy: format!("{:?}", directive.strategy),
            unit: directive.unit,
            notes: directive.notes,
        }
    }
}

/// FFI-safe computed quantity.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQuantity {
    pub quantity: f64,
    pub unit: String,
    pub raw_quantity: f64,
    pub days_supply: u32,
    pub breakdown: String,
}

impl From<quantity::Quantity> for FfiQuantity {
    fn from(quantity: quantity::Quantity) -> Self {
        Self {
            quantity: quantity.quantity,
            unit: quantity.unit,
            raw_quantity: quantity.raw_quantity,
            days_supply: quantity.days_supply,
            breakdown: quantity.breakdown,
        }
    }
}

/// FFI-safe drug concept.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConcept {
    pub rxcui: String,
    pub name: String,
    pub synonyms: Vec<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
}

impl From<DrugConcept> for FfiConcept {
    fn from(concept: DrugConcept) -> Self {
        Self {
            rxcui: concept.rxcui,
            name: concept.name,
            synonyms: concept.synonyms,
            dosage_form: concept.dosage_form,
            strength: concept.strength,
        }
    }
}

impl From<FfiConcept> for DrugConcept {
    fn from(concept: FfiConcept) -> Self {
        DrugConcept {
            rxcui: concept.rxcui,
            name: concept.name,
            synonyms: concept.synonyms,
            dosage_form: concept.dosage_form,
            strength: concept.strength,
        }
    }
}

/// FFI-safe concept search hit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConceptMatch {
    pub rxcui: String,
    pub name: String,
    pub confidence: f64,
}

impl From<models::ConceptMatch> for FfiConceptMatch {
    fn from(found: models::ConceptMatch) -> Self {
        Self {
            rxcui: found.concept.rxcui,
            name: found.concept.name,
            confidence: found.confidence,
        }
    }
}

/// FFI-safe NDC package. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPackage {
    pub code: String,
    pub manufacturer: String,
    pub package_size: u32,
    pub dosage_form: String,
    pub strength: String,
    pub active: bool,
    pub marketing_start: Option<String>,
    pub marketing_end: Option<String>,
}

impl TryFrom<FfiPackage> for PackageRecord {
    type Error = NdcCalcError;

    fn try_from(package: FfiPackage) -> Result<Self, Self::Error> {
        Ok(PackageRecord {
            code: package.code,
            manufacturer: package.manufacturer,
            package_size: package.package_size,
            dosage_form: package.dosage_form,
            strength: package.strength,
            status: if package.active {
                PackageStatus::Active
            } else {
                PackageStatus::Inactive
            },
            marketing_start: parse_ffi_date(package.marketing_start)?,
            marketing_end: parse_ffi_date(package.marketing_end)?,
        })
    }
}

fn parse_ffi_date(value: Option<String>) -> Result<Option<NaiveDate>, NdcCalcError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| NdcCalcError::InvalidInput(format!("date {s:?}: {e}")))
        })
        .transpose()
}

/// FFI-safe package line in a combination.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPackageLine {
    pub ndc: String,
    pub manufacturer: String,
    pub package_size: u32,
    pub count: u32,
}

/// FFI-safe package combination.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCombination {
    pub ndc: String,
    pub package_count: u32,
    pub total_quantity: u32,
    pub overfill_percent: f64,
    pub match_quality: String,
    pub score: f64,
    pub lines: Vec<FfiPackageLine>,
}

impl From<&models::Combination> for FfiCombination {
    fn from(combination: &models::Combination) -> Self {
        let recommendation = models::Recommendation::from(combination);
        Self {
            ndc: recommendation.ndc,
            package_count: recommendation.package_count,
            total_quantity: recommendation.total_quantity,
            overfill_percent: recommendation.overfill_percent,
            match_quality: format!("{:?}", recommendation.match_quality),
            score: recommendation.score,
            lines: recommendation
                .breakdown
                .into_iter()
                .map(|line| FfiPackageLine {
                    ndc: line.ndc,
                    manufacturer: line.manufacturer,
                    package_size: line.package_size,
                    count: line.count,
                })
                .collect(),
        }
    }
}

/// FFI-safe warning.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWarning {
    pub warning_type: String,
    pub severity: String,
    pub message: String,
}

impl From<Warning> for FfiWarning {
    fn from(warning: Warning) -> Self {
        Self {
            warning_type: format!("{:?}", warning.warning_type),
            severity: format!("{:?}", warning.severity),
            message: warning.message,
        }
    }
}

/// FFI-safe matcher output.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPackageMatch {
    pub recommendation: FfiCombination,
    pub alternatives: Vec<FfiCombination>,
    pub warnings: Vec<FfiWarning>,
}

impl From<PackageMatch> for FfiPackageMatch {
    fn from(matched: PackageMatch) -> Self {
        Self {
            recommendation: (&matched.recommendation).into(),
            alternatives: matched.alternatives.iter().map(|c| c.into()).collect(),
            warnings: matched.warnings.into_iter().map(|w| w.into()).collect(),
        }
    }
}
