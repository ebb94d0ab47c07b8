//! Calculation orchestrator.
//!
//! Runs one request through the pipeline and always produces a
//! [`CalculationResult`]:
//!
//! ```text
//! request → normalization → quantity (explicit | parse → calculate)
//!         → package lookup → matching → result
//! ```
//!
//! Normalization, parsing, quantity and package lookup failures abort the
//! pipeline and are recorded in `result.error`. Matching problems only add
//! warnings.

mod ports;

pub use ports::{DrugNormalizer, PackageKey, PackageSource};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::matcher::{MatchError, PackageMatch, PackageMatcher};
use crate::models::{
    CalculationDetails, CalculationRequest, CalculationResult, CalculationStatus,
    NormalizationResult, NormalizationSource, ParsedDirective, QuantitySource, Recommendation,
    Severity, StageError, StageErrorType, Warning, WarningType,
};
use crate::parser::{ParseError, SigParser};
use crate::quantity;
use crate::vocabulary::{dispensing_unit, normalize_unit, Ndc};

/// Unit reported for an explicit quantity when the dosage form is unknown.
const FALLBACK_UNIT: &str = "unit";

/// Why the pipeline stopped early.
enum PipelineError {
    Stage(StageError),
    Unexpected(anyhow::Error),
}

impl PipelineError {
    fn stage(error_type: StageErrorType, message: impl Into<String>, context: impl Serialize) -> Self {
        match serde_json::to_value(context) {
            Ok(context) => PipelineError::Stage(StageError {
                error_type,
                message: message.into(),
                context,
            }),
            Err(e) => PipelineError::Unexpected(
                anyhow::Error::new(e).context("failed to record stage context"),
            ),
        }
    }
}

type StageResult<T> = Result<T, PipelineError>;

/// Quantity stage output carried into matching.
struct QuantityOutcome {
    details: CalculationDetails,
    directive: Option<ParsedDirective>,
}

/// Drives a calculation across the normalizer, parser, quantity calculator,
/// package source and matcher.
pub struct CalculationOrchestrator<N: DrugNormalizer, S: PackageSource> {
    normalizer: N,
    packages: S,
    parser: SigParser,
    matcher: PackageMatcher,
    reference_date: Option<NaiveDate>,
}

impl<N: DrugNormalizer, S: PackageSource> CalculationOrchestrator<N, S> {
    pub fn new(normalizer: N, packages: S) -> Self {
        Self::with_config(normalizer, packages, EngineConfig::default())
    }

    pub fn with_config(normalizer: N, packages: S, config: EngineConfig) -> Self {
        Self {
            normalizer,
            packages,
            parser: SigParser::new(),
            matcher: PackageMatcher::new(config.matcher),
            reference_date: None,
        }
    }

    /// Fix the date marketing windows are checked against (defaults to today, UTC).
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Run a calculation. Failures are reported inside the result.
    pub async fn calculate(&self, request: CalculationRequest) -> CalculationResult {
        let mut result = CalculationResult::new(request.clone());
        info!(
            id = %result.id,
            drug_name = ?request.drug_name,
            ndc = ?request.ndc,
            "calculation started"
        );

        match self.run(&request, &mut result).await {
            Ok(()) => {
                result.status = CalculationStatus::from_warnings(&result.warnings);
            }
            Err(PipelineError::Stage(error)) => {
                warn!(
                    id = %result.id,
                    stage = ?error.error_type,
                    message = %error.message,
                    "calculation aborted"
                );
                result.error = Some(error);
                result.status = CalculationStatus::Error;
            }
            Err(PipelineError::Unexpected(e)) => {
                warn!(id = %result.id, error = %format!("{:#}", e), "unexpected calculation failure");
                result.error = Some(StageError {
                    error_type: StageErrorType::UnexpectedError,
                    message: format!("{:#}", e),
                    context: json!({}),
                });
                result.status = CalculationStatus::Error;
            }
        }

        info!(
            id = %result.id,
            status = ?result.status,
            warnings = result.warnings.len(),
            "calculation finished"
        );
        result
    }

    async fn run(&self, request: &CalculationRequest, result: &mut CalculationResult) -> StageResult<()> {
        let normalization = self.normalize(request).await?;
        debug!(stage = "normalization", source = ?normalization.source, identifier = ?normalization.identifier, "normalized");
        result.normalization = Some(normalization.clone());

        let outcome = self.determine_quantity(request, &normalization, &mut result.warnings)?;
        debug!(
            stage = "quantity",
            source = ?outcome.details.source,
            quantity = ?outcome.details.quantity,
            "quantity determined"
        );
        let target = outcome.details.quantity;
        result.calculation = Some(outcome.details);

        let key = package_key(&normalization)?;
        let packages = self.packages.fetch_packages(&key).await.map_err(|e| {
            PipelineError::stage(
                StageErrorType::PackageFetchFailed,
                format!("Package lookup failed: {:#}", e),
                json!({ "key": key }),
            )
        })?;
        debug!(stage = "packages", active = packages.active.len(), inactive = packages.inactive.len(), "packages fetched");

        if packages.is_empty() {
            warn!(key = ?key, "no packages found");
            result.warnings.push(
                Warning::new(
                    WarningType::NoPackagesFound,
                    Severity::Warning,
                    "No packages were found for this drug",
                )
                .with_data(json!({ "key": key })),
            );
        }
        let candidates = packages.all();
        result.packages = Some(packages);

        if candidates.is_empty() {
            return Ok(());
        }

        let Some(target) = target else {
            result.warnings.push(Warning::new(
                WarningType::MatchingSkipped,
                Severity::Info,
                "Package matching skipped because no quantity was determined",
            ));
            return Ok(());
        };

        match self.matcher.match_packages(target, &candidates) {
            Ok(matched) => {
                self.record_match(matched, outcome.directive.as_ref(), result);
            }
            Err(e) => {
                warn!(stage = "matching", error = %e, "package matching failed");
                result.warnings.extend(e.warnings().iter().cloned());
                result.warnings.push(match_failure_warning(&e, target));
            }
        }

        Ok(())
    }

    async fn normalize(&self, request: &CalculationRequest) -> StageResult<NormalizationResult> {
        if let Some(ndc) = non_empty(request.ndc.as_deref()) {
            return match Ndc::parse(ndc) {
                Ok(_) => Ok(NormalizationResult::direct_ndc(ndc)),
                Err(e) => Err(PipelineError::stage(
                    StageErrorType::NormalizationFailed,
                    format!("Invalid NDC: {}", e),
                    json!({ "ndc": ndc }),
                )),
            };
        }

        let Some(drug_name) = non_empty(request.drug_name.as_deref()) else {
            return Err(PipelineError::stage(
                StageErrorType::NormalizationFailed,
                "Either a drug name or an NDC is required",
                json!({ "drug_name": request.drug_name, "ndc": request.ndc }),
            ));
        };

        let normalization = self.normalizer.normalize(drug_name).await.map_err(|e| {
            PipelineError::stage(
                StageErrorType::NormalizationFailed,
                format!("Could not normalize '{}': {:#}", drug_name, e),
                json!({ "drug_name": drug_name }),
            )
        })?;

        let has_key = non_empty(normalization.identifier.as_deref()).is_some()
            || non_empty(normalization.ndc.as_deref()).is_some();
        if !has_key {
            return Err(PipelineError::stage(
                StageErrorType::NormalizationFailed,
                format!("No identifier found for '{}'", drug_name),
                json!({ "drug_name": drug_name, "normalization": normalization }),
            ));
        }

        Ok(normalization)
    }

    fn determine_quantity(
        &self,
        request: &CalculationRequest,
        normalization: &NormalizationResult,
        warnings: &mut Vec<Warning>,
    ) -> StageResult<QuantityOutcome> {
        if let Some(explicit) = request.quantity {
            if !(explicit > 0.0 && explicit.is_finite()) {
                return Err(PipelineError::stage(
                    StageErrorType::QuantityCalculationFailed,
                    format!("Quantity must be a positive number, found {}", explicit),
                    json!({ "quantity": explicit }),
                ));
            }
            let unit = normalization
                .dosage_form
                .as_deref()
                .and_then(dispensing_unit)
                .unwrap_or(FALLBACK_UNIT);
            return Ok(QuantityOutcome {
                details: CalculationDetails {
                    source: QuantitySource::Explicit,
                    parsed_directive: None,
                    quantity: Some(explicit),
                    unit: Some(unit.to_string()),
                    breakdown: Some(format!("{} {} (entered)", explicit, unit)),
                },
                directive: None,
            });
        }

        let Some(directions) = non_empty(request.directions.as_deref()) else {
            return Err(PipelineError::stage(
                StageErrorType::SigParsingFailed,
                "No directions or quantity supplied",
                json!({ "directions": request.directions }),
            ));
        };

        let directive = self.parser.parse(directions).map_err(|e| {
            let attempts = match &e {
                ParseError::Unrecognized { attempts, .. } => attempts.clone(),
                ParseError::Empty => Vec::new(),
            };
            PipelineError::stage(
                StageErrorType::SigParsingFailed,
                e.to_string(),
                json!({ "directions": directions, "attempts": attempts }),
            )
        })?;

        warnings.extend(directive.notes.iter().map(|note| {
            Warning::new(WarningType::ParseCaveat, Severity::Info, note.clone())
                .with_data(json!({ "directions": directions }))
        }));

        let Some(days_supply) = request.days_supply else {
            return Ok(QuantityOutcome {
                details: CalculationDetails {
                    source: QuantitySource::NotDetermined,
                    parsed_directive: Some(directive.clone()),
                    quantity: None,
                    unit: Some(directive.unit.clone()),
                    breakdown: None,
                },
                directive: Some(directive),
            });
        };

        let calculated = quantity::calculate(&directive, days_supply).map_err(|e| {
            PipelineError::stage(
                StageErrorType::QuantityCalculationFailed,
                e.to_string(),
                json!({ "directive": directive, "days_supply": days_supply }),
            )
        })?;
        warnings.extend(quantity::check_reasonableness(&calculated));

        Ok(QuantityOutcome {
            details: CalculationDetails {
                source: QuantitySource::Calculated,
                parsed_directive: Some(directive.clone()),
                quantity: Some(calculated.quantity),
                unit: Some(calculated.unit),
                breakdown: Some(calculated.breakdown),
            },
            directive: Some(directive),
        })
    }

    fn record_match(
        &self,
        matched: PackageMatch,
        directive: Option<&ParsedDirective>,
        result: &mut CalculationResult,
    ) {
        let PackageMatch {
            recommendation,
            alternatives,
            warnings,
        } = matched;
        result.warnings.extend(warnings);

        if let (Some(directive), Some(primary)) = (directive, recommendation.packages.first()) {
            if let Some(warning) = dosage_form_mismatch(directive, &primary.package) {
                result.warnings.push(warning);
            }
        }

        let today = self
            .reference_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        for package in recommendation
            .packages
            .iter()
            .map(|unit| &unit.package)
            .filter(|package| !package.is_marketed_on(today))
        {
            // Only a past end date is reported
            if let Some(end) = package.marketing_end.filter(|end| *end < today) {
                result.warnings.push(
                    Warning::new(
                        WarningType::MarketingEnded,
                        Severity::Info,
                        format!("NDC {} marketing ended on {}", package.code, end),
                    )
                    .with_data(json!({ "ndc": package.code, "marketing_end": end })),
                );
            }
        }

        debug!(
            stage = "matching",
            recommendation = %recommendation.describe(),
            alternatives = alternatives.len(),
            "recommendation selected"
        );
        result.recommendation = Some(Recommendation::from(&recommendation));
        result.alternatives = alternatives.iter().map(Recommendation::from).collect();
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn package_key(normalization: &NormalizationResult) -> StageResult<PackageKey> {
    let identifier = non_empty(normalization.identifier.as_deref());
    let ndc = non_empty(normalization.ndc.as_deref());

    match (normalization.source, identifier, ndc) {
        (NormalizationSource::DirectNdc, _, Some(ndc)) => Ok(PackageKey::Ndc(ndc.to_string())),
        (_, Some(identifier), _) => Ok(PackageKey::Identifier(identifier.to_string())),
        (_, None, Some(ndc)) => Ok(PackageKey::Ndc(ndc.to_string())),
        (_, None, None) => Err(PipelineError::Unexpected(anyhow::anyhow!(
            "normalization produced neither an identifier nor an NDC"
        ))),
    }
}

/// Directive unit that disagrees with what the package is counted in.
fn dosage_form_mismatch(
    directive: &ParsedDirective,
    package: &crate::models::PackageRecord,
) -> Option<Warning> {
    let package_unit = dispensing_unit(&package.dosage_form)?;
    let directive_unit = normalize_unit(&directive.unit).unwrap_or(directive.unit.as_str());
    if directive_unit == package_unit {
        return None;
    }
    Some(
        Warning::new(
            WarningType::DosageFormMismatch,
            Severity::Warning,
            format!(
                "Directions are in {} but NDC {} is dispensed in {} ({})",
                directive_unit, package.code, package_unit, package.dosage_form
            ),
        )
        .with_data(json!({
            "directive_unit": directive_unit,
            "package_unit": package_unit,
            "dosage_form": package.dosage_form,
        })),
    )
}

fn match_failure_warning(error: &MatchError, target: f64) -> Warning {
    let warning_type = match error {
        MatchError::NoActivePackages { .. } => WarningType::NoActivePackages,
        _ => WarningType::NoMatch,
    };
    Warning::new(warning_type, Severity::Warning, error.to_string())
        .with_data(json!({ "target": target }))
}
