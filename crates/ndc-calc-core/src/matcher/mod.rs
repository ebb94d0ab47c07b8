//! Package matcher.
//!
//! Picks the package combination that best covers a target quantity:
//! 1. Validate the target and candidates; inactive NDCs are reported, never used
//! 2. Generate single-NDC counts and greedy two-NDC pairs
//! 3. Keep combinations within -5% / +10% of the target
//! 4. Rank by score (lower wins); the best is recommended, the next few are alternatives

mod combinations;
mod scoring;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::models::{Combination, PackageRecord, Severity, Warning, WarningType};

/// Largest overfill admitted, in percent of the target.
pub const MAX_OVERFILL_PERCENT: f64 = 10.0;
/// Largest underfill admitted, in percent of the target.
pub const MAX_UNDERFILL_PERCENT: f64 = 5.0;
/// Overfill up to this is labelled a slight overfill.
pub const PREFERRED_OVERFILL_PERCENT: f64 = 5.0;
/// Largest target quantity accepted.
pub const MAX_TARGET_QUANTITY: f64 = 1_000_000.0;

/// Matcher errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Target quantity must be a positive number no larger than 1000000, found {0}")]
    InvalidQuantity(f64),

    #[error("No candidate packages")]
    NoPackages,

    #[error("None of the candidate packages is active")]
    NoActivePackages { warnings: Vec<Warning> },

    #[error("No package combination within tolerance of {target}")]
    NoCombinationWithinTolerance { target: f64, warnings: Vec<Warning> },
}

impl MatchError {
    /// Warnings gathered before the matcher gave up.
    pub fn warnings(&self) -> &[Warning] {
        match self {
            MatchError::NoActivePackages { warnings }
            | MatchError::NoCombinationWithinTolerance { warnings, .. } => warnings,
            MatchError::InvalidQuantity(_) | MatchError::NoPackages => &[],
        }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;

/// Matcher options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatcherConfig {
    /// Alternatives returned after the recommendation
    pub max_alternatives: usize,
    /// Consider two-NDC combinations
    pub allow_multiple_packages: bool,
    /// When nothing fits the window, rank everything instead of failing
    pub relax_tolerance_when_unmatched: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_alternatives: 5,
            allow_multiple_packages: true,
            relax_tolerance_when_unmatched: false,
        }
    }
}

/// Matcher output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageMatch {
    pub recommendation: Combination,
    /// Next best combinations, best first
    pub alternatives: Vec<Combination>,
    pub warnings: Vec<Warning>,
}

/// Package matcher.
#[derive(Debug, Clone, Default)]
pub struct PackageMatcher {
    config: MatcherConfig,
}

impl PackageMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Choose the best combination of `candidates` for `target` units.
    pub fn match_packages(&self, target: f64, candidates: &[PackageRecord]) -> MatchResult<PackageMatch> {
        if !(target > 0.0 && target.is_finite() && target <= MAX_TARGET_QUANTITY) {
            return Err(MatchError::InvalidQuantity(target));
        }
        if candidates.is_empty() {
            return Err(MatchError::NoPackages);
        }

        let mut warnings = Vec::new();
        let (mut usable, any_active) = screen_candidates(candidates, &mut warnings);
        if !any_active {
            return Err(MatchError::NoActivePackages { warnings });
        }

        usable.sort_by(|a, b| {
            b.package_size
                .cmp(&a.package_size)
                .then_with(|| a.ndc_key().cmp(&b.ndc_key()))
        });

        let generated = combinations::generate(target, &usable, self.config.allow_multiple_packages);
        let generated_count = generated.len();
        let (admitted, rejected): (Vec<_>, Vec<_>) = generated
            .into_iter()
            .partition(|c| scoring::within_tolerance(c.overfill_percent));

        debug!(
            target,
            candidates = candidates.len(),
            usable = usable.len(),
            generated = generated_count,
            admitted = admitted.len(),
            "matched packages"
        );

        let mut ranked = if !admitted.is_empty() {
            admitted
        } else if self.config.relax_tolerance_when_unmatched && !rejected.is_empty() {
            warnings.push(
                Warning::new(
                    WarningType::ToleranceExceeded,
                    Severity::Warning,
                    format!(
                        "No combination within -{}%/+{}% of {}; showing the closest available",
                        MAX_UNDERFILL_PERCENT, MAX_OVERFILL_PERCENT, target
                    ),
                )
                .with_data(json!({ "target": target })),
            );
            rejected
        } else {
            return Err(MatchError::NoCombinationWithinTolerance { target, warnings });
        };

        ranked.sort_by(scoring::rank);
        let mut ranked = ranked.into_iter();
        let Some(recommendation) = ranked.next() else {
            return Err(MatchError::NoCombinationWithinTolerance { target, warnings });
        };
        let alternatives: Vec<Combination> = ranked.take(self.config.max_alternatives).collect();

        if recommendation.match_quality.is_underfill() {
            warnings.push(
                Warning::new(
                    WarningType::Underfill,
                    Severity::Warning,
                    format!(
                        "Recommended packages supply {} of {} units ({:.1}% short)",
                        recommendation.total_quantity,
                        target,
                        recommendation.overfill_percent.abs()
                    ),
                )
                .with_data(json!({
                    "target": target,
                    "total_quantity": recommendation.total_quantity,
                    "overfill_percent": recommendation.overfill_percent,
                })),
            );
        }

        Ok(PackageMatch {
            recommendation,
            alternatives,
            warnings,
        })
    }
}

/// Drop inactive and unusable records, warning about each, then duplicate
/// active codes. Returns the usable packages and whether any candidate was active.
fn screen_candidates(candidates: &[PackageRecord], warnings: &mut Vec<Warning>) -> (Vec<PackageRecord>, bool) {
    let mut seen = HashSet::new();
    let mut usable = Vec::new();
    let mut any_active = false;

    for package in candidates {
        if !package.is_active() {
            warnings.push(
                Warning::new(
                    WarningType::InactiveNdc,
                    Severity::Warning,
                    format!("NDC {} is inactive and was not considered", package.code),
                )
                .with_data(json!({ "ndc": package.code })),
            );
            continue;
        }
        any_active = true;

        if package.package_size == 0 {
            warnings.push(
                Warning::new(
                    WarningType::InvalidPackage,
                    Severity::Warning,
                    format!("NDC {} has no package size and was ignored", package.code),
                )
                .with_data(json!({ "ndc": package.code })),
            );
            continue;
        }

        if !seen.insert(package.ndc_key()) {
            continue;
        }
        usable.push(package.clone());
    }

    (usable, any_active)
}

/// Match with the default configuration.
pub fn match_packages(target: f64, candidates: &[PackageRecord]) -> MatchResult<PackageMatch> {
    PackageMatcher::default().match_packages(target, candidates)
}
