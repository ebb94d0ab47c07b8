//! Package combination models for the matcher.

use serde::{Deserialize, Serialize};

use super::package::PackageRecord;
use crate::matcher::{MAX_OVERFILL_PERCENT, MAX_UNDERFILL_PERCENT, PREFERRED_OVERFILL_PERCENT};

/// Overfill within this distance of zero counts as exact.
const EXACT_EPSILON: f64 = 1e-9;

/// How closely a combination's total matches the target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Exact,
    SlightOverfill,
    ModerateOverfill,
    ExcessiveOverfill,
    SlightUnderfill,
    SignificantUnderfill,
}

impl MatchQuality {
    /// Label an overfill percentage (negative means underfill).
    pub fn from_overfill(overfill_percent: f64) -> Self {
        if overfill_percent.abs() < EXACT_EPSILON {
            MatchQuality::Exact
        } else if overfill_percent > 0.0 {
            if overfill_percent <= PREFERRED_OVERFILL_PERCENT {
                MatchQuality::SlightOverfill
            } else if overfill_percent <= MAX_OVERFILL_PERCENT {
                MatchQuality::ModerateOverfill
            } else {
                MatchQuality::ExcessiveOverfill
            }
        } else if overfill_percent.abs() <= MAX_UNDERFILL_PERCENT {
            MatchQuality::SlightUnderfill
        } else {
            MatchQuality::SignificantUnderfill
        }
    }

    pub fn is_underfill(&self) -> bool {
        matches!(
            self,
            MatchQuality::SlightUnderfill | MatchQuality::SignificantUnderfill
        )
    }
}

/// A number of units of one package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageUnit {
    pub package: PackageRecord,
    pub count: u32,
}

impl PackageUnit {
    pub fn quantity(&self) -> u32 {
        self.package.package_size.saturating_mul(self.count)
    }
}

/// One or more package units scored against a target quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Combination {
    /// Packages used, largest contribution first
    pub packages: Vec<PackageUnit>,
    /// Sum of all package units
    pub total_quantity: u32,
    /// (total - target) / target * 100
    pub overfill_percent: f64,
    /// Ranking score (lower wins)
    pub score: f64,
    /// Quality label derived from `overfill_percent`
    pub match_quality: MatchQuality,
}

impl Combination {
    /// Total package units dispensed.
    pub fn unit_count(&self) -> u32 {
        self.packages
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.count))
    }

    /// Number of distinct NDCs used.
    pub fn distinct_ndcs(&self) -> usize {
        self.packages.len()
    }

    /// Mean size of the dispensed package units.
    pub fn average_package_size(&self) -> f64 {
        let units = self.unit_count();
        if units == 0 {
            return 0.0;
        }
        f64::from(self.total_quantity) / f64::from(units)
    }

    /// NDC contributing the most units of quantity.
    pub fn primary_ndc(&self) -> Option<&str> {
        self.packages.first().map(|p| p.package.code.as_str())
    }

    /// Stable textual key, e.g. `00002322830x2+00002322860x1`.
    pub fn key(&self) -> String {
        let mut parts: Vec<String> = self
            .packages
            .iter()
            .map(|p| format!("{}x{}", p.package.ndc_key(), p.count))
            .collect();
        parts.sort();
        parts.join("+")
    }

    /// Human-readable breakdown, e.g. `2 x 30 (12345-6789-1)`.
    pub fn describe(&self) -> String {
        self.packages
            .iter()
            .map(|p| format!("{} x {} ({})", p.count, p.package.package_size, p.package.code))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}
