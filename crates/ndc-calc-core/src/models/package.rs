//! NDC package models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::vocabulary::Ndc;

/// Marketing status of an NDC package.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Active,
    Inactive,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Active => "active",
            PackageStatus::Inactive => "inactive",
        }
    }
}

/// A single dispensable package from the NDC directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageRecord {
    /// NDC as published (hyphenated or bare digits)
    pub code: String,
    /// Labeler / manufacturer name
    pub manufacturer: String,
    /// Units per package, counted in the dosage form's dispensing unit
    pub package_size: u32,
    /// Dosage form (e.g., "TABLET", "SOLUTION")
    pub dosage_form: String,
    /// Strength (e.g., "10 mg")
    pub strength: String,
    /// Marketing status
    pub status: PackageStatus,
    /// Marketing start date
    pub marketing_start: Option<NaiveDate>,
    /// Marketing end date
    pub marketing_end: Option<NaiveDate>,
}

impl PackageRecord {
    /// Create an active package with required fields.
    pub fn new(code: impl Into<String>, package_size: u32) -> Self {
        Self {
            code: code.into(),
            manufacturer: String::new(),
            package_size,
            dosage_form: String::new(),
            strength: String::new(),
            status: PackageStatus::Active,
            marketing_start: None,
            marketing_end: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PackageStatus::Active
    }

    /// Check whether the package is within its marketing window on `date`.
    pub fn is_marketed_on(&self, date: NaiveDate) -> bool {
        let started = self.marketing_start.map_or(true, |start| start <= date);
        let not_ended = self.marketing_end.map_or(true, |end| end >= date);
        started && not_ended
    }

    /// Key used to compare codes across hyphenation layouts (see [`Ndc::key`]).
    ///
    /// Codes that do not parse as an NDC fall back to their trimmed text.
    pub fn ndc_key(&self) -> String {
        Ndc::parse(&self.code)
            .map(|ndc| ndc.key())
            .unwrap_or_else(|_| self.code.trim().to_string())
    }
}

/// Packages returned by a lookup, split by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageSet {
    pub active: Vec<PackageRecord>,
    pub inactive: Vec<PackageRecord>,
}

impl PackageSet {
    /// Split records by their status, preserving order.
    pub fn from_records(records: impl IntoIterator<Item = PackageRecord>) -> Self {
        let (active, inactive) = records.into_iter().partition(PackageRecord::is_active);
        Self { active, inactive }
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.inactive.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.inactive.len()
    }

    /// All records, active first.
    pub fn all(&self) -> Vec<PackageRecord> {
        self.active
            .iter()
            .chain(self.inactive.iter())
            .cloned()
            .collect()
    }
}
