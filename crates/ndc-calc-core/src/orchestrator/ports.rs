//! Collaborators the orchestrator depends on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{NormalizationResult, PackageSet};

/// Resolves a drug name to a concept identifier.
#[async_trait]
pub trait DrugNormalizer: Send + Sync {
    async fn normalize(&self, drug_name: &str) -> anyhow::Result<NormalizationResult>;
}

/// What to look packages up by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PackageKey {
    /// Concept identifier (RxCUI)
    Identifier(String),
    /// A specific NDC; sources return it with its sibling packages
    Ndc(String),
}

/// Supplies candidate packages, split into active and inactive.
#[async_trait]
pub trait PackageSource: Send + Sync {
    async fn fetch_packages(&self, key: &PackageKey) -> anyhow::Result<PackageSet>;
}
