//! SQLite-backed drug directory implementing the orchestrator's collaborators.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tracing::debug;

use super::Database;
use crate::models::{NormalizationResult, PackageSet};
use crate::orchestrator::{DrugNormalizer, PackageKey, PackageSource};

/// Shared handle to a local drug directory.
///
/// Every operation takes the connection lock, runs synchronously and
/// releases it before returning.
#[derive(Clone)]
pub struct LocalDirectory {
    db: Arc<Mutex<Database>>,
}

impl LocalDirectory {
    pub fn new(db: Database) -> Self {
        Self::from_shared(Arc::new(Mutex::new(db)))
    }

    pub fn from_shared(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| anyhow!("drug directory lock poisoned"))
    }
}

#[async_trait]
impl DrugNormalizer for LocalDirectory {
    async fn normalize(&self, drug_name: &str) -> anyhow::Result<NormalizationResult> {
        let best = {
            let db = self.lock()?;
            db.search_concepts(drug_name, 1)
                .with_context(|| format!("searching concepts for {drug_name:?}"))?
                .into_iter()
                .next()
        };

        let found = best.ok_or_else(|| anyhow!("no drug concept matches {drug_name:?}"))?;
        debug!(
            drug_name,
            rxcui = %found.concept.rxcui,
            confidence = found.confidence,
            "resolved drug name"
        );

        let concept = found.concept;
        let mut result = NormalizationResult::rxnorm(concept.rxcui, concept.name);
        result.dosage_form = concept.dosage_form;
        result.strength = concept.strength;
        Ok(result)
    }
}

#[async_trait]
impl PackageSource for LocalDirectory {
    async fn fetch_packages(&self, key: &PackageKey) -> anyhow::Result<PackageSet> {
        let db = self.lock()?;
        let packages = match key {
            PackageKey::Identifier(rxcui) => db
                .packages_for_concept(rxcui)
                .with_context(|| format!("loading packages for concept {rxcui}"))?,
            PackageKey::Ndc(ndc) => db
                .packages_for_ndc(ndc)
                .with_context(|| format!("loading packages for NDC {ndc}"))?,
        };
        debug!(
            active = packages.active.len(),
            inactive = packages.inactive.len(),
            "loaded packages"
        );
        Ok(packages)
    }
}
