//! End-to-end calculation scenarios against stub collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use ndc_calc_core::models::{
    CalculationRequest, CalculationStatus, NormalizationResult, NormalizationSource,
    PackageRecord, PackageSet, PackageStatus, QuantitySource, StageErrorType, WarningType,
};
use ndc_calc_core::orchestrator::{
    CalculationOrchestrator, DrugNormalizer, PackageKey, PackageSource,
};

/// Normalizer that answers every name with the same concept and counts calls.
#[derive(Clone, Default)]
struct StubNormalizer {
    calls: Arc<AtomicUsize>,
    dosage_form: Option<&'static str>,
    fail: bool,
}

#[async_trait]
impl DrugNormalizer for StubNormalizer {
    async fn normalize(&self, drug_name: &str) -> anyhow::Result<NormalizationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("terminology service unavailable");
        }
        let mut result = NormalizationResult::rxnorm("314076", drug_name);
        result.dosage_form = self.dosage_form.map(str::to_string);
        Ok(result)
    }
}

/// Package source returning a fixed set and recording the keys it was asked for.
#[derive(Clone, Default)]
struct StubPackages {
    set: PackageSet,
    keys: Arc<Mutex<Vec<PackageKey>>>,
    fail: bool,
}

impl StubPackages {
    fn with(records: Vec<PackageRecord>) -> Self {
        Self {
            set: PackageSet::from_records(records),
            ..Self::default()
        }
    }

    fn keys(&self) -> Vec<PackageKey> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageSource for StubPackages {
    async fn fetch_packages(&self, key: &PackageKey) -> anyhow::Result<PackageSet> {
        self.keys.lock().unwrap().push(key.clone());
        if self.fail {
            anyhow::bail!("connection reset");
        }
        Ok(self.set.clone())
    }
}

fn tablets(code: &str, size: u32) -> PackageRecord {
    PackageRecord {
        manufacturer: "Lupin".into(),
        dosage_form: "TABLET".into(),
        ..PackageRecord::new(code, size)
    }
}

fn bid_for_thirty_days() -> CalculationRequest {
    CalculationRequest::for_drug("lisinopril 10 mg")
        .with_directions("Take 1 tablet by mouth twice daily")
        .with_days_supply(30)
}

#[tokio::test]
async fn test_happy_path() {
    let packages = StubPackages::with(vec![tablets("68180-513-01", 30), tablets("68180-513-02", 90)]);
    let orchestrator = CalculationOrchestrator::new(StubNormalizer::default(), packages.clone());

    let result = orchestrator.calculate(bid_for_thirty_days()).await;

    assert_eq!(result.status, CalculationStatus::Success);
    assert!(result.error.is_none());
    assert!(result.warnings.is_empty());
    assert_eq!(packages.keys(), vec![PackageKey::Identifier("314076".into())]);

    let calculation = result.calculation.as_ref().unwrap();
    assert_eq!(calculation.source, QuantitySource::Calculated);
    assert_eq!(calculation.quantity, Some(60.0));
    assert_eq!(calculation.unit.as_deref(), Some("tablet"));

    let recommendation = result.recommendation.as_ref().unwrap();
    assert_eq!(recommendation.ndc, "68180-513-01");
    assert_eq!(recommendation.package_count, 2);
    assert_eq!(recommendation.total_quantity, 60);
    assert_eq!(recommendation.breakdown.len(), 1);
    assert_eq!(recommendation.breakdown[0].count, 2);

    // The result is self-describing JSON
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["inputs"]["days_supply"], 30);
}

#[tokio::test]
async fn test_ndc_passthrough_skips_normalizer() {
    let normalizer = StubNormalizer::default();
    let packages = StubPackages::with(vec![tablets("68180-513-01", 30)]);
    let orchestrator = CalculationOrchestrator::new(normalizer.clone(), packages.clone());

    let request = CalculationRequest::for_ndc("68180-513-01")
        .with_directions("Take 1 tablet daily")
        .with_days_supply(30);
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Success);
    assert_eq!(normalizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        result.normalization.as_ref().map(|n| n.source),
        Some(NormalizationSource::DirectNdc)
    );
    assert_eq!(packages.keys(), vec![PackageKey::Ndc("68180-513-01".into())]);
    assert_eq!(result.recommendation.unwrap().total_quantity, 30);
}

#[tokio::test]
async fn test_invalid_ndc_fails_normalization() {
    let packages = StubPackages::default();
    let orchestrator = CalculationOrchestrator::new(StubNormalizer::default(), packages.clone());

    let result = orchestrator
        .calculate(CalculationRequest::for_ndc("12-34").with_quantity(30.0))
        .await;

    assert_eq!(result.status, CalculationStatus::Error);
    let error = result.error.unwrap();
    assert_eq!(error.error_type, StageErrorType::NormalizationFailed);
    assert_eq!(error.context["ndc"], "12-34");
    assert!(packages.keys().is_empty());
}

#[tokio::test]
async fn test_missing_drug_and_ndc() {
    let orchestrator = CalculationOrchestrator::new(StubNormalizer::default(), StubPackages::default());

    let request = CalculationRequest {
        drug_name: Some("   ".into()),
        ..CalculationRequest::default()
    };
    let result = orchestrator.calculate(request).await;

    assert_eq!(
        result.error.map(|e| e.error_type),
        Some(StageErrorType::NormalizationFailed)
    );
}

#[tokio::test]
async fn test_explicit_quantity_uses_dosage_form_unit() {
    let normalizer = StubNormalizer {
        dosage_form: Some("TABLET"),
        ..StubNormalizer::default()
    };
    let orchestrator = CalculationOrchestrator::new(
        normalizer,
        StubPackages::with(vec![tablets("68180-513-01", 30)]),
    );

    let request = CalculationRequest::for_drug("lisinopril")
        .with_quantity(60.0)
        .with_directions("this is ignored when a quantity is given");
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Success);
    let calculation = result.calculation.unwrap();
    assert_eq!(calculation.source, QuantitySource::Explicit);
    assert_eq!(calculation.quantity, Some(60.0));
    assert_eq!(calculation.unit.as_deref(), Some("tablet"));
    assert!(calculation.parsed_directive.is_none());
    assert_eq!(result.recommendation.unwrap().total_quantity, 60);
}

#[tokio::test]
async fn test_explicit_quantity_must_be_positive() {
    let orchestrator = CalculationOrchestrator::new(StubNormalizer::default(), StubPackages::default());

    let result = orchestrator
        .calculate(CalculationRequest::for_drug("lisinopril").with_quantity(-5.0))
        .await;

    assert_eq!(
        result.error.map(|e| e.error_type),
        Some(StageErrorType::QuantityCalculationFailed)
    );
}

#[tokio::test]
async fn test_as_needed_cannot_be_quantified() {
    let orchestrator = CalculationOrchestrator::new(
        StubNormalizer::default(),
        StubPackages::with(vec![tablets("68180-513-01", 30)]),
    );

    let request = CalculationRequest::for_drug("ibuprofen")
        .with_directions("Take 1 tablet as needed for pain")
        .with_days_supply(30);
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Error);
    assert_eq!(
        result.error.as_ref().map(|e| e.error_type),
        Some(StageErrorType::QuantityCalculationFailed)
    );
    assert!(result.normalization.is_some());
    assert!(result.recommendation.is_none());
}

#[tokio::test]
async fn test_no_packages_is_partial() {
    let orchestrator = CalculationOrchestrator::new(StubNormalizer::default(), StubPackages::default());

    let result = orchestrator.calculate(bid_for_thirty_days()).await;

    assert_eq!(result.status, CalculationStatus::Partial);
    assert!(result.error.is_none());
    assert_eq!(result.quantity(), Some(60.0));
    assert_eq!(result.warnings_of(WarningType::NoPackagesFound).len(), 1);
    assert!(result.recommendation.is_none());
}

#[tokio::test]
async fn test_only_inactive_packages() {
    let inactive = PackageRecord {
        status: PackageStatus::Inactive,
        ..tablets("0093-1111-01", 60)
    };
    let orchestrator =
        CalculationOrchestrator::new(StubNormalizer::default(), StubPackages::with(vec![inactive]));

    let result = orchestrator.calculate(bid_for_thirty_days()).await;

    assert_eq!(result.status, CalculationStatus::Partial);
    assert_eq!(result.warnings_of(WarningType::InactiveNdc).len(), 1);
    assert_eq!(result.warnings_of(WarningType::NoActivePackages).len(), 1);
    assert!(result.recommendation.is_none());
    assert_eq!(result.packages.unwrap().inactive.len(), 1);
}

#[tokio::test]
async fn test_normalizer_failure() {
    let normalizer = StubNormalizer {
        fail: true,
        ..StubNormalizer::default()
    };
    let orchestrator = CalculationOrchestrator::new(normalizer, StubPackages::default());

    let result = orchestrator.calculate(bid_for_thirty_days()).await;

    assert_eq!(result.status, CalculationStatus::Error);
    let error = result.error.unwrap();
    assert_eq!(error.error_type, StageErrorType::NormalizationFailed);
    assert!(error.message.contains("terminology service unavailable"));
    assert!(result.normalization.is_none());
}

#[tokio::test]
async fn test_package_source_failure() {
    let packages = StubPackages {
        fail: true,
        ..StubPackages::default()
    };
    let orchestrator = CalculationOrchestrator::new(StubNormalizer::default(), packages);

    let result = orchestrator.calculate(bid_for_thirty_days()).await;

    assert_eq!(result.status, CalculationStatus::Error);
    let error = result.error.unwrap();
    assert_eq!(error.error_type, StageErrorType::PackageFetchFailed);
    assert!(error.message.contains("connection reset"));
    // Earlier stages are kept for the audit trail
    assert_eq!(result.calculation.unwrap().quantity, Some(60.0));
}

#[tokio::test]
async fn test_directions_without_days_supply() {
    let orchestrator = CalculationOrchestrator::new(
        StubNormalizer::default(),
        StubPackages::with(vec![tablets("68180-513-01", 30)]),
    );

    let request = CalculationRequest::for_drug("lisinopril").with_directions("Take 1 tablet daily");
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Partial);
    let calculation = result.calculation.as_ref().unwrap();
    assert_eq!(calculation.source, QuantitySource::NotDetermined);
    assert!(calculation.quantity.is_none());
    assert!(calculation.parsed_directive.is_some());
    assert_eq!(result.warnings_of(WarningType::MatchingSkipped).len(), 1);
    assert!(result.recommendation.is_none());
}

#[tokio::test]
async fn test_unparseable_directions() {
    let orchestrator = CalculationOrchestrator::new(StubNormalizer::default(), StubPackages::default());

    let request = CalculationRequest::for_drug("lisinopril")
        .with_directions("Take as directed")
        .with_days_supply(30);
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Error);
    let error = result.error.unwrap();
    assert_eq!(error.error_type, StageErrorType::SigParsingFailed);
    assert_eq!(error.context["directions"], "Take as directed");
    assert_eq!(error.context["attempts"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_marketing_ended() {
    let discontinued = PackageRecord {
        marketing_end: NaiveDate::from_ymd_opt(2020, 12, 31),
        ..tablets("68180-513-01", 60)
    };
    let orchestrator =
        CalculationOrchestrator::new(StubNormalizer::default(), StubPackages::with(vec![discontinued]))
            .with_reference_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    let result = orchestrator.calculate(bid_for_thirty_days()).await;

    assert_eq!(result.status, CalculationStatus::Partial);
    assert_eq!(result.warnings_of(WarningType::MarketingEnded).len(), 1);
    assert_eq!(result.recommendation.unwrap().total_quantity, 60);
}

#[tokio::test]
async fn test_marketing_window_still_open() {
    let last_day = PackageRecord {
        marketing_start: NaiveDate::from_ymd_opt(2015, 3, 1),
        marketing_end: NaiveDate::from_ymd_opt(2024, 1, 1),
        ..tablets("68180-513-01", 60)
    };
    let orchestrator =
        CalculationOrchestrator::new(StubNormalizer::default(), StubPackages::with(vec![last_day]))
            .with_reference_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    let result = orchestrator.calculate(bid_for_thirty_days()).await;

    assert_eq!(result.status, CalculationStatus::Success);
    assert!(result.warnings_of(WarningType::MarketingEnded).is_empty());
}

#[tokio::test]
async fn test_twenty_eight_day_overfill() {
    let orchestrator = CalculationOrchestrator::new(
        StubNormalizer::default(),
        StubPackages::with(vec![tablets("68180-513-01", 30)]),
    );

    let request = CalculationRequest::for_drug("lisinopril")
        .with_directions("Take 1 tablet daily")
        .with_days_supply(28);
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.quantity(), Some(28.0));
    let recommendation = result.recommendation.unwrap();
    assert_eq!(recommendation.total_quantity, 30);
    assert!((recommendation.overfill_percent - 7.142857).abs() < 1e-4);
}

#[tokio::test]
async fn test_dosage_form_mismatch_warned() {
    let orchestrator = CalculationOrchestrator::new(
        StubNormalizer::default(),
        StubPackages::with(vec![tablets("68180-513-01", 300)]),
    );

    let request = CalculationRequest::for_drug("amoxicillin")
        .with_directions("Take 5 mL by mouth twice daily")
        .with_days_supply(30);
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Partial);
    assert_eq!(result.warnings_of(WarningType::DosageFormMismatch).len(), 1);
}
