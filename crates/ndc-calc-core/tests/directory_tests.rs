//! Calculations backed by an on-disk drug directory.

use std::io::Write;

use ndc_calc_core::models::{
    CalculationRequest, CalculationStatus, DrugConcept, PackageRecord, PackageStatus,
    StageErrorType, WarningType,
};
use ndc_calc_core::{CalculationOrchestrator, Database, EngineConfig, LocalDirectory};
use tempfile::{tempdir, NamedTempFile};

fn seed(db: &Database) {
    let mut lisinopril = DrugConcept::new("314076", "lisinopril 10 MG Oral Tablet");
    lisinopril.synonyms = vec!["Prinivil".into(), "Zestril".into()];
    lisinopril.dosage_form = Some("TABLET".into());
    lisinopril.strength = Some("10 MG".into());
    db.upsert_concept(&lisinopril).unwrap();

    let mut amoxicillin = DrugConcept::new("308191", "amoxicillin 250 MG/5 ML Oral Suspension");
    amoxicillin.dosage_form = Some("SUSPENSION".into());
    db.upsert_concept(&amoxicillin).unwrap();

    for (code, size) in [("68180-513-01", 30), ("68180-513-02", 90)] {
        let package = PackageRecord {
            manufacturer: "Lupin".into(),
            dosage_form: "TABLET".into(),
            ..PackageRecord::new(code, size)
        };
        db.upsert_package("314076", &package).unwrap();
    }
    let retired = PackageRecord {
        status: PackageStatus::Inactive,
        dosage_form: "TABLET".into(),
        ..PackageRecord::new("0093-1111-01", 60)
    };
    db.upsert_package("314076", &retired).unwrap();

    let suspension = PackageRecord {
        dosage_form: "SUSPENSION".into(),
        ..PackageRecord::new("65862-015-05", 100)
    };
    db.upsert_package("308191", &suspension).unwrap();
}

fn orchestrator(directory: LocalDirectory) -> CalculationOrchestrator<LocalDirectory, LocalDirectory> {
    CalculationOrchestrator::new(directory.clone(), directory)
}

#[tokio::test]
async fn test_brand_name_calculation_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("directory.db");
    seed(&Database::open(&path).unwrap());

    // Reopen to prove the data is on disk
    let directory = LocalDirectory::new(Database::open(&path).unwrap());
    let request = CalculationRequest::for_drug("zestril")
        .with_directions("Take 1 tablet by mouth twice daily")
        .with_days_supply(30);
    let result = orchestrator(directory).calculate(request).await;

    let normalization = result.normalization.as_ref().unwrap();
    assert_eq!(normalization.identifier.as_deref(), Some("314076"));
    assert_eq!(normalization.dosage_form.as_deref(), Some("TABLET"));

    // The inactive sibling is reported but never recommended
    assert_eq!(result.status, CalculationStatus::Partial);
    assert_eq!(result.warnings_of(WarningType::InactiveNdc).len(), 1);
    let recommendation = result.recommendation.unwrap();
    assert_eq!(recommendation.ndc, "68180-513-01");
    assert_eq!(recommendation.total_quantity, 60);
}

#[tokio::test]
async fn test_ndc_lookup_returns_siblings() {
    let db = Database::open_in_memory().unwrap();
    seed(&db);
    let directory = LocalDirectory::new(db);

    // 11-digit form of 68180-513-02
    let request = CalculationRequest::for_ndc("68180051302")
        .with_directions("Take 1 tablet daily")
        .with_days_supply(90);
    let result = orchestrator(directory).calculate(request).await;

    assert_eq!(result.packages.as_ref().map(|p| p.len()), Some(3));
    let recommendation = result.recommendation.unwrap();
    assert_eq!(recommendation.ndc, "68180-513-02");
    assert_eq!(recommendation.package_count, 1);
}

#[tokio::test]
async fn test_unknown_drug_fails_normalization() {
    let db = Database::open_in_memory().unwrap();
    seed(&db);

    let request = CalculationRequest::for_drug("xyzzy")
        .with_directions("Take 1 tablet daily")
        .with_days_supply(30);
    let result = orchestrator(LocalDirectory::new(db)).calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Error);
    assert_eq!(
        result.error.map(|e| e.error_type),
        Some(StageErrorType::NormalizationFailed)
    );
}

#[tokio::test]
async fn test_unknown_ndc_finds_no_packages() {
    let db = Database::open_in_memory().unwrap();
    seed(&db);

    let request = CalculationRequest::for_ndc("11111-222-33").with_quantity(30.0);
    let result = orchestrator(LocalDirectory::new(db)).calculate(request).await;

    assert_eq!(result.status, CalculationStatus::Partial);
    assert_eq!(result.warnings_of(WarningType::NoPackagesFound).len(), 1);
}

#[tokio::test]
async fn test_configured_alternatives() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[matcher]\nmax_alternatives = 0").unwrap();
    let config = EngineConfig::from_file(file.path()).unwrap();

    let db = Database::open_in_memory().unwrap();
    seed(&db);
    let directory = LocalDirectory::new(db);
    let orchestrator = CalculationOrchestrator::with_config(directory.clone(), directory, config);

    let request = CalculationRequest::for_drug("lisinopril")
        .with_directions("Take 1 tablet three times daily")
        .with_days_supply(30);
    let result = orchestrator.calculate(request).await;

    assert_eq!(result.recommendation.unwrap().total_quantity, 90);
    assert!(result.alternatives.is_empty());
}
