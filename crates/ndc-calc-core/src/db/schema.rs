//! SQLite schema definition.

/// Complete database schema for the local drug directory.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Drug Concepts
-- ============================================================================

CREATE TABLE IF NOT EXISTS drug_concepts (
    rxcui TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    synonyms TEXT NOT NULL DEFAULT '[]',          -- JSON array of strings
    dosage_form TEXT,
    strength TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- FTS5 virtual table for full-text search
CREATE VIRTUAL TABLE IF NOT EXISTS drug_concepts_fts USING fts5(
    rxcui,
    name,
    synonyms,
    content='drug_concepts',
    content_rowid='rowid'
);

-- Triggers to keep FTS5 in sync with main table
CREATE TRIGGER IF NOT EXISTS drug_concepts_ai AFTER INSERT ON drug_concepts BEGIN
    INSERT INTO drug_concepts_fts(rowid, rxcui, name, synonyms)
    VALUES (new.rowid, new.rxcui, new.name, new.synonyms);
END;

CREATE TRIGGER IF NOT EXISTS drug_concepts_ad AFTER DELETE ON drug_concepts BEGIN
    INSERT INTO drug_concepts_fts(drug_concepts_fts, rowid, rxcui, name, synonyms)
    VALUES ('delete', old.rowid, old.rxcui, old.name, old.synonyms);
END;

CREATE TRIGGER IF NOT EXISTS drug_concepts_au AFTER UPDATE ON drug_concepts BEGIN
    INSERT INTO drug_concepts_fts(drug_concepts_fts, rowid, rxcui, name, synonyms)
    VALUES ('delete', old.rowid, old.rxcui, old.name, old.synonyms);
    INSERT INTO drug_concepts_fts(rowid, rxcui, name, synonyms)
    VALUES (new.rowid, new.rxcui, new.name, new.synonyms);
END;

-- ============================================================================
-- NDC Packages
-- ============================================================================

CREATE TABLE IF NOT EXISTS ndc_packages (
    ndc_key TEXT PRIMARY KEY,                    -- 11 digits, or 12 for 6-3-1 codes
    code TEXT NOT NULL,                          -- NDC as published
    rxcui TEXT NOT NULL REFERENCES drug_concepts(rxcui),
    manufacturer TEXT NOT NULL DEFAULT '',
    package_size INTEGER NOT NULL CHECK (package_size >= 0),
    dosage_form TEXT NOT NULL DEFAULT '',
    strength TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
    marketing_start TEXT,                        -- YYYY-MM-DD
    marketing_end TEXT,                          -- YYYY-MM-DD
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_packages_rxcui ON ndc_packages(rxcui);
CREATE INDEX IF NOT EXISTS idx_packages_status ON ndc_packages(status);
"#;
