//! Drug concept storage and name search.

use rusqlite::{params, OptionalExtension};
use strsim::{jaro_winkler, normalized_levenshtein};

use super::{Database, DbError, DbResult};
use crate::models::{ConceptMatch, DrugConcept};

/// Number of candidates to retrieve from FTS5 before re-ranking.
const FTS_CANDIDATE_LIMIT: usize = 20;

/// Minimum similarity for a concept found by the fallback scan.
const MIN_CONFIDENCE: f64 = 0.60;

impl Database {
    /// Insert or update a drug concept.
    pub fn upsert_concept(&self, concept: &DrugConcept) -> DbResult<()> {
        let synonyms_json = serde_json::to_string(&concept.synonyms)?;

        self.conn.execute(
            r#"
            INSERT INTO drug_concepts (
                rxcui, name, synonyms, dosage_form, strength, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(rxcui) DO UPDATE SET
                name = excluded.name,
                synonyms = excluded.synonyms,
                dosage_form = excluded.dosage_form,
                strength = excluded.strength,
                updated_at = datetime('now')
            "#,
            params![
                concept.rxcui,
                concept.name,
                synonyms_json,
                concept.dosage_form,
                concept.strength,
            ],
        )?;
        Ok(())
    }

    /// Get a concept by RxCUI.
    pub fn get_concept(&self, rxcui: &str) -> DbResult<Option<DrugConcept>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT rxcui, name, synonyms, dosage_form, strength
                FROM drug_concepts
                WHERE rxcui = ?
                "#,
                [rxcui],
                concept_row,
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// Search concepts by name or synonym.
    ///
    /// FTS5 narrows the candidates, which are then re-ranked by string
    /// similarity against the query. When FTS5 finds nothing (typos, partial
    /// words in the middle of a name) every concept is scored instead and
    /// only those above a minimum confidence are kept.
    pub fn search_concepts(&self, query: &str, limit: usize) -> DbResult<Vec<ConceptMatch>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.fts_candidates(query)?;
        let (candidates, floor) = if candidates.is_empty() {
            (self.list_concepts()?, MIN_CONFIDENCE)
        } else {
            (candidates, 0.0)
        };

        let mut matches: Vec<ConceptMatch> = candidates
            .into_iter()
            .map(|concept| {
                let confidence = concept_similarity(&needle, &concept);
                ConceptMatch {
                    concept,
                    confidence,
                }
            })
            .filter(|m| m.confidence >= floor)
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.concept.name.cmp(&b.concept.name))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    /// Get all concepts ordered by name.
    pub fn list_concepts(&self) -> DbResult<Vec<DrugConcept>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT rxcui, name, synonyms, dosage_form, strength
            FROM drug_concepts
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], concept_row)?;

        let mut concepts = Vec::new();
        for row in rows {
            concepts.push(row?.try_into()?);
        }
        Ok(concepts)
    }

    fn fts_candidates(&self, query: &str) -> DbResult<Vec<DrugConcept>> {
        let escaped_query = escape_fts_query(query);
        if escaped_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.rxcui, c.name, c.synonyms, c.dosage_form, c.strength,
                   bm25(drug_concepts_fts) as rank
            FROM drug_concepts c
            JOIN drug_concepts_fts fts ON c.rowid = fts.rowid
            WHERE drug_concepts_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )?;
        let rows = stmt.query_map(
            params![escaped_query, FTS_CANDIDATE_LIMIT as i64],
            concept_row,
        )?;

        let mut concepts = Vec::new();
        for row in rows {
            concepts.push(row?.try_into()?);
        }
        Ok(concepts)
    }
}

fn concept_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrugConceptRow> {
    Ok(DrugConceptRow {
        rxcui: row.get(0)?,
        name: row.get(1)?,
        synonyms: row.get(2)?,
        dosage_form: row.get(3)?,
        strength: row.get(4)?,
    })
}

/// Intermediate row struct for database mapping.
struct DrugConceptRow {
    rxcui: String,
    name: String,
    synonyms: String,
    dosage_form: Option<String>,
    strength: Option<String>,
}

impl TryFrom<DrugConceptRow> for DrugConcept {
    type Error = DbError;

    fn try_from(row: DrugConceptRow) -> Result<Self, Self::Error> {
        Ok(DrugConcept {
            rxcui: row.rxcui,
            name: row.name,
            synonyms: serde_json::from_str(&row.synonyms)?,
            dosage_form: row.dosage_form,
            strength: row.strength,
        })
    }
}

/// Best similarity between the query and the concept's name or synonyms.
fn concept_similarity(needle: &str, concept: &DrugConcept) -> f64 {
    std::iter::once(&concept.name)
        .chain(concept.synonyms.iter())
        .map(|candidate| name_similarity(needle, &candidate.to_lowercase()))
        .fold(0.0, f64::max)
}

fn name_similarity(needle: &str, candidate: &str) -> f64 {
    if candidate == needle {
        return 1.0;
    }
    // "lisinopril" against "lisinopril 10 MG Oral Tablet"
    if candidate
        .split_whitespace()
        .any(|word| word == needle)
        || needle.split_whitespace().any(|word| word == candidate)
    {
        return 0.95;
    }
    candidate
        .split_whitespace()
        .map(|word| fuzzy_match(needle, word))
        .fold(fuzzy_match(needle, candidate), f64::max)
}

fn fuzzy_match(a: &str, b: &str) -> f64 {
    // Jaro-Winkler favours shared prefixes, Levenshtein overall edit distance
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}

/// Escape special FTS5 characters and prepare query for prefix matching.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("{}*", word))
        .collect::<Vec<_>>()
        .join(" ")
}
