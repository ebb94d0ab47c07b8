//! Drug concepts held in the local directory.

use serde::{Deserialize, Serialize};

/// A normalized drug concept (one RxNorm clinical drug).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugConcept {
    /// RxCUI
    pub rxcui: String,
    /// Preferred name (e.g., "lisinopril 10 MG Oral Tablet")
    pub name: String,
    /// Brand names, abbreviations and other spellings
    pub synonyms: Vec<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
}

impl DrugConcept {
    pub fn new(rxcui: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            rxcui: rxcui.into(),
            name: name.into(),
            synonyms: Vec::new(),
            dosage_form: None,
            strength: None,
        }
    }
}

/// A concept returned from a name search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptMatch {
    pub concept: DrugConcept,
    /// Name similarity (0.0 - 1.0)
    pub confidence: f64,
}
