//! Fixed vocabulary tables, built once per process.
//!
//! All keys are stored in normalized form (see [`super::normalize_key`]):
//! lowercase, single-spaced, abbreviation periods removed.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::UnitClass;
use crate::models::Frequency;

/// Unit spelling → canonical unit.
pub(super) static UNITS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(default_units);

/// Canonical unit → class.
pub(super) static UNIT_CLASSES: LazyLock<HashMap<&'static str, UnitClass>> =
    LazyLock::new(default_unit_classes);

/// Dosage form spelling → canonical dosage form.
pub(super) static DOSAGE_FORMS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(default_dosage_forms);

/// Canonical dosage form → unit its packages are counted in.
pub(super) static DISPENSING_UNITS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(default_dispensing_units);

/// Frequency phrase → frequency.
pub(super) static FREQUENCY_PHRASES: LazyLock<HashMap<&'static str, Frequency>> =
    LazyLock::new(|| default_frequency_phrases().into_iter().collect());

/// Frequency phrases ordered for containment matching: longest first, then
/// alphabetical, so "twice daily" is tried before "daily".
pub(super) static FREQUENCY_PHRASES_BY_LENGTH: LazyLock<Vec<(&'static str, Frequency)>> =
    LazyLock::new(|| {
        let mut phrases = default_frequency_phrases();
        phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        phrases
    });

/// Route-of-administration tokens skipped when scanning abbreviated directions.
pub(super) static ROUTE_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "po", "oral", "orally", "im", "iv", "sq", "sc", "subq", "subcut", "sl",
        "sublingual", "sublingually", "pr", "rectally", "pv", "vaginally", "top",
        "topical", "topically", "inh", "inhaled", "intramuscular", "intramuscularly",
        "intravenous", "intravenously", "subcutaneous", "subcutaneously", "buccal",
    ]
    .into_iter()
    .collect()
});

/// Spelled-out doses.
pub(super) static NUMBER_WORDS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    [
        ("half", 0.5),
        ("one", 1.0),
        ("two", 2.0),
        ("three", 3.0),
        ("four", 4.0),
        ("five", 5.0),
        ("six", 6.0),
        ("seven", 7.0),
        ("eight", 8.0),
        ("nine", 9.0),
        ("ten", 10.0),
    ]
    .into_iter()
    .collect()
});

/// Keyword → canonical dosage form, in priority order. Used when a dosage
/// form string is not in the exact table ("extended release oral tablet").
pub(super) const DOSAGE_FORM_KEYWORDS: &[(&str, &str)] = &[
    ("ophthalmic", "drops"),
    ("otic", "drops"),
    ("drop", "drops"),
    ("inject", "injection"),
    ("tablet", "tablet"),
    ("capsule", "capsule"),
    ("suspension", "suspension"),
    ("solution", "solution"),
    ("syrup", "solution"),
    ("elixir", "solution"),
    ("liquid", "solution"),
    ("cream", "cream"),
    ("ointment", "ointment"),
    ("gel", "gel"),
    ("patch", "patch"),
    ("transdermal", "patch"),
    ("aerosol", "inhaler"),
    ("inhal", "inhaler"),
    ("suppositor", "suppository"),
    ("lozenge", "lozenge"),
    ("troche", "lozenge"),
    ("powder", "powder"),
    ("film", "film"),
];

fn default_units() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();

    // Solid oral
    for spelling in ["tablet", "tablets", "tab", "tabs", "tbl", "caplet", "caplets"] {
        map.insert(spelling, "tablet");
    }
    for spelling in ["capsule", "capsules", "cap", "caps"] {
        map.insert(spelling, "capsule");
    }
    for spelling in ["lozenge", "lozenges"] {
        map.insert(spelling, "lozenge");
    }
    for spelling in ["troche", "troches"] {
        map.insert(spelling, "troche");
    }
    for spelling in ["film", "films"] {
        map.insert(spelling, "film");
    }
    for spelling in ["packet", "packets", "sachet", "sachets"] {
        map.insert(spelling, "packet");
    }

    // Other countable forms
    for spelling in ["patch", "patches"] {
        map.insert(spelling, "patch");
    }
    for spelling in ["suppository", "suppositories", "supp", "supps"] {
        map.insert(spelling, "suppository");
    }
    for spelling in [
        "puff",
        "puffs",
        "inhalation",
        "inhalations",
        "actuation",
        "actuations",
    ] {
        map.insert(spelling, "puff");
    }
    for spelling in ["spray", "sprays"] {
        map.insert(spelling, "spray");
    }

    // Volume
    for spelling in [
        "ml",
        "mls",
        "milliliter",
        "milliliters",
        "millilitre",
        "millilitres",
        "cc",
    ] {
        map.insert(spelling, "ml");
    }
    for spelling in ["l", "liter", "liters", "litre", "litres"] {
        map.insert(spelling, "l");
    }
    for spelling in ["tsp", "teaspoon", "teaspoons", "teaspoonful", "teaspoonfuls"] {
        map.insert(spelling, "tsp");
    }
    for spelling in ["tbsp", "tablespoon", "tablespoons", "tablespoonful"] {
        map.insert(spelling, "tbsp");
    }

    // Mass
    for spelling in ["mg", "mgs", "milligram", "milligrams"] {
        map.insert(spelling, "mg");
    }
    for spelling in ["mcg", "µg", "ug", "microgram", "micrograms"] {
        map.insert(spelling, "mcg");
    }
    for spelling in ["g", "gm", "gram", "grams"] {
        map.insert(spelling, "g");
    }

    // Everything else
    for spelling in ["unit", "units", "u", "iu"] {
        map.insert(spelling, "unit");
    }
    for spelling in ["drop", "drops", "gtt", "gtts"] {
        map.insert(spelling, "drop");
    }
    for spelling in ["application", "applications", "applicatorful"] {
        map.insert(spelling, "application");
    }

    map
}

fn default_unit_classes() -> HashMap<&'static str, UnitClass> {
    let mut map = HashMap::new();

    for unit in [
        "tablet",
        "capsule",
        "patch",
        "suppository",
        "puff",
        "spray",
        "lozenge",
        "troche",
        "film",
        "packet",
    ] {
        map.insert(unit, UnitClass::CountBased);
    }
    for unit in ["ml", "l", "tsp", "tbsp", "mg", "mcg", "g"] {
        map.insert(unit, UnitClass::VolumeBased);
    }
    for unit in ["unit", "drop", "application"] {
        map.insert(unit, UnitClass::Other);
    }

    map
}

fn default_dosage_forms() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();

    for spelling in ["tablet", "tablets", "tab", "tabs", "oral tablet"] {
        map.insert(spelling, "tablet");
    }
    for spelling in ["capsule", "capsules", "cap", "caps", "oral capsule"] {
        map.insert(spelling, "capsule");
    }
    for spelling in ["solution", "soln", "sol", "oral solution", "syrup", "elixir"] {
        map.insert(spelling, "solution");
    }
    for spelling in ["suspension", "susp", "oral suspension"] {
        map.insert(spelling, "suspension");
    }
    for spelling in ["injection", "inj", "injectable", "vial"] {
        map.insert(spelling, "injection");
    }
    for spelling in ["cream", "crm"] {
        map.insert(spelling, "cream");
    }
    for spelling in ["ointment", "oint"] {
        map.insert(spelling, "ointment");
    }
    map.insert("gel", "gel");
    for spelling in ["patch", "transdermal system"] {
        map.insert(spelling, "patch");
    }
    for spelling in ["inhaler", "inh", "metered dose inhaler", "mdi"] {
        map.insert(spelling, "inhaler");
    }
    for spelling in ["drops", "gtts"] {
        map.insert(spelling, "drops");
    }
    for spelling in ["suppository", "supp"] {
        map.insert(spelling, "suppository");
    }
    map.insert("powder", "powder");

    map
}

fn default_dispensing_units() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();

    map.insert("tablet", "tablet");
    map.insert("capsule", "capsule");
    map.insert("patch", "patch");
    map.insert("suppository", "suppository");
    map.insert("lozenge", "lozenge");
    map.insert("film", "film");

    for form in ["solution", "suspension", "injection", "drops"] {
        map.insert(form, "ml");
    }
    for form in ["cream", "ointment", "gel", "powder"] {
        map.insert(form, "g");
    }

    map
}

fn default_frequency_phrases() -> Vec<(&'static str, Frequency)> {
    let daily = Frequency::TimesPerDay(1.0);
    let twice = Frequency::TimesPerDay(2.0);
    let three = Frequency::TimesPerDay(3.0);
    let four = Frequency::TimesPerDay(4.0);
    let every_other_day = Frequency::TimesPerDay(0.5);
    let weekly = Frequency::TimesPerDay(1.0 / 7.0);
    let twice_weekly = Frequency::TimesPerDay(2.0 / 7.0);
    let three_weekly = Frequency::TimesPerDay(3.0 / 7.0);
    let monthly = Frequency::TimesPerDay(1.0 / 30.0);

    vec![
        // Once daily
        ("once daily", daily),
        ("once a day", daily),
        ("once per day", daily),
        ("one time daily", daily),
        ("one time a day", daily),
        ("daily", daily),
        ("every day", daily),
        ("each day", daily),
        ("qd", daily),
        ("qday", daily),
        ("qam", daily),
        ("qpm", daily),
        ("qhs", daily),
        ("hs", daily),
        ("every morning", daily),
        ("every evening", daily),
        ("every night", daily),
        ("in the morning", daily),
        ("in the evening", daily),
        ("at bedtime", daily),
        ("nightly", daily),
        // Twice daily
        ("twice daily", twice),
        ("twice a day", twice),
        ("twice per day", twice),
        ("two times daily", twice),
        ("two times a day", twice),
        ("bid", twice),
        ("morning and evening", twice),
        ("morning and night", twice),
        // Three times daily
        ("three times daily", three),
        ("three times a day", three),
        ("three times per day", three),
        ("tid", three),
        // Four times daily
        ("four times daily", four),
        ("four times a day", four),
        ("four times per day", four),
        ("qid", four),
        // Less than daily
        ("every other day", every_other_day),
        ("qod", every_other_day),
        ("once weekly", weekly),
        ("once a week", weekly),
        ("once per week", weekly),
        ("weekly", weekly),
        ("every week", weekly),
        ("qw", weekly),
        ("qwk", weekly),
        ("twice weekly", twice_weekly),
        ("twice a week", twice_weekly),
        ("biw", twice_weekly),
        ("three times weekly", three_weekly),
        ("three times a week", three_weekly),
        ("tiw", three_weekly),
        ("once monthly", monthly),
        ("once a month", monthly),
        ("monthly", monthly),
        // As needed
        ("prn", Frequency::AsNeeded),
        ("as needed", Frequency::AsNeeded),
        ("as required", Frequency::AsNeeded),
        ("when required", Frequency::AsNeeded),
        ("when needed", Frequency::AsNeeded),
        ("if needed", Frequency::AsNeeded),
        ("as necessary", Frequency::AsNeeded),
    ]
}
