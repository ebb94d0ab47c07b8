//! Directive (SIG) parser.
//!
//! Free-text directions are run through an ordered chain of strategies until
//! one produces a [`ParsedDirective`]:
//!
//! 1. [`StructuredStrategy`]: "Take 1 tablet by mouth twice daily"
//! 2. [`AbbreviatedStrategy`]: "1 tab po bid"
//! 3. [`SimpleStrategy`]: "2 tablets every morning"
//! 4. [`ComplexStrategy`]: anything with a number, a unit keyword and a frequency
//!
//! As-needed directions parse successfully with [`Frequency::AsNeeded`]; it is
//! the quantity calculator that refuses them.
//!
//! [`Frequency::AsNeeded`]: crate::models::Frequency::AsNeeded

mod dose;
mod frequency;
mod strategies;

pub use frequency::{resolve_frequency, FrequencyResolution};
pub use strategies::{AbbreviatedStrategy, ComplexStrategy, SimpleStrategy, StructuredStrategy};

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{ParseStrategyKind, ParsedDirective};

/// Why a single strategy declined the text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StrategyRejection(pub String);

/// One strategy's rejection, kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyAttempt {
    pub strategy: ParseStrategyKind,
    pub reason: String,
}

/// Parser errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Directions are empty")]
    Empty,

    #[error("Unable to parse directions \"{text}\" ({} strategies tried)", .attempts.len())]
    Unrecognized {
        text: String,
        attempts: Vec<StrategyAttempt>,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A single way of reading directions.
pub trait ParseStrategy: Send + Sync {
    fn kind(&self) -> ParseStrategyKind;

    fn parse(&self, text: &str) -> Result<ParsedDirective, StrategyRejection>;
}

static DEFAULT_PARSER: LazyLock<SigParser> = LazyLock::new(SigParser::new);

/// Ordered strategy chain.
pub struct SigParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl Default for SigParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SigParser {
    /// Parser with the standard chain.
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(StructuredStrategy),
            Box::new(AbbreviatedStrategy),
            Box::new(SimpleStrategy),
            Box::new(ComplexStrategy),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { strategies }
    }

    /// Parse directions, trying each strategy in turn.
    pub fn parse(&self, text: &str) -> ParseResult<ParsedDirective> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.parse(trimmed) {
                Ok(directive) => {
                    debug!(
                        strategy = ?directive.strategy,
                        dose = directive.dose,
                        unit = %directive.unit,
                        "parsed directions"
                    );
                    return Ok(directive);
                }
                Err(rejection) => {
                    debug!(strategy = ?strategy.kind(), reason = %rejection, "strategy declined");
                    attempts.push(StrategyAttempt {
                        strategy: strategy.kind(),
                        reason: rejection.0,
                    });
                }
            }
        }

        Err(ParseError::Unrecognized {
            text: trimmed.to_string(),
            attempts,
        })
    }
}

/// Parse directions with the standard strategy chain.
pub fn parse_directions(text: &str) -> ParseResult<ParsedDirective> {
    DEFAULT_PARSER.parse(text)
}
