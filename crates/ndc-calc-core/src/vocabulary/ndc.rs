//! NDC validation and normalization.
//!
//! Accepted inputs:
//! - hyphenated 10-digit codes in one of the layouts 6-3-1, 5-4-1, 5-3-2, 4-4-2
//! - bare 10- or 11-digit strings (10-digit codes are left-padded with a zero)
//!
//! Everything is normalized to the 11-digit 5-4-2 form for display. A 6-3-1
//! code pads to the same 11 digits as the 4-4-2 reading of its digits, so
//! package identity uses [`Ndc::key`] instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// NDC parse errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NdcError {
    #[error("NDC is empty")]
    Empty,

    #[error("NDC contains non-numeric characters: {0}")]
    NonNumeric(String),

    #[error("NDC must have 10 or 11 digits, found {0}")]
    InvalidLength(usize),

    #[error("Unrecognized NDC hyphenation: {0}")]
    InvalidLayout(String),
}

pub type NdcResult<T> = Result<T, NdcError>;

/// Segment layout of an NDC as entered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NdcLayout {
    SixThreeOne,
    FiveFourOne,
    FiveThreeTwo,
    FourFourTwo,
    /// 10 digits without hyphens
    Digits10,
    /// 11 digits without hyphens
    Digits11,
}

/// Hyphenated layouts in evaluation order.
const HYPHENATED_LAYOUTS: [(NdcLayout, [usize; 3]); 4] = [
    (NdcLayout::SixThreeOne, [6, 3, 1]),
    (NdcLayout::FiveFourOne, [5, 4, 1]),
    (NdcLayout::FiveThreeTwo, [5, 3, 2]),
    (NdcLayout::FourFourTwo, [4, 4, 2]),
];

/// A validated National Drug Code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ndc {
    segments: Vec<String>,
    layout: NdcLayout,
}

impl Ndc {
    /// Validate an NDC string and detect its layout.
    pub fn parse(input: &str) -> NdcResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(NdcError::Empty);
        }

        if trimmed.contains('-') {
            return Self::parse_hyphenated(trimmed);
        }

        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(NdcError::NonNumeric(trimmed.to_string()));
        }

        let layout = match trimmed.len() {
            10 => NdcLayout::Digits10,
            11 => NdcLayout::Digits11,
            len => return Err(NdcError::InvalidLength(len)),
        };

        Ok(Self {
            segments: vec![trimmed.to_string()],
            layout,
        })
    }

    fn parse_hyphenated(input: &str) -> NdcResult<Self> {
        let segments: Vec<&str> = input.split('-').collect();

        if segments
            .iter()
            .any(|s| !s.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(NdcError::NonNumeric(input.to_string()));
        }

        let lengths: Vec<usize> = segments.iter().map(|s| s.len()).collect();
        HYPHENATED_LAYOUTS
            .iter()
            .find(|(_, expected)| lengths == expected)
            .map(|(layout, _)| Self {
                segments: segments.iter().map(|s| s.to_string()).collect(),
                layout: *layout,
            })
            .ok_or_else(|| NdcError::InvalidLayout(input.to_string()))
    }

    pub fn layout(&self) -> NdcLayout {
        self.layout
    }

    /// Digits as entered, without hyphens.
    pub fn digits(&self) -> String {
        self.segments.concat()
    }

    /// 11-digit form (labeler 5, product 4, package 2).
    pub fn normalized(&self) -> String {
        match self.layout {
            NdcLayout::FourFourTwo => format!("0{}", self.digits()),
            NdcLayout::FiveThreeTwo => {
                format!("{}0{}{}", self.segments[0], self.segments[1], self.segments[2])
            }
            NdcLayout::FiveFourOne => {
                format!("{}{}0{}", self.segments[0], self.segments[1], self.segments[2])
            }
            NdcLayout::SixThreeOne | NdcLayout::Digits10 => format!("0{}", self.digits()),
            NdcLayout::Digits11 => self.digits(),
        }
    }

    /// Identity key for deduplication and storage.
    ///
    /// The 11-digit form, except for 6-3-1 codes, which keep their six-digit
    /// labeler in a 12-digit 6-4-2 key.
    pub fn key(&self) -> String {
        match self.layout {
            NdcLayout::SixThreeOne => {
                format!("{}0{}0{}", self.segments[0], self.segments[1], self.segments[2])
            }
            _ => self.normalized(),
        }
    }

    /// 11-digit form with 5-4-2 hyphenation.
    pub fn to_hyphenated(&self) -> String {
        let normalized = self.normalized();
        format!(
            "{}-{}-{}",
            &normalized[..5],
            &normalized[5..9],
            &normalized[9..]
        )
    }
}

impl fmt::Display for Ndc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hyphenated())
    }
}

/// Validate and normalize an NDC to 11 digits.
pub fn normalize_ndc(input: &str) -> NdcResult<String> {
    Ndc::parse(input).map(|ndc| ndc.normalized())
}

pub fn is_valid_ndc(input: &str) -> bool {
    Ndc::parse(input).is_ok()
}
