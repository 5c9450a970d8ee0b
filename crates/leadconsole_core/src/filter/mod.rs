//! Console filter model.
//!
//! # Responsibility
//! - Compose facet sets, free text, score range and sort into one filter.
//! - Own page cursor reset rules.
//!
//! # Invariants
//! - Filter mutations never fail; only `ScoreRange` construction and
//!   string-keyed facet toggles can be rejected, before any state changes.

use crate::filter::facet::Facet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod facet;
pub mod state;

pub use facet::{toggle, FacetSet};
pub use state::{
    ChangeKind, FilterChange, FilterPatch, FilterState, FilterStore, ScoreRange, SortOrder,
};

/// Filter input rejected before it could reach the store or an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvertedScoreRange { low: u8, high: u8 },
    ScoreOutOfBounds { value: u8 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvertedScoreRange { low, high } => {
                write!(f, "score range lower bound {low} exceeds upper bound {high}")
            }
            Self::ScoreOutOfBounds { value } => {
                write!(f, "score bound {value} is outside 0..=100")
            }
        }
    }
}

impl Error for ValidationError {}

/// Rejected string-keyed facet operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    UnknownFacet(String),
    UnknownFacetValue { facet: Facet, value: String },
    EmptyFacetValue(Facet),
    Validation(ValidationError),
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFacet(name) => write!(f, "unknown facet: `{name}`"),
            Self::UnknownFacetValue { facet, value } => {
                write!(f, "value `{value}` is not a member of facet `{facet}`")
            }
            Self::EmptyFacetValue(facet) => write!(f, "blank value for facet `{facet}`"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FilterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for FilterError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
