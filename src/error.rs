//! Error types of the neighbor search API.

use crate::cell::CellError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NeighborError {
    #[error(transparent)]
    Cell(#[from] CellError),

    #[error("Cutoff must be positive and finite, got {0}")]
    InvalidCutoff(f64),

    #[error("Skin must be non-negative and finite, got {0}")]
    InvalidSkin(f64),

    #[error("Expected {expected} cutoffs (one per atom), got {found}")]
    CutoffCountMismatch { expected: usize, found: usize },

    #[error("Neighbor list has not been built, call update() first")]
    NotBuilt,

    #[error("Atom index {index} out of range for {natoms} atoms")]
    IndexOutOfRange { index: usize, natoms: usize },

    #[error("Radius {radius} needs about {replicas} periodic replicas, more than {limit}")]
    TooManyImages {
        radius: f64,
        replicas: f64,
        limit: usize,
    },

    #[error("No point stored under key {0}")]
    UnknownNode(usize),

    #[error("positions and batch must have the same length")]
    BatchLengthMismatch,

    #[error("Batch IDs must be monotonic (non-decreasing)")]
    BatchNotMonotonic,

    #[error("Expected at least {expected} cells, but got {found}")]
    NotEnoughCells { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, NeighborError>;

pub(crate) fn check_cutoff(cutoff: f64) -> Result<()> {
    if !cutoff.is_finite() || cutoff <= 0.0 {
        return Err(NeighborError::InvalidCutoff(cutoff));
    }
    Ok(())
}
