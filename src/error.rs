//! Error types for chart configuration.
//!
//! Only misconfiguration is reported as an error. Bad data values are skipped
//! by the drawing path and degenerate geometry is handled in place.

use thiserror::Error;

/// Errors raised synchronously by invalid chart configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// Dataset order was not a permutation of the current dataset keys.
    #[error("dataset order {actual:?} is not a permutation of {expected:?}")]
    InvalidDatasetOrder {
        /// Keys currently registered on the plot.
        expected: Vec<String>,
        /// Keys that were supplied.
        actual: Vec<String>,
    },
    /// A dataset key or handle was not registered on the plot.
    #[error("unknown dataset `{0}`")]
    UnknownDataset(String),
    /// A dataset key was added twice.
    #[error("dataset key `{0}` is already in use")]
    DuplicateDatasetKey(String),
    /// An orientation string was not recognised.
    #[error("unsupported orientation `{0}`")]
    InvalidOrientation(String),
    /// An alignment string was not recognised.
    #[error("unsupported alignment `{0}`")]
    InvalidAlignment(String),
    /// A named option string was not recognised.
    #[error("unsupported {kind} `{value}`")]
    InvalidOption {
        /// Option family, e.g. `"hover mode"`.
        kind: &'static str,
        /// Rejected value.
        value: String,
    },
    /// Logarithmic scales need a base greater than one.
    #[error("log base must be greater than 1, got {0}")]
    InvalidLogBase(f64),
    /// Scale domains must be finite.
    #[error("invalid domain [{min}, {max}]")]
    InvalidDomain {
        /// Requested lower bound.
        min: f64,
        /// Requested upper bound.
        max: f64,
    },
    /// A band was requested for a key outside the category domain.
    #[error("no band for category `{0}`")]
    UnknownCategory(String),
    /// The component has been removed and cannot be reused.
    #[error("component {0} has been removed")]
    ComponentRemoved(u64),
    /// The component is mutably borrowed and cannot be inspected.
    #[error("component is busy and cannot be added")]
    ComponentBusy,
    /// The component is already anchored to a surface.
    #[error("component {0} is already rendered to a surface")]
    AlreadyAnchored(u64),
    /// A table cell was outside the supported grid.
    #[error("table cell ({row}, {col}) is out of bounds")]
    InvalidCell {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ChartError>;
