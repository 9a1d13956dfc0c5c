use thiserror::Error;

/// Errors returned by training and classification in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Two compared vectors have different dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// The number of labels does not match the number of points.
    #[error("length mismatch: {data} points but {labels} labels")]
    LengthMismatch {
        /// Number of points.
        data: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Classification was attempted against an empty expert set.
    #[error("no experts: the classifier has no separating hyperplanes")]
    NoExperts,

    /// The cluster id bimap is not a bijection onto {+1, -1}.
    #[error("cluster id bimap is not a bijection: {0}")]
    NotBijective(String),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
