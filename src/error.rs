use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy: parse, dimensionality, lookup
// ---------------------------------------------------------------------------

/// Failures while turning an input file into a [`SampleTable`].
///
/// [`SampleTable`]: crate::data::model::SampleTable
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("row {row}, column '{column}': '{value}' is not a number")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row} has {found} columns, expected {expected}")]
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("group column '{0}' not found in input")]
    MissingGroupColumn(String),

    #[error("row {row}: missing value for column '{column}'")]
    MissingValue { row: usize, column: String },

    #[error("input has a group column but no feature columns")]
    NoFeatureColumns,

    #[error("input contains no sample rows")]
    Empty,

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("reading input")]
    Io(#[from] std::io::Error),

    #[error("decoding CSV")]
    Csv(#[from] csv::Error),

    #[error("decoding JSON")]
    Json(#[from] serde_json::Error),

    #[error("decoding Parquet")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("reading Arrow data")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Malformed(String),
}

/// Inputs too small or too degenerate for the decomposition, and component
/// selections that exceed what the decomposition retained.
#[derive(Debug, Error)]
pub enum DimensionalityError {
    #[error("PCA needs at least 2 samples, got {0}")]
    TooFewSamples(usize),

    #[error("PCA needs at least 2 numeric features, got {0}")]
    TooFewFeatures(usize),

    #[error("feature '{0}' has zero variance and cannot be scaled to unit variance")]
    ZeroVariance(String),

    #[error("component pair ({a}, {b}) is out of range: {retained} components retained")]
    ComponentPairOutOfRange {
        a: usize,
        b: usize,
        retained: usize,
    },
}

/// A sample's group label has no entry in the centroid table. Derived tables
/// are built from the same grouping, so this indicates a caller bug.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("group '{0}' has no centroid entry")]
    UnknownGroup(String),
}
