use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoNoiseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Data length {actual} does not match shape {shape} ({expected} elements)")]
    DataLength {
        shape: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid blend ratio: {0}. Must be between 0.0 and 1.0")]
    InvalidBlendRatio(f64),

    #[error("Invalid blend ratio: '{0}' is not a number")]
    UnparsableBlendRatio(String),

    #[error("Unsupported shuffle mode: {0}. Expected pixel, block_8, block_16 or block_32")]
    UnsupportedMode(String),

    #[error("Unsupported dtype: {0}. Expected f32 or f64")]
    UnsupportedDType(String),

    #[error("Unsupported slice seeding: {0}. Expected keyed or offset")]
    UnsupportedSeeding(String),

    #[error("Dtype mismatch: expected {expected}, got {actual}")]
    DTypeMismatch { expected: String, actual: String },

    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, CryptoNoiseError>;
