use crate::adapters::interface::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("policy blocked: {0}")]
    PolicyBlocked(String),

    #[error("generation failed: {0}")]
    Generation(AdapterError),

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("determinism violation: {0}")]
    DeterminismViolation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("zip error: {0}")]
    Zip(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl From<AdapterError> for CoreError {
    fn from(err: AdapterError) -> Self {
        CoreError::Generation(err)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
