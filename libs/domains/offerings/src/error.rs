use thiserror::Error;

pub type OfferingResult<T> = Result<T, OfferingError>;

#[derive(Debug, Clone, Error)]
pub enum OfferingError {
    #[error("Unknown SKU: {0}")]
    UnknownSku(String),

    #[error("Instance type '{0}' advertises no offerings")]
    NoOfferings(String),
}
