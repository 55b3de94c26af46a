use thiserror::Error;

pub type PricingResult<T> = Result<T, PricingError>;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Retail prices API returned status: {0}")]
    Api(String),

    #[error("Failed to parse retail prices response: {0}")]
    Parse(String),
}
