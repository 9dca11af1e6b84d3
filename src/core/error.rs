//! Error types for pricing and valuation

/// Errors surfaced by price providers and the valuation calculator.
///
/// The variants separate caller mistakes from upstream trouble, and among
/// upstream trouble, "try again later" from "this will never work".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Price source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed price data: {0}")]
    UpstreamDataError(String),

    #[error("No price found for {base}/{quote}")]
    PriceNotFound { base: String, quote: String },
}

impl Error {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::UpstreamDataError(_) => "upstream_data_error",
            Error::PriceNotFound { .. } => "price_not_found",
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::UpstreamDataError(err.to_string())
        } else {
            Error::UpstreamUnavailable(err.to_string())
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
