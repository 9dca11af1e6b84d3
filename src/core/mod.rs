//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod portfolio;
pub mod price;

// Re-export main types for cleaner imports
pub use error::Error;
pub use portfolio::{Holding, Portfolio, ValuationResult};
pub use price::{Market, PriceProvider, PriceQuote};
