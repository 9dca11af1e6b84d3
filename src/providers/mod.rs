pub mod buda;
pub mod caching;
pub mod util;

pub use buda::BudaProvider;
pub use caching::CachingPriceProvider;
