pub mod alpha_vantage;
pub mod traits;

pub use alpha_vantage::AlphaVantageProvider;
pub use traits::PriceProvider;
