pub mod quotes_service;
pub mod quotes_traits;

pub use quotes_service::PriceService;
pub use quotes_traits::PriceOracleTrait;
