pub mod accounting_service;
pub mod accounting_traits;

#[cfg(test)]
mod accounting_service_tests;

pub use accounting_service::AccountingService;
pub use accounting_traits::{AccountingServiceTrait, CreateOrderRequest};
