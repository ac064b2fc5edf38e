pub mod ledger_model;
pub mod ledger_traits;
pub mod memory;

pub use ledger_model::*;
pub use ledger_traits::{LedgerStore, LedgerTx};
pub use memory::MemoryLedger;
