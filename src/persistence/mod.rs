//! Persistence boundary for limit orders and execution audit records
//!
//! - `OrderStore`: the contract callers depend on (idempotent save,
//!   numeric price filtering, per-order bulk writes, append-only audit log)
//! - `MemoryStore`: in-process implementation for tests and dry runs
//! - PostgreSQL implementation lives in `adapters::postgres`

pub mod memory;
pub mod order_store;

pub use memory::MemoryStore;
pub use order_store::{
    retain_below_price, unix_now, BatchFailure, BatchReport, OrderStore, SaveOutcome,
};
