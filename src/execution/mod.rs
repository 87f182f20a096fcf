//! Order execution pipeline.
//!
//! Contains the dedup tracker that keeps one fill in flight per order, the
//! settlement calculator, the batch coordinator, and the GasOracle and
//! OrderFiller traits the coordinator is built on.

pub mod coordinator;
pub mod dedup;
pub mod settlement;
pub mod traits;

pub use coordinator::{preview_settlement, ExecutionCoordinator, ExecutionSettings};
pub use dedup::DedupTracker;
pub use settlement::{compute_settlement, ProfitTokens};
pub use traits::{FillOptions, FillRequest, FillStatus, GasOracle, OrderFiller};
