pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod execution;
pub mod persistence;

pub use adapters::{DryRunFiller, PostgresStore, ProviderGasOracle};
pub use config::AppConfig;
pub use domain::{CandidateOrder, ExecutedOrder, LimitOrder, LimitOrderRecord, OrderDigest};
pub use error::{RelayerError, Result};
pub use execution::{
    DedupTracker, ExecutionCoordinator, ExecutionSettings, FillOptions, FillRequest, FillStatus,
    GasOracle, OrderFiller, ProfitTokens,
};
pub use persistence::{BatchReport, MemoryStore, OrderStore, SaveOutcome};
