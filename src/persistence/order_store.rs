//! Store trait for the execution engine and the order watchers.
//!
//! Decouples callers from PostgresStore so tests can run against MemoryStore.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use tracing::warn;

use crate::domain::{
    hex_key, ExecutedOrder, ExecutedOrderRow, LimitOrderRecord, OrderDigest, WatchPair,
};
use crate::error::Result;

/// Result of an idempotent insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    /// A record with the same digest was already stored. Not an error.
    AlreadyExists,
}

/// One entry of a bulk write that did not apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub digest: OrderDigest,
    pub reason: String,
}

/// Per-order outcome of a bulk update or delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<OrderDigest>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn record_ok(&mut self, digest: OrderDigest) {
        self.succeeded.push(digest);
    }

    pub fn record_err(&mut self, digest: OrderDigest, reason: impl Into<String>) {
        self.failed.push(BatchFailure {
            digest,
            reason: reason.into(),
        });
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Log every failed entry; returns the number of failures.
    pub fn log_failures(&self, operation: &str) -> usize {
        for failure in &self.failed {
            warn!(
                operation,
                digest = %hex_key(&failure.digest),
                reason = %failure.reason,
                "Bulk write entry failed"
            );
        }
        self.failed.len()
    }
}

/// Persistence boundary for limit orders and execution audit records
#[async_trait]
pub trait OrderStore: Send + Sync {
    // --- Limit orders ---

    /// Insert unless the digest is already stored.
    async fn save_limit_order(&self, record: &LimitOrderRecord) -> Result<SaveOutcome>;

    /// Active orders for `pair_address` selling `token_in`, priced strictly
    /// below `price_threshold`.
    async fn get_limit_orders(
        &self,
        price_threshold: U256,
        pair_address: Address,
        token_in: Address,
    ) -> Result<Vec<LimitOrderRecord>>;

    async fn update_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport>;

    async fn delete_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport>;

    // --- Executed orders ---

    /// Append-only.
    async fn save_executed_orders(&self, executed: &[ExecutedOrder]) -> Result<()>;

    /// Most recent first.
    async fn recent_executed_orders(&self, limit: usize) -> Result<Vec<ExecutedOrderRow>>;

    // --- Watch pairs ---

    /// Drop the watched pair set and store `pairs` in its place.
    async fn replace_watch_pairs(&self, pairs: &[WatchPair]) -> Result<()>;

    async fn watch_pairs(&self) -> Result<Vec<WatchPair>>;
}

#[async_trait]
impl OrderStore for crate::adapters::PostgresStore {
    async fn save_limit_order(&self, record: &LimitOrderRecord) -> Result<SaveOutcome> {
        self.save_limit_order(record).await
    }
    async fn get_limit_orders(
        &self,
        price_threshold: U256,
        pair_address: Address,
        token_in: Address,
    ) -> Result<Vec<LimitOrderRecord>> {
        self.get_limit_orders(price_threshold, pair_address, token_in)
            .await
    }
    async fn update_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport> {
        self.update_limit_orders(records).await
    }
    async fn delete_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport> {
        self.delete_limit_orders(records).await
    }
    async fn save_executed_orders(&self, executed: &[ExecutedOrder]) -> Result<()> {
        self.save_executed_orders(executed).await
    }
    async fn recent_executed_orders(&self, limit: usize) -> Result<Vec<ExecutedOrderRow>> {
        self.recent_executed_orders(limit).await
    }
    async fn replace_watch_pairs(&self, pairs: &[WatchPair]) -> Result<()> {
        self.replace_watch_pairs(pairs).await
    }
    async fn watch_pairs(&self) -> Result<Vec<WatchPair>> {
        self.watch_pairs().await
    }
}

/// Apply the price threshold after the store query.
///
/// Prices are decimal strings, so the database cannot order them; every
/// comparison decodes into `U256`. Undecodable prices are dropped and logged.
pub fn retain_below_price(
    records: Vec<LimitOrderRecord>,
    threshold: U256,
) -> Vec<LimitOrderRecord> {
    records
        .into_iter()
        .filter(|record| {
            if record.price_value().is_none() {
                warn!(
                    digest = %hex_key(&record.digest),
                    price = %record.price,
                    "Stored price is not a decimal integer"
                );
                return false;
            }
            record.price_below(threshold)
        })
        .collect()
}

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
