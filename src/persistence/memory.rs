use async_trait::async_trait;
use chrono::Utc;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::order_store::{retain_below_price, unix_now, BatchReport, OrderStore, SaveOutcome};
use crate::domain::{ExecutedOrder, ExecutedOrderRow, LimitOrderRecord, OrderDigest, WatchPair};
use crate::error::Result;

/// In-memory [`OrderStore`] for tests and dry runs
///
/// Keeps the same contracts as the PostgreSQL store: digest uniqueness,
/// active-window filtering and numeric price filtering.
#[derive(Debug, Default)]
pub struct MemoryStore {
    limit_orders: RwLock<HashMap<OrderDigest, LimitOrderRecord>>,
    executed: RwLock<Vec<ExecutedOrderRow>>,
    watch_pairs: RwLock<Vec<WatchPair>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn limit_order_count(&self) -> usize {
        self.limit_orders.read().await.len()
    }

    pub async fn limit_order(&self, digest: OrderDigest) -> Option<LimitOrderRecord> {
        self.limit_orders.read().await.get(&digest).cloned()
    }

    pub async fn executed_count(&self) -> usize {
        self.executed.read().await.len()
    }

    async fn active_orders_at(
        &self,
        now_secs: u64,
        pair_address: Address,
        token_in: Address,
    ) -> Vec<LimitOrderRecord> {
        self.limit_orders
            .read()
            .await
            .values()
            .filter(|r| r.pair_address == pair_address && r.order.token_in == token_in)
            .filter(|r| r.order.is_active_at(now_secs))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn save_limit_order(&self, record: &LimitOrderRecord) -> Result<SaveOutcome> {
        let mut orders = self.limit_orders.write().await;
        if orders.contains_key(&record.digest) {
            return Ok(SaveOutcome::AlreadyExists);
        }
        orders.insert(record.digest, record.clone());
        Ok(SaveOutcome::Inserted)
    }

    async fn get_limit_orders(
        &self,
        price_threshold: U256,
        pair_address: Address,
        token_in: Address,
    ) -> Result<Vec<LimitOrderRecord>> {
        let active = self
            .active_orders_at(unix_now(), pair_address, token_in)
            .await;
        Ok(retain_below_price(active, price_threshold))
    }

    async fn update_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport> {
        let mut orders = self.limit_orders.write().await;
        let mut report = BatchReport::default();

        for record in records {
            match orders.get_mut(&record.digest) {
                Some(existing) => {
                    *existing = record.clone();
                    report.record_ok(record.digest);
                }
                None => report.record_err(record.digest, "not found"),
            }
        }

        Ok(report)
    }

    async fn delete_limit_orders(&self, records: &[LimitOrderRecord]) -> Result<BatchReport> {
        let mut orders = self.limit_orders.write().await;
        let mut report = BatchReport::default();

        for record in records {
            // Deleting an absent order leaves the store in the requested state
            orders.remove(&record.digest);
            report.record_ok(record.digest);
        }

        Ok(report)
    }

    async fn save_executed_orders(&self, executed: &[ExecutedOrder]) -> Result<()> {
        let executed_at = Utc::now();
        self.executed
            .write()
            .await
            .extend(executed.iter().cloned().map(|executed| ExecutedOrderRow {
                executed,
                executed_at,
            }));
        Ok(())
    }

    async fn recent_executed_orders(&self, limit: usize) -> Result<Vec<ExecutedOrderRow>> {
        Ok(self
            .executed
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn replace_watch_pairs(&self, pairs: &[WatchPair]) -> Result<()> {
        *self.watch_pairs.write().await = pairs.to_vec();
        Ok(())
    }

    async fn watch_pairs(&self) -> Result<Vec<WatchPair>> {
        Ok(self.watch_pairs.read().await.clone())
    }
}
