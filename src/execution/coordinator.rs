use ethers::types::{Address, U256};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::dedup::DedupTracker;
use super::settlement::{compute_settlement, ProfitTokens};
use super::traits::{FillOptions, FillRequest, GasOracle, OrderFiller};
use crate::config::AppConfig;
use crate::domain::{hex_key, CandidateOrder, ExecutedOrder};
use crate::error::{RelayerError, Result};
use crate::persistence::OrderStore;

/// Static inputs every fill of a batch shares
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub chain_id: u64,
    pub receiver: Address,
    pub profit_receiver: Address,
    pub profit_tokens: ProfitTokens,
}

impl ExecutionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chain_id: config.chain.chain_id,
            receiver: config.execution.receiver,
            profit_receiver: config.execution.profit_receiver,
            profit_tokens: ProfitTokens::from_preferred(
                config.execution.profit_tokens.iter().copied(),
            ),
        }
    }
}

/// What happened to one candidate
#[derive(Debug)]
enum CandidateOutcome {
    Executed(ExecutedOrder),
    NoGasPrice,
    AlreadyExecuting,
    FillFailed,
}

#[derive(Debug, Default)]
struct BatchTally {
    executed: usize,
    no_gas_price: usize,
    already_executing: usize,
    fill_failed: usize,
}

/// Fans a batch of executable orders out to the filler
///
/// Each candidate runs independently: no gas price means skip, a live dedup
/// reservation means skip, a failed fill releases the reservation so the next
/// batch can retry it. A failing candidate never affects its siblings.
pub struct ExecutionCoordinator {
    gas_oracle: Arc<dyn GasOracle>,
    filler: Arc<dyn OrderFiller>,
    dedup: Arc<DedupTracker>,
    settings: ExecutionSettings,
}

impl ExecutionCoordinator {
    pub fn new(
        gas_oracle: Arc<dyn GasOracle>,
        filler: Arc<dyn OrderFiller>,
        dedup: Arc<DedupTracker>,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            gas_oracle,
            filler,
            dedup,
            settings,
        }
    }

    pub fn dedup(&self) -> &Arc<DedupTracker> {
        &self.dedup
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Attempt every candidate concurrently.
    ///
    /// Returns the orders that were actually filled, in completion order.
    pub async fn execute_orders(&self, candidates: &[CandidateOrder]) -> Vec<ExecutedOrder> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut pending: FuturesUnordered<_> = candidates
            .iter()
            .map(|candidate| self.execute_one(candidate))
            .collect();

        let mut executed = Vec::new();
        let mut tally = BatchTally::default();

        while let Some(outcome) = pending.next().await {
            match outcome {
                CandidateOutcome::Executed(result) => {
                    tally.executed += 1;
                    executed.push(result);
                }
                CandidateOutcome::NoGasPrice => tally.no_gas_price += 1,
                CandidateOutcome::AlreadyExecuting => tally.already_executing += 1,
                CandidateOutcome::FillFailed => tally.fill_failed += 1,
            }
        }

        info!(
            candidates = candidates.len(),
            executed = tally.executed,
            no_gas_price = tally.no_gas_price,
            already_executing = tally.already_executing,
            fill_failed = tally.fill_failed,
            "Execution batch finished"
        );

        executed
    }

    /// Execute a batch and append the fills to the audit log.
    ///
    /// Store errors propagate; reservations are left as they are.
    pub async fn execute_and_record(
        &self,
        candidates: &[CandidateOrder],
        store: &dyn OrderStore,
    ) -> Result<Vec<ExecutedOrder>> {
        let executed = self.execute_orders(candidates).await;

        if !executed.is_empty() {
            store.save_executed_orders(&executed).await.map_err(|e| {
                warn!(count = executed.len(), error = %e, "Failed to record executed orders");
                e
            })?;
        }

        Ok(executed)
    }

    #[instrument(skip_all, fields(digest = %hex_key(&candidate.digest())))]
    async fn execute_one(&self, candidate: &CandidateOrder) -> CandidateOutcome {
        let order = candidate.order();
        let digest = candidate.digest();

        let keep_token_in = self
            .settings
            .profit_tokens
            .keep_token_in(order.token_in, order.token_out);
        let amount_external = compute_settlement(candidate, keep_token_in);

        let chain_id = self.settings.chain_id;
        let gas_price = match isolate(async { self.gas_oracle.gas_price(chain_id).await }).await {
            Ok(Some(price)) if !price.is_zero() => price,
            Ok(_) => {
                debug!("Gas price unavailable, skipping");
                return CandidateOutcome::NoGasPrice;
            }
            Err(e) => {
                debug!(error = %e, "Gas oracle failed, skipping");
                return CandidateOutcome::NoGasPrice;
            }
        };

        if self.dedup.try_reserve(digest) {
            info!("Order already executing");
            return CandidateOutcome::AlreadyExecuting;
        }

        let request = FillRequest {
            digest,
            order: order.clone(),
            path: order.token_pair(),
            amount_external,
            amount_to_fill: candidate.in_amount,
            receiver: self.settings.receiver,
            profit_receiver: self.settings.profit_receiver,
            keep_token_in,
        };

        let options = FillOptions::with_gas_price(gas_price);
        match isolate(async { self.filler.fill(&request, options).await }).await {
            Ok(status) if status.executed => {
                info!(
                    tx_hash = ?status.transaction_hash,
                    gas_price = %gas_price,
                    "Order filled"
                );
                CandidateOutcome::Executed(ExecutedOrder {
                    order: order.clone(),
                    digest,
                    fill_amount: candidate.in_amount,
                    tx_hash: status.transaction_hash,
                })
            }
            Ok(_) => {
                self.dedup.release(digest);
                warn!("Gas estimation failed");
                CandidateOutcome::FillFailed
            }
            Err(e) => {
                self.dedup.release(digest);
                warn!(error = %e, "Fill call failed");
                CandidateOutcome::FillFailed
            }
        }
    }
}

/// Await a collaborator call, turning a panic into an error for this candidate.
async fn isolate<T>(call: impl Future<Output = Result<T>>) -> Result<T> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(RelayerError::Internal(format!(
            "collaborator panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string payload"
    }
}

/// Amount the coordinator would hand to the filler, for dry-run reporting.
pub fn preview_settlement(
    settings: &ExecutionSettings,
    candidate: &CandidateOrder,
) -> (bool, U256) {
    let order = candidate.order();
    let keep_token_in = settings
        .profit_tokens
        .keep_token_in(order.token_in, order.token_out);
    (keep_token_in, compute_settlement(candidate, keep_token_in))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures;
    use crate::error::RelayerError;
    use crate::execution::traits::{FillStatus, MockGasOracle, MockOrderFiller};
    use crate::persistence::MemoryStore;
    use ethers::types::H256;
    use std::time::Duration;

    const GAS: u64 = 30_000_000_000;

    fn settings() -> ExecutionSettings {
        ExecutionSettings {
            chain_id: 137,
            receiver: Address::repeat_byte(0x77),
            profit_receiver: Address::repeat_byte(0x88),
            // token_in of the fixture order (0x0a) ranks above token_out (0x0b)
            profit_tokens: ProfitTokens::from_preferred([
                Address::repeat_byte(0x0a),
                Address::repeat_byte(0x0b),
            ]),
        }
    }

    fn candidate(digest_byte: u8) -> CandidateOrder {
        CandidateOrder {
            limit_order: fixtures::record(digest_byte, "1"),
            in_amount: U256::from(1_000u64),
            min_amount_in: U256::from(900u64),
            out_amount: U256::from(500u64),
            out_diff: U256::from(50u64),
        }
    }

    fn gas_oracle(price: Option<u64>) -> MockGasOracle {
        let mut oracle = MockGasOracle::new();
        oracle
            .expect_gas_price()
            .returning(move |_| Ok(price.map(U256::from)));
        oracle
    }

    fn coordinator(oracle: MockGasOracle, filler: MockOrderFiller) -> ExecutionCoordinator {
        ExecutionCoordinator::new(
            Arc::new(oracle),
            Arc::new(filler),
            Arc::new(DedupTracker::new(Duration::from_secs(180))),
            settings(),
        )
    }

    #[tokio::test]
    async fn test_successful_fill_produces_result() {
        let mut filler = MockOrderFiller::new();
        filler
            .expect_fill()
            .withf(|request, options| {
                request.keep_token_in
                    && request.amount_external == U256::from(910u64)
                    && request.amount_to_fill == U256::from(1_000u64)
                    && request.receiver == Address::repeat_byte(0x77)
                    && request.profit_receiver == Address::repeat_byte(0x88)
                    && !options.force_execution
                    && !options.open
                    && options.gas_price == U256::from(GAS)
            })
            .times(1)
            .returning(|_, _| Ok(FillStatus::executed(H256::repeat_byte(0xee))));

        let coordinator = coordinator(gas_oracle(Some(GAS)), filler);
        let results = coordinator.execute_orders(&[candidate(1)]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].digest, H256::repeat_byte(1));
        assert_eq!(results[0].fill_amount, U256::from(1_000u64));
        assert_eq!(results[0].tx_hash, Some(H256::repeat_byte(0xee)));
        assert!(coordinator.dedup().is_reserved(H256::repeat_byte(1)));
    }

    #[tokio::test]
    async fn test_missing_gas_price_skips_without_reserving() {
        let mut filler = MockOrderFiller::new();
        filler.expect_fill().times(0);

        let coordinator = coordinator(gas_oracle(None), filler);
        let results = coordinator.execute_orders(&[candidate(1), candidate(2)]).await;

        assert!(results.is_empty());
        assert!(coordinator.dedup().is_empty());
    }

    #[tokio::test]
    async fn test_zero_gas_price_counts_as_missing() {
        let mut filler = MockOrderFiller::new();
        filler.expect_fill().times(0);

        let coordinator = coordinator(gas_oracle(Some(0)), filler);
        assert!(coordinator.execute_orders(&[candidate(1)]).await.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_error_is_transient() {
        let mut oracle = MockGasOracle::new();
        oracle
            .expect_gas_price()
            .returning(|_| Err(RelayerError::Provider("timeout".to_string())));
        let mut filler = MockOrderFiller::new();
        filler.expect_fill().times(0);

        let coordinator = coordinator(oracle, filler);
        assert!(coordinator.execute_orders(&[candidate(1)]).await.is_empty());
        assert!(!coordinator.dedup().is_reserved(H256::repeat_byte(1)));
    }

    #[tokio::test]
    async fn test_not_executed_releases_reservation() {
        let mut filler = MockOrderFiller::new();
        filler
            .expect_fill()
            .times(2)
            .returning(|_, _| Ok(FillStatus::not_executed()));

        let coordinator = coordinator(gas_oracle(Some(GAS)), filler);

        assert!(coordinator.execute_orders(&[candidate(1)]).await.is_empty());
        assert!(!coordinator.dedup().is_reserved(H256::repeat_byte(1)));

        // Retried on the very next batch
        assert!(coordinator.execute_orders(&[candidate(1)]).await.is_empty());
    }

    #[tokio::test]
    async fn test_fill_error_is_isolated_per_candidate() {
        let mut filler = MockOrderFiller::new();
        filler.expect_fill().times(2).returning(|request, _| {
            if request.digest == H256::repeat_byte(1) {
                Err(RelayerError::Fill("nonce too low".to_string()))
            } else {
                Ok(FillStatus::executed(H256::repeat_byte(0xee)))
            }
        });

        let coordinator = coordinator(gas_oracle(Some(GAS)), filler);
        let results = coordinator
            .execute_orders(&[candidate(1), candidate(2)])
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].digest, H256::repeat_byte(2));
        assert!(!coordinator.dedup().is_reserved(H256::repeat_byte(1)));
        assert!(coordinator.dedup().is_reserved(H256::repeat_byte(2)));
    }

    #[tokio::test]
    async fn test_reserved_digest_is_not_filled_again() {
        let mut filler = MockOrderFiller::new();
        filler
            .expect_fill()
            .times(1)
            .returning(|_, _| Ok(FillStatus::executed(H256::repeat_byte(0xee))));

        let coordinator = coordinator(gas_oracle(Some(GAS)), filler);

        assert_eq!(coordinator.execute_orders(&[candidate(1)]).await.len(), 1);
        assert!(coordinator.execute_orders(&[candidate(1)]).await.is_empty());
    }

    #[tokio::test]
    async fn test_keep_token_out_settlement() {
        let mut filler = MockOrderFiller::new();
        filler
            .expect_fill()
            .withf(|request, _| {
                !request.keep_token_in && request.amount_external == U256::from(495u64)
            })
            .times(1)
            .returning(|_, _| Ok(FillStatus::executed(H256::repeat_byte(0xee))));

        let mut settings = settings();
        settings.profit_tokens = ProfitTokens::default();

        let coordinator = ExecutionCoordinator::new(
            Arc::new(gas_oracle(Some(GAS))),
            Arc::new(filler),
            Arc::new(DedupTracker::default()),
            settings,
        );

        assert_eq!(coordinator.execute_orders(&[candidate(1)]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_and_record_persists_fills() {
        let mut filler = MockOrderFiller::new();
        filler
            .expect_fill()
            .returning(|_, _| Ok(FillStatus::executed(H256::repeat_byte(0xee))));

        let coordinator = coordinator(gas_oracle(Some(GAS)), filler);
        let store = MemoryStore::new();

        let executed = coordinator
            .execute_and_record(&[candidate(1), candidate(2)], &store)
            .await
            .unwrap();

        assert_eq!(executed.len(), 2);
        assert_eq!(store.executed_count().await, 2);
    }

    #[test]
    fn test_preview_settlement() {
        let (keep_token_in, amount) = preview_settlement(&settings(), &candidate(1));
        assert!(keep_token_in);
        assert_eq!(amount, U256::from(910u64));
    }
}
