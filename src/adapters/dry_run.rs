use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::domain::hex_key;
use crate::error::Result;
use crate::execution::{FillOptions, FillRequest, FillStatus, OrderFiller};

/// Filler that logs the fill it would send and reports it as executed
///
/// No transaction is built, so results carry no transaction hash.
#[derive(Debug, Default)]
pub struct DryRunFiller {
    fills: AtomicU64,
}

impl DryRunFiller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of simulated fills so far
    pub fn fill_count(&self) -> u64 {
        self.fills.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OrderFiller for DryRunFiller {
    async fn fill(&self, request: &FillRequest, options: FillOptions) -> Result<FillStatus> {
        self.fills.fetch_add(1, Ordering::Relaxed);

        info!(
            digest = %hex_key(&request.digest),
            path = %request.path,
            amount_external = %request.amount_external,
            amount_to_fill = %request.amount_to_fill,
            keep_token_in = request.keep_token_in,
            gas_price = %options.gas_price,
            "[DRY RUN] Would fill order"
        );

        Ok(FillStatus {
            executed: true,
            transaction_hash: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures::record;
    use ethers::types::{Address, U256};

    #[tokio::test]
    async fn test_dry_run_reports_executed_without_hash() {
        let filler = DryRunFiller::new();
        let record = record(1, "1");
        let request = FillRequest {
            digest: record.digest,
            path: record.order.token_pair(),
            order: record.order,
            amount_external: U256::from(910u64),
            amount_to_fill: U256::from(1_000u64),
            receiver: Address::zero(),
            profit_receiver: Address::zero(),
            keep_token_in: true,
        };

        let status = filler
            .fill(&request, FillOptions::with_gas_price(U256::one()))
            .await
            .unwrap();

        assert!(status.executed);
        assert_eq!(status.transaction_hash, None);
        assert_eq!(filler.fill_count(), 1);
    }
}
