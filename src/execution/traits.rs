use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::domain::{LimitOrder, OrderDigest, TokenPair};
use crate::error::Result;

/// Source of the current gas price for a chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GasOracle: Send + Sync {
    /// `Ok(None)` when no usable price is available right now.
    async fn gas_price(&self, chain_id: u64) -> Result<Option<U256>>;
}

/// Everything the fill transaction needs about one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    pub digest: OrderDigest,
    pub order: LimitOrder,
    pub path: TokenPair,
    /// Slippage-adjusted amount the counterparty must honour
    pub amount_external: U256,
    pub amount_to_fill: U256,
    pub receiver: Address,
    pub profit_receiver: Address,
    pub keep_token_in: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillOptions {
    pub force_execution: bool,
    pub gas_price: U256,
    pub open: bool,
}

impl FillOptions {
    pub fn with_gas_price(gas_price: U256) -> Self {
        Self {
            force_execution: false,
            gas_price,
            open: false,
        }
    }
}

/// Outcome reported by the fill transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillStatus {
    pub executed: bool,
    pub transaction_hash: Option<H256>,
}

impl FillStatus {
    pub fn executed(transaction_hash: H256) -> Self {
        Self {
            executed: true,
            transaction_hash: Some(transaction_hash),
        }
    }

    pub fn not_executed() -> Self {
        Self::default()
    }
}

/// Builds, signs and submits the fill transaction for one order
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderFiller: Send + Sync {
    /// `executed = false` means the fill was not sent (e.g. gas estimation failed).
    async fn fill(&self, request: &FillRequest, options: FillOptions) -> Result<FillStatus>;
}
