use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

use super::TokenPair;

/// Content-derived identifier of a limit order. Dedup key and storage key.
pub type OrderDigest = H256;

/// Signed limit order as published by the maker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrder {
    pub maker: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub recipient: Address,
    /// Unix seconds
    pub start_time: u64,
    /// Unix seconds
    pub end_time: u64,
    #[serde(default)]
    pub stop_price: U256,
    #[serde(default)]
    pub oracle_address: Address,
    #[serde(default)]
    pub oracle_data: Bytes,
    pub v: u8,
    pub r: H256,
    pub s: H256,
    pub chain_id: u64,
}

impl LimitOrder {
    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            token_in: self.token_in,
            token_out: self.token_out,
        }
    }

    /// Order window is open strictly between start and end.
    pub fn is_active_at(&self, now_secs: u64) -> bool {
        self.start_time < now_secs && now_secs < self.end_time
    }
}

/// Persisted limit order
///
/// `price` is kept as a decimal string because it can exceed every native
/// numeric range. Compare it through [`LimitOrderRecord::price_value`], never
/// as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderRecord {
    pub order: LimitOrder,
    pub digest: OrderDigest,
    pub pair_address: Address,
    pub price: String,
}

impl LimitOrderRecord {
    /// Decode the stored price. `None` when the string is not a base-10 integer.
    pub fn price_value(&self) -> Option<U256> {
        let raw = self.price.trim();
        if raw.is_empty() {
            return None;
        }
        U256::from_dec_str(raw).ok()
    }

    /// Strict numeric comparison against a threshold. Undecodable prices never match.
    pub fn price_below(&self, threshold: U256) -> bool {
        self.price_value().is_some_and(|price| price < threshold)
    }
}

/// Order judged executable upstream, with live market context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOrder {
    pub limit_order: LimitOrderRecord,
    /// Token-in amount available to fill
    pub in_amount: U256,
    /// Minimum token-in the resting order accepts
    pub min_amount_in: U256,
    /// Token-out amount available
    pub out_amount: U256,
    /// Out-side deficit relative to the order's limit price
    pub out_diff: U256,
}

impl CandidateOrder {
    pub fn digest(&self) -> OrderDigest {
        self.limit_order.digest
    }

    pub fn order(&self) -> &LimitOrder {
        &self.limit_order.order
    }
}

/// Audit record of a successful fill. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedOrder {
    pub order: LimitOrder,
    pub digest: OrderDigest,
    pub fill_amount: U256,
    pub tx_hash: Option<H256>,
}

/// Executed order as read back from storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedOrderRow {
    pub executed: ExecutedOrder,
    pub executed_at: DateTime<Utc>,
}

/// Lowercase `0x` hex form used as a storage key for addresses and digests.
pub fn hex_key<T: std::fmt::Debug>(value: &T) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn order(token_in: Address, token_out: Address) -> LimitOrder {
        LimitOrder {
            maker: Address::repeat_byte(0xaa),
            token_in,
            token_out,
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(500u64),
            recipient: Address::repeat_byte(0xaa),
            start_time: 0,
            end_time: u64::MAX,
            stop_price: U256::zero(),
            oracle_address: Address::zero(),
            oracle_data: Bytes::default(),
            v: 27,
            r: H256::repeat_byte(0x01),
            s: H256::repeat_byte(0x02),
            chain_id: 137,
        }
    }

    pub fn record(digest_byte: u8, price: &str) -> LimitOrderRecord {
        LimitOrderRecord {
            order: order(Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)),
            digest: H256::repeat_byte(digest_byte),
            pair_address: Address::repeat_byte(0xcc),
            price: price.to_string(),
        }
    }
}
