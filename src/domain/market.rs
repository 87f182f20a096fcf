use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Direction of a fill: what the order sells and what it buys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token_in: Address,
    pub token_out: Address,
}

impl std::fmt::Display for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}->{:?}", self.token_in, self.token_out)
    }
}

/// AMM pair whose limit orders the relayer watches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchPair {
    pub pair_address: Address,
    pub token0: Address,
    pub token1: Address,
}
