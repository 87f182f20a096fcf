use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::U256;
use ethers::utils::parse_units;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{RelayerError, Result};
use crate::execution::GasOracle;

/// Gas price from a JSON-RPC node (`eth_gasPrice`)
///
/// Prices above the optional cap are reported as unavailable so the batch is
/// skipped until the network calms down.
pub struct ProviderGasOracle<M> {
    provider: Arc<M>,
    chain_id: u64,
    max_gas_price: Option<U256>,
}

impl ProviderGasOracle<Provider<Http>> {
    /// Connect to an HTTP RPC endpoint
    pub fn connect(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RelayerError::Provider(format!("Invalid RPC url {rpc_url}: {e}")))?;
        Ok(Self::new(Arc::new(provider), chain_id))
    }
}

impl<M: Middleware> ProviderGasOracle<M> {
    pub fn new(provider: Arc<M>, chain_id: u64) -> Self {
        Self {
            provider,
            chain_id,
            max_gas_price: None,
        }
    }

    /// Cap the accepted gas price, in gwei
    pub fn with_max_gwei(mut self, max_gwei: Option<Decimal>) -> Result<Self> {
        self.max_gas_price = match max_gwei {
            Some(gwei) => Some(gwei_to_wei(gwei)?),
            None => None,
        };
        Ok(self)
    }
}

fn gwei_to_wei(gwei: Decimal) -> Result<U256> {
    parse_units(gwei.normalize().to_string(), "gwei")
        .map(Into::into)
        .map_err(|e| RelayerError::Validation(format!("Invalid gas cap {gwei} gwei: {e}")))
}

#[async_trait]
impl<M> GasOracle for ProviderGasOracle<M>
where
    M: Middleware + 'static,
{
    async fn gas_price(&self, chain_id: u64) -> Result<Option<U256>> {
        if chain_id != self.chain_id {
            return Err(RelayerError::Provider(format!(
                "Gas oracle serves chain {}, asked for {}",
                self.chain_id, chain_id
            )));
        }

        let price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| RelayerError::Provider(format!("eth_gasPrice failed: {e}")))?;

        if price.is_zero() {
            warn!("Node returned a zero gas price");
            return Ok(None);
        }

        if let Some(cap) = self.max_gas_price {
            if price > cap {
                debug!(gas_price = %price, cap = %cap, "Gas price above cap");
                return Ok(None);
            }
        }

        Ok(Some(price))
    }
}
