use ethers::providers::{Http, Provider};
use ethers::types::{Address, U256};
use ethers::utils::format_units;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::output::{print_items, ExecutedRow, LimitOrderRow, OutputMode, SettlementRow};
use crate::adapters::{DryRunFiller, PostgresStore, ProviderGasOracle};
use crate::config::AppConfig;
use crate::domain::{hex_key, CandidateOrder};
use crate::error::{RelayerError, Result};
use crate::execution::{
    preview_settlement, DedupTracker, ExecutionCoordinator, ExecutionSettings, GasOracle,
};

pub async fn connect_store(config: &AppConfig) -> Result<PostgresStore> {
    PostgresStore::new(&config.database.url, config.database.max_connections).await
}

pub fn build_gas_oracle(config: &AppConfig) -> Result<ProviderGasOracle<Provider<Http>>> {
    ProviderGasOracle::connect(&config.chain.rpc_url, config.chain.chain_id)?
        .with_max_gwei(config.execution.max_gas_price_gwei)
}

pub fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim())
        .map_err(|e| RelayerError::Validation(format!("Invalid address {raw}: {e}")))
}

pub fn parse_amount(raw: &str) -> Result<U256> {
    U256::from_dec_str(raw.trim())
        .map_err(|e| RelayerError::Validation(format!("Invalid decimal amount {raw}: {e}")))
}

pub fn read_candidates(path: &Path) -> Result<Vec<CandidateOrder>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub async fn migrate(config: &AppConfig) -> Result<()> {
    let store = connect_store(config).await?;
    store.migrate().await
}

pub async fn show_gas(config: &AppConfig) -> Result<()> {
    let oracle = build_gas_oracle(config)?;

    match oracle.gas_price(config.chain.chain_id).await? {
        Some(price) => {
            let gwei = format_units(price, "gwei")
                .map_err(|e| RelayerError::Internal(e.to_string()))?;
            println!("chain {}: {} gwei", config.chain.chain_id, gwei);
        }
        None => println!(
            "chain {}: gas price unavailable (zero or above cap)",
            config.chain.chain_id
        ),
    }
    Ok(())
}

pub async fn list_orders(
    config: &AppConfig,
    pair: &str,
    token_in: &str,
    below: &str,
    mode: OutputMode,
) -> Result<()> {
    let pair = parse_address(pair)?;
    let token_in = parse_address(token_in)?;
    let threshold = parse_amount(below)?;

    let store = connect_store(config).await?;
    let orders = store.get_limit_orders(threshold, pair, token_in).await?;

    let rows: Vec<LimitOrderRow> = orders.iter().map(LimitOrderRow::from).collect();
    print_items(&rows, mode)?;
    Ok(())
}

pub async fn execute_batch(
    config: &AppConfig,
    file: &Path,
    record: bool,
    mode: OutputMode,
) -> Result<()> {
    if !config.dry_run.enabled {
        return Err(RelayerError::Validation(
            "This binary ships only the dry-run filler; set dry_run.enabled = true".to_string(),
        ));
    }

    if let Err(errors) = config.validate_for_execution() {
        return Err(RelayerError::Validation(errors.join("; ")));
    }

    let candidates = read_candidates(file)?;
    info!("Loaded {} candidate orders from {}", candidates.len(), file.display());

    let settings = ExecutionSettings::from_config(config);
    let filler = Arc::new(DryRunFiller::new());
    let coordinator = ExecutionCoordinator::new(
        Arc::new(build_gas_oracle(config)?),
        filler.clone(),
        Arc::new(DedupTracker::new(config.execution.dedup_window())),
        settings.clone(),
    );

    let executed = if record {
        let store = connect_store(config).await?;
        coordinator.execute_and_record(&candidates, &store).await?
    } else {
        coordinator.execute_orders(&candidates).await
    };

    let executed_digests: HashSet<_> = executed.iter().map(|e| e.digest).collect();
    let rows: Vec<SettlementRow> = candidates
        .iter()
        .filter(|c| executed_digests.contains(&c.digest()))
        .map(|c| {
            let (keep_token_in, amount_external) = preview_settlement(&settings, c);
            SettlementRow {
                digest: hex_key(&c.digest()),
                keep_token_in,
                amount_external: amount_external.to_string(),
                amount_to_fill: c.in_amount.to_string(),
            }
        })
        .collect();

    print_items(&rows, mode)?;
    info!(
        simulated_fills = filler.fill_count(),
        "{} of {} candidates executed",
        executed.len(),
        candidates.len()
    );
    Ok(())
}

pub async fn show_executed(config: &AppConfig, limit: usize, mode: OutputMode) -> Result<()> {
    let store = connect_store(config).await?;
    let rows: Vec<ExecutedRow> = store
        .recent_executed_orders(limit)
        .await?
        .iter()
        .map(ExecutedRow::from)
        .collect();

    print_items(&rows, mode)?;
    Ok(())
}
