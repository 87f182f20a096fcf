//! Output formatting for `relayer` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::{hex_key, ExecutedOrderRow, LimitOrderRecord};

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct LimitOrderRow {
    pub digest: String,
    pub price: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub amount_out: String,
    pub end_time: u64,
}

impl From<&LimitOrderRecord> for LimitOrderRow {
    fn from(record: &LimitOrderRecord) -> Self {
        Self {
            digest: hex_key(&record.digest),
            price: record.price.clone(),
            token_in: hex_key(&record.order.token_in),
            token_out: hex_key(&record.order.token_out),
            amount_in: record.order.amount_in.to_string(),
            amount_out: record.order.amount_out.to_string(),
            end_time: record.order.end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ExecutedRow {
    pub executed_at: String,
    pub digest: String,
    pub fill_amount: String,
    pub tx_hash: String,
}

impl From<&ExecutedOrderRow> for ExecutedRow {
    fn from(row: &ExecutedOrderRow) -> Self {
        Self {
            executed_at: row.executed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            digest: hex_key(&row.executed.digest),
            fill_amount: row.executed.fill_amount.to_string(),
            tx_hash: row
                .executed
                .tx_hash
                .as_ref()
                .map(hex_key)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Settlement the coordinator computed for one candidate
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SettlementRow {
    pub digest: String,
    pub keep_token_in: bool,
    pub amount_external: String,
    pub amount_to_fill: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures::record;
    use crate::domain::ExecutedOrder;
    use chrono::{TimeZone, Utc};
    use ethers::types::U256;

    #[test]
    fn test_output_mode_from_flag() {
        assert_eq!(OutputMode::from_json_flag(true), OutputMode::Json);
        assert_eq!(OutputMode::from_json_flag(false), OutputMode::Table);
    }

    #[test]
    fn test_limit_order_row_uses_decimal_amounts() {
        let row = LimitOrderRow::from(&record(1, "123"));
        assert_eq!(row.amount_in, "1000");
        assert_eq!(row.price, "123");
        assert!(row.digest.starts_with("0x0101"));
    }

    #[test]
    fn test_executed_row_without_hash() {
        let order = record(1, "1");
        let row = ExecutedOrderRow {
            executed: ExecutedOrder {
                order: order.order,
                digest: order.digest,
                fill_amount: U256::from(42u64),
                tx_hash: None,
            },
            executed_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let display = ExecutedRow::from(&row);
        assert_eq!(display.tx_hash, "-");
        assert_eq!(display.fill_amount, "42");
        assert_eq!(display.executed_at, "2024-01-02 03:04:05");
    }
}
