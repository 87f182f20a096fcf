//! Relayer CLI
//!
//! Commands:
//! - `relayer migrate` - Apply database migrations
//! - `relayer gas` - Show the gas price the engine would use
//! - `relayer orders` - List active limit orders below a price
//! - `relayer execute` - Run one execution batch from a JSON file
//! - `relayer executed` - Show the execution audit log

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Limit order relayer
#[derive(Parser, Debug)]
#[command(name = "relayer")]
#[command(author, version, about = "Fills on-chain limit orders once they become profitable")]
pub struct Cli {
    /// Config directory
    #[arg(short, long, default_value = "config", env = "RELAYER_CONFIG_DIR")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply database migrations
    Migrate,

    /// Show the current gas price for the configured chain
    Gas,

    /// List active limit orders for a pair priced below a threshold
    Orders {
        /// Pair address
        #[arg(long)]
        pair: String,
        /// Input token of the orders
        #[arg(long)]
        token_in: String,
        /// Price threshold (decimal integer)
        #[arg(long)]
        below: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a batch of candidate orders read from a JSON file
    Execute {
        /// JSON array of candidate orders
        #[arg(short, long)]
        file: PathBuf,
        /// Append fills to the executed-orders log
        #[arg(long)]
        record: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recently executed orders
    Executed {
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_orders_command() {
        let cli = Cli::try_parse_from([
            "relayer",
            "orders",
            "--pair",
            "0x01",
            "--token-in",
            "0x02",
            "--below",
            "200000000000000000",
        ])
        .unwrap();

        match cli.command {
            Commands::Orders { below, json, .. } => {
                assert_eq!(below, "200000000000000000");
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("config"));
    }

    #[test]
    fn test_parse_execute_command() {
        let cli =
            Cli::try_parse_from(["relayer", "execute", "-f", "batch.json", "--record"]).unwrap();
        match cli.command {
            Commands::Execute { file, record, .. } => {
                assert_eq!(file, PathBuf::from("batch.json"));
                assert!(record);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
