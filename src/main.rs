use clap::Parser;
use limit_relayer::cli::output::OutputMode;
use limit_relayer::cli::{commands, Cli, Commands};
use limit_relayer::config::AppConfig;
use limit_relayer::error::{RelayerError, Result};
use tracing::{error, info, warn};

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match AppConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging_simple();
            error!("Failed to load configuration from {}: {}", cli.config.display(), e);
            return Err(e.into());
        }
    };

    init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for problem in &errors {
            warn!("Config: {}", problem);
        }
        return Err(RelayerError::Validation(errors.join("; ")));
    }

    if config.dry_run.enabled {
        info!("Dry run mode: fills are logged, no transactions are sent");
    }

    match &cli.command {
        Commands::Migrate => commands::migrate(&config).await?,
        Commands::Gas => commands::show_gas(&config).await?,
        Commands::Orders {
            pair,
            token_in,
            below,
            json,
        } => {
            commands::list_orders(&config, pair, token_in, below, OutputMode::from_json_flag(*json))
                .await?
        }
        Commands::Execute { file, record, json } => {
            commands::execute_batch(&config, file, *record, OutputMode::from_json_flag(*json))
                .await?
        }
        Commands::Executed { limit, json } => {
            commands::show_executed(&config, *limit, OutputMode::from_json_flag(*json)).await?
        }
    }

    Ok(())
}
