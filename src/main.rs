use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use staker_config::StakerConfig;
use staker_escrow::FsKeyEscrow;
use staker_provisioner::HttpProvisioningApi;
use staker_saga::{StateSlot, compute_stakeable_validator_count};
use staker_store::SqliteStateStore;
use staker_types::VALIDATOR_DEPOSIT;

/// Staker - resumable validator provisioning for a liquid staking strategy
#[derive(Parser)]
#[command(name = "staker")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.staker)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Inspect or reset the persisted workflow
  State {
    #[command(subcommand)]
    action: StateAction,
  },

  /// Compute how many validators can be funded
  Capacity {
    /// Strategy asset balance, in wei
    #[arg(long)]
    balance: u128,

    /// Stake threshold, in wei
    #[arg(long)]
    threshold: u128,

    /// Stake already committed, in wei
    #[arg(long)]
    tally: u128,

    /// Deposit per validator, in wei (default: 32 ether)
    #[arg(long, default_value_t = VALIDATOR_DEPOSIT)]
    unit: u128,
  },

  /// Work with configuration files
  Config {
    #[command(subcommand)]
    action: ConfigAction,
  },
}

#[derive(Subcommand)]
enum StateAction {
  /// Print the workflow state as JSON
  Show,

  /// Drop the workflow state so the next run starts fresh
  Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
  /// Parse and validate a configuration file
  Validate {
    /// Path to the configuration file (JSON)
    config_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".staker"),
  };

  match cli.command {
    Some(Commands::State { action }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_state(action, &data_dir).await })?;
    }
    Some(Commands::Capacity {
      balance,
      threshold,
      tally,
      unit,
    }) => {
      println!("{}", compute_stakeable_validator_count(balance, threshold, tally, unit));
    }
    Some(Commands::Config {
      action: ConfigAction::Validate { config_file },
    }) => {
      validate_config(&config_file, &data_dir)?;
    }
    None => {
      println!("staker - use --help to see available commands");
    }
  }

  Ok(())
}

async fn open_slot(data_dir: &Path) -> Result<StateSlot> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let db_path = data_dir.join("state.db");
  let store = SqliteStateStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open state database: {}", db_path.display()))?;

  Ok(StateSlot::new(Arc::new(store)))
}

async fn run_state(action: StateAction, data_dir: &Path) -> Result<()> {
  let slot = open_slot(data_dir).await?;

  match action {
    StateAction::Show => match slot.load().await.context("failed to load workflow state")? {
      Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
      None => eprintln!("No workflow in progress"),
    },
    StateAction::Clear => match slot.take().await.context("failed to clear workflow state")? {
      Some(state) => eprintln!("Cleared workflow {} at {}", state.correlation_id, state.kind()),
      None => eprintln!("No workflow in progress"),
    },
  }

  Ok(())
}

fn validate_config(config_file: &Path, data_dir: &Path) -> Result<()> {
  let config = StakerConfig::load(config_file)
    .with_context(|| format!("invalid config file: {}", config_file.display()))?;
  HttpProvisioningApi::from_config(&config.provisioner).context("invalid provisioner settings")?;
  let escrow = FsKeyEscrow::from_config(&config.escrow, data_dir);

  eprintln!("Config OK: {}", config_file.display());
  eprintln!("  provisioner: {}", config.provisioner.base_url);
  if let Some(name) = &config.provisioner.api_key_env {
    eprintln!("  api key from: ${name}");
  }
  eprintln!("  escrow dir: {}", escrow.base_path().display());
  eprintln!("  operators: {:?}", config.saga.operator_ids);
  eprintln!("  error threshold: {}", config.saga.error_threshold);
  eprintln!("  unit stake: {} wei", config.saga.unit_stake);

  Ok(())
}
