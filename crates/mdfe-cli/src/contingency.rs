//! # Contingency Subcommand
//!
//! Reads and transitions the persisted contingency config in
//! `state_dir/contingency.json`.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use mdfe_state::ContingencyConfig;

use crate::config::EmitterConfig;

/// Arguments for the `mdfe contingency` subcommand.
#[derive(Args, Debug)]
pub struct ContingencyArgs {
    #[command(subcommand)]
    pub command: ContingencyCommand,
}

/// Contingency subcommands.
#[derive(Subcommand, Debug)]
pub enum ContingencyCommand {
    /// Show the current emission mode.
    Status {
        /// Print the persisted JSON form instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Enter offline contingency (NORMAL → OFFLINE_FALLBACK).
    Activate {
        /// Reason for entering contingency.
        #[arg(long)]
        motive: String,
        /// Federation unit; defaults to the configured `uf`.
        #[arg(long)]
        uf: Option<String>,
        /// Explicit mode name.
        #[arg(long)]
        mode: Option<String>,
    },

    /// Return to normal emission (OFFLINE_FALLBACK → NORMAL).
    Deactivate,
}

/// Execute the contingency subcommand.
pub fn run_contingency(args: &ContingencyArgs, config: &EmitterConfig) -> Result<u8> {
    match &args.command {
        ContingencyCommand::Status { json } => {
            let current = config.load_contingency()?;
            if *json {
                println!("{}", current.to_json());
            } else {
                print_status(&current);
            }
            Ok(0)
        }

        ContingencyCommand::Activate { motive, uf, mode } => {
            let Some(region) = uf.as_deref().or(config.uf.as_deref()) else {
                bail!("no federation unit: pass --uf or set `uf` in the config file");
            };
            let mut current = config.load_contingency()?;
            current
                .activate(region, motive, mode.as_deref())
                .context("cannot activate contingency")?;
            config.save_contingency(&current)?;
            println!("OK: contingency active ({})", current.mode());
            Ok(0)
        }

        ContingencyCommand::Deactivate => {
            let mut current = config.load_contingency()?;
            let was_active = current.is_active();
            current.deactivate();
            config.save_contingency(&current)?;
            if was_active {
                println!("OK: contingency deactivated");
            } else {
                println!("OK: already in normal mode");
            }
            Ok(0)
        }
    }
}

fn print_status(config: &ContingencyConfig) {
    println!("Mode: {}", config.mode());
    println!("  tpEmis: {}", config.emission_type().code());
    if let Some(at) = config.activated_at() {
        println!("  Since: {at}");
    }
    if !config.motive().is_empty() {
        println!("  Motive: {}", config.motive());
    }
}
