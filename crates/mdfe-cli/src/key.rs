//! # Key Subcommand
//!
//! Access-key utilities.
//!
//! - `build`: Compose a key from its components.
//! - `check`: Verify a key's check digit and print its components.
//! - `recompute`: Replace a key's trailing digit with the correct one.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use mdfe_core::{validate_key_for_unit, AccessKey, KeyFields, DEFAULT_MODEL};

/// Arguments for the `mdfe key` subcommand.
#[derive(Args, Debug)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub command: KeyCommand,
}

/// Key subcommands.
#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Compose an access key from its components.
    Build {
        /// IBGE code of the federation unit (cUF).
        #[arg(long)]
        uf_code: String,
        /// Two-digit emission year.
        #[arg(long)]
        year: String,
        /// Two-digit emission month.
        #[arg(long)]
        month: String,
        /// Issuer CNPJ or CPF.
        #[arg(long)]
        tax_id: String,
        /// Document model.
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        /// Series.
        #[arg(long)]
        series: String,
        /// Document number.
        #[arg(long)]
        number: String,
        /// Emission type (tpEmis).
        #[arg(long, default_value = "1")]
        emission_type: String,
        /// Eight-digit control number (cMDF).
        #[arg(long)]
        control_number: String,
    },

    /// Verify a key and print its components.
    Check {
        /// The 44-digit key.
        key: String,
        /// Also require the key to belong to this federation unit.
        #[arg(long)]
        uf: Option<String>,
    },

    /// Recompute the check digit of a 43- or 44-digit key.
    Recompute {
        /// The key or key prefix.
        key: String,
    },
}

/// Execute the key subcommand.
pub fn run_key(args: &KeyArgs) -> Result<u8> {
    match &args.command {
        KeyCommand::Build {
            uf_code,
            year,
            month,
            tax_id,
            model,
            series,
            number,
            emission_type,
            control_number,
        } => {
            let fields = KeyFields {
                uf_code: uf_code.clone(),
                year: year.clone(),
                month: month.clone(),
                tax_id: tax_id.clone(),
                model: model.clone(),
                series: series.clone(),
                number: number.clone(),
                emission_type: emission_type.clone(),
                control_number: control_number.clone(),
            };
            let key = AccessKey::build(&fields).context("cannot build access key")?;
            println!("{key}");
            Ok(0)
        }

        KeyCommand::Check { key, uf } => cmd_check(key, uf.as_deref()),

        KeyCommand::Recompute { key } => {
            let key = AccessKey::recompute(key).context("cannot recompute check digit")?;
            println!("{key}");
            Ok(0)
        }
    }
}

/// Returns 0 for a valid key, 2 for a key that fails verification.
fn cmd_check(raw: &str, uf: Option<&str>) -> Result<u8> {
    let key = match AccessKey::parse(raw) {
        Ok(key) => key,
        Err(e) => {
            println!("INVALID: {e}");
            return Ok(2);
        }
    };
    if let Some(uf) = uf {
        if let Err(e) = validate_key_for_unit(&key, uf) {
            println!("INVALID: {e}");
            return Ok(2);
        }
    }
    let fields = key.fields();
    println!("OK: {key}");
    println!("  cUF:    {}", fields.uf_code);
    println!("  AAMM:   {}{}", fields.year, fields.month);
    println!("  CNPJ:   {}", fields.tax_id);
    println!("  mod:    {}", fields.model);
    println!("  serie:  {}", fields.series);
    println!("  nMDF:   {}", fields.number);
    println!("  tpEmis: {}", fields.emission_type);
    println!("  cMDF:   {}", fields.control_number);
    println!("  cDV:    {}", key.check_digit());
    Ok(0)
}
