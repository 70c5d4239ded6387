//! # Event Subcommand
//!
//! Writes unsigned `eventoMDFe` requests. Sign them with
//! `mdfe sign --tag infEvento`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use mdfe_core::AccessKey;
use mdfe_protocol::{EventBody, EventRequest};

use crate::config::EmitterConfig;
use crate::manifest::emit_output;

/// Arguments for the `mdfe event` subcommand.
#[derive(Args, Debug)]
pub struct EventArgs {
    /// Access key of the manifest the event concerns.
    #[arg(long, global = true)]
    pub key: Option<String>,
    /// Author CNPJ or CPF; defaults to the configured `tax_id`.
    #[arg(long, global = true)]
    pub author: Option<String>,
    /// Event sequence number (nSeqEvento).
    #[arg(long, global = true, default_value_t = 1)]
    pub sequence: u8,
    /// Write the request here instead of stdout.
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,
    #[command(subcommand)]
    pub command: EventCommand,
}

/// Event subcommands.
#[derive(Subcommand, Debug)]
pub enum EventCommand {
    /// Cancellation (110111).
    Cancel {
        /// Authorization protocol number.
        #[arg(long)]
        protocol: String,
        /// Justification.
        #[arg(long)]
        justification: String,
    },

    /// Closure (110112).
    Close {
        /// Authorization protocol number.
        #[arg(long)]
        protocol: String,
        /// Closing date, YYYY-MM-DD.
        #[arg(long)]
        date: String,
        /// IBGE code of the closing state.
        #[arg(long)]
        uf_code: String,
        /// IBGE code of the closing municipality.
        #[arg(long)]
        municipality: String,
    },

    /// Driver inclusion (110114).
    Driver {
        /// Driver name.
        #[arg(long)]
        name: String,
        /// Driver CPF.
        #[arg(long)]
        cpf: String,
    },
}

impl EventCommand {
    fn body(&self) -> EventBody {
        match self {
            Self::Cancel {
                protocol,
                justification,
            } => EventBody::Cancellation {
                protocol: protocol.clone(),
                justification: justification.clone(),
            },
            Self::Close {
                protocol,
                date,
                uf_code,
                municipality,
            } => EventBody::Closure {
                protocol: protocol.clone(),
                closed_on: date.clone(),
                uf_code: uf_code.clone(),
                municipality_code: municipality.clone(),
            },
            Self::Driver { name, cpf } => EventBody::DriverInclusion {
                name: name.clone(),
                cpf: cpf.clone(),
            },
        }
    }
}

/// Execute the event subcommand.
pub fn run_event(args: &EventArgs, config: &EmitterConfig) -> Result<u8> {
    let raw_key = args.key.as_deref().context("--key is required")?;
    let key = AccessKey::parse(raw_key).context("invalid access key")?;
    let author = args
        .author
        .as_deref()
        .or(config.tax_id.as_deref())
        .context("no author: pass --author or set `tax_id` in the config file")?;

    let request = EventRequest::new(key, config.environment, author, args.command.body())
        .with_sequence(args.sequence)
        .with_version(&config.schema_version);
    let element = request.to_element().context("cannot build event request")?;
    tracing::info!(id = %request.id(), kind = %request.kind(), "event request built");
    emit_output(&element.to_document(), args.out.as_deref())?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdfe_core::Element;

    const KEY: &str = "41140581452880000139580010000000281611743166";

    #[test]
    fn close_event_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("close.xml");
        let config = EmitterConfig {
            tax_id: Some("81452880000139".into()),
            ..EmitterConfig::default()
        };
        let args = EventArgs {
            key: Some(KEY.into()),
            author: None,
            sequence: 2,
            out: Some(out.clone()),
            command: EventCommand::Close {
                protocol: "941140000000001".into(),
                date: "2014-05-22".into(),
                uf_code: "42".into(),
                municipality: "4205407".into(),
            },
        };
        assert_eq!(run_event(&args, &config).unwrap(), 0);
        let el = Element::parse(&std::fs::read_to_string(out).unwrap()).unwrap();
        let info = el.first_child("infEvento").unwrap();
        assert_eq!(info.attribute("Id"), Some(format!("ID110112{KEY}02").as_str()));
        assert_eq!(info.find_text(&["CNPJ"]), Some("81452880000139"));
        assert_eq!(info.find_text(&["tpAmb"]), Some("2"));
    }

    #[test]
    fn missing_author_is_an_error() {
        let args = EventArgs {
            key: Some(KEY.into()),
            author: None,
            sequence: 1,
            out: None,
            command: EventCommand::Driver {
                name: "ANA".into(),
                cpf: "12345678901".into(),
            },
        };
        let err = run_event(&args, &EmitterConfig::default()).unwrap_err();
        assert!(err.to_string().contains("--author"));
    }
}
