//! # Reconcile Subcommand
//!
//! Merges a submission with the authority's response payload.
//!
//! - `authorization`: Signed manifest + batch response → `mdfeProc`.
//! - `event`: Signed event + event response → `procEventoMDFe`.
//! - `cancel`: Processed manifest + cancellation response → cancelled copy.
//!
//! Exit code 2 means the authority rejected the submission; other
//! mismatches are errors.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use mdfe_protocol::{
    cancel_register, parse_authorization_response, parse_event_response, reconcile_authorization,
    reconcile_event, EventKind, ReconcileError,
};

use crate::manifest::emit_output;
use crate::signing::read_document;

/// Arguments for the `mdfe reconcile` subcommand.
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    #[command(subcommand)]
    pub command: ReconcileCommand,
}

/// Reconcile subcommands.
#[derive(Subcommand, Debug)]
pub enum ReconcileCommand {
    /// Match a signed manifest against a batch response.
    Authorization {
        /// Signed MDFe document.
        document: PathBuf,
        /// Authority response payload.
        #[arg(long)]
        response: PathBuf,
        /// Write the processed document here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Match a submitted event against its response.
    Event {
        /// Submitted eventoMDFe document.
        document: PathBuf,
        /// Authority response payload.
        #[arg(long)]
        response: PathBuf,
        /// Event type code; read from the submitted event when omitted.
        #[arg(long)]
        kind: Option<String>,
        /// Write the processed event here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Mark an authorized manifest as cancelled.
    Cancel {
        /// Processed mdfeProc document.
        document: PathBuf,
        /// Cancellation event response payload.
        #[arg(long)]
        response: PathBuf,
        /// Write the cancelled document here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn read_payload(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Rejections map to exit code 2; everything else is an error.
fn outcome<T>(result: Result<T, ReconcileError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ReconcileError::RejectedByAuthority { status, reason }) => {
            println!("REJECTED: [{status}] {reason}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Execute the reconcile subcommand.
pub fn run_reconcile(args: &ReconcileArgs) -> Result<u8> {
    match &args.command {
        ReconcileCommand::Authorization {
            document,
            response,
            out,
        } => {
            let submitted = read_document(document)?;
            let records = parse_authorization_response(&read_payload(response)?)
                .context("cannot read authorization response")?;
            let Some(processed) = outcome(reconcile_authorization(&submitted, &records))? else {
                return Ok(2);
            };
            tracing::info!(key = %processed.access_key(), status = processed.status(), "authorization reconciled");
            emit_output(&processed.to_xml(), out.as_deref())?;
            Ok(0)
        }

        ReconcileCommand::Event {
            document,
            response,
            kind,
            out,
        } => {
            let submitted = read_document(document)?;
            let code = match kind {
                Some(code) => code.clone(),
                None => submitted
                    .find_text(&["infEvento", "tpEvento"])
                    .context("submitted event has no tpEvento; pass --kind")?
                    .to_string(),
            };
            let kind = EventKind::from_code(&code)?;
            let record = parse_event_response(&read_payload(response)?)
                .context("cannot read event response")?;
            let Some(processed) = outcome(reconcile_event(&submitted, &record, kind))? else {
                return Ok(2);
            };
            emit_output(&processed.to_xml(), out.as_deref())?;
            Ok(0)
        }

        ReconcileCommand::Cancel {
            document,
            response,
            out,
        } => {
            let processed = read_document(document)?;
            let record = parse_event_response(&read_payload(response)?)
                .context("cannot read cancellation response")?;
            let Some(cancelled) = outcome(cancel_register(&processed, &record))? else {
                return Ok(2);
            };
            emit_output(&cancelled.to_document(), out.as_deref())?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdfe_core::Element;

    const KEY: &str = "41140581452880000139580010000000281611743166";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn signed_manifest(dir: &Path) -> PathBuf {
        write(
            dir,
            "signed.xml",
            &format!(
                "<MDFe><infMDFe Id=\"MDFe{KEY}\" versao=\"3.00\"/>\
                 <Signature><SignedInfo><Reference><DigestValue>d1</DigestValue>\
                 </Reference></SignedInfo></Signature></MDFe>"
            ),
        )
    }

    fn batch(status: u16) -> String {
        format!(
            "<retConsReciMDFe><protMDFe versao=\"3.00\"><infProt><chMDFe>{KEY}</chMDFe>\
             <nProt>941140000000001</nProt><digVal>d1</digVal><cStat>{status}</cStat>\
             <xMotivo>motivo</xMotivo></infProt></protMDFe></retConsReciMDFe>"
        )
    }

    fn event_response(status: u16) -> String {
        format!(
            "<retEventoMDFe><infEvento><cStat>{status}</cStat><xMotivo>ok</xMotivo>\
             <chMDFe>{KEY}</chMDFe><tpEvento>110111</tpEvento><nProt>941140000000002</nProt>\
             </infEvento></retEventoMDFe>"
        )
    }

    #[test]
    fn authorization_then_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let processed = dir.path().join("proc.xml");
        let code = run_reconcile(&ReconcileArgs {
            command: ReconcileCommand::Authorization {
                document: signed_manifest(dir.path()),
                response: write(dir.path(), "ret.xml", &batch(100)),
                out: Some(processed.clone()),
            },
        })
        .unwrap();
        assert_eq!(code, 0);

        let cancelled = dir.path().join("cancelled.xml");
        let code = run_reconcile(&ReconcileArgs {
            command: ReconcileCommand::Cancel {
                document: processed,
                response: write(dir.path(), "ev.xml", &event_response(135)),
                out: Some(cancelled.clone()),
            },
        })
        .unwrap();
        assert_eq!(code, 0);
        let el = Element::parse(&std::fs::read_to_string(cancelled).unwrap()).unwrap();
        assert_eq!(el.find_text(&["protMDFe", "infProt", "cStat"]), Some("101"));
    }

    #[test]
    fn rejected_authorization_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        let code = run_reconcile(&ReconcileArgs {
            command: ReconcileCommand::Authorization {
                document: signed_manifest(dir.path()),
                response: write(dir.path(), "ret.xml", &batch(999)),
                out: None,
            },
        })
        .unwrap();
        assert_eq!(code, 2);
    }

    #[test]
    fn event_kind_read_from_submission() {
        let dir = tempfile::tempdir().unwrap();
        let event = write(
            dir.path(),
            "event.xml",
            &format!(
                "<eventoMDFe versao=\"3.00\"><infEvento><chMDFe>{KEY}</chMDFe>\
                 <tpEvento>110111</tpEvento></infEvento></eventoMDFe>"
            ),
        );
        let out = dir.path().join("proc-ev.xml");
        let code = run_reconcile(&ReconcileArgs {
            command: ReconcileCommand::Event {
                document: event.clone(),
                response: write(dir.path(), "ev.xml", &event_response(136)),
                kind: None,
                out: Some(out.clone()),
            },
        })
        .unwrap();
        assert_eq!(code, 0);
        assert!(std::fs::read_to_string(out).unwrap().contains("procEventoMDFe"));

        let err = run_reconcile(&ReconcileArgs {
            command: ReconcileCommand::Event {
                document: event,
                response: write(dir.path(), "ev2.xml", &event_response(135)),
                kind: Some("999999".into()),
                out: None,
            },
        })
        .unwrap_err();
        assert!(err.to_string().contains("999999"));
    }
}
