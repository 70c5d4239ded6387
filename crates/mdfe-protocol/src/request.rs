//! # Service Requests
//!
//! Payloads handed to a [`crate::Transport`]. Each builder returns the
//! request's root element; the transport owns envelopes and endpoints.

use mdfe_core::{AccessKey, Element, Environment, DEFAULT_VERSION, MDFE_NAMESPACE};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::event::tax_id_tag;

/// `xServ` of the list-unclosed query.
pub const UNCLOSED_QUERY_SERVICE: &str = "CONSULTAR NÃO ENCERRADOS";

/// Authority web services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceName {
    /// Batch submission (`enviMDFe`).
    Reception,
    /// Batch receipt query (`consReciMDFe`).
    ReceiptQuery,
    /// Single document status (`consSitMDFe`).
    StatusQuery,
    /// Event registration (`eventoMDFe`).
    Event,
    /// Service availability (`consStatServMDFe`).
    ServiceStatus,
    /// Unclosed manifests of an issuer (`consMDFeNaoEnc`).
    UnclosedQuery,
}

impl ServiceName {
    /// Root element of the request this service receives.
    pub fn request_root(self) -> &'static str {
        match self {
            Self::Reception => "enviMDFe",
            Self::ReceiptQuery => "consReciMDFe",
            Self::StatusQuery => "consSitMDFe",
            Self::Event => "eventoMDFe",
            Self::ServiceStatus => "consStatServMDFe",
            Self::UnclosedQuery => "consMDFeNaoEnc",
        }
    }
}

impl std::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Reception => "MDFeRecepcao",
            Self::ReceiptQuery => "MDFeRetRecepcao",
            Self::StatusQuery => "MDFeConsulta",
            Self::Event => "MDFeRecepcaoEvento",
            Self::ServiceStatus => "MDFeStatusServico",
            Self::UnclosedQuery => "MDFeConsNaoEnc",
        };
        f.write_str(name)
    }
}

fn root(name: &str, version: &str) -> Element {
    Element::new(name)
        .attr("versao", version)
        .attr("xmlns", MDFE_NAMESPACE)
}

fn tp_amb(environment: Environment) -> String {
    environment.code().to_string()
}

/// `enviMDFe` wrapping one signed manifest.
///
/// # Errors
///
/// [`ReconcileError::MalformedSubmission`] when `batch_id` is empty or
/// longer than 15 digits, or `manifest` is not an `MDFe` element.
pub fn submission_batch(batch_id: &str, manifest: &Element) -> Result<Element, ReconcileError> {
    let batch_id = batch_id.trim();
    if batch_id.is_empty() || batch_id.len() > 15 || !batch_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReconcileError::MalformedSubmission(format!(
            "batch id {batch_id:?} must be 1 to 15 digits"
        )));
    }
    if manifest.local_name() != "MDFe" {
        return Err(ReconcileError::MalformedSubmission(format!(
            "expected MDFe, found {}",
            manifest.name
        )));
    }
    let version = manifest
        .find(&["infMDFe"])
        .and_then(|inf| inf.attribute("versao"))
        .unwrap_or(DEFAULT_VERSION);
    Ok(root("enviMDFe", version)
        .leaf("idLote", batch_id)
        .child(manifest.clone()))
}

/// `consReciMDFe` for a batch receipt number.
pub fn receipt_query(environment: Environment, receipt: &str, version: &str) -> Element {
    root("consReciMDFe", version)
        .leaf("tpAmb", tp_amb(environment))
        .leaf("nRec", receipt.trim())
}

/// `consSitMDFe` for one access key.
pub fn status_query(environment: Environment, key: &AccessKey, version: &str) -> Element {
    root("consSitMDFe", version)
        .leaf("tpAmb", tp_amb(environment))
        .leaf("xServ", "CONSULTAR")
        .leaf("chMDFe", key.as_str())
}

/// `consStatServMDFe`.
pub fn service_status(environment: Environment, version: &str) -> Element {
    root("consStatServMDFe", version)
        .leaf("tpAmb", tp_amb(environment))
        .leaf("xServ", "STATUS")
}

/// `consMDFeNaoEnc` for an issuer's CNPJ or CPF.
pub fn unclosed_query(
    environment: Environment,
    tax_id: &str,
    version: &str,
) -> Result<Element, ReconcileError> {
    let tag = tax_id_tag(tax_id)?;
    Ok(root("consMDFeNaoEnc", version)
        .leaf("tpAmb", tp_amb(environment))
        .leaf("xServ", UNCLOSED_QUERY_SERVICE)
        .leaf(tag, tax_id.trim()))
}
