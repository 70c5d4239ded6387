//! # Authority Response Records
//!
//! Extracts the fields reconciliation needs from opaque response payloads.
//! Lookups are by local name, so prefixed and unprefixed payloads read the
//! same. The original record element is kept for the processed envelope.

use mdfe_core::{Element, DEFAULT_VERSION, MDFE_NAMESPACE};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// One `protMDFe` entry of an authorization response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityResponseRecord {
    /// `cStat`
    pub status: u16,
    /// `xMotivo`
    pub reason: String,
    /// `nProt`
    pub protocol_number: Option<String>,
    /// `digVal`
    pub digest_value: Option<String>,
    /// `chMDFe`
    pub subject_key: Option<String>,
    /// The `protMDFe` element as received.
    pub element: Element,
}

/// The `retEventoMDFe` answer to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponseRecord {
    /// `cStat`
    pub status: u16,
    /// `xMotivo`
    pub reason: String,
    /// `nProt`
    pub protocol_number: Option<String>,
    /// `chMDFe`
    pub subject_key: Option<String>,
    /// `tpEvento`
    pub event_type: Option<String>,
    /// `nSeqEvento`
    pub sequence: Option<String>,
    /// The `retEventoMDFe` element as received.
    pub element: Element,
}

fn text(info: &Element, field: &str) -> Option<String> {
    info.find_text(&[field])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn status(info: &Element) -> Result<u16, ReconcileError> {
    let raw = info
        .find_text(&["cStat"])
        .ok_or_else(|| ReconcileError::MalformedResponse(format!("{} has no cStat", info.name)))?;
    raw.trim()
        .parse()
        .map_err(|_| ReconcileError::MalformedResponse(format!("cStat {raw:?} is not numeric")))
}

impl AuthorityResponseRecord {
    /// Read a `protMDFe` (or bare `infProt`) element.
    pub fn from_element(element: &Element) -> Result<Self, ReconcileError> {
        let wrapped = match element.local_name() {
            "protMDFe" => element.clone(),
            "infProt" => Element::new("protMDFe")
                .attr("versao", DEFAULT_VERSION)
                .child(element.clone()),
            other => {
                return Err(ReconcileError::MalformedResponse(format!(
                    "expected protMDFe, found {other}"
                )))
            }
        };
        let info = wrapped
            .first_child("infProt")
            .ok_or_else(|| ReconcileError::MalformedResponse("protMDFe has no infProt".into()))?;
        Ok(Self {
            status: status(info)?,
            reason: text(info, "xMotivo").unwrap_or_default(),
            protocol_number: text(info, "nProt"),
            digest_value: text(info, "digVal"),
            subject_key: text(info, "chMDFe"),
            element: wrapped,
        })
    }

    /// Synthesize a record and its `protMDFe` element.
    pub fn new(status: u16, reason: &str, key: &str, digest: &str, protocol: Option<&str>) -> Self {
        let info = Element::new("infProt")
            .leaf("chMDFe", key)
            .leaf_opt("nProt", protocol)
            .leaf("digVal", digest)
            .leaf("cStat", status.to_string())
            .leaf("xMotivo", reason);
        let element = Element::new("protMDFe")
            .attr("versao", DEFAULT_VERSION)
            .attr("xmlns", MDFE_NAMESPACE)
            .child(info);
        Self {
            status,
            reason: reason.to_string(),
            protocol_number: protocol.map(str::to_string),
            digest_value: Some(digest.to_string()),
            subject_key: Some(key.to_string()),
            element,
        }
    }
}

impl EventResponseRecord {
    /// Read a `retEventoMDFe` (or bare `infEvento`) element.
    pub fn from_element(element: &Element) -> Result<Self, ReconcileError> {
        let wrapped = match element.local_name() {
            "retEventoMDFe" => element.clone(),
            "infEvento" => Element::new("retEventoMDFe")
                .attr("versao", DEFAULT_VERSION)
                .child(element.clone()),
            other => {
                return Err(ReconcileError::MalformedResponse(format!(
                    "expected retEventoMDFe, found {other}"
                )))
            }
        };
        let info = wrapped.first_child("infEvento").ok_or_else(|| {
            ReconcileError::MalformedResponse("retEventoMDFe has no infEvento".into())
        })?;
        Ok(Self {
            status: status(info)?,
            reason: text(info, "xMotivo").unwrap_or_default(),
            protocol_number: text(info, "nProt"),
            subject_key: text(info, "chMDFe"),
            event_type: text(info, "tpEvento"),
            sequence: text(info, "nSeqEvento"),
            element: wrapped,
        })
    }

    /// Synthesize a record and its `retEventoMDFe` element.
    pub fn new(
        status: u16,
        reason: &str,
        key: &str,
        event_type: Option<&str>,
        protocol: Option<&str>,
    ) -> Self {
        let info = Element::new("infEvento")
            .leaf("cStat", status.to_string())
            .leaf("xMotivo", reason)
            .leaf("chMDFe", key)
            .leaf_opt("tpEvento", event_type)
            .leaf_opt("nSeqEvento", event_type.map(|_| "1"))
            .leaf_opt("nProt", protocol);
        let element = Element::new("retEventoMDFe")
            .attr("versao", DEFAULT_VERSION)
            .attr("xmlns", MDFE_NAMESPACE)
            .child(info);
        Self {
            status,
            reason: reason.to_string(),
            protocol_number: protocol.map(str::to_string),
            subject_key: Some(key.to_string()),
            event_type: event_type.map(str::to_string),
            sequence: event_type.map(|_| "1".to_string()),
            element,
        }
    }
}

fn parse(xml: &str) -> Result<Element, ReconcileError> {
    Element::parse(xml).map_err(|e| ReconcileError::MalformedResponse(e.to_string()))
}

/// Every authorization record in a response payload, in document order.
/// A payload with a batch status but no records yields an empty list.
pub fn parse_authorization_response(xml: &str) -> Result<Vec<AuthorityResponseRecord>, ReconcileError> {
    let root = parse(xml)?;
    let mut records = root.descendants_named("protMDFe");
    if records.is_empty() {
        records = root.descendants_named("infProt");
    }
    records
        .into_iter()
        .map(AuthorityResponseRecord::from_element)
        .collect()
}

/// The event answer in a response payload.
pub fn parse_event_response(xml: &str) -> Result<EventResponseRecord, ReconcileError> {
    let root = parse(xml)?;
    let found = root
        .descendant("retEventoMDFe")
        .or_else(|| root.descendant("infEvento"))
        .ok_or_else(|| ReconcileError::MalformedResponse("no retEventoMDFe in response".into()))?;
    EventResponseRecord::from_element(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "41140581452880000139580010000000281611743166";

    #[test]
    fn test_parse_batch_response_with_prefixes() {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <retConsReciMDFe xmlns="{MDFE_NAMESPACE}" versao="3.00">
      <cStat>104</cStat>
      <protMDFe versao="3.00">
        <infProt>
          <chMDFe>{KEY}</chMDFe>
          <nProt>941140000000001</nProt>
          <digVal>abc123</digVal>
          <cStat>100</cStat>
          <xMotivo>Autorizado o uso do MDF-e</xMotivo>
        </infProt>
      </protMDFe>
    </retConsReciMDFe>
  </soap:Body>
</soap:Envelope>"#
        );
        let records = parse_authorization_response(&xml).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.status, 100);
        assert_eq!(r.subject_key.as_deref(), Some(KEY));
        assert_eq!(r.digest_value.as_deref(), Some("abc123"));
        assert_eq!(r.protocol_number.as_deref(), Some("941140000000001"));
        assert_eq!(r.element.local_name(), "protMDFe");
    }

    #[test]
    fn test_bare_inf_prot_is_wrapped() {
        let xml = format!("<infProt><chMDFe>{KEY}</chMDFe><cStat>100</cStat></infProt>");
        let records = parse_authorization_response(&xml).unwrap();
        assert_eq!(records[0].element.name, "protMDFe");
        assert_eq!(records[0].digest_value, None);
    }

    #[test]
    fn test_non_numeric_status_is_malformed() {
        let xml = "<protMDFe><infProt><cStat>OK</cStat></infProt></protMDFe>";
        assert!(matches!(
            parse_authorization_response(xml),
            Err(ReconcileError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_event_response() {
        let xml = format!(
            "<retEventoMDFe versao=\"3.00\"><infEvento><cStat>135</cStat>\
             <xMotivo>Evento registrado</xMotivo><chMDFe>{KEY}</chMDFe>\
             <tpEvento>110111</tpEvento><nSeqEvento>1</nSeqEvento>\
             <nProt>941140000000002</nProt></infEvento></retEventoMDFe>"
        );
        let r = parse_event_response(&xml).unwrap();
        assert_eq!(r.status, 135);
        assert_eq!(r.event_type.as_deref(), Some("110111"));
        assert_eq!(r.protocol_number.as_deref(), Some("941140000000002"));
    }

    #[test]
    fn test_event_response_missing() {
        assert!(parse_event_response("<retConsSitMDFe/>").is_err());
    }

    #[test]
    fn test_deeply_nested_payload_is_malformed() {
        let payload = "<a>".repeat(200_000) + &"</a>".repeat(200_000);
        assert!(matches!(
            parse_authorization_response(&payload),
            Err(ReconcileError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_event_response(&payload),
            Err(ReconcileError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_synthesized_record_reparses() {
        let r = AuthorityResponseRecord::new(100, "Autorizado", KEY, "d1", Some("1"));
        assert_eq!(AuthorityResponseRecord::from_element(&r.element).unwrap(), r);
    }
}
