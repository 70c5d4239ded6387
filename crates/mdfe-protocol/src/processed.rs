//! Processed envelopes: `mdfeProc` for authorized manifests and
//! `procEventoMDFe` for registered events.

use mdfe_core::{AccessKey, Element, MDFE_NAMESPACE};
use serde::{Deserialize, Serialize};

/// Which envelope a [`ProcessedDocument`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessedKind {
    /// `mdfeProc`
    Manifest,
    /// `procEventoMDFe`
    Event,
}

impl ProcessedKind {
    /// Envelope element name.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Manifest => "mdfeProc",
            Self::Event => "procEventoMDFe",
        }
    }
}

/// A submission merged with the authority record that accepted it.
/// Immutable and ready for archival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    kind: ProcessedKind,
    access_key: AccessKey,
    status: u16,
    protocol_number: Option<String>,
    envelope: Element,
}

impl ProcessedDocument {
    pub(crate) fn wrap(
        kind: ProcessedKind,
        version: &str,
        submitted: &Element,
        record: &Element,
        access_key: AccessKey,
        status: u16,
        protocol_number: Option<String>,
    ) -> Self {
        let envelope = Element::new(kind.tag())
            .attr("versao", version)
            .attr("xmlns", MDFE_NAMESPACE)
            .child(submitted.clone())
            .child(record.clone());
        Self {
            kind,
            access_key,
            status,
            protocol_number,
            envelope,
        }
    }

    /// Envelope kind.
    pub fn kind(&self) -> ProcessedKind {
        self.kind
    }

    /// Key of the document the envelope concerns.
    pub fn access_key(&self) -> &AccessKey {
        &self.access_key
    }

    /// `cStat` of the matched record.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// `nProt` of the matched record.
    pub fn protocol_number(&self) -> Option<&str> {
        self.protocol_number.as_deref()
    }

    /// The envelope element.
    pub fn envelope(&self) -> &Element {
        &self.envelope
    }

    /// Consume into the envelope element.
    pub fn into_envelope(self) -> Element {
        self.envelope
    }

    /// Serialize with an XML declaration.
    pub fn to_xml(&self) -> String {
        self.envelope.to_document()
    }
}
