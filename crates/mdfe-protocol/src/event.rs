//! # Events
//!
//! Post-authorization actions on a manifest: building the `eventoMDFe`
//! request, reconciling the authority's answer into a `procEventoMDFe`
//! envelope, and marking a processed manifest as cancelled.
//!
//! Events are single, not batched, so matching is by subject key only. A
//! key mismatch is fatal regardless of status.

use mdfe_core::text::sanitize;
use mdfe_core::{AccessKey, Element, Environment, FiscalDateTime, DEFAULT_VERSION, MDFE_NAMESPACE};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::processed::{ProcessedDocument, ProcessedKind};
use crate::response::EventResponseRecord;

/// Maximum characters of a cancellation justification.
pub const MAX_JUSTIFICATION_CHARS: usize = 255;

/// Homologated (135) and homologated with restriction (136).
pub const EVENT_ALLOW_LIST: [u16; 2] = [135, 136];

/// Closure also accepts 155 (already closed).
pub const CLOSURE_EXTRA_STATUS: u16 = 155;

/// Reason written on a cancelled manifest's protocol.
pub const CANCELLED_REASON: &str = "Cancelamento de MDF-e homologado";

/// Status written on a cancelled manifest's protocol.
pub const CANCELLED_STATUS: &str = "101";

/// Supported event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// 110111
    Cancellation,
    /// 110112
    Closure,
    /// 110114
    DriverInclusion,
}

impl EventKind {
    /// `tpEvento` code.
    pub fn code(self) -> u32 {
        match self {
            Self::Cancellation => 110111,
            Self::Closure => 110112,
            Self::DriverInclusion => 110114,
        }
    }

    /// Look up an event by its `tpEvento` code.
    pub fn from_code(code: &str) -> Result<Self, ReconcileError> {
        match code.trim() {
            "110111" => Ok(Self::Cancellation),
            "110112" => Ok(Self::Closure),
            "110114" => Ok(Self::DriverInclusion),
            other => Err(ReconcileError::UnknownEventKind(other.to_string())),
        }
    }

    /// `descEvento` text.
    pub fn description(self) -> &'static str {
        match self {
            Self::Cancellation => "Cancelamento",
            Self::Closure => "Encerramento",
            Self::DriverInclusion => "Inclusao Condutor",
        }
    }

    /// Whether `status` is a handled outcome for this event.
    pub fn allows(self, status: u16) -> bool {
        EVENT_ALLOW_LIST.contains(&status) || (self == Self::Closure && status == CLOSURE_EXTRA_STATUS)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancellation => f.write_str("CANCELLATION"),
            Self::Closure => f.write_str("CLOSURE"),
            Self::DriverInclusion => f.write_str("DRIVER_INCLUSION"),
        }
    }
}

// ─── Requests ────────────────────────────────────────────────────────

/// Kind-specific event content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventBody {
    /// `evCancMDFe`
    Cancellation {
        /// Authorization protocol being cancelled.
        protocol: String,
        /// Justification; sanitized and cut to 255 characters.
        justification: String,
    },
    /// `evEncMDFe`
    Closure {
        /// Authorization protocol of the manifest.
        protocol: String,
        /// Closing date, `YYYY-MM-DD`.
        closed_on: String,
        /// IBGE code of the closing state.
        uf_code: String,
        /// IBGE code of the closing municipality.
        municipality_code: String,
    },
    /// `evIncCondutorMDFe`
    DriverInclusion {
        /// Driver name.
        name: String,
        /// Driver CPF.
        cpf: String,
    },
}

impl EventBody {
    /// Event type of this body.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Cancellation { .. } => EventKind::Cancellation,
            Self::Closure { .. } => EventKind::Closure,
            Self::DriverInclusion { .. } => EventKind::DriverInclusion,
        }
    }
}

/// An `eventoMDFe` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    key: AccessKey,
    environment: Environment,
    author_tax_id: String,
    issued_at: FiscalDateTime,
    sequence: u8,
    version: String,
    body: EventBody,
}

/// `CNPJ` for 14 digits, `CPF` for 11.
pub(crate) fn tax_id_tag(tax_id: &str) -> Result<&'static str, ReconcileError> {
    let digits = tax_id.trim();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReconcileError::MalformedSubmission(format!(
            "tax id {digits:?} is not numeric"
        )));
    }
    match digits.len() {
        14 => Ok("CNPJ"),
        11 => Ok("CPF"),
        n => Err(ReconcileError::MalformedSubmission(format!(
            "tax id must have 11 or 14 digits, got {n}"
        ))),
    }
}

impl EventRequest {
    /// Event on `key` by the party with `author_tax_id`, sequence 1, dated
    /// now.
    pub fn new(key: AccessKey, environment: Environment, author_tax_id: &str, body: EventBody) -> Self {
        Self {
            key,
            environment,
            author_tax_id: author_tax_id.trim().to_string(),
            issued_at: FiscalDateTime::now(),
            sequence: 1,
            version: DEFAULT_VERSION.to_string(),
            body,
        }
    }

    /// Set `nSeqEvento`.
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    /// Set `dhEvento`.
    pub fn with_issued_at(mut self, issued_at: FiscalDateTime) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Set the layout version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Event type.
    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }

    /// `infEvento/@Id`: `ID` + type + key + two-digit sequence.
    pub fn id(&self) -> String {
        format!("ID{}{}{:02}", self.kind().code(), self.key, self.sequence)
    }

    fn detail(&self) -> Result<Element, ReconcileError> {
        let kind = self.kind();
        let detail = match &self.body {
            EventBody::Cancellation {
                protocol,
                justification,
            } => {
                let justification = sanitize(justification, MAX_JUSTIFICATION_CHARS);
                if justification.is_empty() {
                    return Err(ReconcileError::MalformedSubmission(
                        "cancellation needs a justification".into(),
                    ));
                }
                Element::new("evCancMDFe")
                    .leaf("descEvento", kind.description())
                    .leaf("nProt", protocol.trim())
                    .leaf("xJust", justification)
            }
            EventBody::Closure {
                protocol,
                closed_on,
                uf_code,
                municipality_code,
            } => Element::new("evEncMDFe")
                .leaf("descEvento", kind.description())
                .leaf("nProt", protocol.trim())
                .leaf("dtEnc", closed_on.trim())
                .leaf("cUF", uf_code.trim())
                .leaf("cMun", municipality_code.trim()),
            EventBody::DriverInclusion { name, cpf } => Element::new("evIncCondutorMDFe")
                .leaf("descEvento", kind.description())
                .child(
                    Element::new("condutor")
                        .leaf("xNome", name.trim())
                        .leaf("CPF", cpf.trim()),
                ),
        };
        Ok(detail)
    }

    /// Build the unsigned `eventoMDFe` element.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::MalformedSubmission`] for an unusable author tax
    /// id, a key whose state code is unknown, or an empty justification.
    pub fn to_element(&self) -> Result<Element, ReconcileError> {
        let unit = self
            .key
            .federation_unit()
            .map_err(|e| ReconcileError::MalformedSubmission(e.to_string()))?;
        let tag = tax_id_tag(&self.author_tax_id)?;
        let info = Element::new("infEvento")
            .attr("Id", self.id())
            .leaf("cOrgao", format!("{:02}", unit.code()))
            .leaf("tpAmb", self.environment.code().to_string())
            .leaf(tag, self.author_tax_id.as_str())
            .leaf("chMDFe", self.key.as_str())
            .leaf("dhEvento", self.issued_at.to_rfc3339())
            .leaf("tpEvento", self.kind().code().to_string())
            .leaf("nSeqEvento", self.sequence.to_string())
            .child(
                Element::new("detEvento")
                    .attr("versaoEvento", self.version.as_str())
                    .child(self.detail()?),
            );
        Ok(Element::new("eventoMDFe")
            .attr("versao", self.version.as_str())
            .attr("xmlns", MDFE_NAMESPACE)
            .child(info))
    }
}

// ─── Reconciliation ──────────────────────────────────────────────────

/// A response that names its event type must name `kind`.
fn check_response_kind(response: &EventResponseRecord, kind: EventKind) -> Result<(), ReconcileError> {
    match response.event_type.as_deref().map(str::trim) {
        Some(found) if found != kind.code().to_string() => Err(ReconcileError::WrongEventKind {
            expected: kind.code(),
            found: found.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_event(
    key: &AccessKey,
    response: &EventResponseRecord,
    kind: EventKind,
) -> Result<(), ReconcileError> {
    let found = response.subject_key.as_deref().unwrap_or_default();
    if found != key.as_str() {
        return Err(ReconcileError::SubjectMismatch {
            expected: key.to_string(),
            found: found.to_string(),
        });
    }
    if !kind.allows(response.status) {
        tracing::info!(key = %key, kind = %kind, status = response.status, "event rejected");
        return Err(ReconcileError::RejectedByAuthority {
            status: response.status,
            reason: response.reason.clone(),
        });
    }
    Ok(())
}

/// Reconcile a submitted `eventoMDFe` with the authority's answer.
///
/// # Errors
///
/// - [`ReconcileError::UnknownEventKind`] when the submitted `tpEvento`
///   is not a supported event.
/// - [`ReconcileError::WrongEventKind`] when the submitted `tpEvento`, or
///   the response's when present, is not `kind`.
/// - [`ReconcileError::SubjectMismatch`] when the response names another
///   key, whatever its status.
/// - [`ReconcileError::RejectedByAuthority`] for a status `kind` does not
///   allow.
pub fn reconcile_event(
    submitted: &Element,
    response: &EventResponseRecord,
    kind: EventKind,
) -> Result<ProcessedDocument, ReconcileError> {
    if submitted.local_name() != "eventoMDFe" {
        return Err(ReconcileError::MalformedSubmission(
            "submitted root is not eventoMDFe".into(),
        ));
    }
    let raw_key = submitted
        .find_text(&["infEvento", "chMDFe"])
        .ok_or_else(|| ReconcileError::MalformedSubmission("infEvento has no chMDFe".into()))?;
    let key = AccessKey::parse(raw_key.trim())
        .map_err(|e| ReconcileError::MalformedSubmission(e.to_string()))?;
    let code = submitted
        .find_text(&["infEvento", "tpEvento"])
        .ok_or_else(|| ReconcileError::MalformedSubmission("infEvento has no tpEvento".into()))?;
    let submitted_kind = EventKind::from_code(code)?;
    if submitted_kind != kind {
        return Err(ReconcileError::WrongEventKind {
            expected: kind.code(),
            found: code.trim().to_string(),
        });
    }
    check_response_kind(response, kind)?;
    check_event(&key, response, kind)?;

    let version = submitted.attribute("versao").unwrap_or(DEFAULT_VERSION);
    tracing::info!(key = %key, kind = %kind, status = response.status, "event reconciled");
    Ok(ProcessedDocument::wrap(
        ProcessedKind::Event,
        version,
        submitted,
        &response.element,
        key,
        response.status,
        response.protocol_number.clone(),
    ))
}

/// Mark an authorized manifest (`mdfeProc`) as cancelled.
///
/// Applies the cancellation rules of [`reconcile_event`] to `response`
/// and returns a copy of `document` whose protocol carries status 101,
/// the event's protocol number and [`CANCELLED_REASON`].
///
/// # Errors
///
/// - [`ReconcileError::WrongEventKind`] when the response is for another
///   event type.
/// - [`ReconcileError::NotAuthorized`] when `document` has no `protMDFe`.
/// - The errors of [`reconcile_event`].
pub fn cancel_register(
    document: &Element,
    response: &EventResponseRecord,
) -> Result<Element, ReconcileError> {
    let kind = EventKind::Cancellation;
    check_response_kind(response, kind)?;
    let id = document
        .find(&["MDFe", "infMDFe"])
        .and_then(|inf| inf.attribute("Id"))
        .ok_or_else(|| ReconcileError::MalformedSubmission("document has no MDFe/infMDFe".into()))?;
    let key = AccessKey::from_document_id(id)
        .map_err(|e| ReconcileError::MalformedSubmission(e.to_string()))?;
    if document.find(&["protMDFe", "infProt"]).is_none() {
        return Err(ReconcileError::NotAuthorized {
            key: key.to_string(),
        });
    }
    check_event(&key, response, kind)?;

    let mut cancelled = document.clone();
    if let Some(info) = cancelled.find_mut(&["protMDFe", "infProt"]) {
        set_or_append(info, "cStat", CANCELLED_STATUS);
        set_or_append(info, "xMotivo", CANCELLED_REASON);
        if let Some(protocol) = &response.protocol_number {
            if !info.set_text_at(&["nProt"], protocol.as_str()) {
                let at = info
                    .children
                    .iter()
                    .position(|c| matches!(c.local_name(), "digVal" | "cStat" | "xMotivo"))
                    .unwrap_or(info.children.len());
                info.children.insert(at, Element::with_text("nProt", protocol.as_str()));
            }
        }
    }
    tracing::info!(key = %key, "manifest marked as cancelled");
    Ok(cancelled)
}

fn set_or_append(parent: &mut Element, name: &str, text: &str) {
    if !parent.set_text_at(&[name], text) {
        parent.children.push(Element::with_text(name, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "41140581452880000139580010000000281611743166";

    fn key() -> AccessKey {
        AccessKey::parse(KEY).unwrap()
    }

    fn cancellation() -> EventRequest {
        EventRequest::new(
            key(),
            Environment::Homologation,
            "81452880000139",
            EventBody::Cancellation {
                protocol: "941140000000001".into(),
                justification: "Erro na digitação dos dados & valores".into(),
            },
        )
        .with_issued_at(FiscalDateTime::parse("2014-05-21T09:00:00-03:00").unwrap())
    }

    // ── event kinds ──

    #[test]
    fn test_event_kind_codes() {
        assert_eq!(EventKind::from_code("110111").unwrap(), EventKind::Cancellation);
        assert_eq!(EventKind::from_code("110112").unwrap(), EventKind::Closure);
        assert_eq!(EventKind::from_code("110114").unwrap(), EventKind::DriverInclusion);
        assert_eq!(
            EventKind::from_code("110115").unwrap_err(),
            ReconcileError::UnknownEventKind("110115".into())
        );
    }

    #[test]
    fn test_closure_allows_155_only() {
        assert!(EventKind::Closure.allows(155));
        assert!(!EventKind::Cancellation.allows(155));
        assert!(!EventKind::DriverInclusion.allows(155));
        assert!(EventKind::Cancellation.allows(136));
    }

    // ── requests ──

    #[test]
    fn test_cancellation_request_layout() {
        let el = cancellation().to_element().unwrap();
        let info = el.first_child("infEvento").unwrap();
        assert_eq!(info.attribute("Id"), Some(format!("ID110111{KEY}01").as_str()));
        assert_eq!(info.find_text(&["cOrgao"]), Some("41"));
        assert_eq!(info.find_text(&["tpAmb"]), Some("2"));
        assert_eq!(info.find_text(&["CNPJ"]), Some("81452880000139"));
        assert_eq!(info.find_text(&["dhEvento"]), Some("2014-05-21T09:00:00-03:00"));
        let body = info.find(&["detEvento", "evCancMDFe"]).unwrap();
        assert_eq!(body.find_text(&["descEvento"]), Some("Cancelamento"));
        assert_eq!(
            body.find_text(&["xJust"]),
            Some("Erro na digitacao dos dados e valores")
        );
    }

    #[test]
    fn test_closure_and_driver_bodies() {
        let closure = EventRequest::new(
            key(),
            Environment::Production,
            "12345678901",
            EventBody::Closure {
                protocol: "1".into(),
                closed_on: "2014-05-22".into(),
                uf_code: "42".into(),
                municipality_code: "4205407".into(),
            },
        )
        .with_sequence(3)
        .to_element()
        .unwrap();
        let info = closure.first_child("infEvento").unwrap();
        assert!(info.attribute("Id").unwrap().ends_with("03"));
        assert_eq!(info.find_text(&["CPF"]), Some("12345678901"));
        assert_eq!(
            info.find_text(&["detEvento", "evEncMDFe", "cMun"]),
            Some("4205407")
        );

        let driver = EventRequest::new(
            key(),
            Environment::Production,
            "81452880000139",
            EventBody::DriverInclusion {
                name: "MARIA".into(),
                cpf: "98765432100".into(),
            },
        )
        .to_element()
        .unwrap();
        assert_eq!(
            driver.find_text(&["infEvento", "detEvento", "evIncCondutorMDFe", "condutor", "xNome"]),
            Some("MARIA")
        );
    }

    #[test]
    fn test_blank_justification_is_rejected() {
        let request = EventRequest::new(
            key(),
            Environment::Homologation,
            "81452880000139",
            EventBody::Cancellation {
                protocol: "1".into(),
                justification: "   ".into(),
            },
        );
        assert!(matches!(
            request.to_element(),
            Err(ReconcileError::MalformedSubmission(_))
        ));
    }

    #[test]
    fn test_bad_author_tax_id() {
        let request = EventRequest::new(
            key(),
            Environment::Homologation,
            "123",
            EventBody::DriverInclusion {
                name: "A".into(),
                cpf: "1".into(),
            },
        );
        assert!(request.to_element().is_err());
    }

    // ── reconciliation ──

    #[test]
    fn test_reconcile_event_wraps_request_and_response() {
        let submitted = cancellation().to_element().unwrap();
        let response = EventResponseRecord::new(135, "Evento registrado", KEY, Some("110111"), Some("9"));
        let processed = reconcile_event(&submitted, &response, EventKind::Cancellation).unwrap();
        assert_eq!(processed.kind(), ProcessedKind::Event);
        let names: Vec<&str> = processed
            .envelope()
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["eventoMDFe", "retEventoMDFe"]);
        assert_eq!(processed.envelope().name, "procEventoMDFe");
    }

    #[test]
    fn test_subject_mismatch_beats_status() {
        let submitted = cancellation().to_element().unwrap();
        let other = "35140581452880000139580010000000281611743160";
        let response = EventResponseRecord::new(135, "ok", other, None, None);
        assert!(matches!(
            reconcile_event(&submitted, &response, EventKind::Cancellation),
            Err(ReconcileError::SubjectMismatch { .. })
        ));
    }

    fn closure() -> EventRequest {
        EventRequest::new(
            key(),
            Environment::Homologation,
            "81452880000139",
            EventBody::Closure {
                protocol: "941140000000001".into(),
                closed_on: "2014-05-22".into(),
                uf_code: "42".into(),
                municipality_code: "4205407".into(),
            },
        )
        .with_issued_at(FiscalDateTime::parse("2014-05-22T09:00:00-03:00").unwrap())
    }

    #[test]
    fn test_closure_155_vs_cancellation_155() {
        let closed = closure().to_element().unwrap();
        let response = EventResponseRecord::new(155, "Ja encerrado", KEY, None, None);
        assert!(reconcile_event(&closed, &response, EventKind::Closure).is_ok());

        let cancelled = cancellation().to_element().unwrap();
        assert_eq!(
            reconcile_event(&cancelled, &response, EventKind::Cancellation).unwrap_err(),
            ReconcileError::RejectedByAuthority {
                status: 155,
                reason: "Ja encerrado".into()
            }
        );
    }

    #[test]
    fn test_kind_must_match_submitted_event() {
        let submitted = cancellation().to_element().unwrap();
        let response = EventResponseRecord::new(155, "Ja encerrado", KEY, Some("110111"), None);
        assert_eq!(
            reconcile_event(&submitted, &response, EventKind::Closure).unwrap_err(),
            ReconcileError::WrongEventKind {
                expected: 110112,
                found: "110111".into()
            }
        );
    }

    #[test]
    fn test_kind_must_match_response_event() {
        let submitted = closure().to_element().unwrap();
        let response = EventResponseRecord::new(155, "Ja encerrado", KEY, Some("110111"), None);
        assert_eq!(
            reconcile_event(&submitted, &response, EventKind::Closure).unwrap_err(),
            ReconcileError::WrongEventKind {
                expected: 110112,
                found: "110111".into()
            }
        );
    }

    #[test]
    fn test_unknown_submitted_event_type() {
        let mut submitted = cancellation().to_element().unwrap();
        assert!(submitted.set_text_at(&["infEvento", "tpEvento"], "999999"));
        let response = EventResponseRecord::new(135, "ok", KEY, None, None);
        assert_eq!(
            reconcile_event(&submitted, &response, EventKind::Cancellation).unwrap_err(),
            ReconcileError::UnknownEventKind("999999".into())
        );
    }

    // ── cancel register ──

    fn processed_manifest() -> Element {
        Element::new("mdfeProc")
            .child(Element::new("MDFe").child(Element::new("infMDFe").attr("Id", format!("MDFe{KEY}"))))
            .child(
                Element::new("protMDFe").child(
                    Element::new("infProt")
                        .leaf("chMDFe", KEY)
                        .leaf("nProt", "941140000000001")
                        .leaf("cStat", "100")
                        .leaf("xMotivo", "Autorizado o uso do MDF-e"),
                ),
            )
    }

    #[test]
    fn test_cancel_register_rewrites_protocol_copy() {
        let original = processed_manifest();
        let response = EventResponseRecord::new(135, "ok", KEY, Some("110111"), Some("941140000000099"));
        let cancelled = cancel_register(&original, &response).unwrap();
        assert_eq!(cancelled.find_text(&["protMDFe", "infProt", "cStat"]), Some("101"));
        assert_eq!(
            cancelled.find_text(&["protMDFe", "infProt", "nProt"]),
            Some("941140000000099")
        );
        assert_eq!(
            cancelled.find_text(&["protMDFe", "infProt", "xMotivo"]),
            Some(CANCELLED_REASON)
        );
        assert_eq!(original.find_text(&["protMDFe", "infProt", "cStat"]), Some("100"));
    }

    #[test]
    fn test_cancel_register_places_missing_protocol_number() {
        let without_number = Element::new("mdfeProc")
            .child(Element::new("MDFe").child(Element::new("infMDFe").attr("Id", format!("MDFe{KEY}"))))
            .child(
                Element::new("protMDFe").child(
                    Element::new("infProt")
                        .leaf("chMDFe", KEY)
                        .leaf("dhRecbto", "2014-05-20T10:01:00-03:00")
                        .leaf("digVal", "d1")
                        .leaf("cStat", "100")
                        .leaf("xMotivo", "Autorizado o uso do MDF-e"),
                ),
            );
        let response = EventResponseRecord::new(135, "ok", KEY, Some("110111"), Some("941140000000099"));
        let cancelled = cancel_register(&without_number, &response).unwrap();
        let names: Vec<&str> = cancelled
            .find(&["protMDFe", "infProt"])
            .unwrap()
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["chMDFe", "dhRecbto", "nProt", "digVal", "cStat", "xMotivo"]);
    }

    #[test]
    fn test_cancel_register_requires_protocol() {
        let unauthorized = Element::new("mdfeProc")
            .child(Element::new("MDFe").child(Element::new("infMDFe").attr("Id", format!("MDFe{KEY}"))));
        let response = EventResponseRecord::new(135, "ok", KEY, None, None);
        assert!(matches!(
            cancel_register(&unauthorized, &response),
            Err(ReconcileError::NotAuthorized { .. })
        ));
    }

    #[test]
    fn test_cancel_register_rejects_other_event_type() {
        let response = EventResponseRecord::new(135, "ok", KEY, Some("110112"), None);
        assert_eq!(
            cancel_register(&processed_manifest(), &response).unwrap_err(),
            ReconcileError::WrongEventKind {
                expected: 110111,
                found: "110112".into()
            }
        );
    }
}
