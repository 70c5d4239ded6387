//! # Protocol Errors
//!
//! Mismatch errors abort reconciliation immediately with no partial merge.
//! Nothing here retries; retry and backoff belong to the transport.

use thiserror::Error;

/// Failure to reconcile a submission with the authority's answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The matched record carries a status outside the allow-list.
    #[error("rejected by authority: [{status}] {reason}")]
    RejectedByAuthority {
        /// `cStat` of the record.
        status: u16,
        /// `xMotivo` of the record.
        reason: String,
    },

    /// No record matches the submission's digest and key.
    #[error("no response record matches digest and key of {key}")]
    DigestMismatch {
        /// Key of the submitted document.
        key: String,
    },

    /// The event response concerns another document.
    #[error("event response is for {found}, submitted event is for {expected}")]
    SubjectMismatch {
        /// Key of the submitted event.
        expected: String,
        /// Key in the response.
        found: String,
    },

    /// Unsupported event type code.
    #[error("unknown event kind {0}")]
    UnknownEventKind(String),

    /// The response is for a different event type than the one applied.
    #[error("expected event {expected}, response carries {found}")]
    WrongEventKind {
        /// Event type the operation applies.
        expected: u32,
        /// `tpEvento` found in the response.
        found: String,
    },

    /// The submitted artifact lacks what reconciliation reads from it.
    #[error("malformed submission: {0}")]
    MalformedSubmission(String),

    /// The authority payload could not be read.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The document has no authorization protocol to amend.
    #[error("document {key} carries no authorization protocol")]
    NotAuthorized {
        /// Key of the document.
        key: String,
    },
}

/// Failure reported by a transport implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The service could not be reached.
    #[error("service {service} unavailable: {reason}")]
    Unavailable {
        /// Service name.
        service: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The service answered with something other than a response payload.
    #[error("invalid reply from {service}: {reason}")]
    InvalidReply {
        /// Service name.
        service: String,
        /// What was wrong.
        reason: String,
    },
}

/// Payload does not conform to the layout schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("schema {version} violation in {root}: {reason}")]
pub struct SchemaError {
    /// Layout version validated against.
    pub version: String,
    /// Expected root element.
    pub root: String,
    /// Violation found.
    pub reason: String,
}

/// Failure of [`crate::submit_batch`].
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The request payload could not be assembled.
    #[error(transparent)]
    Request(#[from] ReconcileError),

    /// The payload failed schema validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
