//! # mdfe-protocol
//!
//! Everything between a signed manifest and its archived, authority-stamped
//! form.
//!
//! - **Responses** (`response.rs`): prefix-agnostic extraction of
//!   `protMDFe` and `retEventoMDFe` records from opaque payloads.
//! - **Authorization** (`authorization.rs`): digest-and-key matching of a
//!   signed manifest against a batch response, yielding `mdfeProc`.
//! - **Events** (`event.rs`): event request construction, event
//!   reconciliation into `procEventoMDFe`, and cancellation registration.
//! - **Requests** (`request.rs`): submission and query payloads.
//! - **Collaborators** (`collaborators.rs`): the `Transport` and
//!   `SchemaValidator` seams and the `submit_batch` helper.
//!
//! Reconciliation is pure: no I/O, no shared state, no retries.

pub mod authorization;
pub mod collaborators;
pub mod error;
pub mod event;
pub mod processed;
pub mod request;
pub mod response;

pub use authorization::{reconcile_authorization, AUTHORIZATION_ALLOW_LIST};
pub use collaborators::{submit_batch, SchemaValidator, StructuralValidator, Transport};
pub use error::{ReconcileError, SchemaError, SubmitError, TransportError};
pub use event::{cancel_register, reconcile_event, EventBody, EventKind, EventRequest};
pub use processed::{ProcessedDocument, ProcessedKind};
pub use request::ServiceName;
pub use response::{
    parse_authorization_response, parse_event_response, AuthorityResponseRecord,
    EventResponseRecord,
};
