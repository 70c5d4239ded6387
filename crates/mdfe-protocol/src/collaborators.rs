//! # Collaborator Contracts
//!
//! The protocol core never opens a socket or loads an XSD. Transports and
//! schema validators are supplied by the caller through the traits below;
//! [`submit_batch`] is the only place the two are composed.
//!
//! Both traits require `Send + Sync` so one instance can serve concurrent
//! builders. Retry and backoff, when wanted, live inside a [`Transport`].

use mdfe_core::Element;

use crate::error::{SchemaError, SubmitError, TransportError};
use crate::request::{submission_batch, ServiceName};

/// Delivers a request payload to an authority service.
pub trait Transport: Send + Sync {
    /// Send `payload` to `service` and return the raw response payload.
    fn send(&self, service: ServiceName, payload: &str) -> Result<String, TransportError>;
}

/// Validates a payload against a layout version.
pub trait SchemaValidator: Send + Sync {
    /// Check `payload` against the schema of `version` with root `root`.
    fn validate(&self, version: &str, payload: &str, root: &str) -> Result<(), SchemaError>;
}

/// Well-formedness and root checks without a schema file.
///
/// Confirms the payload parses, the root's local name is `root`, and its
/// `versao` equals `version` when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl SchemaValidator for StructuralValidator {
    fn validate(&self, version: &str, payload: &str, root: &str) -> Result<(), SchemaError> {
        let violation = |reason: String| SchemaError {
            version: version.to_string(),
            root: root.to_string(),
            reason,
        };
        let parsed = Element::parse(payload).map_err(|e| violation(e.to_string()))?;
        if parsed.local_name() != root {
            return Err(violation(format!("root element is {}", parsed.name)));
        }
        match parsed.attribute("versao") {
            Some(found) if found != version => Err(violation(format!("versao is {found}"))),
            _ => Ok(()),
        }
    }
}

/// Wrap `manifest` in an `enviMDFe`, validate it and send it.
///
/// Returns the raw response payload for
/// [`crate::parse_authorization_response`].
pub fn submit_batch(
    transport: &dyn Transport,
    validator: &dyn SchemaValidator,
    version: &str,
    batch_id: &str,
    manifest: &Element,
) -> Result<String, SubmitError> {
    let batch = submission_batch(batch_id, manifest)?;
    let payload = batch.to_document();
    validator.validate(version, &payload, ServiceName::Reception.request_root())?;
    tracing::debug!(batch_id, service = %ServiceName::Reception, "submitting batch");
    let response = transport.send(ServiceName::Reception, &payload)?;
    Ok(response)
}
