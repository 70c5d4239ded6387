//! # Authorization Reconciliation
//!
//! Matches a signed manifest against the records of a batch response. The
//! first record whose `digVal` and `chMDFe` both equal the submission's is
//! the answer; every status in [`AUTHORIZATION_ALLOW_LIST`] is a handled
//! terminal outcome and produces an `mdfeProc` envelope.

use mdfe_core::{AccessKey, Element, DEFAULT_VERSION};

use crate::error::ReconcileError;
use crate::processed::{ProcessedDocument, ProcessedKind};
use crate::response::AuthorityResponseRecord;

/// Authorized (100), authorized late (150), use denied (110, 205, 302).
pub const AUTHORIZATION_ALLOW_LIST: [u16; 5] = [100, 150, 110, 205, 302];

/// Key and signed digest of a submitted manifest.
pub(crate) fn submission_identity(submitted: &Element) -> Result<(AccessKey, String), ReconcileError> {
    let malformed = |msg: &str| ReconcileError::MalformedSubmission(msg.to_string());
    if submitted.local_name() != "MDFe" {
        return Err(malformed("submitted root is not MDFe"));
    }
    let id = submitted
        .find(&["infMDFe"])
        .and_then(|inf| inf.attribute("Id"))
        .ok_or_else(|| malformed("infMDFe has no Id"))?;
    let key = AccessKey::from_document_id(id)
        .map_err(|e| ReconcileError::MalformedSubmission(e.to_string()))?;
    let digest = mdfe_crypto::digest_value(submitted)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| malformed("document is not signed"))?;
    Ok((key, digest.to_string()))
}

/// Reconcile a signed manifest with an authorization response set.
///
/// # Errors
///
/// - [`ReconcileError::DigestMismatch`] when no record matches both digest
///   and key.
/// - [`ReconcileError::RejectedByAuthority`] when the matching record's
///   status is not in [`AUTHORIZATION_ALLOW_LIST`].
/// - [`ReconcileError::MalformedSubmission`] when the submission has no key
///   or signature digest.
pub fn reconcile_authorization(
    submitted: &Element,
    responses: &[AuthorityResponseRecord],
) -> Result<ProcessedDocument, ReconcileError> {
    let (key, digest) = submission_identity(submitted)?;
    let record = responses
        .iter()
        .find(|r| {
            r.digest_value.as_deref() == Some(digest.as_str())
                && r.subject_key.as_deref() == Some(key.as_str())
        })
        .ok_or_else(|| {
            tracing::warn!(key = %key, candidates = responses.len(), "no response record matches submission");
            ReconcileError::DigestMismatch {
                key: key.to_string(),
            }
        })?;

    if !AUTHORIZATION_ALLOW_LIST.contains(&record.status) {
        tracing::info!(key = %key, status = record.status, "authorization rejected");
        return Err(ReconcileError::RejectedByAuthority {
            status: record.status,
            reason: record.reason.clone(),
        });
    }

    let version = submitted
        .find(&["infMDFe"])
        .and_then(|inf| inf.attribute("versao"))
        .unwrap_or(DEFAULT_VERSION);
    tracing::info!(key = %key, status = record.status, "authorization reconciled");
    Ok(ProcessedDocument::wrap(
        ProcessedKind::Manifest,
        version,
        submitted,
        &record.element,
        key,
        record.status,
        record.protocol_number.clone(),
    ))
}
