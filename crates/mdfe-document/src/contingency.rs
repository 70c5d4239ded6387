//! # Contingency Adjustment
//!
//! Re-issues an already finalized manifest under the current emission
//! mode. While contingency is active the document's `tpEmis` is rewritten,
//! which changes the access key: `cDV`, `Id` and the QR code URL follow,
//! and any signature over the old content is dropped.

use mdfe_state::ContingencyConfig;

use crate::document::ManifestDocument;
use crate::error::BuildError;
use crate::finalize;

/// Apply `config` to `document`. Returns an unchanged copy when
/// contingency is not active.
///
/// # Errors
///
/// Fails when the document lacks the fields the key is derived from.
pub fn adjust(
    document: &ManifestDocument,
    config: &ContingencyConfig,
) -> Result<ManifestDocument, BuildError> {
    if !config.is_active() {
        return Ok(document.clone());
    }
    let code = config.emission_type().code().to_string();
    let mut root = document.root().clone();
    if !root.set_text_at(&["infMDFe", "ide", "tpEmis"], code) {
        return Err(BuildError::MissingRequiredField {
            field: "tpEmis",
            group: "ide",
        });
    }
    if document.is_signed() {
        tracing::debug!(key = %document.access_key(), "dropping signature of re-keyed document");
        root.children.retain(|c| c.local_name() != "Signature");
    }
    let key = finalize::heal_key(&mut root)?;
    finalize::refresh_qr_code(&mut root, &key, false);
    tracing::info!(
        previous = %document.access_key(),
        key = %key,
        mode = %config.mode(),
        "manifest adjusted for contingency"
    );
    ManifestDocument::from_element(root)
}
