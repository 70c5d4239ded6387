//! # Access-Key Finalization
//!
//! Re-derives the access key from the document's own fields and repairs
//! the document when the declared key disagrees.
//!
//! A mismatch is corrected in place (`ide/cDV` and the `infMDFe/@Id`
//! attribute) and logged at `warn`. The derived key is always the one the
//! finished document carries.

use mdfe_core::domain::QR_CODE_BASE_URL;
use mdfe_core::{AccessKey, Element, FiscalDateTime, KeyFields};

use crate::error::BuildError;

fn ide_field<'a>(ide: &'a Element, field: &'static str) -> Result<&'a str, BuildError> {
    ide.find_text(&[field])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(BuildError::MissingRequiredField { field, group: "ide" })
}

fn inf_mdfe(root: &Element) -> Result<&Element, BuildError> {
    root.first_child("infMDFe")
        .ok_or_else(|| BuildError::Structure("missing infMDFe".to_string()))
}

/// Collect the key components from a manifest rooted at `MDFe`.
pub fn key_fields(root: &Element) -> Result<KeyFields, BuildError> {
    let inf = inf_mdfe(root)?;
    let ide = inf.first_child("ide").ok_or(BuildError::MissingRequiredField {
        field: "ide",
        group: "infMDFe",
    })?;
    let issued_raw = ide_field(ide, "dhEmi")?;
    let issued = FiscalDateTime::parse(issued_raw).map_err(|_| BuildError::DateTime {
        field: "dhEmi",
        value: issued_raw.to_string(),
    })?;
    let tax_id = inf
        .find_text(&["emit", "CNPJ"])
        .or_else(|| inf.find_text(&["emit", "CPF"]))
        .ok_or(BuildError::MissingRequiredField {
            field: "CNPJ",
            group: "emit",
        })?;

    Ok(KeyFields {
        uf_code: ide_field(ide, "cUF")?.to_string(),
        year: issued.year2(),
        month: issued.month2(),
        tax_id: tax_id.trim().to_string(),
        model: ide_field(ide, "mod")?.to_string(),
        series: ide_field(ide, "serie")?.to_string(),
        number: ide_field(ide, "nMDF")?.to_string(),
        emission_type: ide_field(ide, "tpEmis")?.to_string(),
        control_number: ide_field(ide, "cMDF")?.to_string(),
    })
}

/// Derive the access key a manifest's fields call for.
pub fn derive_key(root: &Element) -> Result<AccessKey, BuildError> {
    Ok(AccessKey::build(&key_fields(root)?)?)
}

/// Derive the key and make `cDV` and `Id` agree with it.
pub(crate) fn heal_key(root: &mut Element) -> Result<AccessKey, BuildError> {
    let derived = derive_key(root)?;
    let expected_id = derived.to_document_id();
    let inf = root
        .first_child_mut("infMDFe")
        .ok_or_else(|| BuildError::Structure("missing infMDFe".to_string()))?;

    let declared = inf.attribute("Id").map(str::to_string).unwrap_or_default();
    if declared != expected_id {
        if !declared.is_empty() {
            tracing::warn!(
                declared = %declared,
                derived = %derived,
                "declared access key does not match document fields; correcting"
            );
        }
        inf.set_attribute("Id", expected_id);
    }
    if !inf.set_text_at(&["ide", "cDV"], derived.check_digit().to_string()) {
        return Err(BuildError::MissingRequiredField {
            field: "cDV",
            group: "ide",
        });
    }
    Ok(derived)
}

/// QR code URL of the supplementary block.
pub fn qr_code_url(key: &AccessKey, environment: &str) -> String {
    format!("{QR_CODE_BASE_URL}?chMDFe={key}&tpAmb={environment}")
}

/// Point `infMDFeSupl/qrCodMDFe` at `key`, creating the block right after
/// `infMDFe` when `create` is set and it does not exist yet.
pub(crate) fn refresh_qr_code(root: &mut Element, key: &AccessKey, create: bool) {
    let environment = root
        .find_text(&["infMDFe", "ide", "tpAmb"])
        .unwrap_or("2")
        .trim()
        .to_string();
    let url = qr_code_url(key, &environment);
    if root.set_text_at(&["infMDFeSupl", "qrCodMDFe"], url.clone()) || !create {
        return;
    }
    let position = root
        .children
        .iter()
        .position(|c| c.local_name() == "infMDFe")
        .map_or(root.children.len(), |i| i + 1);
    root.children.insert(
        position,
        Element::new("infMDFeSupl").leaf("qrCodMDFe", url),
    );
}
