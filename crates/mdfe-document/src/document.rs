//! # Finalized Manifest
//!
//! The immutable product of [`crate::ManifestBuilder::build`]. Holds the
//! element tree rooted at `MDFe` together with the attributes downstream
//! code needs without walking the tree: version, environment, emission
//! type, modal and the verified access key.

use mdfe_core::{AccessKey, Element, EmissionType, Environment};
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::finalize::derive_key;
use crate::modal::ModalKind;

/// A finalized manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    root: Element,
    access_key: AccessKey,
    version: String,
    environment: Environment,
    emission_type: EmissionType,
    modal: ModalKind,
}

fn structure(msg: impl Into<String>) -> BuildError {
    BuildError::Structure(msg.into())
}

fn code_at<T>(
    inf: &Element,
    field: &'static str,
    lookup: impl Fn(u8) -> Option<T>,
) -> Result<T, BuildError> {
    let raw = inf
        .find_text(&["ide", field])
        .ok_or(BuildError::MissingRequiredField { field, group: "ide" })?;
    raw.trim()
        .parse::<u8>()
        .ok()
        .and_then(lookup)
        .ok_or_else(|| structure(format!("ide/{field} has unknown code {raw:?}")))
}

impl ManifestDocument {
    /// Wrap a manifest tree, reading its header fields.
    ///
    /// # Errors
    ///
    /// Fails when the root is not `MDFe`, a header field is missing or
    /// unknown, or the `Id` attribute is not the key the fields derive.
    pub fn from_element(root: Element) -> Result<Self, BuildError> {
        if root.local_name() != "MDFe" {
            return Err(structure(format!("expected MDFe root, found {}", root.name)));
        }
        let inf = root
            .first_child("infMDFe")
            .ok_or_else(|| structure("missing infMDFe"))?;
        let version = inf
            .attribute("versao")
            .ok_or_else(|| structure("infMDFe has no versao"))?
            .to_string();
        let access_key = AccessKey::from_document_id(inf.attribute("Id").unwrap_or_default())?;
        let environment = code_at(inf, "tpAmb", Environment::from_code)?;
        let emission_type = code_at(inf, "tpEmis", EmissionType::from_code)?;
        let modal = code_at(inf, "modal", ModalKind::from_code)?;

        let derived = derive_key(&root)?;
        if derived != access_key {
            return Err(structure(format!(
                "Id carries {access_key} but document fields derive {derived}"
            )));
        }

        Ok(Self {
            root,
            access_key,
            version,
            environment,
            emission_type,
            modal,
        })
    }

    /// Parse and wrap a serialized manifest.
    pub fn parse(xml: &str) -> Result<Self, BuildError> {
        let root = Element::parse(xml).map_err(|e| structure(e.to_string()))?;
        Self::from_element(root)
    }

    /// The `MDFe` element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Consume into the `MDFe` element.
    pub fn into_element(self) -> Element {
        self.root
    }

    /// The verified access key.
    pub fn access_key(&self) -> &AccessKey {
        &self.access_key
    }

    /// Layout version (`infMDFe/@versao`).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Authority environment.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Emission type the key was derived with.
    pub fn emission_type(&self) -> EmissionType {
        self.emission_type
    }

    /// Modal of the single modal block.
    pub fn modal(&self) -> ModalKind {
        self.modal
    }

    /// Whether a `Signature` element is attached.
    pub fn is_signed(&self) -> bool {
        self.root.first_child("Signature").is_some()
    }

    /// Serialize with an XML declaration.
    pub fn to_xml(&self) -> String {
        self.root.to_document()
    }
}
