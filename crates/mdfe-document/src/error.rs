//! # Build Errors
//!
//! Field and order problems are collected while the tree is assembled and
//! surfaced together when [`crate::ManifestBuilder::build`] runs, so a
//! caller can report every defect of an input at once.

use mdfe_core::KeyError;
use thiserror::Error;

use crate::modal::ModalKind;

/// A single problem found while assembling a manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A field the layout marks as required was empty or absent.
    #[error("required field {field} missing in group {group}")]
    MissingRequiredField {
        /// Element name of the field.
        field: &'static str,
        /// Element name of the group it belongs to.
        group: &'static str,
    },

    /// A child was placed in a group whose schema has no slot for it.
    #[error("group {parent} has no slot for {child}")]
    SchemaOrder {
        /// Group receiving the child.
        parent: String,
        /// Rejected child.
        child: String,
    },

    /// A nested group was registered but its parent group never was.
    #[error("group {group} requires parent group {parent}")]
    MissingParent {
        /// Orphaned group.
        group: String,
        /// Parent group that was never created.
        parent: &'static str,
    },

    /// A second modal block was registered.
    #[error("modal already set to {existing}; cannot add {requested}")]
    ConflictingModal {
        /// Modal registered first.
        existing: ModalKind,
        /// Modal of the rejected call.
        requested: ModalKind,
    },

    /// A cross-field rule of the layout is violated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A linked document points at an index no group was registered under.
    #[error("{group} references unknown {target} item {item}")]
    UnknownItem {
        /// Group holding the reference.
        group: &'static str,
        /// Kind of group referenced.
        target: &'static str,
        /// Index that matched nothing.
        item: u32,
    },

    /// The access key could not be derived from the document fields.
    #[error("access key: {0}")]
    Key(#[from] KeyError),

    /// A date-time field is not RFC 3339.
    #[error("invalid date-time in {field}: {value:?}")]
    DateTime {
        /// Element name of the field.
        field: &'static str,
        /// Value found.
        value: String,
    },

    /// A finalized document is missing a structural element.
    #[error("document structure: {0}")]
    Structure(String),
}

/// Every problem found during one build, in discovery order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct BuildErrors(pub Vec<BuildError>);

impl BuildErrors {
    /// The collected errors.
    pub fn errors(&self) -> &[BuildError] {
        &self.0
    }

    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} build error(s)", self.0.len())?;
        for (i, e) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {e}", i + 1)?;
        }
        Ok(())
    }
}
