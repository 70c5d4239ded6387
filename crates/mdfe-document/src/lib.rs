//! # mdfe-document
//!
//! Builds the `MDFe` element tree of a transport manifest.
//!
//! ## Architecture
//!
//! - **Arena** (`arena.rs`): index-addressed nodes with slot-ordered
//!   insertion; the tree exists only as parent/child ids until export.
//! - **Schema** (`schema.rs`): per-group child slot tables.
//! - **Groups** (`groups.rs`): one input record per tag operation.
//! - **Builder** (`builder.rs`, `road.rs`, `modal.rs`, `linked.rs`): the
//!   `tag_*` operations, deferred joins and `build`.
//! - **Finalize** (`finalize.rs`): access-key derivation and
//!   self-healing, QR code block.
//! - **Contingency** (`contingency.rs`): re-keying a finished document
//!   when contingency is active.
//!
//! ## Crate Policy
//!
//! - Errors are collected into [`BuildErrors`]; nothing in a tag operation
//!   panics or aborts the build early.
//! - `ide/tpEmis` is always taken from the [`mdfe_state::ContingencyHandle`].

pub mod arena;
pub mod builder;
pub mod contingency;
pub mod document;
pub mod error;
pub mod finalize;
pub mod groups;
pub mod keyed;
pub mod linked;
pub mod modal;
pub mod road;
pub mod schema;

pub use builder::ManifestBuilder;
pub use contingency::adjust;
pub use document::ManifestDocument;
pub use error::{BuildError, BuildErrors};
pub use finalize::{derive_key, qr_code_url};
pub use groups::*;
pub use modal::ModalKind;
