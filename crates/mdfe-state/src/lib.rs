//! # mdfe-state
//!
//! Process-wide emission-mode policy.
//!
//! - **Contingency** (`contingency.rs`): `Normal ⇄ OfflineFallback` state
//!   machine with its compact persisted form.
//! - **Handle** (`handle.rs`): thread-safe, explicitly passed wrapper that
//!   many builders snapshot concurrently while transitions stay atomic.

pub mod contingency;
pub mod handle;

pub use contingency::{ContingencyConfig, ContingencyError, ContingencyMode, MAX_MOTIVE_CHARS};
pub use handle::ContingencyHandle;
