//! Error types.
//!
//! The engine has no fatal errors: untracked reads, triggers nobody listens
//! to, and repeated wrapping are all silent no-ops. What remains are misuse
//! of the typed views and bad input.

use thiserror::Error;

use crate::observe::ContainerKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Record access on a list, or list access on a record.
    #[error("expected a {expected}, found a {found}")]
    KindMismatch {
        expected: ContainerKind,
        found: ContainerKind,
    },

    /// List assignment more than one slot past the end.
    #[error("index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// JSON conversion of a structure that contains itself.
    #[error("cannot convert a cyclic structure to JSON")]
    Cycle,

    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}
