//! Error types.
//!
//! None of these escape [`Engine::request_bids`](crate::Engine::request_bids):
//! admission errors are logged and reported, validation errors are written to
//! the offending request's `error` field, collaborator errors are logged at
//! the call site.

use crate::InventoryKind;
use thiserror::Error;

/// Why a placement pattern was refused at admission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must be a JSON object")]
    NotAnObject,
    #[error("can't create pattern without slot pattern or div pattern")]
    MissingIdentity,
    #[error("{field} should be a string")]
    IdentityNotString { field: &'static str },
    #[error("sizes should be an array")]
    SizesNotArray,
    #[error("invalid {field} regex: {reason}")]
    InvalidRegex { field: &'static str, reason: String },
    #[error("malformed pattern: {0}")]
    Malformed(String),
}

/// Why a request was rejected before matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no inventory submodule registered")]
    NoInventory,
    #[error("inventory type '{kind}' is not supported by inventory submodule '{inventory}'")]
    UnsupportedInventory { kind: InventoryKind, inventory: String },
    #[error("inventory type '{0}' requires a non-empty name")]
    MissingName(InventoryKind),
    #[error("source '{0}' is not registered")]
    UnknownSource(String),
    #[error("destination '{0}' is not registered")]
    UnknownDestination(String),
    #[error("sizes should be an array")]
    SizesNotArray,
    #[error("rejected by {submodule}: {reason}")]
    Rejected { submodule: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0} submodule must have a non-empty name")]
    EmptyName(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by an external collaborator (slot directory, bidding
/// engine, page renderer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{collaborator}: {message}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self { collaborator, message: message.into() }
    }
}
