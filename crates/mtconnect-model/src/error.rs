//! Error types for the registry, value codec, document layer and validation.

use thiserror::Error;

use crate::registry::Capability;

/// Caller contract violation when asking the registry for a variant.
///
/// Unknown discriminators are not errors (they degrade to the family's
/// fallback); only requests the registry cannot interpret at all end up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("empty discriminator passed for {capability} variant")]
    EmptyDiscriminator { capability: Capability },
}

/// A registration's constructor refused to build its variant.
///
/// Never surfaces to callers of the registry; the candidate is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("variant {type_id} could not be constructed: {reason}")]
pub struct VariantError {
    pub type_id: &'static str,
    pub reason: String,
}

impl VariantError {
    pub fn new(type_id: &'static str, reason: impl Into<String>) -> Self {
        Self {
            type_id,
            reason: reason.into(),
        }
    }
}

/// Malformed value-store key.
///
/// The codec skips keys that fail to parse; this type only exists so the
/// skip can be logged with a precise reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("unexpected end of key while reading {context}")]
    UnexpectedEnd { context: &'static str },

    #[error("expected '[' at byte {position} while reading {context}")]
    ExpectedOpenBracket {
        context: &'static str,
        position: usize,
    },

    #[error("unterminated bracket in {context}")]
    UnterminatedBracket { context: &'static str },

    #[error("empty bracket in {context}")]
    EmptyBracket { context: &'static str },

    #[error("trailing input after {context}")]
    TrailingInput { context: &'static str },

    #[error("time series index {index:?} is not a non-negative integer")]
    InvalidIndex { index: String },
}

/// Error while reading or writing a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("document is empty")]
    EmptyDocument,

    #[error("unexpected root element: expected {expected}, found {found}")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("document size {len} exceeds maximum {max}")]
    DocumentTooLarge { len: usize, max: usize },

    #[error("element nesting exceeds maximum depth {max}")]
    DepthExceeded { max: usize },

    #[error("element {element} has more than {max} children")]
    TooManyChildren { element: String, max: usize },

    #[error("failed to write document: {0}")]
    Write(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Error during semantic validation of a device tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{element} element has an empty id")]
    EmptyId { element: &'static str },

    #[error("id {id:?} is used by more than one element")]
    DuplicateId { id: String },

    #[error("data item {data_item:?} references unknown composition {composition:?}")]
    UnknownComposition {
        data_item: String,
        composition: String,
    },

    #[error("reference idRef {id_ref:?} does not name an element of device {device:?}")]
    DanglingReference { device: String, id_ref: String },
}

/// Error type for RFC 3339 timestamp parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TimestampError {
    pub message: String,
}

impl TimestampError {
    pub(crate) fn invalid(what: &str, input: &str) -> Self {
        Self {
            message: format!("invalid {} in timestamp: {}", what, input),
        }
    }
}
