//! Options for reading and writing documents.

use crate::limits::{
    DEFAULT_SCHEMA_VERSION, MAX_CHILDREN_PER_ELEMENT, MAX_DOCUMENT_DEPTH, MAX_DOCUMENT_SIZE,
};

/// Options for reading documents.
///
/// The defaults come from [`crate::limits`]. Callers reading documents from
/// untrusted peers can tighten them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum element nesting depth.
    pub max_depth: usize,
    /// Maximum document length in bytes.
    pub max_document_size: usize,
    /// Maximum number of children under one element.
    pub max_children: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_DOCUMENT_DEPTH,
            max_document_size: MAX_DOCUMENT_SIZE,
            max_children: MAX_CHILDREN_PER_ELEMENT,
        }
    }
}

impl ReadOptions {
    /// Creates default read options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum document size.
    pub fn max_document_size(mut self, size: usize) -> Self {
        self.max_document_size = size;
        self
    }
}

/// Options for writing documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indentation width; `None` writes the document on one line.
    pub indent: Option<usize>,
    /// Schema version used in the document namespace.
    pub schema_version: String,
    /// Emit the `xmlns` attribute on the root element.
    pub emit_namespace: bool,
    /// Emit the `<?xml ...?>` declaration.
    pub emit_declaration: bool,
    /// Emit change-detection `hash` attributes on device model elements.
    pub include_hashes: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            emit_namespace: true,
            emit_declaration: true,
            include_hashes: false,
        }
    }
}

impl WriteOptions {
    /// Creates default write options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options producing a single-line fragment without declaration or
    /// namespace.
    pub fn compact() -> Self {
        Self {
            indent: None,
            emit_namespace: false,
            emit_declaration: false,
            ..Self::default()
        }
    }

    /// Sets the schema version.
    pub fn schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    /// Enables `hash` attributes.
    pub fn with_hashes(mut self) -> Self {
        self.include_hashes = true;
        self
    }

    /// Returns the namespace URI for a document root.
    pub fn namespace(&self, document: &str) -> String {
        format!("urn:mtconnect.org:{}:{}", document, self.schema_version)
    }
}
