//! Limits applied when reading untrusted documents, plus wire constants.

/// Maximum element nesting accepted by the XML reader.
///
/// Devices documents rarely exceed a depth of 15; the bound exists so that
/// the recursive marshaller cannot be driven into stack exhaustion.
pub const MAX_DOCUMENT_DEPTH: usize = 64;

/// Maximum size of a document's text, in bytes (64 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

/// Maximum number of child elements under a single element.
pub const MAX_CHILDREN_PER_ELEMENT: usize = 1_000_000;

/// Maximum number of memoized shape names per table.
pub const MAX_NAME_CACHE_ENTRIES: usize = 4096;

/// Number of zero-padded digits in a `TimeSeries[...]` index.
pub const TIME_SERIES_INDEX_WIDTH: usize = 5;

/// Schema version written into document namespaces by default.
pub const DEFAULT_SCHEMA_VERSION: &str = "2.2";

/// Root element of a devices document.
pub const DEVICES_ROOT: &str = "MTConnectDevices";

/// Root element of a streams document.
pub const STREAMS_ROOT: &str = "MTConnectStreams";
