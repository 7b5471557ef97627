//! MTConnect device and observation model.
//!
//! This crate provides an extensible, registry-driven model of MTConnect
//! devices and observations, the value-store encoding of structured
//! observation payloads, and XML marshalling of Devices and Streams
//! documents that keeps unknown schema extensions instead of rejecting them.
//!
//! # Overview
//!
//! - **Type registry**: maps a discriminator string (an element name or a
//!   `type` attribute) plus, for observations, a representation to a
//!   constructor. Unknown discriminators fall back to the family's base
//!   shape.
//! - **Value codec**: structured payloads (data sets, tables, time series,
//!   conditions) are flattened into keyed string values. Removed entries
//!   travel as the `[!ENTRY_REMOVED!]` sentinel.
//! - **Value store**: each observation owns a small map guarded by its own
//!   lock, so readers and writers on different threads never see a torn
//!   payload.
//! - **Marshalling**: list items are written as elements named by their
//!   discriminator and resolved back through the registry on read.
//!
//! # Quick Start
//!
//! ```rust
//! use mtconnect_model::{
//!     read_devices_document, write_devices_document, DataSetEntry, Observation,
//!     ObservationPayload, ReadOptions, TypeRegistry, WriteOptions,
//! };
//!
//! let xml = r#"<MTConnectDevices>
//!   <Devices>
//!     <Device id="d1" name="VMC">
//!       <DataItems>
//!         <DataItem id="vars" type="VARIABLE" category="EVENT" representation="DATA_SET"/>
//!       </DataItems>
//!     </Device>
//!   </Devices>
//! </MTConnectDevices>"#;
//!
//! let registry = TypeRegistry::global();
//! let document = read_devices_document(xml, registry, &ReadOptions::default()).unwrap();
//! let item = document.find_data_item("vars").unwrap();
//!
//! let observation = Observation::from_data_item(registry, item).unwrap();
//! observation.set_payload(&ObservationPayload::DataSet(vec![
//!     DataSetEntry::new("speed", "100"),
//!     DataSetEntry::removed("feed"),
//! ]));
//! assert_eq!(&*observation.element_name(registry), "VariableDataSet");
//! assert_eq!(observation.data_set()[0].key, "feed");
//!
//! let text = write_devices_document(&document, registry, &WriteOptions::default()).unwrap();
//! assert!(text.contains("representation=\"DATA_SET\""));
//! ```
//!
//! # Modules
//!
//! - [`registry`]: discriminator → variant resolution and built-in tables
//! - [`codec`]: key grammar and payload encoding
//! - [`model`]: devices, observations, streams and the value store
//! - [`document`]: generic element tree and XML text form
//! - [`marshal`]: Devices and Streams documents
//! - [`validate`]: device-tree checks
//! - [`util`]: timestamps
//! - [`error`]: error types
//! - [`limits`]: bounds applied to untrusted documents
//!
//! # Security
//!
//! Documents from the network are read under [`ReadOptions`] limits on
//! size, nesting depth and children per element. Unknown elements never
//! fail a read; malformed XML and limit violations do.

pub mod codec;
pub mod document;
pub mod error;
pub mod limits;
pub mod marshal;
pub mod model;
pub mod options;
pub mod registry;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use error::{
    DocumentError, KeyError, RegistryError, TimestampError, ValidationError, VariantError,
};
pub use marshal::{
    read_devices_document, read_streams_document, write_devices_document, write_streams_document,
};
pub use model::{
    Component, ComponentStream, Composition, Condition, ConditionLevel, ConditionQualifier,
    DataItem, DataItemCategory, DataSetEntry, Device, DeviceStream, DevicesDocument, Header,
    Observation, ObservationPayload, ObservationProperty, ObservationValue, ObservationValueStore,
    Reference, Representation, StreamsDocument, TableCell, TableEntry, TimeSeries,
};
pub use options::{ReadOptions, WriteOptions};
pub use registry::{Capability, Registration, Resolution, TypeRegistry, TypeRegistryBuilder};
pub use util::{format_timestamp, parse_timestamp};
pub use validate::{validate_device, validate_devices};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MTConnect schema version written by default.
pub const SCHEMA_VERSION: &str = limits::DEFAULT_SCHEMA_VERSION;
