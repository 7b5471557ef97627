//! Data model types.
//!
//! - Wire enumerations (category, representation, condition level)
//! - Observation values and structured payloads
//! - The per-observation value store
//! - Observations, device trees and streams documents

pub mod device;
pub mod header;
pub mod id;
pub mod kind;
pub mod observation;
pub mod store;
pub mod streams;
pub mod value;

pub use device::{Component, Composition, DataItem, Description, Device, DevicesDocument, Reference};
pub use header::Header;
pub use id::{content_hash, derived_uuid, device_uuid, parse_uuid};
pub use kind::{ConditionLevel, ConditionQualifier, DataItemCategory, Representation};
pub use observation::Observation;
pub use store::{ObservationProperty, ObservationValueStore};
pub use streams::{ComponentStream, DeviceStream, StreamsDocument};
pub use value::{
    Condition, DataSetEntry, EntryState, ObservationPayload, ObservationValue, PayloadShape,
    TableCell, TableEntry, TimeSeries, ValueContent,
};
