//! Observations: one reported value of a data item.

use std::sync::Arc;

use crate::codec::keys::{self, DURATION, RESET_TRIGGERED, RESULT, STATISTIC, UNAVAILABLE};
use crate::codec::value::{
    decode_condition, decode_data_set, decode_payload, decode_scalar, decode_table,
    decode_time_series, encode_payload,
};
use crate::error::{RegistryError, TimestampError};
use crate::model::{
    Condition, ConditionLevel, DataItem, DataItemCategory, DataSetEntry, ObservationPayload,
    ObservationProperty, ObservationValue, ObservationValueStore, PayloadShape, Representation,
    TableEntry, TimeSeries,
};
use crate::registry::{Capability, Family, Resolution, TypeRegistry, Variant};
use crate::util::datetime::{format_timestamp, parse_timestamp};

/// An observation of a data item.
///
/// The type and representation select the registered variant; the payload
/// lives in the value store and is shared safely between threads.
#[derive(Debug)]
pub struct Observation {
    type_id: String,
    representation: Representation,
    category: DataItemCategory,
    resolution: Resolution<Observation>,
    /// Element name read from a document for an unregistered observation.
    source_name: Option<Arc<str>>,
    store: ObservationValueStore,
}

impl Observation {
    pub fn new(
        type_id: impl Into<String>,
        category: DataItemCategory,
        representation: Representation,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            representation,
            category,
            resolution: Resolution::Fallback,
            source_name: None,
            store: ObservationValueStore::new(),
        }
    }

    /// Creates the observation variant matching a data item definition and
    /// copies the identifying attributes onto it.
    pub fn from_data_item(registry: &TypeRegistry, item: &DataItem) -> Result<Self, RegistryError> {
        let mut observation = registry.create_observation(&item.type_id, item.representation)?;
        observation.category = item.category;
        observation.set_property(ObservationProperty::DataItemId, &item.id);
        if let Some(name) = &item.name {
            observation.set_property(ObservationProperty::Name, name);
        }
        if let Some(sub_type) = &item.sub_type {
            observation.set_property(ObservationProperty::SubType, sub_type);
        }
        if let Some(composition) = &item.composition_id {
            observation.set_property(ObservationProperty::CompositionId, composition);
        }
        Ok(observation)
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn category(&self) -> DataItemCategory {
        self.category
    }

    /// Overrides the category, e.g. from the container an observation was
    /// read from.
    pub fn set_category(&mut self, category: DataItemCategory) {
        self.category = category;
    }

    pub fn shape(&self) -> PayloadShape {
        PayloadShape::of(self.category, self.representation)
    }

    pub fn resolution(&self) -> Resolution<Observation> {
        self.resolution
    }

    pub fn store(&self) -> &ObservationValueStore {
        &self.store
    }

    pub fn set_property(&self, property: ObservationProperty, value: impl Into<String>) {
        self.store.set_property(property, value);
    }

    pub fn property(&self, property: ObservationProperty) -> Option<String> {
        self.store.property(property)
    }

    pub fn data_item_id(&self) -> Option<String> {
        self.property(ObservationProperty::DataItemId)
    }

    pub fn timestamp(&self) -> Option<String> {
        self.property(ObservationProperty::Timestamp)
    }

    pub fn set_timestamp(&self, timestamp: impl Into<String>) {
        self.set_property(ObservationProperty::Timestamp, timestamp);
    }

    /// Timestamp as UTC epoch microseconds.
    pub fn timestamp_micros(&self) -> Result<Option<i64>, TimestampError> {
        self.timestamp().as_deref().map(parse_timestamp).transpose()
    }

    pub fn set_timestamp_micros(&self, epoch_micros: i64) {
        self.set_timestamp(format_timestamp(epoch_micros));
    }

    /// Sequence number. Unparsable sequences read as absent.
    pub fn sequence(&self) -> Option<u64> {
        self.property(ObservationProperty::Sequence)?.parse().ok()
    }

    pub fn set_sequence(&self, sequence: u64) {
        self.set_property(ObservationProperty::Sequence, sequence.to_string());
    }

    pub fn add_value(&self, value: ObservationValue) {
        self.store.add_value(value);
    }

    pub fn values(&self) -> Vec<ObservationValue> {
        self.store.values()
    }

    /// Replaces the stored values with the encoding of `payload`.
    /// Auxiliary values (statistic, duration, reset trigger) are kept.
    pub fn set_payload(&self, payload: &ObservationPayload) {
        self.store
            .replace_values_retaining(encode_payload(payload), keys::is_auxiliary_key);
    }

    /// Decodes the stored values according to this observation's shape.
    pub fn payload(&self) -> ObservationPayload {
        decode_payload(&self.store.values(), self.shape())
    }

    pub fn result(&self) -> Option<String> {
        decode_scalar(&self.store.values())
    }

    pub fn set_result(&self, value: impl Into<String>) {
        self.store.add_value(ObservationValue::new(RESULT, value));
    }

    pub fn statistic(&self) -> Option<String> {
        self.auxiliary(STATISTIC)
    }

    pub fn duration(&self) -> Option<String> {
        self.auxiliary(DURATION)
    }

    pub fn reset_triggered(&self) -> Option<String> {
        self.auxiliary(RESET_TRIGGERED)
    }

    /// Sets an auxiliary value by key (`Statistic`, `Duration`,
    /// `ResetTriggered`).
    pub fn set_auxiliary(&self, key: &'static str, value: impl Into<String>) {
        self.store.add_value(ObservationValue::new(key, value));
    }

    fn auxiliary(&self, key: &str) -> Option<String> {
        self.store.get_value(key)?.value().map(str::to_string)
    }

    pub fn data_set(&self) -> Vec<DataSetEntry> {
        decode_data_set(&self.store.values())
    }

    pub fn table(&self) -> Vec<TableEntry> {
        decode_table(&self.store.values())
    }

    pub fn time_series(&self) -> TimeSeries {
        decode_time_series(&self.store.values())
    }

    pub fn condition(&self) -> Condition {
        decode_condition(&self.store.values())
    }

    /// Marks the observation as having no data.
    pub fn set_unavailable(&self) {
        let payload = match self.shape() {
            PayloadShape::Condition => {
                ObservationPayload::Condition(Condition::new(ConditionLevel::Unavailable))
            }
            _ => ObservationPayload::Scalar(Some(UNAVAILABLE.to_string())),
        };
        self.set_payload(&payload);
    }

    pub fn is_unavailable(&self) -> bool {
        match self.shape() {
            PayloadShape::Condition => self.condition().level == ConditionLevel::Unavailable,
            _ => self.result().as_deref() == Some(UNAVAILABLE),
        }
    }

    /// Element name this observation is written under. Conditions are named
    /// by their level; unregistered observations read from a document keep
    /// the name they were read under. A condition read under a level name
    /// this crate does not know keeps that name while it stays UNAVAILABLE.
    pub fn element_name(&self, registry: &TypeRegistry) -> Arc<str> {
        match (self.shape(), &self.source_name) {
            (PayloadShape::Condition, source) => {
                let level = self.condition().level;
                match source {
                    Some(name) if level == ConditionLevel::Unavailable => Arc::clone(name),
                    _ => Arc::from(level.element_name()),
                }
            }
            (_, Some(name)) => Arc::clone(name),
            _ => registry.observation_element_name(&self.type_id, self.representation),
        }
    }

    pub(crate) fn set_source_name(&mut self, name: Arc<str>) {
        self.source_name = Some(name);
    }

    /// Moves every field of `base` onto `self`, keeping only the
    /// resolution of `self`.
    pub(crate) fn adopt(self, base: Observation) -> Observation {
        let Observation {
            type_id,
            representation,
            category,
            resolution: _,
            source_name,
            store,
        } = base;
        Observation {
            type_id,
            representation,
            category,
            resolution: self.resolution,
            source_name,
            store,
        }
    }
}

impl Clone for Observation {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id.clone(),
            representation: self.representation,
            category: self.category,
            resolution: self.resolution,
            source_name: self.source_name.clone(),
            store: self.store.clone(),
        }
    }
}

impl PartialEq for Observation {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.representation == other.representation
            && self.category == other.category
            && self.resolution == other.resolution
            && self.source_name == other.source_name
            && self.store == other.store
    }
}

impl Variant for Observation {
    const CAPABILITY: Capability = Capability::Observation;
    const KEYED_BY_REPRESENTATION: bool = true;

    fn family(registry: &TypeRegistry) -> &Family<Self> {
        &registry.observations
    }

    /// Unknown observation types keep the requested type and representation
    /// so nothing about the payload is lost.
    fn fallback(discriminator: &str, representation: Option<Representation>) -> Self {
        Observation::new(
            discriminator,
            DataItemCategory::Event,
            representation.unwrap_or_default(),
        )
    }

    fn resolution(&self) -> Resolution<Self> {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: Resolution<Self>) {
        self.resolution = resolution;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataSetEntry, TableCell};

    fn registry() -> &'static TypeRegistry {
        TypeRegistry::global()
    }

    #[test]
    fn test_timestamp_micros() {
        let observation = Observation::new("POSITION", DataItemCategory::Sample, Representation::Value);
        assert_eq!(observation.timestamp_micros(), Ok(None));
        observation.set_timestamp_micros(1_500_000);
        assert_eq!(observation.timestamp().as_deref(), Some("1970-01-01T00:00:01.5Z"));
        assert_eq!(observation.timestamp_micros(), Ok(Some(1_500_000)));
        observation.set_timestamp("yesterday");
        assert!(observation.timestamp_micros().is_err());
    }

    #[test]
    fn test_payload_round_trip_through_store() {
        let observation = registry()
            .create_observation("VARIABLE", Representation::DataSet)
            .unwrap();
        let payload = ObservationPayload::DataSet(vec![
            DataSetEntry::new("a", "1"),
            DataSetEntry::removed("b"),
        ]);
        observation.set_payload(&payload);
        assert_eq!(observation.payload(), payload);
    }

    #[test]
    fn test_set_payload_replaces_previous_values() {
        let observation = registry()
            .create_observation("WORK_OFFSET", Representation::Table)
            .unwrap();
        observation.set_payload(&ObservationPayload::Table(vec![TableEntry::new(
            "G54",
            vec![TableCell::new("X", "1")],
        )]));
        observation.set_payload(&ObservationPayload::Table(vec![TableEntry::new(
            "G55",
            vec![TableCell::new("Y", "2")],
        )]));
        let table = observation.table();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].key, "G55");
    }

    #[test]
    fn test_set_payload_keeps_auxiliary_values() {
        let observation = Observation::new("TEMPERATURE", DataItemCategory::Sample, Representation::Value);
        observation.set_auxiliary(STATISTIC, "AVERAGE");
        observation.set_auxiliary(DURATION, "10.0");
        observation.set_payload(&ObservationPayload::Scalar(Some("21.5".to_string())));
        assert_eq!(observation.statistic().as_deref(), Some("AVERAGE"));
        assert_eq!(observation.duration().as_deref(), Some("10.0"));
        assert_eq!(observation.result().as_deref(), Some("21.5"));
        assert_eq!(observation.reset_triggered(), None);
    }

    #[test]
    fn test_set_payload_does_not_lose_concurrent_auxiliary_writes() {
        let observation = Observation::new("TEMPERATURE", DataItemCategory::Sample, Representation::Value);
        std::thread::scope(|scope| {
            let observation = &observation;
            scope.spawn(move || {
                for i in 0..500 {
                    observation.set_payload(&ObservationPayload::Scalar(Some(i.to_string())));
                }
            });
            scope.spawn(move || {
                for i in 0..500 {
                    observation.set_auxiliary(DURATION, i.to_string());
                }
            });
        });
        assert_eq!(observation.duration().as_deref(), Some("499"));
        assert_eq!(observation.result().as_deref(), Some("499"));
    }

    #[test]
    fn test_unavailable() {
        let sample = Observation::new("POSITION", DataItemCategory::Sample, Representation::Value);
        assert!(!sample.is_unavailable());
        sample.set_unavailable();
        assert!(sample.is_unavailable());
        assert_eq!(sample.result().as_deref(), Some("UNAVAILABLE"));

        let condition = Observation::new("SYSTEM", DataItemCategory::Condition, Representation::Value);
        condition.set_payload(&ObservationPayload::Condition(Condition::new(ConditionLevel::Normal)));
        assert!(!condition.is_unavailable());
        condition.set_unavailable();
        assert!(condition.is_unavailable());
    }

    #[test]
    fn test_element_names() {
        let feed = Observation::new(
            "PATH_FEEDRATE",
            DataItemCategory::Sample,
            Representation::TimeSeries,
        );
        assert_eq!(&*feed.element_name(registry()), "PathFeedrateTimeSeries");

        let condition = Observation::new("SYSTEM", DataItemCategory::Condition, Representation::Value);
        condition.set_payload(&ObservationPayload::Condition(Condition::new(ConditionLevel::Fault)));
        assert_eq!(&*condition.element_name(registry()), "Fault");

        // An unknown level name read from a document is kept until the
        // level is set to a known one.
        let mut critical = Observation::new("SYSTEM", DataItemCategory::Condition, Representation::Value);
        critical.set_unavailable();
        critical.set_source_name(Arc::from("Critical"));
        assert_eq!(&*critical.element_name(registry()), "Critical");
        critical.set_payload(&ObservationPayload::Condition(Condition::new(ConditionLevel::Warning)));
        assert_eq!(&*critical.element_name(registry()), "Warning");
    }

    #[test]
    fn test_from_data_item_copies_identity() {
        let item = DataItem::new("x_pos", "POSITION", DataItemCategory::Sample)
            .with_sub_type("ACTUAL")
            .with_representation(Representation::TimeSeries);
        let observation = Observation::from_data_item(registry(), &item).unwrap();
        assert!(observation.resolution().is_registered());
        assert_eq!(observation.data_item_id().as_deref(), Some("x_pos"));
        assert_eq!(
            observation.property(ObservationProperty::SubType).as_deref(),
            Some("ACTUAL")
        );
        assert_eq!(observation.shape(), PayloadShape::TimeSeries);
    }

    #[test]
    fn test_sequence_parsing() {
        let observation = Observation::new("BLOCK", DataItemCategory::Event, Representation::Value);
        assert_eq!(observation.sequence(), None);
        observation.set_sequence(42);
        assert_eq!(observation.sequence(), Some(42));
        observation.set_property(ObservationProperty::Sequence, "abc");
        assert_eq!(observation.sequence(), None);
    }
}
