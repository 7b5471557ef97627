//! Thread-synchronized value store owned by one observation.
//!
//! A transport thread may write values while a response thread serializes
//! the same observation. Every operation takes the store's lock for a single
//! map lookup, insert or swap; encoding and decoding of whole payloads always
//! happen on snapshots, outside the lock.

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::model::ObservationValue;

/// Observation properties kept alongside the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationProperty {
    DataItemId,
    Name,
    SubType,
    Timestamp,
    Sequence,
    CompositionId,
    DeviceUuid,
}

impl ObservationProperty {
    pub const ALL: [ObservationProperty; 7] = [
        ObservationProperty::DataItemId,
        ObservationProperty::Name,
        ObservationProperty::SubType,
        ObservationProperty::Timestamp,
        ObservationProperty::Sequence,
        ObservationProperty::CompositionId,
        ObservationProperty::DeviceUuid,
    ];

    /// XML attribute carrying the property, if it is written on the
    /// observation element.
    pub fn attribute(self) -> Option<&'static str> {
        match self {
            ObservationProperty::DataItemId => Some("dataItemId"),
            ObservationProperty::Name => Some("name"),
            ObservationProperty::SubType => Some("subType"),
            ObservationProperty::Timestamp => Some("timestamp"),
            ObservationProperty::Sequence => Some("sequence"),
            ObservationProperty::CompositionId => Some("compositionId"),
            ObservationProperty::DeviceUuid => None,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default, Clone)]
struct StoreState {
    properties: [Option<String>; ObservationProperty::ALL.len()],
    values: IndexMap<String, ObservationValue>,
}

/// Ordered key → value map behind one per-instance lock.
#[derive(Debug, Default)]
pub struct ObservationValueStore {
    state: Mutex<StoreState>,
}

impl ObservationValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value stored under the value's key.
    pub fn add_value(&self, value: ObservationValue) {
        let mut state = self.state.lock();
        state.values.insert(value.key().to_string(), value);
    }

    /// Returns the value stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<ObservationValue> {
        self.state.lock().values.get(key).cloned()
    }

    /// Removes the entry for `key` entirely (no tombstone).
    pub fn remove_value(&self, key: &str) -> Option<ObservationValue> {
        self.state.lock().values.shift_remove(key)
    }

    /// Snapshot of all values in insertion order.
    pub fn values(&self) -> Vec<ObservationValue> {
        self.state.lock().values.values().cloned().collect()
    }

    /// Replaces every value in one swap. Readers see either the old or the
    /// new set, never a mix.
    pub fn replace_values(&self, values: Vec<ObservationValue>) {
        let mut map = IndexMap::with_capacity(values.len());
        for value in values {
            map.insert(value.key().to_string(), value);
        }
        std::mem::swap(&mut self.state.lock().values, &mut map);
    }

    /// Replaces every value except those whose key satisfies `keep`, in one
    /// swap under the lock. A replacement value wins over a kept one with
    /// the same key.
    pub fn replace_values_retaining(
        &self,
        values: Vec<ObservationValue>,
        keep: impl Fn(&str) -> bool,
    ) {
        let mut map = IndexMap::with_capacity(values.len());
        for value in values {
            map.insert(value.key().to_string(), value);
        }
        let mut state = self.state.lock();
        for (key, value) in state.values.iter() {
            if keep(key.as_str()) && !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        state.values = map;
    }

    pub fn clear_values(&self) {
        self.state.lock().values.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().values.is_empty()
    }

    pub fn set_property(&self, property: ObservationProperty, value: impl Into<String>) {
        let value = value.into();
        self.state.lock().properties[property.slot()] = Some(value);
    }

    pub fn clear_property(&self, property: ObservationProperty) {
        self.state.lock().properties[property.slot()] = None;
    }

    pub fn property(&self, property: ObservationProperty) -> Option<String> {
        self.state.lock().properties[property.slot()].clone()
    }

    /// Snapshot of the set properties.
    pub fn properties(&self) -> Vec<(ObservationProperty, String)> {
        let state = self.state.lock();
        ObservationProperty::ALL
            .iter()
            .filter_map(|p| state.properties[p.slot()].clone().map(|v| (*p, v)))
            .collect()
    }

    fn snapshot(&self) -> StoreState {
        self.state.lock().clone()
    }
}

impl Clone for ObservationValueStore {
    fn clone(&self) -> Self {
        Self {
            state: Mutex::new(self.snapshot()),
        }
    }
}

impl PartialEq for ObservationValueStore {
    /// Compares properties and values (key and content, ignoring order).
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let (a, b) = (self.snapshot(), other.snapshot());
        a.properties == b.properties
            && a.values.len() == b.values.len()
            && a.values.iter().all(|(key, value)| {
                b.values
                    .get(key)
                    .is_some_and(|other| other.content() == value.content())
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::model::ValueContent;

    #[test]
    fn test_last_write_wins() {
        let store = ObservationValueStore::new();
        store.add_value(ObservationValue::new("Result", "1"));
        store.add_value(ObservationValue::new("Result", "2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_value("Result").unwrap().value(), Some("2"));
    }

    #[test]
    fn test_missing_value_is_absent() {
        let store = ObservationValueStore::new();
        assert!(store.get_value("Result").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_values_swaps_everything() {
        let store = ObservationValueStore::new();
        store.add_value(ObservationValue::new("DataSet[a]", "1"));
        store.replace_values(vec![ObservationValue::new("DataSet[b]", "2")]);
        let keys: Vec<String> = store.values().iter().map(|v| v.key().to_string()).collect();
        assert_eq!(keys, ["DataSet[b]"]);
    }

    #[test]
    fn test_properties() {
        let store = ObservationValueStore::new();
        store.set_property(ObservationProperty::Timestamp, "2024-01-01T00:00:00Z");
        store.set_property(ObservationProperty::DataItemId, "avail");
        assert_eq!(
            store.properties(),
            vec![
                (ObservationProperty::DataItemId, "avail".to_string()),
                (ObservationProperty::Timestamp, "2024-01-01T00:00:00Z".to_string()),
            ]
        );
        store.clear_property(ObservationProperty::Timestamp);
        assert_eq!(store.property(ObservationProperty::Timestamp), None);
    }

    #[test]
    fn test_equality_ignores_order_but_not_content() {
        let a = ObservationValueStore::new();
        a.add_value(ObservationValue::new("x", "1"));
        a.add_value(ObservationValue::new("y", "2"));
        let b = ObservationValueStore::new();
        b.add_value(ObservationValue::new("y", "2"));
        b.add_value(ObservationValue::new("x", "1"));
        assert_eq!(a, b);

        b.add_value(ObservationValue::removed("x"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_replace_values_retaining() {
        let store = ObservationValueStore::new();
        store.add_value(ObservationValue::new("Result", "1"));
        store.add_value(ObservationValue::new("Statistic", "AVERAGE"));
        store.add_value(ObservationValue::new("Duration", "5"));

        store.replace_values_retaining(
            vec![
                ObservationValue::new("DataSet[a]", "1"),
                ObservationValue::new("Duration", "10"),
            ],
            |key| key == "Statistic" || key == "Duration",
        );
        assert_eq!(store.get_value("Result"), None);
        assert_eq!(store.get_value("Statistic").unwrap().value(), Some("AVERAGE"));
        assert_eq!(store.get_value("Duration").unwrap().value(), Some("10"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        const WRITERS: usize = 8;
        const KEYS_PER_WRITER: usize = 250;
        const READERS: usize = 4;

        let store = ObservationValueStore::new();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            let writers: Vec<_> = (0..WRITERS)
                .map(|w| {
                    let store = &store;
                    scope.spawn(move || {
                        for k in 0..KEYS_PER_WRITER {
                            let key = format!("DataSet[w{}k{}]", w, k);
                            store.add_value(ObservationValue::new(key, format!("{}", k)));
                        }
                    })
                })
                .collect();

            for _ in 0..READERS {
                let (store, done) = (&store, &done);
                scope.spawn(move || {
                    while !done.load(Ordering::Acquire) {
                        for value in store.values() {
                            // Every observed entry is complete.
                            assert!(value.key().starts_with("DataSet[w"));
                            assert!(matches!(value.content(), ValueContent::Text(v) if !v.is_empty()));
                        }
                    }
                });
            }

            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, Ordering::Release);
        });

        assert_eq!(store.len(), WRITERS * KEYS_PER_WRITER);
        for w in 0..WRITERS {
            for k in 0..KEYS_PER_WRITER {
                assert!(store.get_value(&format!("DataSet[w{}k{}]", w, k)).is_some());
            }
        }
    }
}
