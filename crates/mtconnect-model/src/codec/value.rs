//! Payload encoding/decoding.
//!
//! Encoding flattens a structured [`ObservationPayload`] into an ordered
//! list of [`ObservationValue`]s using the key grammar in
//! [`crate::codec::keys`]. Decoding groups values back into entries.
//!
//! Decoded data-set entries, table rows, table cells and time-series samples
//! are always ordered by their embedded key (ordinal string order) or numeric
//! index, never by the order values were stored in. Malformed keys are
//! skipped and logged; they never fail a decode.

use std::collections::BTreeMap;

use tracing::debug;

use crate::codec::keys::{
    self, CDATA, DATA_SET_PREFIX, ENTRY_REMOVED, LEVEL, MESSAGE, NATIVE_CODE, NATIVE_SEVERITY,
    QUALIFIER, RESULT, SAMPLE_RATE, TABLE_PREFIX, TIME_SERIES_PREFIX, ValueKey,
};
use crate::model::{
    Condition, ConditionLevel, ConditionQualifier, DataSetEntry, EntryState, ObservationPayload,
    ObservationValue, PayloadShape, TableCell, TableEntry, TimeSeries, ValueContent,
};

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a payload into store values.
pub fn encode_payload(payload: &ObservationPayload) -> Vec<ObservationValue> {
    match payload {
        ObservationPayload::Scalar(value) => encode_scalar(value.as_deref()),
        ObservationPayload::Condition(condition) => encode_condition(condition),
        ObservationPayload::DataSet(entries) => encode_data_set(entries),
        ObservationPayload::Table(entries) => encode_table(entries),
        ObservationPayload::TimeSeries(series) => encode_time_series(series),
    }
}

/// Encodes a scalar result. `None` encodes to nothing.
pub fn encode_scalar(value: Option<&str>) -> Vec<ObservationValue> {
    value
        .map(|v| ObservationValue::new(RESULT, v))
        .into_iter()
        .collect()
}

/// Encodes a condition. Absent optional fields produce no key.
pub fn encode_condition(condition: &Condition) -> Vec<ObservationValue> {
    let mut values = Vec::with_capacity(5);
    values.push(ObservationValue::new(LEVEL, condition.level.as_str()));
    if let Some(code) = &condition.native_code {
        values.push(ObservationValue::new(NATIVE_CODE, code.as_str()));
    }
    if let Some(severity) = &condition.native_severity {
        values.push(ObservationValue::new(NATIVE_SEVERITY, severity.as_str()));
    }
    if let Some(qualifier) = condition.qualifier {
        values.push(ObservationValue::new(QUALIFIER, qualifier.as_str()));
    }
    if let Some(message) = &condition.message {
        values.push(ObservationValue::new(MESSAGE, message.as_str()));
    }
    values
}

/// Encodes data-set entries in the order given.
pub fn encode_data_set(entries: &[DataSetEntry]) -> Vec<ObservationValue> {
    entries
        .iter()
        .map(|entry| {
            let key = keys::data_set_key(&entry.key);
            match &entry.value {
                EntryState::Present(v) => ObservationValue::new(key, v.as_str()),
                EntryState::Removed => ObservationValue::removed(key),
            }
        })
        .collect()
}

/// Encodes table rows. A removed row becomes a single row-level tombstone
/// and a present row without cells a row-level key with an empty value.
pub fn encode_table(entries: &[TableEntry]) -> Vec<ObservationValue> {
    let mut values = Vec::new();
    for entry in entries {
        match &entry.cells {
            EntryState::Present(cells) if cells.is_empty() => {
                values.push(ObservationValue::new(keys::table_row_key(&entry.key), ""));
            }
            EntryState::Present(cells) => {
                for cell in cells {
                    values.push(ObservationValue::new(
                        keys::table_key(&entry.key, &cell.key),
                        cell.value.as_str(),
                    ));
                }
            }
            EntryState::Removed => {
                values.push(ObservationValue::removed(keys::table_row_key(&entry.key)));
            }
        }
    }
    values
}

/// Encodes samples with sequential indices starting at 0.
pub fn encode_time_series(series: &TimeSeries) -> Vec<ObservationValue> {
    let mut values: Vec<ObservationValue> = series
        .samples
        .iter()
        .enumerate()
        .map(|(i, sample)| ObservationValue::new(keys::time_series_key(i), sample.to_string()))
        .collect();
    if let Some(rate) = series.sample_rate {
        values.push(ObservationValue::new(SAMPLE_RATE, rate.to_string()));
    }
    values
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes store values into the payload of the given shape.
pub fn decode_payload(values: &[ObservationValue], shape: PayloadShape) -> ObservationPayload {
    match shape {
        PayloadShape::Scalar => ObservationPayload::Scalar(decode_scalar(values)),
        PayloadShape::Condition => ObservationPayload::Condition(decode_condition(values)),
        PayloadShape::DataSet => ObservationPayload::DataSet(decode_data_set(values)),
        PayloadShape::Table => ObservationPayload::Table(decode_table(values)),
        PayloadShape::TimeSeries => ObservationPayload::TimeSeries(decode_time_series(values)),
    }
}

/// Returns the `Result` value, falling back to `CDATA`.
pub fn decode_scalar(values: &[ObservationValue]) -> Option<String> {
    text_of(values, RESULT)
        .or_else(|| text_of(values, CDATA))
        .map(str::to_string)
}

/// Decodes a condition. A missing or unknown level reads as `UNAVAILABLE`.
pub fn decode_condition(values: &[ObservationValue]) -> Condition {
    let level = match text_of(values, LEVEL) {
        Some(level) => ConditionLevel::parse(level).unwrap_or_else(|| {
            debug!(level, "unknown condition level, reading as UNAVAILABLE");
            ConditionLevel::Unavailable
        }),
        None => ConditionLevel::Unavailable,
    };
    Condition {
        level,
        native_code: text_of(values, NATIVE_CODE).map(str::to_string),
        native_severity: text_of(values, NATIVE_SEVERITY).map(str::to_string),
        qualifier: text_of(values, QUALIFIER).and_then(ConditionQualifier::parse),
        message: text_of(values, MESSAGE).map(str::to_string),
    }
}

/// Decodes data-set entries sorted by entry key.
pub fn decode_data_set(values: &[ObservationValue]) -> Vec<DataSetEntry> {
    let mut entries: BTreeMap<&str, EntryState<String>> = BTreeMap::new();
    for value in values.iter().filter(|v| v.key().starts_with(DATA_SET_PREFIX)) {
        match ValueKey::parse(value.key()) {
            Ok(ValueKey::DataSet(key)) => {
                let state = match value.content() {
                    ValueContent::Text(v) => EntryState::Present(v.clone()),
                    ValueContent::Removed => EntryState::Removed,
                };
                entries.insert(key, state);
            }
            Ok(_) => {}
            Err(error) => skip_malformed(value.key(), &error),
        }
    }
    entries
        .into_iter()
        .map(|(key, value)| DataSetEntry {
            key: key.to_string(),
            value,
        })
        .collect()
}

enum RowAccumulator<'a> {
    Cells(BTreeMap<&'a str, &'a str>),
    Removed,
}

/// Decodes table rows sorted by row key, cells sorted by cell key.
///
/// A row tombstone wins over any cells stored for the same row. A row-level
/// key with a value marks the row present even without cells. Cell-level
/// tombstones drop the cell but leave its row present, so a row whose only
/// cells were removed decodes as an empty row.
pub fn decode_table(values: &[ObservationValue]) -> Vec<TableEntry> {
    let mut rows: BTreeMap<&str, RowAccumulator<'_>> = BTreeMap::new();
    for value in values.iter().filter(|v| v.key().starts_with(TABLE_PREFIX)) {
        match ValueKey::parse(value.key()) {
            Ok(ValueKey::TableRow(row)) => {
                if value.is_removed() {
                    rows.insert(row, RowAccumulator::Removed);
                } else {
                    rows.entry(row)
                        .or_insert_with(|| RowAccumulator::Cells(BTreeMap::new()));
                }
            }
            Ok(ValueKey::TableCell { row, cell }) => {
                let acc = rows
                    .entry(row)
                    .or_insert_with(|| RowAccumulator::Cells(BTreeMap::new()));
                if let (RowAccumulator::Cells(cells), Some(text)) = (acc, value.value()) {
                    cells.insert(cell, text);
                }
            }
            Ok(_) => {}
            Err(error) => skip_malformed(value.key(), &error),
        }
    }
    rows.into_iter()
        .map(|(key, acc)| match acc {
            RowAccumulator::Cells(cells) => TableEntry::new(
                key,
                cells
                    .into_iter()
                    .map(|(cell, value)| TableCell::new(cell, value))
                    .collect(),
            ),
            RowAccumulator::Removed => TableEntry::removed(key),
        })
        .collect()
}

/// Decodes samples ordered by numeric index.
///
/// Non-numeric samples are skipped.
pub fn decode_time_series(values: &[ObservationValue]) -> TimeSeries {
    let mut samples: BTreeMap<usize, f64> = BTreeMap::new();
    for value in values.iter().filter(|v| v.key().starts_with(TIME_SERIES_PREFIX)) {
        match ValueKey::parse(value.key()) {
            Ok(ValueKey::TimeSeries(index)) => match value.value().map(|v| v.trim().parse::<f64>()) {
                Some(Ok(sample)) => {
                    samples.insert(index, sample);
                }
                _ => debug!(key = value.key(), "skipping non-numeric time series sample"),
            },
            Ok(_) => {}
            Err(error) => skip_malformed(value.key(), &error),
        }
    }
    TimeSeries {
        samples: samples.into_values().collect(),
        sample_rate: text_of(values, SAMPLE_RATE).and_then(|r| r.trim().parse().ok()),
    }
}

// =============================================================================
// RAW PAIRS
// =============================================================================

/// Renders values as raw key/value pairs. Tombstones become the removal
/// sentinel.
pub fn to_wire_pairs(values: &[ObservationValue]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|v| (v.key().to_string(), v.wire_value().to_string()))
        .collect()
}

/// Reads one raw pair. The removal sentinel becomes a tombstone.
pub fn from_wire_pair(key: impl Into<String>, value: impl Into<String>) -> ObservationValue {
    let value = value.into();
    if value == ENTRY_REMOVED {
        ObservationValue::removed(key)
    } else {
        ObservationValue::new(key, value)
    }
}

/// Reads raw pairs, see [`from_wire_pair`].
pub fn from_wire_pairs<I, K, V>(pairs: I) -> Vec<ObservationValue>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| from_wire_pair(k, v))
        .collect()
}

fn text_of<'a>(values: &'a [ObservationValue], key: &str) -> Option<&'a str> {
    values
        .iter()
        .rev()
        .find(|v| v.key() == key)
        .and_then(ObservationValue::value)
}

fn skip_malformed(key: &str, error: &crate::error::KeyError) {
    debug!(key, %error, "skipping malformed value key");
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_data_set_sorted_by_key() {
        let entries = vec![
            DataSetEntry::new("c", "3"),
            DataSetEntry::new("a", "1"),
            DataSetEntry::removed("b"),
        ];
        let decoded = decode_data_set(&encode_data_set(&entries));
        let keys: Vec<&str> = decoded.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(decoded[0].value(), Some("1"));
        assert!(decoded[1].is_removed());
        assert_eq!(decoded[1].value(), None);
    }

    #[test]
    fn test_table_two_level_ordering() {
        let entries = vec![
            TableEntry::new("B", vec![TableCell::new("y", "2"), TableCell::new("x", "1")]),
            TableEntry::new("A", vec![TableCell::new("z", "9"), TableCell::new("w", "8")]),
        ];
        let decoded = decode_table(&encode_table(&entries));
        let rows: Vec<&str> = decoded.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(rows, ["A", "B"]);

        let cells: Vec<&str> = decoded[1]
            .cells
            .as_present()
            .unwrap()
            .iter()
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(cells, ["x", "y"]);
        assert_eq!(decoded[0].cell("w"), Some("8"));
    }

    #[test]
    fn test_table_removed_row() {
        let entries = vec![TableEntry::removed("G55"), TableEntry::new("G54", vec![TableCell::new("X", "0")])];
        let encoded = encode_table(&entries);
        assert_eq!(encoded[0].key(), "Table[G55]");
        assert_eq!(encoded[0].wire_value(), ENTRY_REMOVED);

        let decoded = decode_table(&encoded);
        assert_eq!(decoded[0].key, "G54");
        assert!(decoded[1].is_removed());
    }

    #[test]
    fn test_row_tombstone_wins_over_cells() {
        let values = vec![
            ObservationValue::removed("Table[r]"),
            ObservationValue::new("Table[r][c]", "1"),
        ];
        let decoded = decode_table(&values);
        assert_eq!(decoded, vec![TableEntry::removed("r")]);
    }

    #[test]
    fn test_table_empty_row_is_kept() {
        let entries = vec![TableEntry::new("G54", vec![]), TableEntry::removed("G55")];
        let encoded = encode_table(&entries);
        assert_eq!(encoded[0].key(), "Table[G54]");
        assert_eq!(encoded[0].value(), Some(""));
        assert_eq!(decode_table(&encoded), entries);

        // A row marker next to cells adds nothing.
        let values = vec![
            ObservationValue::new("Table[r]", ""),
            ObservationValue::new("Table[r][c]", "1"),
        ];
        assert_eq!(
            decode_table(&values),
            vec![TableEntry::new("r", vec![TableCell::new("c", "1")])]
        );
    }

    #[test]
    fn test_table_cell_tombstone_drops_only_the_cell() {
        let values = vec![
            ObservationValue::new("Table[r][a]", "1"),
            ObservationValue::removed("Table[r][b]"),
            ObservationValue::removed("Table[s][x]"),
        ];
        assert_eq!(
            decode_table(&values),
            vec![
                TableEntry::new("r", vec![TableCell::new("a", "1")]),
                TableEntry::new("s", vec![]),
            ]
        );
    }

    #[test]
    fn test_time_series_index_recovery() {
        let values = vec![
            ObservationValue::new("TimeSeries[00003]", "3.5"),
            ObservationValue::new("TimeSeries[00001]", "1.5"),
            ObservationValue::new("TimeSeries[00002]", "2.5"),
        ];
        let series = decode_time_series(&values);
        assert_eq!(series.samples, vec![1.5, 2.5, 3.5]);
        assert_eq!(series.sample_rate, None);
    }

    #[test]
    fn test_time_series_encoding() {
        let series = TimeSeries::new(vec![10.0, 11.25]).with_sample_rate(100.0);
        let encoded = encode_time_series(&series);
        assert_eq!(encoded[0].key(), "TimeSeries[00000]");
        assert_eq!(encoded[0].value(), Some("10"));
        assert_eq!(encoded[1].key(), "TimeSeries[00001]");
        assert_eq!(encoded[2].key(), "SampleRate");
        assert_eq!(decode_time_series(&encoded), series);
    }

    #[test]
    fn test_malformed_keys_are_skipped() {
        let values = vec![
            ObservationValue::new("DataSet[good]", "1"),
            ObservationValue::new("DataSet[broken", "2"),
            ObservationValue::new("TimeSeries[x1]", "3"),
            ObservationValue::new("TimeSeries[00000]", "not-a-number"),
            ObservationValue::new("TimeSeries[00001]", "4"),
            ObservationValue::new("Table[r][c]tail", "5"),
            ObservationValue::new("Table[r][c]", "6"),
        ];
        assert_eq!(decode_data_set(&values), vec![DataSetEntry::new("good", "1")]);
        assert_eq!(decode_time_series(&values).samples, vec![4.0]);
        assert_eq!(
            decode_table(&values),
            vec![TableEntry::new("r", vec![TableCell::new("c", "6")])]
        );
    }

    #[test]
    fn test_removal_sentinel_round_trip() {
        let encoded = encode_data_set(&[DataSetEntry::removed("tool")]);
        let pairs = to_wire_pairs(&encoded);
        assert_eq!(pairs, vec![("DataSet[tool]".to_string(), "[!ENTRY_REMOVED!]".to_string())]);

        let read_back = from_wire_pairs(pairs.clone());
        let decoded = decode_data_set(&read_back);
        assert!(decoded[0].is_removed());
        assert_eq!(decoded[0].value(), None);

        // Re-encoding reproduces the exact sentinel.
        assert_eq!(to_wire_pairs(&encode_data_set(&decoded)), pairs);
    }

    #[test]
    fn test_condition_round_trip() {
        let condition = Condition::new(ConditionLevel::Fault)
            .native_code("E42")
            .qualifier(ConditionQualifier::High)
            .message("spindle overtemp");
        let encoded = encode_condition(&condition);
        assert_eq!(encoded.len(), 4);
        assert_eq!(decode_condition(&encoded), condition);
    }

    #[test]
    fn test_condition_defaults_to_unavailable() {
        assert_eq!(decode_condition(&[]).level, ConditionLevel::Unavailable);
        let bogus = vec![ObservationValue::new(LEVEL, "SMOKING")];
        assert_eq!(decode_condition(&bogus).level, ConditionLevel::Unavailable);
    }

    #[test]
    fn test_scalar_falls_back_to_cdata() {
        assert_eq!(decode_scalar(&[ObservationValue::new(CDATA, "x")]), Some("x".to_string()));
        assert_eq!(
            decode_scalar(&[ObservationValue::new(CDATA, "x"), ObservationValue::new(RESULT, "y")]),
            Some("y".to_string())
        );
        assert_eq!(decode_scalar(&[]), None);
        assert!(encode_scalar(None).is_empty());
    }

    fn arb_entries() -> impl Strategy<Value = Vec<(String, Option<String>)>> {
        prop::collection::btree_map("[a-zA-Z0-9_]{1,8}", prop::option::of("[a-z0-9 ]{0,6}"), 0..24)
            .prop_map(|m| m.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    }

    proptest! {
        #[test]
        fn prop_data_set_decodes_sorted(entries in arb_entries()) {
            let input: Vec<DataSetEntry> = entries
                .iter()
                .map(|(k, v)| match v {
                    Some(v) => DataSetEntry::new(k.as_str(), v.as_str()),
                    None => DataSetEntry::removed(k.as_str()),
                })
                .collect();
            let decoded = decode_data_set(&encode_data_set(&input));

            let mut expected = input.clone();
            expected.sort_by(|a, b| a.key.cmp(&b.key));
            prop_assert_eq!(decoded, expected);
        }

        #[test]
        fn prop_table_decodes_sorted(rows in arb_entries(), cells in arb_entries()) {
            let input: Vec<TableEntry> = rows
                .iter()
                .map(|(row, present)| match present {
                    Some(_) => TableEntry::new(
                        row.as_str(),
                        cells
                            .iter()
                            .filter_map(|(c, v)| v.as_ref().map(|v| TableCell::new(c.as_str(), v.as_str())))
                            .collect(),
                    ),
                    None => TableEntry::removed(row.as_str()),
                })
                .collect();
            let decoded = decode_table(&encode_table(&input));

            let decoded_rows: Vec<&str> = decoded.iter().map(|r| r.key.as_str()).collect();
            let mut expected_rows: Vec<&str> = input.iter().map(|r| r.key.as_str()).collect();
            expected_rows.sort();
            prop_assert_eq!(decoded_rows, expected_rows);

            for row in &decoded {
                if let Some(cells) = row.cells.as_present() {
                    let keys: Vec<&str> = cells.iter().map(|c| c.key.as_str()).collect();
                    let mut sorted = keys.clone();
                    sorted.sort();
                    prop_assert_eq!(keys, sorted);
                }
            }
        }

        #[test]
        fn prop_time_series_orders_by_index(
            indexed in prop::collection::btree_map(0usize..100_000, -10_000i32..10_000, 0..32)
                .prop_map(|m| m.into_iter().collect::<Vec<_>>())
                .prop_shuffle()
        ) {
            let values: Vec<ObservationValue> = indexed
                .iter()
                .map(|(i, v)| ObservationValue::new(keys::time_series_key(*i), (*v as f64 / 4.0).to_string()))
                .collect();
            let mut expected = indexed.clone();
            expected.sort_by_key(|(i, _)| *i);
            let expected: Vec<f64> = expected.into_iter().map(|(_, v)| v as f64 / 4.0).collect();
            prop_assert_eq!(decode_time_series(&values).samples, expected);
        }
    }
}
