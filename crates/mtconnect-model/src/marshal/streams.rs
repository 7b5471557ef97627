//! Streams documents.
//!
//! ```text
//! MTConnectStreams
//!   Header
//!   Streams
//!     DeviceStream                          name, uuid
//!       ComponentStream                     component, componentId
//!         Samples | Events                  observations named by shape
//!         Condition                         Normal | Warning | Fault | Unavailable
//! ```
//!
//! Observation payloads map onto elements as follows:
//!
//! ```text
//! Value       <Position ...>12.5</Position>
//! DataSet     <VariableDataSet count="2"><Entry key="a">1</Entry><Entry key="b" removed="true"/></..>
//! Table       <WorkOffsetTable count="1"><Entry key="G54"><Cell key="X">1</Cell></Entry></..>
//! TimeSeries  <PositionTimeSeries sampleCount="3" sampleRate="100">1 2 3</..>
//! Condition   <Fault type="SYSTEM" nativeCode="E1" qualifier="HIGH">message</Fault>
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::codec::keys::{DURATION, RESET_TRIGGERED, STATISTIC, UNAVAILABLE};
use crate::document::{parse_xml, to_xml, Element};
use crate::error::DocumentError;
use crate::limits::STREAMS_ROOT;
use crate::marshal::devices::{header_from_element, header_to_element};
use crate::marshal::{
    parse_attr, read_collection, string_attr, write_collection, Marshal, ReadContext, WriteContext,
};
use crate::model::{
    ComponentStream, Condition, ConditionLevel, ConditionQualifier, DataItemCategory,
    DataSetEntry, DeviceStream, Observation, ObservationPayload, ObservationProperty,
    PayloadShape, Representation, StreamsDocument, TableCell, TableEntry, TimeSeries,
};
use crate::options::{ReadOptions, WriteOptions};
use crate::registry::TypeRegistry;

const HEADER: &str = "Header";
const STREAMS: &str = "Streams";
const DEVICE_STREAM: &str = "DeviceStream";
const COMPONENT_STREAM: &str = "ComponentStream";
const ENTRY: &str = "Entry";
const CELL: &str = "Cell";

const CATEGORIES: [DataItemCategory; 3] = [
    DataItemCategory::Sample,
    DataItemCategory::Event,
    DataItemCategory::Condition,
];

/// Auxiliary value keys and the attributes carrying them.
const AUXILIARY_ATTRIBUTES: [(&str, &str); 3] = [
    (STATISTIC, "statistic"),
    (DURATION, "duration"),
    (RESET_TRIGGERED, "resetTriggered"),
];

// =============================================================================
// DOCUMENT
// =============================================================================

/// Parses a streams document.
pub fn read_streams_document(
    text: &str,
    registry: &TypeRegistry,
    options: &ReadOptions,
) -> Result<StreamsDocument, DocumentError> {
    let root = parse_xml(text, options)?;
    streams_from_element(&root, &ReadContext::new(registry, *options))
}

/// Writes a streams document.
pub fn write_streams_document(
    document: &StreamsDocument,
    registry: &TypeRegistry,
    options: &WriteOptions,
) -> Result<String, DocumentError> {
    let root = streams_to_element(document, &WriteContext::new(registry, options));
    to_xml(&root, options)
}

pub fn streams_from_element(
    root: &Element,
    ctx: &ReadContext<'_>,
) -> Result<StreamsDocument, DocumentError> {
    if root.local_name() != STREAMS_ROOT {
        return Err(DocumentError::UnexpectedRoot {
            expected: STREAMS_ROOT,
            found: root.name.clone(),
        });
    }
    let header = root.child(HEADER).map(header_from_element).unwrap_or_default();
    let mut device_streams = Vec::new();
    if let Some(streams) = root.child(STREAMS) {
        let ctx = ctx.descend()?;
        for element in streams.children_named(DEVICE_STREAM) {
            device_streams.push(device_stream_from_element(element, &ctx)?);
        }
    }
    Ok(StreamsDocument {
        header,
        device_streams,
    })
}

pub fn streams_to_element(document: &StreamsDocument, ctx: &WriteContext<'_>) -> Element {
    let mut root = Element::new(STREAMS_ROOT);
    if ctx.options.emit_namespace {
        root.set_attr("xmlns", ctx.options.namespace(STREAMS_ROOT));
    }
    root.push(header_to_element(&document.header));
    let mut streams = Element::new(STREAMS);
    for device_stream in &document.device_streams {
        streams.push(device_stream_to_element(device_stream, ctx));
    }
    root.push(streams);
    root
}

fn device_stream_from_element(
    element: &Element,
    ctx: &ReadContext<'_>,
) -> Result<DeviceStream, DocumentError> {
    let ctx = ctx.descend()?;
    let mut stream = DeviceStream::new(element.attr("name").unwrap_or_default());
    stream.uuid = string_attr(element, "uuid");
    for child in element.children_named(COMPONENT_STREAM) {
        stream
            .component_streams
            .push(component_stream_from_element(child, &ctx)?);
    }
    Ok(stream)
}

fn device_stream_to_element(stream: &DeviceStream, ctx: &WriteContext<'_>) -> Element {
    let mut element = Element::new(DEVICE_STREAM)
        .with_attr("name", stream.name.as_str())
        .with_opt_attr("uuid", stream.uuid.as_deref());
    for component_stream in &stream.component_streams {
        element.push(component_stream_to_element(component_stream, ctx));
    }
    element
}

fn component_stream_from_element(
    element: &Element,
    ctx: &ReadContext<'_>,
) -> Result<ComponentStream, DocumentError> {
    let mut stream = ComponentStream::new(
        element.attr("component").unwrap_or_default(),
        element.attr("componentId").unwrap_or_default(),
    );
    stream.name = string_attr(element, "name");
    stream.uuid = string_attr(element, "uuid");
    for child in &element.children {
        let Some(category) = CATEGORIES
            .into_iter()
            .find(|c| c.container() == child.name)
        else {
            debug!(element = %child.name, "unknown component stream container skipped");
            continue;
        };
        let observations = read_collection::<Observation>(child, &ctx.with_category(category))?;
        stream.container_mut(category).extend(observations);
    }
    Ok(stream)
}

fn component_stream_to_element(stream: &ComponentStream, ctx: &WriteContext<'_>) -> Element {
    let mut element = Element::new(COMPONENT_STREAM)
        .with_attr("component", stream.component.as_str())
        .with_opt_attr("name", stream.name.as_deref())
        .with_attr("componentId", stream.component_id.as_str())
        .with_opt_attr("uuid", stream.uuid.as_deref());
    for category in CATEGORIES {
        let observations = stream.container(category);
        if !observations.is_empty() {
            element.push(write_collection(category.container(), observations, ctx));
        }
    }
    element
}

// =============================================================================
// OBSERVATIONS
// =============================================================================

fn data_set_from_element(element: &Element) -> Vec<DataSetEntry> {
    element
        .children_named(ENTRY)
        .filter_map(|entry| {
            let key = entry.attr("key")?;
            Some(if entry.attr("removed") == Some("true") {
                DataSetEntry::removed(key)
            } else {
                DataSetEntry::new(key, entry.text().unwrap_or_default())
            })
        })
        .collect()
}

fn table_from_element(element: &Element) -> Vec<TableEntry> {
    element
        .children_named(ENTRY)
        .filter_map(|entry| {
            let key = entry.attr("key")?;
            if entry.attr("removed") == Some("true") {
                return Some(TableEntry::removed(key));
            }
            let cells = entry
                .children_named(CELL)
                .filter_map(|cell| {
                    Some(TableCell::new(cell.attr("key")?, cell.text().unwrap_or_default()))
                })
                .collect();
            Some(TableEntry::new(key, cells))
        })
        .collect()
}

fn time_series_from_element(element: &Element, text: &str) -> TimeSeries {
    let samples = text
        .split_whitespace()
        .filter_map(|s| match s.parse::<f64>() {
            Ok(sample) => Some(sample),
            Err(_) => {
                debug!(element = %element.name, sample = s, "non-numeric time series sample skipped");
                None
            }
        })
        .collect();
    TimeSeries {
        samples,
        sample_rate: parse_attr(element, "sampleRate"),
    }
}

fn condition_from_element(element: &Element) -> Condition {
    let level = ConditionLevel::from_element_name(element.local_name()).unwrap_or_else(|| {
        debug!(element = %element.name, "unknown condition level, reading as UNAVAILABLE");
        ConditionLevel::Unavailable
    });
    Condition {
        level,
        native_code: string_attr(element, "nativeCode"),
        native_severity: string_attr(element, "nativeSeverity"),
        qualifier: element.attr("qualifier").and_then(ConditionQualifier::parse),
        message: element.text.clone(),
    }
}

fn entry_element(key: &str, removed: bool) -> Element {
    let entry = Element::new(ENTRY).with_attr("key", key);
    if removed {
        entry.with_attr("removed", "true")
    } else {
        entry
    }
}

impl Marshal for Observation {
    fn discriminator(
        element: &Element,
        ctx: &ReadContext<'_>,
    ) -> Option<(String, Option<Representation>)> {
        if ctx.category == Some(DataItemCategory::Condition) {
            return Some((string_attr(element, "type")?, Some(Representation::Value)));
        }
        let (type_id, representation) = ctx.registry.parse_observation_element(&element.name);
        Some((type_id.to_string(), Some(representation)))
    }

    fn read_base(
        element: &Element,
        discriminator: &str,
        representation: Option<Representation>,
        ctx: &ReadContext<'_>,
    ) -> Result<Self, DocumentError> {
        let category = ctx.category.unwrap_or(DataItemCategory::Event);
        let mut observation =
            Observation::new(discriminator, category, representation.unwrap_or_default());

        for property in ObservationProperty::ALL {
            if let Some(value) = property.attribute().and_then(|attr| element.attr(attr)) {
                observation.set_property(property, value);
            }
        }

        let text = element.text();
        let unavailable = text == Some(UNAVAILABLE);
        let payload = match (category, observation.representation()) {
            (DataItemCategory::Condition, _) => {
                if ConditionLevel::from_element_name(element.local_name()).is_none() {
                    observation.set_source_name(Arc::from(element.name.as_str()));
                }
                ObservationPayload::Condition(condition_from_element(element))
            }
            (_, Representation::DataSet) => ObservationPayload::DataSet(data_set_from_element(element)),
            (_, Representation::Table) => ObservationPayload::Table(table_from_element(element)),
            (_, Representation::TimeSeries) if !unavailable => ObservationPayload::TimeSeries(
                time_series_from_element(element, text.unwrap_or_default()),
            ),
            _ => ObservationPayload::Scalar(text.map(str::to_string)),
        };
        observation.set_payload(&payload);

        // Data sets and tables without entries carry the marker as text.
        if unavailable
            && matches!(payload, ObservationPayload::DataSet(_) | ObservationPayload::Table(_))
        {
            observation.set_result(UNAVAILABLE);
        }
        for (key, attribute) in AUXILIARY_ATTRIBUTES {
            if let Some(value) = element.attr(attribute) {
                observation.set_auxiliary(key, value);
            }
        }
        Ok(observation)
    }

    fn adopt(concrete: Self, base: Self) -> Self {
        concrete.adopt(base)
    }

    /// Conditions are named by their level, so only other shapes keep the
    /// element name they were read under.
    fn degrade(mut base: Self, element: &Element) -> Self {
        if base.shape() != PayloadShape::Condition {
            base.set_source_name(Arc::from(element.name.as_str()));
        }
        base
    }

    fn to_element(&self, ctx: &WriteContext<'_>) -> Element {
        let mut element = Element::new(&*self.element_name(ctx.registry));
        for (property, value) in self.store().properties() {
            if let Some(attribute) = property.attribute() {
                element.set_attr(attribute, value);
            }
        }

        match self.payload() {
            ObservationPayload::Scalar(value) => element.text = value,
            ObservationPayload::Condition(condition) => {
                element.set_attr("type", self.type_id());
                element = element
                    .with_opt_attr("nativeCode", condition.native_code.as_deref())
                    .with_opt_attr("nativeSeverity", condition.native_severity.as_deref())
                    .with_opt_attr("qualifier", condition.qualifier.map(|q| q.as_str()));
                element.text = condition.message;
            }
            ObservationPayload::DataSet(entries) => {
                element.set_attr("count", entries.len().to_string());
                for entry in &entries {
                    let mut child = entry_element(&entry.key, entry.is_removed());
                    child.text = entry.value().map(str::to_string);
                    element.push(child);
                }
                element.text = self.result();
            }
            ObservationPayload::Table(entries) => {
                element.set_attr("count", entries.len().to_string());
                for entry in &entries {
                    let mut child = entry_element(&entry.key, entry.is_removed());
                    for cell in entry.cells.as_present().into_iter().flatten() {
                        child.push(
                            Element::new(CELL)
                                .with_attr("key", cell.key.as_str())
                                .with_text(cell.value.as_str()),
                        );
                    }
                    element.push(child);
                }
                element.text = self.result();
            }
            ObservationPayload::TimeSeries(series) => {
                element.set_attr("sampleCount", series.samples.len().to_string());
                element = element.with_opt_attr("sampleRate", series.sample_rate);
                element.text = match self.result() {
                    Some(result) if series.samples.is_empty() => Some(result),
                    _ if series.samples.is_empty() => None,
                    _ => Some(
                        series
                            .samples
                            .iter()
                            .map(f64::to_string)
                            .collect::<Vec<_>>()
                            .join(" "),
                    ),
                };
            }
        }

        for (key, attribute) in AUXILIARY_ATTRIBUTES {
            if let Some(value) = self.store().get_value(key).and_then(|v| v.value().map(str::to_string)) {
                element.set_attr(attribute, value);
            }
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Header, ObservationPayload};

    const STREAMS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MTConnectStreams xmlns="urn:mtconnect.org:MTConnectStreams:2.2">
  <Header creationTime="2024-03-01T10:00:01Z" sender="agent" instanceId="1700000000" version="2.2.0" bufferSize="131072" firstSequence="1" lastSequence="120" nextSequence="121"/>
  <Streams>
    <DeviceStream name="VMC-3Axis" uuid="000-111">
      <ComponentStream component="Linear" name="X" componentId="x1">
        <Samples>
          <Position dataItemId="x1pos" timestamp="2024-03-01T10:00:00.5Z" sequence="101" subType="ACTUAL">12.5</Position>
          <PositionTimeSeries dataItemId="x1ts" timestamp="2024-03-01T10:00:00.6Z" sequence="102" sampleCount="4" sampleRate="100">1 2.5 -3 4</PositionTimeSeries>
          <Temperature dataItemId="x1temp" timestamp="2024-03-01T10:00:00.7Z" sequence="103" statistic="AVERAGE" duration="10">21.5</Temperature>
          <x:FluxLevel dataItemId="x1flux" timestamp="2024-03-01T10:00:00.8Z" sequence="104">7</x:FluxLevel>
        </Samples>
        <Events>
          <VariableDataSet dataItemId="vars" timestamp="2024-03-01T10:00:00.9Z" sequence="105" count="3">
            <Entry key="b" removed="true"/>
            <Entry key="a">1</Entry>
            <Entry key="c">3</Entry>
          </VariableDataSet>
          <WorkOffsetTable dataItemId="wo" timestamp="2024-03-01T10:00:01Z" sequence="106" count="2">
            <Entry key="G55"><Cell key="Y">2</Cell><Cell key="X">1</Cell></Entry>
            <Entry key="G54" removed="true"/>
          </WorkOffsetTable>
          <ToolOffsetTable dataItemId="to" timestamp="2024-03-01T10:00:01Z" sequence="107">UNAVAILABLE</ToolOffsetTable>
        </Events>
        <Condition>
          <Fault dataItemId="x1act" timestamp="2024-03-01T10:00:01Z" sequence="108" type="ACTUATOR" nativeCode="E42" nativeSeverity="3" qualifier="HIGH">Overload</Fault>
          <Normal dataItemId="x1sys" timestamp="2024-03-01T10:00:01Z" sequence="109" type="x:HYDRAULICS"/>
        </Condition>
      </ComponentStream>
    </DeviceStream>
  </Streams>
</MTConnectStreams>"#;

    fn read(text: &str) -> StreamsDocument {
        read_streams_document(text, TypeRegistry::global(), &ReadOptions::default()).unwrap()
    }

    fn write(document: &StreamsDocument) -> String {
        write_streams_document(document, TypeRegistry::global(), &WriteOptions::default()).unwrap()
    }

    fn find<'a>(document: &'a StreamsDocument, id: &str) -> &'a Observation {
        document.observation(id).unwrap()
    }

    #[test]
    fn test_read_every_shape() {
        let document = read(STREAMS_XML);
        assert_eq!(document.header.next_sequence, Some(121));

        let position = find(&document, "x1pos");
        assert!(position.resolution().is_registered());
        assert_eq!(position.category(), DataItemCategory::Sample);
        assert_eq!(position.result().as_deref(), Some("12.5"));
        assert_eq!(position.sequence(), Some(101));

        let series = find(&document, "x1ts").time_series();
        assert_eq!(series.samples, vec![1.0, 2.5, -3.0, 4.0]);
        assert_eq!(series.sample_rate, Some(100.0));

        let temperature = find(&document, "x1temp");
        assert_eq!(temperature.statistic().as_deref(), Some("AVERAGE"));
        assert_eq!(temperature.duration().as_deref(), Some("10"));

        let vars = find(&document, "vars").data_set();
        let keys: Vec<&str> = vars.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert!(vars[1].is_removed());

        let table = find(&document, "wo").table();
        assert_eq!(table[0].key, "G54");
        assert!(table[0].is_removed());
        let cells: Vec<&str> = table[1]
            .cells
            .as_present()
            .unwrap()
            .iter()
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(cells, ["X", "Y"]);

        let tool_offsets = find(&document, "to");
        assert!(tool_offsets.is_unavailable());
        assert!(tool_offsets.table().is_empty());

        let fault = find(&document, "x1act").condition();
        assert_eq!(fault.level, ConditionLevel::Fault);
        assert_eq!(fault.native_code.as_deref(), Some("E42"));
        assert_eq!(fault.qualifier, Some(ConditionQualifier::High));
        assert_eq!(fault.message.as_deref(), Some("Overload"));
    }

    #[test]
    fn test_unknown_observations_are_kept() {
        let document = read(STREAMS_XML);
        let flux = find(&document, "x1flux");
        assert!(!flux.resolution().is_registered());
        assert_eq!(flux.type_id(), "x:FLUX_LEVEL");
        assert_eq!(flux.result().as_deref(), Some("7"));
        assert_eq!(&*flux.element_name(TypeRegistry::global()), "x:FluxLevel");

        let hydraulics = find(&document, "x1sys");
        assert!(!hydraulics.resolution().is_registered());
        assert_eq!(hydraulics.condition().level, ConditionLevel::Normal);
        assert_eq!(hydraulics.category(), DataItemCategory::Condition);
    }

    #[test]
    fn test_round_trip_identity() {
        let first = read(STREAMS_XML);
        let text = write(&first);
        let second = read(&text);
        assert_eq!(first, second);
        assert_eq!(write(&second), text);
    }

    #[test]
    fn test_unregistered_element_name_survives() {
        let xml = r#"<MTConnectStreams><Streams><DeviceStream name="d">
            <ComponentStream component="Device" componentId="d"><Events>
              <x:customThing dataItemId="c" sequence="1">on</x:customThing>
            </Events></ComponentStream>
        </DeviceStream></Streams></MTConnectStreams>"#;
        let document = read(xml);
        let text = write_streams_document(&document, TypeRegistry::global(), &WriteOptions::compact())
            .unwrap();
        assert!(text.contains("<x:customThing dataItemId=\"c\" sequence=\"1\">on</x:customThing>"));
    }

    fn single_stream(body: &str) -> String {
        format!(
            "<MTConnectStreams><Streams><DeviceStream name=\"d\">{}</DeviceStream></Streams></MTConnectStreams>",
            body
        )
    }

    #[test]
    fn test_acronym_element_names_round_trip() {
        let stream = "<ComponentStream component=\"Electric\" componentId=\"e1\"><Samples>\
            <AmperageAC dataItemId=\"a1\" sequence=\"1\">3</AmperageAC>\
            <AmperageACTimeSeries dataItemId=\"a2\" sequence=\"2\" sampleCount=\"3\" sampleRate=\"100\">1 2 3</AmperageACTimeSeries>\
            </Samples><Events>\
            <MTConnectVersion dataItemId=\"v\" sequence=\"3\">2.2</MTConnectVersion>\
            </Events></ComponentStream>";
        let document = read(&single_stream(stream));

        for (id, type_id, rep) in [
            ("a1", "AMPERAGE_AC", Representation::Value),
            ("a2", "AMPERAGE_AC", Representation::TimeSeries),
            ("v", "MTCONNECT_VERSION", Representation::Value),
        ] {
            let observation = find(&document, id);
            assert!(observation.resolution().is_registered(), "{} resolved as fallback", id);
            assert_eq!(observation.type_id(), type_id);
            assert_eq!(observation.representation(), rep);
        }

        let text = write_streams_document(&document, TypeRegistry::global(), &WriteOptions::compact())
            .unwrap();
        assert!(text.contains(stream), "written as {}", text);
    }

    #[test]
    fn test_unknown_condition_level_keeps_its_element_name() {
        let stream = "<ComponentStream component=\"Device\" componentId=\"d\"><Condition>\
            <Critical dataItemId=\"c\" sequence=\"1\" type=\"x:HYDRAULICS\">boom</Critical>\
            <Critical dataItemId=\"s\" sequence=\"2\" type=\"SYSTEM\">overheat</Critical>\
            </Condition></ComponentStream>";
        let document = read(&single_stream(stream));

        let hydraulics = find(&document, "c");
        assert!(!hydraulics.resolution().is_registered());
        assert_eq!(hydraulics.condition().level, ConditionLevel::Unavailable);
        let system = find(&document, "s");
        assert!(system.resolution().is_registered());
        assert_eq!(system.condition().message.as_deref(), Some("overheat"));

        let text = write_streams_document(&document, TypeRegistry::global(), &WriteOptions::compact())
            .unwrap();
        assert!(text.contains(stream), "written as {}", text);
        assert_eq!(read(&text), document);
    }

    #[test]
    fn test_discrete_observations_round_trip() {
        let registry = TypeRegistry::global();
        let item = crate::model::DataItem::new("avail", "AVAILABILITY", DataItemCategory::Event)
            .with_representation(Representation::Discrete);
        let observation = Observation::from_data_item(registry, &item).unwrap();
        assert!(observation.resolution().is_registered());
        observation.set_sequence(7);
        observation.set_result("AVAILABLE");

        let mut stream = ComponentStream::new("Device", "d");
        stream.push(observation);
        let document = StreamsDocument::new(
            Header::new(),
            vec![DeviceStream::new("VMC").with_component_stream(stream)],
        );
        let text = write_streams_document(&document, registry, &WriteOptions::compact()).unwrap();
        assert!(text.contains("<Availability dataItemId=\"avail\" sequence=\"7\">AVAILABLE</Availability>"));
        assert_eq!(read(&text), document);
    }

    #[test]
    fn test_write_built_document() {
        let registry = TypeRegistry::global();
        let item = crate::model::DataItem::new("vars", "VARIABLE", DataItemCategory::Event)
            .with_representation(Representation::DataSet);
        let observation = Observation::from_data_item(registry, &item).unwrap();
        observation.set_sequence(5);
        observation.set_payload(&ObservationPayload::DataSet(vec![
            DataSetEntry::new("speed", "100"),
            DataSetEntry::removed("feed"),
        ]));

        let mut stream = ComponentStream::new("Path", "p1");
        stream.push(observation);
        let document = StreamsDocument::new(
            Header::new(),
            vec![DeviceStream::new("VMC").with_component_stream(stream)],
        );
        let text = write_streams_document(&document, registry, &WriteOptions::compact()).unwrap();
        assert!(text.contains(
            "<VariableDataSet dataItemId=\"vars\" sequence=\"5\" count=\"2\">\
             <Entry key=\"feed\" removed=\"true\"/><Entry key=\"speed\">100</Entry></VariableDataSet>"
        ));
        assert_eq!(read(&text), document);
    }

    #[test]
    fn test_unexpected_root() {
        let err = read_streams_document("<MTConnectDevices/>", TypeRegistry::global(), &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnexpectedRoot { .. }));
    }
}
