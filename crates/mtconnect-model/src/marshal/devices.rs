//! Devices documents.
//!
//! ```text
//! MTConnectDevices
//!   Header
//!   Devices
//!     Device | Agent                 (named by type)
//!       Description
//!       DataItems      DataItem      (type attribute)
//!       Compositions   Composition   (type attribute)
//!       Components     Axes | Linear | ...
//!       References     ComponentRef | DataItemRef
//! ```

use tracing::trace;

use crate::document::{parse_xml, to_xml, Element};
use crate::error::DocumentError;
use crate::limits::DEVICES_ROOT;
use crate::marshal::{
    parse_attr, read_collection, string_attr, write_collection, Marshal, ReadContext, WriteContext,
};
use crate::model::{
    Component, Composition, DataItem, DataItemCategory, Description, Device, DevicesDocument,
    Header, Reference, Representation,
};
use crate::options::{ReadOptions, WriteOptions};
use crate::registry::TypeRegistry;

pub const DEVICES: &str = "Devices";
pub const COMPONENTS: &str = "Components";
pub const COMPOSITIONS: &str = "Compositions";
pub const DATA_ITEMS: &str = "DataItems";
pub const REFERENCES: &str = "References";

const HEADER: &str = "Header";
const DESCRIPTION: &str = "Description";
const COMPOSITION: &str = "Composition";
const DATA_ITEM: &str = "DataItem";
const COMPONENT_REF: &str = "ComponentRef";
const DATA_ITEM_REF: &str = "DataItemRef";

// =============================================================================
// DOCUMENT
// =============================================================================

/// Parses a devices document.
pub fn read_devices_document(
    text: &str,
    registry: &TypeRegistry,
    options: &ReadOptions,
) -> Result<DevicesDocument, DocumentError> {
    let root = parse_xml(text, options)?;
    devices_from_element(&root, &ReadContext::new(registry, *options))
}

/// Writes a devices document.
pub fn write_devices_document(
    document: &DevicesDocument,
    registry: &TypeRegistry,
    options: &WriteOptions,
) -> Result<String, DocumentError> {
    let root = devices_to_element(document, &WriteContext::new(registry, options));
    to_xml(&root, options)
}

pub fn devices_from_element(
    root: &Element,
    ctx: &ReadContext<'_>,
) -> Result<DevicesDocument, DocumentError> {
    if root.local_name() != DEVICES_ROOT {
        return Err(DocumentError::UnexpectedRoot {
            expected: DEVICES_ROOT,
            found: root.name.clone(),
        });
    }
    let header = root.child(HEADER).map(header_from_element).unwrap_or_default();
    let devices = match root.child(DEVICES) {
        Some(container) => read_collection::<Device>(container, ctx)?,
        None => Vec::new(),
    };
    Ok(DevicesDocument { header, devices })
}

pub fn devices_to_element(document: &DevicesDocument, ctx: &WriteContext<'_>) -> Element {
    let mut root = Element::new(DEVICES_ROOT);
    if ctx.options.emit_namespace {
        root.set_attr("xmlns", ctx.options.namespace(DEVICES_ROOT));
    }
    root.push(header_to_element(&document.header));
    root.push(write_collection(DEVICES, &document.devices, ctx));
    root
}

// =============================================================================
// HEADER
// =============================================================================

pub(crate) fn header_from_element(element: &Element) -> Header {
    Header {
        creation_time: string_attr(element, "creationTime"),
        sender: string_attr(element, "sender"),
        instance_id: parse_attr(element, "instanceId"),
        version: string_attr(element, "version"),
        buffer_size: parse_attr(element, "bufferSize"),
        asset_buffer_size: parse_attr(element, "assetBufferSize"),
        asset_count: parse_attr(element, "assetCount"),
        first_sequence: parse_attr(element, "firstSequence"),
        last_sequence: parse_attr(element, "lastSequence"),
        next_sequence: parse_attr(element, "nextSequence"),
        device_model_change_time: string_attr(element, "deviceModelChangeTime"),
    }
}

pub(crate) fn header_to_element(header: &Header) -> Element {
    Element::new(HEADER)
        .with_opt_attr("creationTime", header.creation_time.as_deref())
        .with_opt_attr("sender", header.sender.as_deref())
        .with_opt_attr("instanceId", header.instance_id)
        .with_opt_attr("version", header.version.as_deref())
        .with_opt_attr("bufferSize", header.buffer_size)
        .with_opt_attr("assetBufferSize", header.asset_buffer_size)
        .with_opt_attr("assetCount", header.asset_count)
        .with_opt_attr("firstSequence", header.first_sequence)
        .with_opt_attr("lastSequence", header.last_sequence)
        .with_opt_attr("nextSequence", header.next_sequence)
        .with_opt_attr("deviceModelChangeTime", header.device_model_change_time.as_deref())
}

// =============================================================================
// SHARED PARTS
// =============================================================================

fn description_from_element(element: &Element) -> Description {
    Description {
        manufacturer: string_attr(element, "manufacturer"),
        model: string_attr(element, "model"),
        serial_number: string_attr(element, "serialNumber"),
        station: string_attr(element, "station"),
        text: element.text.clone(),
    }
}

fn description_to_element(description: &Description) -> Element {
    let mut element = Element::new(DESCRIPTION)
        .with_opt_attr("manufacturer", description.manufacturer.as_deref())
        .with_opt_attr("model", description.model.as_deref())
        .with_opt_attr("serialNumber", description.serial_number.as_deref())
        .with_opt_attr("station", description.station.as_deref());
    element.text = description.text.clone();
    element
}

fn references_from_element(container: &Element) -> Vec<Reference> {
    container
        .children
        .iter()
        .filter_map(|child| {
            let id_ref = string_attr(child, "idRef")?;
            let name = string_attr(child, "name");
            match child.name.as_str() {
                COMPONENT_REF => Some(Reference::Component { id_ref, name }),
                DATA_ITEM_REF => Some(Reference::DataItem { id_ref, name }),
                other => {
                    trace!(element = other, "unknown reference kind skipped");
                    None
                }
            }
        })
        .collect()
}

fn references_to_element(references: &[Reference]) -> Element {
    let mut container = Element::new(REFERENCES);
    for reference in references {
        let (name, id_ref, ref_name) = match reference {
            Reference::Component { id_ref, name } => (COMPONENT_REF, id_ref, name),
            Reference::DataItem { id_ref, name } => (DATA_ITEM_REF, id_ref, name),
        };
        container.push(
            Element::new(name)
                .with_attr("idRef", id_ref.as_str())
                .with_opt_attr("name", ref_name.as_deref()),
        );
    }
    container
}

/// Children shared by devices and components.
#[derive(Default)]
struct NodeChildren {
    description: Option<Description>,
    data_items: Vec<DataItem>,
    compositions: Vec<Composition>,
    components: Vec<Component>,
    references: Vec<Reference>,
}

fn read_node_children(element: &Element, ctx: &ReadContext<'_>) -> Result<NodeChildren, DocumentError> {
    let mut children = NodeChildren::default();
    for child in &element.children {
        match child.name.as_str() {
            DESCRIPTION => children.description = Some(description_from_element(child)),
            DATA_ITEMS => children.data_items = read_collection(child, ctx)?,
            COMPOSITIONS => children.compositions = read_collection(child, ctx)?,
            COMPONENTS => children.components = read_collection(child, ctx)?,
            REFERENCES => children.references = references_from_element(child),
            other => trace!(parent = %element.name, element = other, "unmodelled child skipped"),
        }
    }
    Ok(children)
}

fn write_node_children(
    element: &mut Element,
    description: Option<&Description>,
    data_items: &[DataItem],
    compositions: &[Composition],
    components: &[Component],
    references: &[Reference],
    ctx: &WriteContext<'_>,
) {
    if let Some(description) = description {
        element.push(description_to_element(description));
    }
    if !data_items.is_empty() {
        element.push(write_collection(DATA_ITEMS, data_items, ctx));
    }
    if !compositions.is_empty() {
        element.push(write_collection(COMPOSITIONS, compositions, ctx));
    }
    if !components.is_empty() {
        element.push(write_collection(COMPONENTS, components, ctx));
    }
    if !references.is_empty() {
        element.push(references_to_element(references));
    }
}

// =============================================================================
// FAMILIES
// =============================================================================

impl Marshal for Device {
    fn discriminator(
        element: &Element,
        _ctx: &ReadContext<'_>,
    ) -> Option<(String, Option<Representation>)> {
        Some((element.name.clone(), None))
    }

    fn read_base(
        element: &Element,
        discriminator: &str,
        _representation: Option<Representation>,
        ctx: &ReadContext<'_>,
    ) -> Result<Self, DocumentError> {
        let children = read_node_children(element, ctx)?;
        let mut device = Device::variant(discriminator);
        device.id = string_attr(element, "id").unwrap_or_default();
        device.name = string_attr(element, "name");
        device.uuid = string_attr(element, "uuid");
        device.native_name = string_attr(element, "nativeName");
        device.sample_interval = parse_attr(element, "sampleInterval");
        device.iso841_class = string_attr(element, "iso841Class");
        device.mtconnect_version = string_attr(element, "mtconnectVersion");
        device.description = children.description;
        device.data_items = children.data_items;
        device.compositions = children.compositions;
        device.components = children.components;
        device.references = children.references;
        Ok(device)
    }

    fn adopt(concrete: Self, base: Self) -> Self {
        concrete.adopt(base)
    }

    fn to_element(&self, ctx: &WriteContext<'_>) -> Element {
        let mut element = Element::new(self.type_id.as_str())
            .with_attr("id", self.id.as_str())
            .with_opt_attr("name", self.name.as_deref())
            .with_opt_attr("uuid", self.uuid.as_deref())
            .with_opt_attr("nativeName", self.native_name.as_deref())
            .with_opt_attr("sampleInterval", self.sample_interval)
            .with_opt_attr("iso841Class", self.iso841_class.as_deref())
            .with_opt_attr("mtconnectVersion", self.mtconnect_version.as_deref());
        write_node_children(
            &mut element,
            self.description.as_ref(),
            &self.data_items,
            &self.compositions,
            &self.components,
            &self.references,
            ctx,
        );
        ctx.finish_node(element)
    }
}

impl Marshal for Component {
    fn discriminator(
        element: &Element,
        _ctx: &ReadContext<'_>,
    ) -> Option<(String, Option<Representation>)> {
        Some((element.name.clone(), None))
    }

    fn read_base(
        element: &Element,
        discriminator: &str,
        _representation: Option<Representation>,
        ctx: &ReadContext<'_>,
    ) -> Result<Self, DocumentError> {
        let children = read_node_children(element, ctx)?;
        let mut component = Component::new(string_attr(element, "id").unwrap_or_default(), discriminator);
        component.name = string_attr(element, "name");
        component.native_name = string_attr(element, "nativeName");
        component.uuid = string_attr(element, "uuid");
        component.sample_interval = parse_attr(element, "sampleInterval");
        component.description = children.description;
        component.data_items = children.data_items;
        component.compositions = children.compositions;
        component.components = children.components;
        component.references = children.references;
        Ok(component)
    }

    fn adopt(concrete: Self, base: Self) -> Self {
        concrete.adopt(base)
    }

    fn to_element(&self, ctx: &WriteContext<'_>) -> Element {
        let mut element = Element::new(self.type_id.as_str())
            .with_attr("id", self.id.as_str())
            .with_opt_attr("name", self.name.as_deref())
            .with_opt_attr("nativeName", self.native_name.as_deref())
            .with_opt_attr("uuid", self.uuid.as_deref())
            .with_opt_attr("sampleInterval", self.sample_interval);
        write_node_children(
            &mut element,
            self.description.as_ref(),
            &self.data_items,
            &self.compositions,
            &self.components,
            &self.references,
            ctx,
        );
        ctx.finish_node(element)
    }
}

impl Marshal for Composition {
    fn discriminator(
        element: &Element,
        _ctx: &ReadContext<'_>,
    ) -> Option<(String, Option<Representation>)> {
        if element.name != COMPOSITION {
            return None;
        }
        Some((string_attr(element, "type")?, None))
    }

    fn read_base(
        element: &Element,
        discriminator: &str,
        _representation: Option<Representation>,
        _ctx: &ReadContext<'_>,
    ) -> Result<Self, DocumentError> {
        let mut composition = Composition::new(string_attr(element, "id").unwrap_or_default(), discriminator);
        composition.name = string_attr(element, "name");
        composition.uuid = string_attr(element, "uuid");
        composition.description = element.child(DESCRIPTION).map(description_from_element);
        Ok(composition)
    }

    fn adopt(concrete: Self, base: Self) -> Self {
        concrete.adopt(base)
    }

    fn to_element(&self, ctx: &WriteContext<'_>) -> Element {
        let mut element = Element::new(COMPOSITION)
            .with_attr("id", self.id.as_str())
            .with_attr("type", self.type_id.as_str())
            .with_opt_attr("name", self.name.as_deref())
            .with_opt_attr("uuid", self.uuid.as_deref());
        if let Some(description) = &self.description {
            element.push(description_to_element(description));
        }
        ctx.finish_node(element)
    }
}

impl Marshal for DataItem {
    fn discriminator(
        element: &Element,
        _ctx: &ReadContext<'_>,
    ) -> Option<(String, Option<Representation>)> {
        if element.name != DATA_ITEM {
            return None;
        }
        Some((string_attr(element, "type")?, None))
    }

    fn read_base(
        element: &Element,
        discriminator: &str,
        _representation: Option<Representation>,
        ctx: &ReadContext<'_>,
    ) -> Result<Self, DocumentError> {
        let category = match element.attr("category").and_then(DataItemCategory::parse) {
            Some(category) => category,
            // Fall back to the registered default for the type.
            None => {
                let concrete: DataItem = ctx.registry.create(discriminator, None)?;
                concrete.category
            }
        };
        let representation = match element.attr("representation") {
            Some(raw) => Representation::parse(raw).unwrap_or_else(|| {
                trace!(value = raw, "unknown representation read as VALUE");
                Representation::Value
            }),
            None => Representation::Value,
        };
        let mut item = DataItem::new(string_attr(element, "id").unwrap_or_default(), discriminator, category);
        item.sub_type = string_attr(element, "subType");
        item.name = string_attr(element, "name");
        item.units = string_attr(element, "units");
        item.native_units = string_attr(element, "nativeUnits");
        item.representation = representation;
        item.composition_id = string_attr(element, "compositionId");
        item.coordinate_system = string_attr(element, "coordinateSystem");
        item.statistic = string_attr(element, "statistic");
        item.sample_rate = parse_attr(element, "sampleRate");
        item.discrete = element.attr("discrete") == Some("true");
        Ok(item)
    }

    fn adopt(concrete: Self, base: Self) -> Self {
        concrete.adopt(base)
    }

    fn to_element(&self, ctx: &WriteContext<'_>) -> Element {
        let representation =
            (self.representation != Representation::Value).then(|| self.representation.as_str());
        let element = Element::new(DATA_ITEM)
            .with_attr("id", self.id.as_str())
            .with_attr("type", self.type_id.as_str())
            .with_opt_attr("subType", self.sub_type.as_deref())
            .with_attr("category", self.category.as_str())
            .with_opt_attr("name", self.name.as_deref())
            .with_opt_attr("units", self.units.as_deref())
            .with_opt_attr("nativeUnits", self.native_units.as_deref())
            .with_opt_attr("representation", representation)
            .with_opt_attr("compositionId", self.composition_id.as_deref())
            .with_opt_attr("coordinateSystem", self.coordinate_system.as_deref())
            .with_opt_attr("statistic", self.statistic.as_deref())
            .with_opt_attr("sampleRate", self.sample_rate)
            .with_opt_attr("discrete", self.discrete.then_some("true"));
        ctx.finish_node(element)
    }
}
