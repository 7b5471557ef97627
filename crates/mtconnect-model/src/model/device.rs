//! The device information model.
//!
//! A device is a tree: components own sub-components, data items (what can
//! be observed) and compositions (lower-level parts a data item can be
//! attributed to). Every node carries its discriminator in `type_id`, a
//! unique `id`, and a [`Resolution`] recording whether a registered
//! variant was found for the discriminator.

use crate::model::{id, DataItemCategory, Header, Representation};
use crate::registry::{Capability, Family, Resolution, TypeRegistry, Variant};

/// Free-form description of a device or component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Description {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub station: Option<String>,
    pub text: Option<String>,
}

impl Description {
    pub fn is_empty(&self) -> bool {
        self.manufacturer.is_none()
            && self.model.is_none()
            && self.serial_number.is_none()
            && self.station.is_none()
            && self.text.is_none()
    }
}

/// A pointer to another node of the same device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Component { id_ref: String, name: Option<String> },
    DataItem { id_ref: String, name: Option<String> },
}

impl Reference {
    pub fn id_ref(&self) -> &str {
        match self {
            Reference::Component { id_ref, .. } | Reference::DataItem { id_ref, .. } => id_ref,
        }
    }
}

/// Definition of something a device can report.
#[derive(Debug, Clone, PartialEq)]
pub struct DataItem {
    pub id: String,
    pub type_id: String,
    pub sub_type: Option<String>,
    pub category: DataItemCategory,
    pub name: Option<String>,
    pub units: Option<String>,
    pub native_units: Option<String>,
    pub representation: Representation,
    pub composition_id: Option<String>,
    pub coordinate_system: Option<String>,
    pub statistic: Option<String>,
    pub sample_rate: Option<f64>,
    pub discrete: bool,
    pub resolution: Resolution<DataItem>,
}

impl DataItem {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, category: DataItemCategory) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            sub_type: None,
            category,
            name: None,
            units: None,
            native_units: None,
            representation: Representation::Value,
            composition_id: None,
            coordinate_system: None,
            statistic: None,
            sample_rate: None,
            discrete: false,
            resolution: Resolution::Fallback,
        }
    }

    pub(crate) fn variant(
        type_id: &str,
        category: DataItemCategory,
        units: Option<&'static str>,
    ) -> Self {
        let mut item = Self::new("", type_id, category);
        item.units = units.map(str::to_string);
        item
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_composition(mut self, composition_id: impl Into<String>) -> Self {
        self.composition_id = Some(composition_id.into());
        self
    }

    /// Moves every field of `base` onto `self`, keeping only the
    /// resolution of `self`.
    pub(crate) fn adopt(self, base: DataItem) -> DataItem {
        let DataItem {
            id,
            type_id,
            sub_type,
            category,
            name,
            units,
            native_units,
            representation,
            composition_id,
            coordinate_system,
            statistic,
            sample_rate,
            discrete,
            resolution: _,
        } = base;
        DataItem {
            id,
            type_id,
            sub_type,
            category,
            name,
            units,
            native_units,
            representation,
            composition_id,
            coordinate_system,
            statistic,
            sample_rate,
            discrete,
            resolution: self.resolution,
        }
    }
}

impl Variant for DataItem {
    const CAPABILITY: Capability = Capability::DataItem;

    fn family(registry: &TypeRegistry) -> &Family<Self> {
        &registry.data_items
    }

    fn fallback(discriminator: &str, _representation: Option<Representation>) -> Self {
        DataItem::new("", discriminator, DataItemCategory::Event)
    }

    fn resolution(&self) -> Resolution<Self> {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: Resolution<Self>) {
        self.resolution = resolution;
    }
}

/// A lower-level part of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub id: String,
    pub type_id: String,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub description: Option<Description>,
    pub resolution: Resolution<Composition>,
}

impl Composition {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            name: None,
            uuid: None,
            description: None,
            resolution: Resolution::Fallback,
        }
    }

    pub(crate) fn variant(type_id: &str) -> Self {
        Self::new("", type_id)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn adopt(self, base: Composition) -> Composition {
        let Composition {
            id,
            type_id,
            name,
            uuid,
            description,
            resolution: _,
        } = base;
        Composition {
            id,
            type_id,
            name,
            uuid,
            description,
            resolution: self.resolution,
        }
    }
}

impl Variant for Composition {
    const CAPABILITY: Capability = Capability::Composition;

    fn family(registry: &TypeRegistry) -> &Family<Self> {
        &registry.compositions
    }

    fn fallback(discriminator: &str, _representation: Option<Representation>) -> Self {
        Composition::new("", discriminator)
    }

    fn resolution(&self) -> Resolution<Self> {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: Resolution<Self>) {
        self.resolution = resolution;
    }
}

/// A functional part of a device. Components nest.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    pub type_id: String,
    pub name: Option<String>,
    pub native_name: Option<String>,
    pub uuid: Option<String>,
    pub sample_interval: Option<f64>,
    pub description: Option<Description>,
    pub data_items: Vec<DataItem>,
    pub compositions: Vec<Composition>,
    pub components: Vec<Component>,
    pub references: Vec<Reference>,
    pub resolution: Resolution<Component>,
}

impl Component {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            name: None,
            native_name: None,
            uuid: None,
            sample_interval: None,
            description: None,
            data_items: Vec::new(),
            compositions: Vec::new(),
            components: Vec::new(),
            references: Vec::new(),
            resolution: Resolution::Fallback,
        }
    }

    pub(crate) fn variant(type_id: &str) -> Self {
        Self::new("", type_id)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_data_item(mut self, item: DataItem) -> Self {
        self.data_items.push(item);
        self
    }

    pub fn with_composition(mut self, composition: Composition) -> Self {
        self.compositions.push(composition);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Depth-first search for a component by id, including `self`.
    pub fn find_component(&self, id: &str) -> Option<&Component> {
        if self.id == id {
            return Some(self);
        }
        self.components.iter().find_map(|c| c.find_component(id))
    }

    /// Depth-first search for a data item by id.
    pub fn find_data_item(&self, id: &str) -> Option<&DataItem> {
        self.data_items
            .iter()
            .find(|d| d.id == id)
            .or_else(|| self.components.iter().find_map(|c| c.find_data_item(id)))
    }

    pub(crate) fn adopt(self, base: Component) -> Component {
        let Component {
            id,
            type_id,
            name,
            native_name,
            uuid,
            sample_interval,
            description,
            data_items,
            compositions,
            components,
            references,
            resolution: _,
        } = base;
        Component {
            id,
            type_id,
            name,
            native_name,
            uuid,
            sample_interval,
            description,
            data_items,
            compositions,
            components,
            references,
            resolution: self.resolution,
        }
    }

    fn collect_data_items<'a>(&'a self, out: &mut Vec<&'a DataItem>) {
        out.extend(self.data_items.iter());
        for component in &self.components {
            component.collect_data_items(out);
        }
    }
}

impl Variant for Component {
    const CAPABILITY: Capability = Capability::Component;

    fn family(registry: &TypeRegistry) -> &Family<Self> {
        &registry.components
    }

    fn fallback(discriminator: &str, _representation: Option<Representation>) -> Self {
        Component::new("", discriminator)
    }

    fn resolution(&self) -> Resolution<Self> {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: Resolution<Self>) {
        self.resolution = resolution;
    }
}

/// Root of a device tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub type_id: String,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub native_name: Option<String>,
    pub sample_interval: Option<f64>,
    pub iso841_class: Option<String>,
    pub mtconnect_version: Option<String>,
    pub description: Option<Description>,
    pub data_items: Vec<DataItem>,
    pub compositions: Vec<Composition>,
    pub components: Vec<Component>,
    pub references: Vec<Reference>,
    pub resolution: Resolution<Device>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut device = Self::variant("Device");
        device.id = id.into();
        device.name = Some(name.into());
        device
    }

    pub(crate) fn variant(type_id: &str) -> Self {
        Self {
            id: String::new(),
            type_id: type_id.to_string(),
            name: None,
            uuid: None,
            native_name: None,
            sample_interval: None,
            iso841_class: None,
            mtconnect_version: None,
            description: None,
            data_items: Vec::new(),
            compositions: Vec::new(),
            components: Vec::new(),
            references: Vec::new(),
            resolution: Resolution::Fallback,
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_data_item(mut self, item: DataItem) -> Self {
        self.data_items.push(item);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Assigns a name-derived UUID if the device has none.
    pub fn ensure_uuid(&mut self) -> &str {
        if self.uuid.is_none() {
            let seed = self.name.as_deref().unwrap_or(&self.id);
            self.uuid = Some(id::device_uuid(seed));
        }
        self.uuid.as_deref().unwrap_or_default()
    }

    pub fn find_component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find_map(|c| c.find_component(id))
    }

    pub fn find_data_item(&self, id: &str) -> Option<&DataItem> {
        self.data_items
            .iter()
            .find(|d| d.id == id)
            .or_else(|| self.components.iter().find_map(|c| c.find_data_item(id)))
    }

    /// Every data item of the device, depth first.
    pub fn all_data_items(&self) -> Vec<&DataItem> {
        let mut out: Vec<&DataItem> = self.data_items.iter().collect();
        for component in &self.components {
            component.collect_data_items(&mut out);
        }
        out
    }

    pub(crate) fn adopt(self, base: Device) -> Device {
        let Device {
            id,
            type_id,
            name,
            uuid,
            native_name,
            sample_interval,
            iso841_class,
            mtconnect_version,
            description,
            data_items,
            compositions,
            components,
            references,
            resolution: _,
        } = base;
        Device {
            id,
            type_id,
            name,
            uuid,
            native_name,
            sample_interval,
            iso841_class,
            mtconnect_version,
            description,
            data_items,
            compositions,
            components,
            references,
            resolution: self.resolution,
        }
    }
}

impl Variant for Device {
    const CAPABILITY: Capability = Capability::Device;

    fn family(registry: &TypeRegistry) -> &Family<Self> {
        &registry.devices
    }

    fn fallback(discriminator: &str, _representation: Option<Representation>) -> Self {
        Device::variant(discriminator)
    }

    fn resolution(&self) -> Resolution<Self> {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: Resolution<Self>) {
        self.resolution = resolution;
    }
}

/// A devices document: header plus device trees.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DevicesDocument {
    pub header: Header,
    pub devices: Vec<Device>,
}

impl DevicesDocument {
    pub fn new(header: Header, devices: Vec<Device>) -> Self {
        Self { header, devices }
    }

    /// Finds a device by name or UUID.
    pub fn device(&self, name_or_uuid: &str) -> Option<&Device> {
        self.devices.iter().find(|d| {
            d.name.as_deref() == Some(name_or_uuid) || d.uuid.as_deref() == Some(name_or_uuid)
        })
    }

    pub fn find_data_item(&self, id: &str) -> Option<&DataItem> {
        self.devices.iter().find_map(|d| d.find_data_item(id))
    }
}
