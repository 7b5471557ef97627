//! Streams documents: observations grouped by device and component.

use crate::model::{DataItemCategory, Header, Observation};

/// Observations reported by one component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentStream {
    /// Component type (element name in the devices document).
    pub component: String,
    pub component_id: String,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub samples: Vec<Observation>,
    pub events: Vec<Observation>,
    pub conditions: Vec<Observation>,
}

impl ComponentStream {
    pub fn new(component: impl Into<String>, component_id: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            component_id: component_id.into(),
            ..Self::default()
        }
    }

    /// Files the observation under the container matching its category.
    pub fn push(&mut self, observation: Observation) {
        self.container_mut(observation.category()).push(observation);
    }

    pub fn container(&self, category: DataItemCategory) -> &[Observation] {
        match category {
            DataItemCategory::Sample => &self.samples,
            DataItemCategory::Event => &self.events,
            DataItemCategory::Condition => &self.conditions,
        }
    }

    pub(crate) fn container_mut(&mut self, category: DataItemCategory) -> &mut Vec<Observation> {
        match category {
            DataItemCategory::Sample => &mut self.samples,
            DataItemCategory::Event => &mut self.events,
            DataItemCategory::Condition => &mut self.conditions,
        }
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.samples
            .iter()
            .chain(self.events.iter())
            .chain(self.conditions.iter())
    }

    pub fn len(&self) -> usize {
        self.samples.len() + self.events.len() + self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Component streams of one device.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceStream {
    pub name: String,
    pub uuid: Option<String>,
    pub component_streams: Vec<ComponentStream>,
}

impl DeviceStream {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_component_stream(mut self, stream: ComponentStream) -> Self {
        self.component_streams.push(stream);
        self
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.component_streams.iter().flat_map(|s| s.observations())
    }
}

/// A streams document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamsDocument {
    pub header: Header,
    pub device_streams: Vec<DeviceStream>,
}

impl StreamsDocument {
    pub fn new(header: Header, device_streams: Vec<DeviceStream>) -> Self {
        Self {
            header,
            device_streams,
        }
    }

    /// Finds the latest observation of a data item, by sequence.
    pub fn observation(&self, data_item_id: &str) -> Option<&Observation> {
        self.device_streams
            .iter()
            .flat_map(|d| d.observations())
            .filter(|o| o.data_item_id().as_deref() == Some(data_item_id))
            .max_by_key(|o| o.sequence())
    }
}
