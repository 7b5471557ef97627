//! Semantic validation for device trees.
//!
//! Reading a document never fails on these checks; a tree read from an
//! agent can be inspected afterwards. Validation stops at the first
//! problem found, in document order.

use rustc_hash::FxHashSet;

use crate::error::ValidationError;
use crate::model::{Component, Composition, DataItem, Device, DevicesDocument, Reference};

/// The parts of a device or component that validation looks at.
struct Node<'a> {
    element: &'static str,
    id: &'a str,
    data_items: &'a [DataItem],
    compositions: &'a [Composition],
    components: &'a [Component],
    references: &'a [Reference],
}

impl<'a> Node<'a> {
    fn device(device: &'a Device) -> Self {
        Self {
            element: "Device",
            id: &device.id,
            data_items: &device.data_items,
            compositions: &device.compositions,
            components: &device.components,
            references: &device.references,
        }
    }

    fn component(component: &'a Component) -> Self {
        Self {
            element: "Component",
            id: &component.id,
            data_items: &component.data_items,
            compositions: &component.compositions,
            components: &component.components,
            references: &component.references,
        }
    }

    fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.components.iter().map(Node::component)
    }
}

/// Validates a single device.
pub fn validate_device(device: &Device) -> Result<(), ValidationError> {
    let mut seen = FxHashSet::default();
    validate_in(device, &mut seen)
}

/// Validates every device of a document. Ids must be unique across the
/// whole document.
pub fn validate_devices(document: &DevicesDocument) -> Result<(), ValidationError> {
    let mut seen = FxHashSet::default();
    for device in &document.devices {
        validate_in(device, &mut seen)?;
    }
    Ok(())
}

fn validate_in<'a>(
    device: &'a Device,
    seen: &mut FxHashSet<&'a str>,
) -> Result<(), ValidationError> {
    let root = Node::device(device);
    let mut device_ids = FxHashSet::default();
    collect_ids(&root, seen, &mut device_ids)?;
    check_links(&root, &device.id, &device_ids)
}

fn collect_ids<'a>(
    node: &Node<'a>,
    seen: &mut FxHashSet<&'a str>,
    device_ids: &mut FxHashSet<&'a str>,
) -> Result<(), ValidationError> {
    claim(node.element, node.id, seen, device_ids)?;
    for composition in node.compositions {
        claim("Composition", &composition.id, seen, device_ids)?;
    }
    for item in node.data_items {
        claim("DataItem", &item.id, seen, device_ids)?;
    }
    for child in node.children() {
        collect_ids(&child, seen, device_ids)?;
    }
    Ok(())
}

fn claim<'a>(
    element: &'static str,
    id: &'a str,
    seen: &mut FxHashSet<&'a str>,
    device_ids: &mut FxHashSet<&'a str>,
) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyId { element });
    }
    if !seen.insert(id) {
        return Err(ValidationError::DuplicateId { id: id.to_string() });
    }
    device_ids.insert(id);
    Ok(())
}

fn check_links(
    node: &Node<'_>,
    device: &str,
    device_ids: &FxHashSet<&str>,
) -> Result<(), ValidationError> {
    for item in node.data_items {
        if let Some(composition) = &item.composition_id {
            if !node.compositions.iter().any(|c| &c.id == composition) {
                return Err(ValidationError::UnknownComposition {
                    data_item: item.id.clone(),
                    composition: composition.clone(),
                });
            }
        }
    }
    for reference in node.references {
        if !device_ids.contains(reference.id_ref()) {
            return Err(ValidationError::DanglingReference {
                device: device.to_string(),
                id_ref: reference.id_ref().to_string(),
            });
        }
    }
    for child in node.children() {
        check_links(&child, device, device_ids)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataItemCategory, Header};

    fn motor_axis() -> Component {
        Component::new("x1", "Linear")
            .with_composition(Composition::new("x1m", "MOTOR"))
            .with_data_item(
                DataItem::new("x1temp", "TEMPERATURE", DataItemCategory::Sample)
                    .with_composition("x1m"),
            )
    }

    fn device() -> Device {
        Device::new("d1", "VMC")
            .with_data_item(DataItem::new("avail", "AVAILABILITY", DataItemCategory::Event))
            .with_component(
                Component::new("axes", "Axes")
                    .with_component(motor_axis())
                    .with_reference(Reference::DataItem {
                        id_ref: "avail".to_string(),
                        name: None,
                    }),
            )
    }

    #[test]
    fn test_valid_device() {
        assert_eq!(validate_device(&device()), Ok(()));
    }

    #[test]
    fn test_empty_id() {
        let device = device().with_component(Component::new("", "Door"));
        assert_eq!(
            validate_device(&device),
            Err(ValidationError::EmptyId {
                element: "Component"
            })
        );
    }

    #[test]
    fn test_duplicate_id() {
        let device = device().with_data_item(DataItem::new("x1", "EXECUTION", DataItemCategory::Event));
        assert_eq!(
            validate_device(&device),
            Err(ValidationError::DuplicateId {
                id: "x1".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_across_devices() {
        let document = DevicesDocument::new(
            Header::new(),
            vec![device(), Device::new("d2", "Lathe").with_component(motor_axis())],
        );
        assert_eq!(
            validate_devices(&document),
            Err(ValidationError::DuplicateId {
                id: "x1".to_string()
            })
        );
        // Each device on its own is fine.
        assert!(document.devices.iter().all(|d| validate_device(d).is_ok()));
    }

    #[test]
    fn test_composition_must_belong_to_owner() {
        // The composition lives on x1, the data item on the device.
        let device = device().with_data_item(
            DataItem::new("dtemp", "TEMPERATURE", DataItemCategory::Sample).with_composition("x1m"),
        );
        assert_eq!(
            validate_device(&device),
            Err(ValidationError::UnknownComposition {
                data_item: "dtemp".to_string(),
                composition: "x1m".to_string(),
            })
        );
    }

    #[test]
    fn test_dangling_reference() {
        let device = device().with_component(Component::new("door", "Door").with_reference(
            Reference::Component {
                id_ref: "spindle".to_string(),
                name: None,
            },
        ));
        assert_eq!(
            validate_device(&device),
            Err(ValidationError::DanglingReference {
                device: "d1".to_string(),
                id_ref: "spindle".to_string(),
            })
        );
    }
}
