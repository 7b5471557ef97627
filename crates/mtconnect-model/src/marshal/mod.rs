//! Polymorphic collection marshalling.
//!
//! Lists of polymorphic nodes are written with one element per item, named
//! by the item's discriminator (or carrying it in a `type` attribute, per
//! family). Reading inverts this: each child's discriminator selects the
//! registered variant, the element is read into the base shape, and the
//! base fields are moved onto the concrete instance. Children whose
//! discriminator is not registered keep the base shape under their
//! original name.

pub mod devices;
pub mod streams;

use tracing::{debug, trace};

use crate::document::{Element, HASH_ATTRIBUTE};
use crate::error::DocumentError;
use crate::model::{DataItemCategory, Representation};
use crate::options::{ReadOptions, WriteOptions};
use crate::registry::{TypeRegistry, Variant};

pub use devices::{
    devices_from_element, devices_to_element, read_devices_document, write_devices_document,
};
pub use streams::{
    read_streams_document, streams_from_element, streams_to_element, write_streams_document,
};

/// State threaded through a read.
#[derive(Debug, Clone, Copy)]
pub struct ReadContext<'r> {
    pub registry: &'r TypeRegistry,
    pub options: ReadOptions,
    /// Category of the observation container being read, if any.
    pub category: Option<DataItemCategory>,
    depth: usize,
}

impl<'r> ReadContext<'r> {
    pub fn new(registry: &'r TypeRegistry, options: ReadOptions) -> Self {
        Self {
            registry,
            options,
            category: None,
            depth: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for one level of nesting deeper.
    pub fn descend(&self) -> Result<Self, DocumentError> {
        let depth = self.depth + 1;
        if depth > self.options.max_depth {
            return Err(DocumentError::DepthExceeded {
                max: self.options.max_depth,
            });
        }
        Ok(Self { depth, ..*self })
    }

    pub fn with_category(&self, category: DataItemCategory) -> Self {
        Self {
            category: Some(category),
            ..*self
        }
    }
}

/// State threaded through a write.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'r> {
    pub registry: &'r TypeRegistry,
    pub options: &'r WriteOptions,
}

impl<'r> WriteContext<'r> {
    pub fn new(registry: &'r TypeRegistry, options: &'r WriteOptions) -> Self {
        Self { registry, options }
    }

    /// Adds the change-detection hash when enabled.
    pub(crate) fn finish_node(&self, mut element: Element) -> Element {
        if self.options.include_hashes {
            let hash = element.content_hash();
            element.set_attr(HASH_ATTRIBUTE, hash);
        }
        element
    }
}

/// A node family that can be written to and read from elements.
pub trait Marshal: Variant {
    /// The discriminator (and representation, for observations) of an item
    /// element, or `None` if the element does not name one.
    fn discriminator(
        element: &Element,
        ctx: &ReadContext<'_>,
    ) -> Option<(String, Option<Representation>)>;

    /// Reads the element into the family's base shape.
    fn read_base(
        element: &Element,
        discriminator: &str,
        representation: Option<Representation>,
        ctx: &ReadContext<'_>,
    ) -> Result<Self, DocumentError>;

    /// Moves the base fields onto the concrete instance.
    fn adopt(concrete: Self, base: Self) -> Self;

    /// Called on the base shape when no variant is registered.
    fn degrade(base: Self, _element: &Element) -> Self {
        base
    }

    fn to_element(&self, ctx: &WriteContext<'_>) -> Element;
}

/// Writes `items` as children of a container element.
pub fn write_collection<T: Marshal>(
    container: &str,
    items: &[T],
    ctx: &WriteContext<'_>,
) -> Element {
    let mut element = Element::new(container);
    element.children = items.iter().map(|item| item.to_element(ctx)).collect();
    element
}

/// Reads every child of a container element.
///
/// Children without a discriminator are skipped.
pub fn read_collection<T: Marshal>(
    container: &Element,
    ctx: &ReadContext<'_>,
) -> Result<Vec<T>, DocumentError> {
    let ctx = ctx.descend()?;
    let mut items = Vec::with_capacity(container.children.len());
    for child in &container.children {
        if let Some(item) = read_item::<T>(child, &ctx)? {
            items.push(item);
        }
    }
    Ok(items)
}

/// Reads a single item element.
pub fn read_item<T: Marshal>(
    element: &Element,
    ctx: &ReadContext<'_>,
) -> Result<Option<T>, DocumentError> {
    let Some((discriminator, representation)) = T::discriminator(element, ctx) else {
        debug!(
            capability = %T::CAPABILITY,
            element = %element.name,
            "element carries no discriminator; skipped"
        );
        return Ok(None);
    };
    if discriminator.is_empty() {
        debug!(
            capability = %T::CAPABILITY,
            element = %element.name,
            "element carries an empty discriminator; skipped"
        );
        return Ok(None);
    }

    let base = T::read_base(element, &discriminator, representation, ctx)?;
    let concrete: T = ctx.registry.create(&discriminator, representation)?;
    if concrete.resolution().is_registered() {
        trace!(capability = %T::CAPABILITY, %discriminator, "resolved variant");
        Ok(Some(T::adopt(concrete, base)))
    } else {
        debug!(
            capability = %T::CAPABILITY,
            %discriminator,
            element = %element.name,
            "unregistered element; keeping base shape"
        );
        Ok(Some(T::degrade(base, element)))
    }
}

/// Parses an optional attribute, dropping values that do not parse.
pub(crate) fn parse_attr<T: std::str::FromStr>(element: &Element, key: &str) -> Option<T> {
    let raw = element.attr(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(element = %element.name, attribute = key, value = raw, "unparsable attribute ignored");
            None
        }
    }
}

pub(crate) fn string_attr(element: &Element, key: &str) -> Option<String> {
    element.attr(key).map(str::to_string)
}
