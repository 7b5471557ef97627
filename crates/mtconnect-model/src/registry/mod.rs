//! Runtime type resolution.
//!
//! Documents name their node types with plain strings: a component element
//! is called `Linear`, a data item carries `type="POSITION"`, an observation
//! is written as `PositionTimeSeries`. The registry maps such a
//! discriminator (plus a representation, for observations) to a
//! constructor for the matching variant.
//!
//! Each capability has its own [`Family`] of registration tables. A family
//! builds its lookup index lazily on first use and never changes it
//! afterwards, so a built registry is safe to share between threads.
//! Lookups that find nothing degrade to a generic fallback node carrying
//! the requested discriminator.

mod builtin;
pub mod naming;

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::{RegistryError, VariantError};
use crate::model::{Component, Composition, DataItem, Device, Observation, Representation};

pub use builtin::{
    COMPONENT_VARIANTS, COMPOSITION_VARIANTS, DATA_ITEM_VARIANTS, DEVICE_VARIANTS,
    OBSERVATION_VARIANTS,
};

use naming::ShapeNames;

/// The kinds of nodes the registry can construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Device,
    Component,
    Composition,
    DataItem,
    Observation,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Device => "device",
            Capability::Component => "component",
            Capability::Composition => "composition",
            Capability::DataItem => "data item",
            Capability::Observation => "observation",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered variant: its discriminator, an optional representation key
/// and its constructor.
pub struct Registration<T> {
    pub type_id: &'static str,
    pub representation: Option<Representation>,
    /// Abstract variants document a type family but are never instantiated.
    pub is_abstract: bool,
    /// Element name of the type where the standard spelling differs from
    /// the PascalCase form (`MTConnectVersion`, `AmperageAC`). Observation
    /// elements append the representation suffix to it.
    pub element_name: Option<&'static str>,
    pub construct: fn() -> Result<T, VariantError>,
}

impl<T> Registration<T> {
    pub const fn new(type_id: &'static str, construct: fn() -> Result<T, VariantError>) -> Self {
        Self {
            type_id,
            representation: None,
            is_abstract: false,
            element_name: None,
            construct,
        }
    }

    pub const fn with_representation(self, representation: Representation) -> Self {
        Self {
            type_id: self.type_id,
            representation: Some(representation),
            ..self
        }
    }

    pub const fn abstract_variant(self) -> Self {
        Self {
            type_id: self.type_id,
            is_abstract: true,
            ..self
        }
    }

    pub const fn with_element_name(self, element_name: &'static str) -> Self {
        Self {
            element_name: Some(element_name),
            ..self
        }
    }

    fn index_key(&self) -> String {
        index_key(self.type_id, self.representation)
    }
}

impl<T> Clone for Registration<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Registration<T> {}

impl<T> fmt::Debug for Registration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("type_id", &self.type_id)
            .field("representation", &self.representation)
            .field("is_abstract", &self.is_abstract)
            .field("element_name", &self.element_name)
            .finish()
    }
}

fn index_key(type_id: &str, representation: Option<Representation>) -> String {
    match representation {
        Some(rep) => format!("{}:{}", type_id, rep.as_str()),
        None => type_id.to_string(),
    }
}

/// How a node was produced: by a registered variant or as a fallback.
pub enum Resolution<T: 'static> {
    Registered(&'static Registration<T>),
    Fallback,
}

impl<T: 'static> Resolution<T> {
    pub fn is_registered(&self) -> bool {
        matches!(self, Resolution::Registered(_))
    }

    pub fn registration(&self) -> Option<&'static Registration<T>> {
        match self {
            Resolution::Registered(registration) => Some(*registration),
            Resolution::Fallback => None,
        }
    }
}

impl<T: 'static> Clone for Resolution<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for Resolution<T> {}

impl<T: 'static> PartialEq for Resolution<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Resolution::Registered(a), Resolution::Registered(b)) => {
                a.type_id == b.type_id && a.representation == b.representation
            }
            (Resolution::Fallback, Resolution::Fallback) => true,
            _ => false,
        }
    }
}

impl<T: 'static> Eq for Resolution<T> {}

impl<T: 'static> fmt::Debug for Resolution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Registered(registration) => f
                .debug_tuple("Registered")
                .field(&index_key(registration.type_id, registration.representation))
                .finish(),
            Resolution::Fallback => f.write_str("Fallback"),
        }
    }
}

/// A node type the registry can construct.
pub trait Variant: Sized + 'static {
    const CAPABILITY: Capability;
    /// Whether lookups include the representation in the key.
    const KEYED_BY_REPRESENTATION: bool = false;

    fn family(registry: &TypeRegistry) -> &Family<Self>;

    /// Builds the generic node used when no variant matches.
    fn fallback(discriminator: &str, representation: Option<Representation>) -> Self;

    fn resolution(&self) -> Resolution<Self>;

    fn set_resolution(&mut self, resolution: Resolution<Self>);
}

type VariantIndex<T> = FxHashMap<String, Vec<&'static Registration<T>>>;

/// The registration tables of one capability and their lazily built index.
pub struct Family<T: 'static> {
    tables: Vec<&'static [Registration<T>]>,
    index: OnceCell<VariantIndex<T>>,
}

impl<T: Variant> Family<T> {
    fn new(tables: Vec<&'static [Registration<T>]>) -> Self {
        Self {
            tables,
            index: OnceCell::new(),
        }
    }

    fn index(&self) -> &VariantIndex<T> {
        self.index.get_or_init(|| self.build_index())
    }

    fn build_index(&self) -> VariantIndex<T> {
        let mut index: VariantIndex<T> = FxHashMap::default();
        let mut skipped = 0usize;
        for registration in self.tables.iter().copied().flat_map(|table| table.iter()) {
            if registration.is_abstract {
                skipped += 1;
                continue;
            }
            let candidates = index.entry(registration.index_key()).or_default();
            if !candidates.is_empty() {
                warn!(
                    capability = %T::CAPABILITY,
                    key = %registration.index_key(),
                    "duplicate variant registration; earlier registration takes precedence"
                );
            }
            candidates.push(registration);
        }
        debug!(
            capability = %T::CAPABILITY,
            variants = index.len(),
            skipped_abstract = skipped,
            "built variant index"
        );
        index
    }

    /// All instantiable registrations, first candidate per key, in table
    /// order.
    pub fn registrations(&self) -> impl Iterator<Item = &'static Registration<T>> + '_ {
        let index = self.index();
        self.tables
            .iter()
            .copied()
            .flat_map(|table| table.iter())
            .filter(move |registration| {
                !registration.is_abstract
                    && index
                        .get(&registration.index_key())
                        .and_then(|candidates| candidates.first())
                        .is_some_and(|first| std::ptr::eq(*first, *registration))
            })
    }

    pub fn len(&self) -> usize {
        self.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index().is_empty()
    }
}

impl<T: 'static> fmt::Debug for Family<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("tables", &self.tables.len())
            .field("indexed", &self.index.get().is_some())
            .finish()
    }
}

/// Candidates registered under one key, in registration order.
#[derive(Debug)]
pub struct VariantHandle<'r, T: 'static> {
    candidates: &'r [&'static Registration<T>],
}

impl<'r, T: Variant> VariantHandle<'r, T> {
    /// The registration that takes precedence.
    pub fn primary(&self) -> &'static Registration<T> {
        self.candidates[0]
    }

    pub fn candidates(&self) -> &'r [&'static Registration<T>] {
        self.candidates
    }

    /// Runs the constructors in order and returns the first success.
    pub fn instantiate(&self) -> Option<T> {
        for &registration in self.candidates {
            match (registration.construct)() {
                Ok(mut value) => {
                    value.set_resolution(Resolution::Registered(registration));
                    return Some(value);
                }
                Err(err) => {
                    warn!(
                        capability = %T::CAPABILITY,
                        type_id = registration.type_id,
                        error = %err,
                        "variant constructor failed; trying next candidate"
                    );
                }
            }
        }
        None
    }
}

/// Maps discriminators to node constructors for every capability.
#[derive(Debug)]
pub struct TypeRegistry {
    pub(crate) devices: Family<Device>,
    pub(crate) components: Family<Component>,
    pub(crate) compositions: Family<Composition>,
    pub(crate) data_items: Family<DataItem>,
    pub(crate) observations: Family<Observation>,
    names: ShapeNames,
}

lazy_static! {
    static ref GLOBAL_REGISTRY: TypeRegistry = TypeRegistry::builtin();
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// A registry holding only the built-in vocabulary.
    pub fn builtin() -> Self {
        Self::builder().with_builtin().build()
    }

    /// The shared built-in registry.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn family<T: Variant>(&self) -> &Family<T> {
        T::family(self)
    }

    /// Looks up the variants registered for a discriminator.
    ///
    /// The representation is ignored for capabilities that are not keyed by
    /// it.
    pub fn resolve<T: Variant>(
        &self,
        discriminator: &str,
        representation: Option<Representation>,
    ) -> Option<VariantHandle<'_, T>> {
        let representation = if T::KEYED_BY_REPRESENTATION {
            representation.map(Representation::observed)
        } else {
            None
        };
        let key = index_key(discriminator, representation);
        let candidates = T::family(self).index().get(&key)?;
        (!candidates.is_empty()).then_some(VariantHandle {
            candidates: candidates.as_slice(),
        })
    }

    /// Constructs the variant for a discriminator, degrading to the
    /// capability's fallback node when nothing matches or every constructor
    /// fails.
    pub fn create<T: Variant>(
        &self,
        discriminator: &str,
        representation: Option<Representation>,
    ) -> Result<T, RegistryError> {
        if discriminator.is_empty() {
            return Err(RegistryError::EmptyDiscriminator {
                capability: T::CAPABILITY,
            });
        }
        if let Some(value) = self
            .resolve::<T>(discriminator, representation)
            .and_then(|handle| handle.instantiate())
        {
            return Ok(value);
        }
        trace!(
            capability = %T::CAPABILITY,
            discriminator,
            "no registered variant; using fallback"
        );
        let representation = if T::KEYED_BY_REPRESENTATION {
            representation.map(Representation::observed)
        } else {
            representation
        };
        let mut value = T::fallback(discriminator, representation);
        value.set_resolution(Resolution::Fallback);
        Ok(value)
    }

    pub fn create_device(&self, type_id: &str) -> Result<Device, RegistryError> {
        self.create(type_id, None)
    }

    pub fn create_component(&self, type_id: &str) -> Result<Component, RegistryError> {
        self.create(type_id, None)
    }

    pub fn create_composition(&self, type_id: &str) -> Result<Composition, RegistryError> {
        self.create(type_id, None)
    }

    pub fn create_data_item(&self, type_id: &str) -> Result<DataItem, RegistryError> {
        self.create(type_id, None)
    }

    pub fn create_observation(
        &self,
        type_id: &str,
        representation: Representation,
    ) -> Result<Observation, RegistryError> {
        self.create(type_id, Some(representation))
    }

    /// True if an observation variant is registered for the pair.
    pub fn is_registered_observation(&self, type_id: &str, representation: Representation) -> bool {
        self.resolve::<Observation>(type_id, Some(representation))
            .is_some()
    }

    /// Element name for an observation type and representation.
    ///
    /// Registered pairs use their registered spelling; anything else is
    /// derived from the type by PascalCase conversion.
    pub fn observation_element_name(
        &self,
        type_id: &str,
        representation: Representation,
    ) -> Arc<str> {
        self.names
            .element_name(&self.observations, type_id, representation.observed())
    }

    /// Recovers (type, representation) from an observation element name.
    ///
    /// Element names of registered pairs are matched exactly, which also
    /// covers types whose own name ends in a suffix word (a value type named
    /// `..._TABLE`). Other names are split by suffix.
    pub fn parse_observation_element(&self, element_name: &str) -> (Arc<str>, Representation) {
        self.names.parse(&self.observations, element_name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Assembles a registry from registration tables.
///
/// Tables are consulted in the order they are added; on duplicate keys the
/// earliest registration takes precedence.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    devices: Vec<&'static [Registration<Device>]>,
    components: Vec<&'static [Registration<Component>]>,
    compositions: Vec<&'static [Registration<Composition>]>,
    data_items: Vec<&'static [Registration<DataItem>]>,
    observations: Vec<&'static [Registration<Observation>]>,
}

impl TypeRegistryBuilder {
    pub fn with_builtin(self) -> Self {
        self.devices(DEVICE_VARIANTS)
            .components(COMPONENT_VARIANTS)
            .compositions(COMPOSITION_VARIANTS)
            .data_items(DATA_ITEM_VARIANTS)
            .observations(OBSERVATION_VARIANTS)
    }

    pub fn devices(mut self, table: &'static [Registration<Device>]) -> Self {
        self.devices.push(table);
        self
    }

    pub fn components(mut self, table: &'static [Registration<Component>]) -> Self {
        self.components.push(table);
        self
    }

    pub fn compositions(mut self, table: &'static [Registration<Composition>]) -> Self {
        self.compositions.push(table);
        self
    }

    pub fn data_items(mut self, table: &'static [Registration<DataItem>]) -> Self {
        self.data_items.push(table);
        self
    }

    pub fn observations(mut self, table: &'static [Registration<Observation>]) -> Self {
        self.observations.push(table);
        self
    }

    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            devices: Family::new(self.devices),
            components: Family::new(self.components),
            compositions: Family::new(self.compositions),
            data_items: Family::new(self.data_items),
            observations: Family::new(self.observations),
            names: ShapeNames::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataItemCategory;

    static EXTRA_COMPONENTS: &[Registration<Component>] = &[
        Registration::new("Linear", || Ok(Component::variant("Linear"))),
        Registration::new("Gantry", || Ok(Component::variant("Gantry"))),
        Registration::new("Frame", || Ok(Component::variant("Frame"))).abstract_variant(),
        Registration::new("Broken", || Err(VariantError::new("Broken", "not constructible"))),
        Registration::new("Broken", || Ok(Component::variant("Broken"))),
    ];

    #[test]
    fn test_resolves_builtin_variants() {
        let registry = TypeRegistry::global();
        let linear = registry.create_component("Linear").unwrap();
        assert_eq!(linear.type_id, "Linear");
        assert!(linear.resolution.is_registered());

        let motor = registry.create_composition("MOTOR").unwrap();
        assert!(motor.resolution.is_registered());

        let position = registry.create_data_item("POSITION").unwrap();
        assert_eq!(position.category, DataItemCategory::Sample);
        assert_eq!(position.units.as_deref(), Some("MILLIMETER"));
    }

    #[test]
    fn test_unknown_discriminator_falls_back() {
        let registry = TypeRegistry::global();
        let widget = registry.create_component("Widget").unwrap();
        assert_eq!(widget.type_id, "Widget");
        assert_eq!(widget.resolution, Resolution::Fallback);
    }

    #[test]
    fn test_empty_discriminator_is_an_error() {
        let registry = TypeRegistry::global();
        assert_eq!(
            registry.create_component(""),
            Err(RegistryError::EmptyDiscriminator {
                capability: Capability::Component
            })
        );
    }

    #[test]
    fn test_observations_are_keyed_by_representation() {
        let registry = TypeRegistry::global();
        assert!(registry.is_registered_observation("VARIABLE", Representation::DataSet));
        assert!(!registry.is_registered_observation("AVAILABILITY", Representation::Table));

        // The representation of a fallback is preserved.
        let odd = registry
            .create_observation("AVAILABILITY", Representation::Table)
            .unwrap();
        assert_eq!(odd.resolution(), Resolution::Fallback);
        assert_eq!(odd.representation(), Representation::Table);
    }

    #[test]
    fn test_representation_ignored_for_unkeyed_capabilities() {
        let registry = TypeRegistry::global();
        assert!(registry
            .resolve::<Component>("Linear", Some(Representation::DataSet))
            .is_some());
    }

    #[test]
    fn test_first_registration_wins_and_abstract_is_skipped() {
        let registry = TypeRegistry::builder()
            .components(EXTRA_COMPONENTS)
            .with_builtin()
            .build();

        let handle = registry.resolve::<Component>("Linear", None).unwrap();
        assert_eq!(handle.candidates().len(), 2);
        assert!(std::ptr::eq(handle.primary(), &EXTRA_COMPONENTS[0]));

        let gantry = registry.create_component("Gantry").unwrap();
        assert!(gantry.resolution.is_registered());

        assert!(registry.resolve::<Component>("Frame", None).is_none());
        let frame = registry.create_component("Frame").unwrap();
        assert_eq!(frame.resolution, Resolution::Fallback);
    }

    #[test]
    fn test_failed_constructor_falls_through_to_next_candidate() {
        let registry = TypeRegistry::builder().components(EXTRA_COMPONENTS).build();
        let broken = registry.create_component("Broken").unwrap();
        let registration = broken.resolution.registration().unwrap();
        assert!(std::ptr::eq(registration, &EXTRA_COMPONENTS[4]));
    }

    #[test]
    fn test_registrations_lists_each_key_once() {
        let registry = TypeRegistry::builder()
            .components(EXTRA_COMPONENTS)
            .components(EXTRA_COMPONENTS)
            .build();
        let names: Vec<&str> = registry
            .family::<Component>()
            .registrations()
            .map(|r| r.type_id)
            .collect();
        assert_eq!(names, ["Linear", "Gantry", "Broken"]);
        assert_eq!(registry.family::<Component>().len(), 3);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let registry = TypeRegistry::builtin();
        let a = registry.resolve::<DataItem>("POSITION", None).unwrap().primary();
        let b = registry.resolve::<DataItem>("POSITION", None).unwrap().primary();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_concurrent_first_lookup() {
        let registry = TypeRegistry::builtin();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let item = registry.create_data_item("TEMPERATURE").unwrap();
                        assert!(item.resolution.is_registered());
                        let name =
                            registry.observation_element_name("TEMPERATURE", Representation::TimeSeries);
                        assert_eq!(&*name, "TemperatureTimeSeries");
                    }
                });
            }
        });
    }

    #[test]
    fn test_parse_observation_element() {
        let registry = TypeRegistry::global();
        let (type_id, rep) = registry.parse_observation_element("VariableDataSet");
        assert_eq!((&*type_id, rep), ("VARIABLE", Representation::DataSet));

        let (type_id, rep) = registry.parse_observation_element("x:FluxLevel");
        assert_eq!((&*type_id, rep), ("x:FLUX_LEVEL", Representation::Value));
    }

    #[test]
    fn test_acronym_element_names_resolve() {
        let registry = TypeRegistry::global();
        for (element, type_id, rep) in [
            ("MTConnectVersion", "MTCONNECT_VERSION", Representation::Value),
            ("AmperageAC", "AMPERAGE_AC", Representation::Value),
            ("AmperageACTimeSeries", "AMPERAGE_AC", Representation::TimeSeries),
            ("VoltageDC", "VOLTAGE_DC", Representation::Value),
        ] {
            let parsed = registry.parse_observation_element(element);
            assert_eq!((&*parsed.0, parsed.1), (type_id, rep));
            assert!(registry.is_registered_observation(type_id, rep));
            assert_eq!(&*registry.observation_element_name(type_id, rep), element);
        }
    }

    #[test]
    fn test_discrete_observations_use_the_value_variant() {
        let registry = TypeRegistry::global();
        let observation = registry
            .create_observation("AVAILABILITY", Representation::Discrete)
            .unwrap();
        assert!(observation.resolution().is_registered());
        assert_eq!(observation.representation(), Representation::Value);
        assert!(registry.is_registered_observation("AVAILABILITY", Representation::Discrete));
        assert_eq!(
            &*registry.observation_element_name("AVAILABILITY", Representation::Discrete),
            "Availability"
        );

        let fallback = registry
            .create_observation("x:DOOR_COUNT", Representation::Discrete)
            .unwrap();
        assert_eq!(fallback.resolution(), Resolution::Fallback);
        assert_eq!(fallback.representation(), Representation::Value);
    }
}
