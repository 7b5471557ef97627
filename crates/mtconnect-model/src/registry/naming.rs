//! Observation element names ("shape names").
//!
//! An observation is written under `PascalCase(type) + suffix`, where the
//! suffix comes from its representation:
//!
//! ```text
//! AVAILABILITY,  VALUE        ->  Availability
//! VARIABLE,      DATA_SET     ->  VariableDataSet
//! PATH_FEEDRATE, TIME_SERIES  ->  PathFeedrateTimeSeries
//! x:FLUX_LEVEL,  VALUE        ->  x:FluxLevel
//! ```
//!
//! Types whose standard spelling keeps an acronym (`MTConnectVersion`,
//! `AmperageACTimeSeries`) carry it on their registration. Registered
//! names are indexed once per registry in both directions and always win;
//! the conversion above only names unregistered pairs.
//!
//! Both directions are memoized per registry because they run for every
//! observation written or read.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::limits::MAX_NAME_CACHE_ENTRIES;
use crate::model::{Observation, Representation};
use crate::registry::Family;

/// Converts an `UPPER_SNAKE` type to `PascalCase`, keeping a namespace
/// prefix. Words that already contain lowercase letters keep their casing.
pub fn pascal_case(type_id: &str) -> String {
    let (prefix, local) = split_prefix(type_id);
    let mut out = String::with_capacity(type_id.len());
    if let Some(prefix) = prefix {
        out.push_str(prefix);
        out.push(':');
    }
    for word in local.split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            if word.chars().any(|c| c.is_lowercase()) {
                out.push_str(chars.as_str());
            } else {
                out.extend(chars.flat_map(char::to_lowercase));
            }
        }
    }
    out
}

/// Converts a `PascalCase` name back to `UPPER_SNAKE`, keeping a namespace
/// prefix.
pub fn upper_snake_case(name: &str) -> String {
    let (prefix, local) = split_prefix(name);
    let mut out = String::with_capacity(name.len() + 4);
    if let Some(prefix) = prefix {
        out.push_str(prefix);
        out.push(':');
    }
    let chars: Vec<char> = local.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }
    out
}

/// Splits a representation suffix off an element name.
///
/// Names equal to a bare suffix (`Table`) are treated as value types.
pub fn split_element_suffix(name: &str) -> (&str, Representation) {
    for rep in [
        Representation::TimeSeries,
        Representation::DataSet,
        Representation::Table,
    ] {
        let suffix = rep.element_suffix();
        if let Some(base) = name.strip_suffix(suffix) {
            if !base.is_empty() && !base.ends_with(':') {
                return (base, rep);
            }
        }
    }
    (name, Representation::Value)
}

/// Computes the element name without memoization.
pub fn element_name(type_id: &str, representation: Representation) -> String {
    let mut name = pascal_case(type_id);
    name.push_str(representation.element_suffix());
    name
}

fn split_prefix(s: &str) -> (Option<&str>, &str) {
    match s.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, s),
    }
}

fn slot(representation: Representation) -> usize {
    representation as usize
}

type ForwardNames = [FxHashMap<Box<str>, Arc<str>>; Representation::ALL.len()];
type ReverseNames = FxHashMap<Box<str>, (Arc<str>, Representation)>;

/// Element names of the registered observation pairs.
#[derive(Debug, Default)]
struct RegisteredNames {
    forward: ForwardNames,
    reverse: ReverseNames,
}

impl RegisteredNames {
    fn build(observations: &Family<Observation>) -> Self {
        let mut bases: FxHashMap<&str, &str> = FxHashMap::default();
        for registration in observations.registrations() {
            if let Some(base) = registration.element_name {
                bases.entry(registration.type_id).or_insert(base);
            }
        }

        let mut names = RegisteredNames::default();
        for registration in observations.registrations() {
            let Some(rep) = registration.representation else {
                continue;
            };
            let name: Arc<str> = match bases.get(registration.type_id) {
                Some(base) => format!("{}{}", base, rep.element_suffix()).into(),
                None => element_name(registration.type_id, rep).into(),
            };
            names.forward[slot(rep)]
                .entry(registration.type_id.into())
                .or_insert_with(|| Arc::clone(&name));
            match names.reverse.get(&*name) {
                Some((other, _)) if &**other != registration.type_id => {
                    warn!(
                        element = %name,
                        type_id = registration.type_id,
                        taken_by = %other,
                        "element name registered twice; earlier registration takes precedence"
                    );
                }
                Some(_) => {}
                None => {
                    names
                        .reverse
                        .insert(Box::from(&*name), (registration.type_id.into(), rep));
                }
            }
        }
        debug!(names = names.reverse.len(), "built observation element name index");
        names
    }
}

/// Element names in both directions: registered names plus memo tables
/// for converted names.
#[derive(Debug, Default)]
pub(crate) struct ShapeNames {
    registered: OnceCell<RegisteredNames>,
    forward: RwLock<ForwardNames>,
    reverse: RwLock<ReverseNames>,
}

impl ShapeNames {
    fn registered(&self, observations: &Family<Observation>) -> &RegisteredNames {
        self.registered
            .get_or_init(|| RegisteredNames::build(observations))
    }

    pub(crate) fn element_name(
        &self,
        observations: &Family<Observation>,
        type_id: &str,
        representation: Representation,
    ) -> Arc<str> {
        if let Some(name) = self.registered(observations).forward[slot(representation)].get(type_id)
        {
            return Arc::clone(name);
        }
        if let Some(name) = self.forward.read()[slot(representation)].get(type_id) {
            return Arc::clone(name);
        }
        let name: Arc<str> = element_name(type_id, representation).into();
        let mut forward = self.forward.write();
        let table = &mut forward[slot(representation)];
        if table.len() < MAX_NAME_CACHE_ENTRIES {
            table.insert(type_id.into(), Arc::clone(&name));
        }
        name
    }

    /// Parses an element name into (type, representation): registered
    /// names exactly, anything else by suffix.
    pub(crate) fn parse(
        &self,
        observations: &Family<Observation>,
        element_name: &str,
    ) -> (Arc<str>, Representation) {
        if let Some((type_id, rep)) = self.registered(observations).reverse.get(element_name) {
            return (Arc::clone(type_id), *rep);
        }
        if let Some((type_id, rep)) = self.reverse.read().get(element_name) {
            return (Arc::clone(type_id), *rep);
        }
        let (base, rep) = split_element_suffix(element_name);
        let type_id: Arc<str> = upper_snake_case(base).into();
        let mut reverse = self.reverse.write();
        if reverse.len() < MAX_NAME_CACHE_ENTRIES {
            reverse.insert(element_name.into(), (Arc::clone(&type_id), rep));
        }
        (type_id, rep)
    }
}
