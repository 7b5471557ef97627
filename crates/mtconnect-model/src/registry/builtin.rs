//! Built-in variant tables.
//!
//! Component and composition variants differ only in their type name. Data
//! item types additionally carry a default category and units, and list
//! the representations their observations are registered for beyond the
//! plain value. `as "Name"` sets the element name of a type whose standard
//! spelling is not the PascalCase form of its type.

use crate::model::{
    Component, Composition, DataItem, DataItemCategory, Device, Observation, Representation,
};
use crate::registry::Registration;

macro_rules! named_variants {
    ($(#[$meta:meta])* $name:ident: $ty:ty { $($type_id:literal),* $(,)? }) => {
        $(#[$meta])*
        pub static $name: &[Registration<$ty>] = &[
            $( Registration::new($type_id, || Ok(<$ty>::variant($type_id))), )*
        ];
    };
}

macro_rules! data_item_types {
    (@units) => { None };
    (@units $units:literal) => { Some($units) };
    ($(
        $type_id:literal $(as $element:literal)? => $category:ident $(($units:literal))? $([$($rep:ident),+])?;
    )*) => {
        /// Data item variants with their default category and units.
        pub static DATA_ITEM_VARIANTS: &[Registration<DataItem>] = &[
            $(
                Registration::new($type_id, || {
                    Ok(DataItem::variant(
                        $type_id,
                        DataItemCategory::$category,
                        data_item_types!(@units $($units)?),
                    ))
                })
                $(.with_element_name($element))?,
            )*
        ];

        /// Observation variants, one per registered (type, representation).
        pub static OBSERVATION_VARIANTS: &[Registration<Observation>] = &[
            $(
                Registration::new($type_id, || {
                    Ok(Observation::new($type_id, DataItemCategory::$category, Representation::Value))
                })
                .with_representation(Representation::Value)
                $(.with_element_name($element))?,
                $($(
                    Registration::new($type_id, || {
                        Ok(Observation::new($type_id, DataItemCategory::$category, Representation::$rep))
                    })
                    .with_representation(Representation::$rep),
                )+)?
            )*
        ];
    };
}

named_variants! {
    /// Top-level device variants.
    DEVICE_VARIANTS: Device { "Device", "Agent" }
}

named_variants! {
    /// Component variants by element name.
    COMPONENT_VARIANTS: Component {
        "Adapter", "Adapters", "Auxiliaries", "Axes", "Linear", "Rotary",
        "Controller", "Path", "Systems", "Electric", "Hydraulic", "Pneumatic",
        "Coolant", "Lubrication", "Enclosure", "Protective", "WorkEnvelope",
        "Door", "Actuator", "Chuck", "Stock", "Structures", "Structure",
        "Link", "Resources", "Materials", "Personnel", "Parts", "Process",
        "Interfaces", "BarFeederInterface", "MaterialHandlerInterface",
        "DoorInterface", "ChuckInterface", "Sensor", "Environmental",
        "Feeder", "Loader", "ToolingDelivery", "ToolMagazine",
        "AutomaticToolChanger", "Turret", "GangToolBar", "Spindle",
    }
}

named_variants! {
    /// Composition variants by type.
    COMPOSITION_VARIANTS: Composition {
        "ACTUATOR", "AMPLIFIER", "BALLSCREW", "BELT", "BRAKE", "CHAIN",
        "CHUCK", "CHUTE", "CIRCUIT_BREAKER", "CLAMP", "COMPRESSOR", "DOOR",
        "DRAIN", "ENCODER", "FAN", "FILTER", "GRIPPER", "HOPPER",
        "HYDRAULIC_CYLINDER", "LINEAR_POSITION_FEEDBACK", "MOTOR", "OIL",
        "POT", "POWER_SUPPLY", "PULLEY", "PUMP", "REEL", "SENSING_ELEMENT",
        "SPINDLE", "STORAGE_BATTERY", "SWITCH", "TABLE", "TANK", "TENSIONER",
        "TRANSFORMER", "VALVE", "VAT", "WATER", "WIRE", "WORKPIECE",
    }
}

data_item_types! {
    // Events
    "ACTIVE_AXES" => Event;
    "ALARM_LIMIT" => Event [DataSet];
    "ASSET_CHANGED" => Event;
    "ASSET_REMOVED" => Event;
    "AVAILABILITY" => Event;
    "AXIS_STATE" => Event;
    "BLOCK" => Event;
    "CHUCK_STATE" => Event;
    "COMPONENT_DATA" => Event [Table];
    "CONTROL_LIMIT" => Event [DataSet];
    "CONTROLLER_MODE" => Event;
    "DEVICE_ADDED" => Event;
    "DEVICE_CHANGED" => Event;
    "DEVICE_REMOVED" => Event;
    "DEVICE_UUID" => Event;
    "DOOR_STATE" => Event;
    "EMERGENCY_STOP" => Event;
    "EXECUTION" => Event;
    "FEATURE_MEASUREMENT" => Event [Table];
    "FUNCTIONAL_MODE" => Event;
    "LINE_NUMBER" => Event;
    "MESSAGE" => Event;
    "MTCONNECT_VERSION" as "MTConnectVersion" => Event;
    "OPERATOR_ID" => Event;
    "PALLET_ID" => Event;
    "PART_COUNT" => Event [DataSet];
    "PART_ID" => Event;
    "PROGRAM" => Event;
    "PROGRAM_HEADER" => Event;
    "ROTARY_MODE" => Event;
    "SPECIFICATION_LIMIT" => Event [DataSet];
    "TOOL_NUMBER" => Event;
    "TOOL_OFFSET" => Event [Table];
    "VARIABLE" => Event [DataSet];
    "WORK_OFFSET" => Event [Table];
    // Samples
    "ACCELERATION" => Sample ("MILLIMETER/SECOND^2") [TimeSeries];
    "AMPERAGE_AC" as "AmperageAC" => Sample ("AMPERE") [TimeSeries];
    "AMPERAGE_DC" as "AmperageDC" => Sample ("AMPERE") [TimeSeries];
    "ANGLE" => Sample ("DEGREE") [TimeSeries];
    "AXIS_FEEDRATE" => Sample ("MILLIMETER/SECOND") [TimeSeries];
    "CUTTING_SPEED" => Sample ("MILLIMETER/SECOND");
    "DISPLACEMENT" => Sample ("MILLIMETER") [TimeSeries];
    "ELECTRICAL_ENERGY" => Sample ("WATT_SECOND");
    "FLOW" => Sample ("LITER/SECOND");
    "FREQUENCY" => Sample ("HERTZ") [TimeSeries];
    "LOAD" => Sample ("PERCENT") [TimeSeries];
    "PATH_FEEDRATE" => Sample ("MILLIMETER/SECOND") [TimeSeries];
    "PATH_POSITION" => Sample ("MILLIMETER_3D");
    "POSITION" => Sample ("MILLIMETER") [TimeSeries];
    "PRESSURE" => Sample ("PASCAL") [TimeSeries];
    "ROTARY_VELOCITY" => Sample ("REVOLUTION/MINUTE") [TimeSeries];
    "SOUND_LEVEL" => Sample ("DECIBEL") [TimeSeries];
    "TEMPERATURE" => Sample ("CELSIUS") [TimeSeries];
    "VOLTAGE_AC" as "VoltageAC" => Sample ("VOLT") [TimeSeries];
    "VOLTAGE_DC" as "VoltageDC" => Sample ("VOLT") [TimeSeries];
    "WATTAGE" => Sample ("WATT") [TimeSeries];
    // Conditions
    "ACTUATOR" => Condition;
    "COMMUNICATIONS" => Condition;
    "DATA_RANGE" => Condition;
    "HARDWARE" => Condition;
    "LOGIC_PROGRAM" => Condition;
    "MOTION_PROGRAM" => Condition;
    "SYSTEM" => Condition;
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn assert_unique<T>(table: &[Registration<T>]) {
        let mut seen = HashSet::new();
        for registration in table {
            assert!(
                seen.insert((registration.type_id, registration.representation)),
                "duplicate registration {}",
                registration.type_id
            );
        }
    }

    #[test]
    fn test_builtin_tables_have_unique_keys() {
        assert_unique(DEVICE_VARIANTS);
        assert_unique(COMPONENT_VARIANTS);
        assert_unique(COMPOSITION_VARIANTS);
        assert_unique(DATA_ITEM_VARIANTS);
        assert_unique(OBSERVATION_VARIANTS);
    }

    #[test]
    fn test_every_constructor_succeeds() {
        for registration in COMPONENT_VARIANTS {
            let component = (registration.construct)().unwrap();
            assert_eq!(component.type_id, registration.type_id);
        }
        for registration in OBSERVATION_VARIANTS {
            let observation = (registration.construct)().unwrap();
            assert_eq!(observation.type_id(), registration.type_id);
            assert_eq!(Some(observation.representation()), registration.representation);
        }
    }

    #[test]
    fn test_data_item_defaults() {
        let find = |type_id: &str| {
            DATA_ITEM_VARIANTS
                .iter()
                .find(|r| r.type_id == type_id)
                .map(|r| (r.construct)().unwrap())
                .unwrap()
        };
        let temperature = find("TEMPERATURE");
        assert_eq!(temperature.category, DataItemCategory::Sample);
        assert_eq!(temperature.units.as_deref(), Some("CELSIUS"));

        let system = find("SYSTEM");
        assert_eq!(system.category, DataItemCategory::Condition);
        assert_eq!(system.units, None);
    }

    #[test]
    fn test_acronym_element_names() {
        let named: Vec<_> = OBSERVATION_VARIANTS
            .iter()
            .filter_map(|r| r.element_name.map(|name| (r.type_id, name)))
            .collect();
        assert!(named.contains(&("MTCONNECT_VERSION", "MTConnectVersion")));
        assert!(named.contains(&("AMPERAGE_AC", "AmperageAC")));
        // Only the value registration carries the name.
        assert_eq!(named.iter().filter(|(t, _)| *t == "AMPERAGE_AC").count(), 1);
    }

    #[test]
    fn test_every_data_item_has_a_value_observation() {
        let observed: HashSet<_> = OBSERVATION_VARIANTS
            .iter()
            .filter(|r| r.representation == Some(Representation::Value))
            .map(|r| r.type_id)
            .collect();
        for registration in DATA_ITEM_VARIANTS {
            assert!(observed.contains(registration.type_id));
        }
    }
}
