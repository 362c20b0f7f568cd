//! Dynamic composition (§4.5): maps a device's reported abilities to a
//! `FeatureSet`, synthesized once per `(deviceType, hwVer, fwVer)` and
//! cached by the registry.

use std::collections::HashMap;

use serde_json::Value;

use crate::feature::FeatureHandler;
use crate::features::diffuser::{DiffuserLightHandler, DiffuserSprayHandler};
use crate::features::garage::GarageHandler;
use crate::features::generic::{GenericHandler, TimerHandler, TriggerHandler};
use crate::features::hub::{HubOnlineHandler, HubSensorSmokeHandler, HubSensorTempHumHandler};
use crate::features::light::LightHandler;
use crate::features::presence_sensor::PresenceSensorHandler;
use crate::features::roller::RollerHandler;
use crate::features::spray::SprayHandler;
use crate::features::thermostat::ThermostatHandler;
use crate::features::toggle::ToggleHandler;

/// Presence of this namespace in the device's abilities selects the Hub
/// base class (§4.5 "Hub detection").
pub const HUB_SUBDEVICE_LIST_NAMESPACE: &str = "Appliance.Hub.SubdeviceList";

pub fn is_hub(abilities: &HashMap<String, Value>) -> bool {
    abilities.contains_key(HUB_SUBDEVICE_LIST_NAMESPACE)
}

/// A composed, namespace-indexed set of feature handlers for one synthesized
/// class.
pub struct FeatureSet {
    handlers: Vec<Box<dyn FeatureHandler>>,
    by_namespace: HashMap<String, usize>,
    generic_index: usize,
}

impl FeatureSet {
    /// Resolve the handler bound to `namespace`, falling back to the
    /// catch-all `GenericHandler` for anything not in the composed set
    /// (§4.6 Dispatch: "Unknown namespaces become Generic").
    pub fn resolve(&self, namespace: &str) -> &dyn FeatureHandler {
        match self.by_namespace.get(namespace) {
            Some(&index) => self.handlers[index].as_ref(),
            None => self.handlers[self.generic_index].as_ref(),
        }
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.by_namespace.keys().map(String::as_str)
    }
}

/// Compose the feature set for a plain device (not a hub). Only handlers
/// whose namespace is actually present in `abilities` are bound; the
/// `ToggleX` vs `Toggle` pair resolves to whichever is listed first and
/// present (P6 "X wins", since each handler lists its `X` variant first).
pub fn compose_device(abilities: &HashMap<String, Value>) -> FeatureSet {
    let registry: Vec<Box<dyn FeatureHandler>> = vec![
        Box::new(ToggleHandler),
        Box::new(LightHandler),
        Box::new(ThermostatHandler),
        Box::new(RollerHandler),
        Box::new(GarageHandler),
        Box::new(DiffuserLightHandler),
        Box::new(DiffuserSprayHandler),
        Box::new(SprayHandler),
        Box::new(PresenceSensorHandler),
        Box::new(TimerHandler),
        Box::new(TriggerHandler),
    ];
    compose(registry, abilities)
}

/// Compose the feature set for a hub. These bind to the hub's own
/// abilities; sub-devices additionally filter via
/// `sub_device_allowed_namespaces`.
pub fn compose_hub(abilities: &HashMap<String, Value>) -> FeatureSet {
    let registry: Vec<Box<dyn FeatureHandler>> =
        vec![Box::new(HubOnlineHandler), Box::new(HubSensorTempHumHandler), Box::new(HubSensorSmokeHandler)];
    compose(registry, abilities)
}

fn compose(registry: Vec<Box<dyn FeatureHandler>>, abilities: &HashMap<String, Value>) -> FeatureSet {
    let mut handlers = Vec::new();
    let mut by_namespace = HashMap::new();

    for handler in registry {
        if let Some(resolved) = handler.candidate_namespaces().iter().find(|ns| abilities.contains_key(**ns)) {
            by_namespace.insert(resolved.to_string(), handlers.len());
            handlers.push(handler);
        }
    }

    let generic_index = handlers.len();
    handlers.push(Box::new(GenericHandler));
    FeatureSet { handlers, by_namespace, generic_index }
}

/// The fixed `subdeviceType → hub namespaces` table (§4.5 "SubDevice
/// abilities"). Matched by prefix since firmware variants append suffixes
/// (e.g. `ms100h`, `mts100v3`).
pub fn sub_device_allowed_namespaces(sub_device_type: &str) -> &'static [&'static str] {
    let t = sub_device_type.to_ascii_lowercase();
    if t.starts_with("ms100") {
        &["Appliance.Hub.Sensor.TempHum", "Appliance.Hub.Online"]
    } else if t.starts_with("ma151") {
        &["Appliance.Hub.Sensor.Smoke", "Appliance.Hub.Online"]
    } else if t.starts_with("mts100") {
        &["Appliance.Hub.Mts100.All", "Appliance.Hub.Mts100.Temperature", "Appliance.Hub.Mts100.Mode", "Appliance.Hub.Mts100.Adjust", "Appliance.Hub.Online"]
    } else {
        &["Appliance.Hub.Online"]
    }
}

/// Intersect the hub's abilities with the fixed table for `sub_device_type`,
/// producing the sub-device's own effective ability set.
pub fn filter_hub_abilities_for_sub_device(hub_abilities: &HashMap<String, Value>, sub_device_type: &str) -> Vec<String> {
    sub_device_allowed_namespaces(sub_device_type)
        .iter()
        .filter(|ns| hub_abilities.contains_key(**ns))
        .map(|ns| ns.to_string())
        .collect()
}
