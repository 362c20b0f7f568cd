//! Concrete `FeatureHandler` implementations, one module per ability
//! family (§4.5).

pub mod diffuser;
pub mod garage;
pub mod generic;
pub mod hub;
pub mod light;
pub mod presence_sensor;
pub mod roller;
pub mod spray;
pub mod thermostat;
pub mod toggle;
