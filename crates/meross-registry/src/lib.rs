//! Device registry, dynamic feature composition, and per-channel state
//! (C6+C7, §4.5/§4.6).

pub mod ability;
pub mod device;
pub mod feature;
pub mod features;
pub mod registry;
pub mod state_store;
pub mod sub_device;

pub use ability::{is_hub, FeatureSet};
pub use device::Device;
pub use feature::FeatureHandler;
pub use registry::{DeviceFilter, DeviceIdentifier, DeviceSnapshot, Registry};
pub use state_store::{FeatureStateStore, Projection};
pub use sub_device::SubDevice;
