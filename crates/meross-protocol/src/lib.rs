//! Shared wire types, crypto, and the stable error-kind taxonomy for the
//! meross-core workspace.
//!
//! Every other crate in the workspace depends on this one; it has no
//! dependency on any sibling crate, so it can be used standalone to encode
//! or decode the Meross wire format without a live session.

pub mod change;
pub mod credentials;
pub mod crypto;
pub mod device;
pub mod envelope;
pub mod error;
pub mod pending;
pub mod push;
pub mod topics;
pub mod util;

pub use change::{Change, ChangeSource};
pub use credentials::Credentials;
pub use device::{ChannelInfo, DeviceDescriptor, OnlineStatus, SubDeviceDescriptor};
pub use envelope::{Envelope, Header, Method};
pub use error::{ErrorContext, ErrorKind, MerossError, MerossResult};
pub use pending::{PendingRequest, Reply, Transport};
pub use push::{PushNotification, PushPayload};
