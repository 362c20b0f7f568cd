//! LAN HTTP transport (C4): direct device control on the local network,
//! bypassing the vendor cloud entirely.

pub mod client;
pub mod config;
pub mod error;

pub use client::LanClient;
pub use config::LanConfig;
pub use error::LanError;
