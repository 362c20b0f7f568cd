//! Signed HTTP client for the Meross vendor REST API (C2).

pub mod client;
pub mod config;
pub mod error;

pub use client::MerossHttpClient;
pub use config::HttpConfig;
pub use error::HttpError;
