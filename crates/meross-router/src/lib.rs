//! Command router (C5): per-request transport selection, LAN→cloud
//! fallback, and per-device error budgeting (§4.4).

pub mod budget;
pub mod router;

pub use budget::ErrorBudget;
pub use router::{CommandRouter, RouterConfig, Target, TransportMode};
