//! HTTP surface for agents and dashboards
//!
//! Agents post usage increments and read back their next interval; humans
//! and scripts read the JSON status view.

mod api;
mod server;

pub use api::ApiState;
pub use server::{build_router, WebServer};
