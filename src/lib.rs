//! Client for Miniconf settings trees exposed over MQTT v5.
//!
//! A device at topic prefix `{prefix}` serves its settings on
//! `{prefix}/settings/...` and answers on the response topic given with each
//! request, echoing the request's correlation data. Multi-part answers carry
//! the status `Continue` until a terminal `Ok` or error status.
//!
//! - [`Client`] issues get/set/clear/list/dump requests and matches the
//!   responses to them, any number of requests in flight at once
//! - [`DiscoveryService`] finds devices through their `{prefix}/alive` beacons
//! - [`CommandSession`] runs `PATH`, `PATH=VALUE`, `PATH=`, `PATH?`, `PATH!`
//!   command sequences with relative paths
//!
//! The MQTT connection itself is abstracted by [`Transport`];
//! [`MemoryBroker`] provides an in-process implementation.
//!
//! The crate logs through `tracing` and installs no subscriber.

mod client;
mod config;
mod core;
mod discovery;
mod errors;
mod session;
mod transport;
mod utils;

pub mod constants;

pub use crate::config::*;
pub use crate::core::*;

pub use client::*;
pub use discovery::*;
pub use errors::*;
pub use session::*;
pub use transport::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
mod test_utils;
