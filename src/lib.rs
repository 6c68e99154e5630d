//! Startup core of the authentication service.
//!
//! [`bootstrap::BootstrapGate`] merges remote secrets into configuration once;
//! [`resources`] builds downstream clients lazily from the resulting snapshot;
//! [`mail`] keeps the remote email templates in sync and sends through them.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod resources;
pub mod secrets;
pub mod server;

pub use error::{Error, Result};
