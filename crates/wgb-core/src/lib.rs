//! Core domain + application logic for the WhatsApp group bot.
//!
//! This crate is intentionally transport-agnostic. The WhatsApp sidecar and
//! the HTTP preview fetcher live behind ports (traits) implemented in adapter
//! crates.

pub mod broadcast;
pub mod config;
pub mod domain;
pub mod errors;
pub mod guard;
pub mod logging;
pub mod messaging;
pub mod preview;
pub mod router;
pub mod store;

pub use errors::{Error, Result};
