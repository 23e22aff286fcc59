//! Shared types for tinypaste: JSON bodies of the HTTP API and the
//! domain views the paste service hands to handlers.

pub mod api;
pub mod models;
