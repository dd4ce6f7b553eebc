//! uidsync CLI library
//!
//! Exposes the binary's modules for integration testing.

pub mod commands;
pub mod console;
pub mod error;
pub mod logging;
pub mod preflight;
pub mod settings;
