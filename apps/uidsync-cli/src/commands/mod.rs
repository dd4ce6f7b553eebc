//! Subcommand implementations.

pub mod check;
pub mod profile;
pub mod sync;
