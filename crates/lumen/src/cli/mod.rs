//! Command handlers for the `lumen` binary.

pub mod config;
pub mod operations;
pub mod process;
