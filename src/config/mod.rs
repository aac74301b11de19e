//! Configuration management for tapedeck.
//!
//! Loads and saves application configuration from a TOML file in the user's
//! config directory.

pub mod file;

pub use file::{AudioConfig, CountdownConfig, TapedeckConfig};
