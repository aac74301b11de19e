//! Application command handlers for tapedeck.
//!
//! # Commands
//! - `record`: countdown, record with live waveform, stop
//! - `config`: open configuration file in user's preferred editor
//! - `list_devices`: list available audio input devices
//! - `logs`: display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod record;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::handle_record;
