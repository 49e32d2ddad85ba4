//! Strata Services Layer
//!
//! Host-side services around the storage core: settings for now.

pub mod settings;

pub use settings::{DemoSettings, LoggingSettings, Settings, SettingsError};
