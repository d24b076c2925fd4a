// Wiring
pub mod app;
// Remote catalog
pub mod catalog;
pub mod config;
// Package download and install
pub mod downloads;
pub mod error;
pub mod observable;
// Unified path management
pub mod paths;
// Current translation and position
pub mod reading;
pub mod settings;
// Data storage
pub mod storage;
pub mod translations;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
