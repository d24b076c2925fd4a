/**
 * Paths Module
 *
 * Unified path management for the core.
 * The database and downloaded packages all live under one data directory.
 */
mod app_dirs;

pub use app_dirs::*;
