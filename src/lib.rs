pub mod analytics;
pub mod config;
pub mod data;
pub mod report;
pub mod session;

/// Application name, used in log output.
pub const APP_NAME: &str = "track-eda";
