//! CLI library components for forest-meta.

pub mod config;
pub mod logging;
pub mod pipeline;
