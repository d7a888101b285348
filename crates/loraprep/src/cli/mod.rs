//! CLI command implementations.

pub mod caption;
pub mod config;
pub mod package;
pub mod progress;
pub mod refine;
pub mod resize;
