//! evharvest library: event extraction, the three-directory event store and
//! the harvest orchestration that ties them together.

pub mod config;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod models;
pub mod render;
pub mod report;
pub mod storage;

pub use error::{HarvestError, Result};
