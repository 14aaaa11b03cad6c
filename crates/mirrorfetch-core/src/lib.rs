//! Multi-source download engine: mirror mapping, ordered fallback and bounded batch downloads.

pub mod config;
pub mod logging;

pub mod batch;
pub mod checksum;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod mirror;
pub mod settings;
pub mod sources;
pub mod storage;
pub mod task;
