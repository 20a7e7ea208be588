//! CLI command implementations

pub mod backup;
pub mod check;
pub mod completions;
pub mod config;
pub mod init;
pub mod item;
pub mod material;
pub mod report;
pub mod task;
