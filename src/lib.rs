//! wkshop: a workshop ledger
//!
//! Tracks the items a workshop produces (materials, work materials and
//! production steps) and the tasks ordered from it, in a single JSON
//! document with rotating numbered backups.

pub mod cli;
pub mod core;
pub mod entities;
pub mod json;
