//! Price download plumbing for the CLI.
//!
//! The quote cache location and the sequential Yahoo fetch of every ticker
//! that was ever an index member.

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
