//! Resumable, resource-aware bulk downloader for sky-survey image cutouts.

pub mod checkpoint;
pub mod config;
pub mod failure;
pub mod fetch;
pub mod job;
pub mod logging;
pub mod monitor;
pub mod orchestrator;
pub mod source;
pub mod storage;

pub use orchestrator::{Orchestrator, ProgressStats, RunOptions, RunReport};
