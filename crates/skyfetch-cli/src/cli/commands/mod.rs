//! CLI command handlers, one file per command.

mod fetch;
mod status;

pub use fetch::{run_fetch, FetchArgs};
pub use status::run_status;
