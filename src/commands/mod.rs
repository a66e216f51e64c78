//! CLI command handlers.

mod fetch;
mod releases;

pub use fetch::run_fetch_command;
pub use releases::run_releases_command;
