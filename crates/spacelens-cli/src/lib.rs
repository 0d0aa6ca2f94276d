/// SpaceLens CLI: terminal frontend for the scanning engine.
///
/// This crate only parses arguments and renders projections. Scanning,
/// caching and navigation live in `spacelens-core`.
pub mod app;
pub mod args;
pub mod export;
pub mod report;

pub use app::{run, scan};
pub use args::Cli;
