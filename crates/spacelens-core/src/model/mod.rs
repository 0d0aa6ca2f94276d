/// Data model for the SpaceLens scanning engine.
///
/// Re-exports the value-like [`Entry`] record and size formatting helpers.
pub mod entry;
pub mod size;

pub use entry::{display_name, merge_by_size_desc, sort_by_size_desc, Entry};
