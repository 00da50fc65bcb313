//! File I/O
//!
//! Ground-truth annotation files and the detector result cache.

pub mod annotations;
pub mod cache;

pub use annotations::{load_labeled_intervals, parse_labeled_intervals};
pub use cache::{cache_key, ChorusWindow, JsonFileCache, MemoryCache, ResultCache};
