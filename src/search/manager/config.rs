//! Configuration constants for search operations
//!
//! Defaults for [`crate::SearchConfig`]; every value can be overridden from
//! the config file.

/// Default maximum result tuples aggregated per keyword query
pub const DEFAULT_MAX_RESULTS_PER_KEYWORD: usize = 5000;

/// Processed tuples between two intermediate UI pushes
pub const DEFAULT_UPDATE_FREQUENCY: usize = 1000;

/// Rows per UI push during streaming
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Rows per pagination pull after streaming
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Rows read when a sort change forces a reload from index 0
pub const DEFAULT_RELOAD_WINDOW_SIZE: usize = 40;
