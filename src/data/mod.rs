//! Sparse async data layer (§3, §4.10).

pub mod loaded_ranges;
pub mod manager;
pub mod placeholder;
pub mod state;

pub use loaded_ranges::LoadedRanges;
pub use manager::{Adapter, AdapterFuture, AdapterPage, DataManager};
pub use state::LoadState;
