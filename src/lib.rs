//! vlist: a virtual-scrolling list engine for browser DOM environments.
//!
//! ```ignore
//! let instance = vlist::vlist(BuilderConfig::new(container, item))
//!     .use_feature(Box::new(SelectionFeature::new(SelectionConfig::default())))
//!     .build()?;
//! ```
//!
//! The builder (`vlist()` / [`Builder`]) validates configuration, builds the DOM
//! skeleton, assembles the engine, runs the feature pipeline, and returns an
//! [`Instance`] — the object callers hold for the life of the list.

pub mod builder;
pub mod compression;
pub mod context;
pub mod data;
pub mod dom;
pub mod error;
pub mod events;
pub mod facade;
pub mod features;
pub mod item;
pub mod pool;
pub mod range;
pub mod renderer;
pub mod scroll;
pub mod size_cache;
pub mod velocity;
pub mod viewport;
pub mod vlist_event;

pub use builder::{
    vlist, Builder, BuilderConfig, ContainerRef, ItemConfig, Orientation, ScrollConfig,
    ScrollbarMode, SizeSpec, DEFAULT_OVERSCAN,
};
pub use error::ConfigError;
pub use events::HandlerId;
pub use facade::{Instance, ScrollAlign};
pub use item::{Identified, ItemId};
pub use range::Range;
pub use renderer::{Template, TemplateOutput};
pub use vlist_event::{IndexRange, VlistEvent};

pub use features::async_feature::{AsyncConfig, AsyncFeature};
pub use features::grid::{GridConfig, GridFeature};
pub use features::page::PageFeature;
pub use features::scale::{ScaleConfig, ScaleFeature};
pub use features::scrollbar::{ScrollbarFeature, ScrollbarOptions};
pub use features::sections::{SectionsConfig, SectionsFeature};
pub use features::selection::{SelectionConfig, SelectionFeature, SelectionMode};
pub use features::snapshots::{ScrollSnapshot, SnapshotsFeature};
pub use features::Feature;

pub use data::{Adapter, AdapterFuture, AdapterPage, DataManager, LoadedRanges, LoadState};
pub use pool::PoolStats;
