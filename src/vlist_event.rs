//! The concrete event payloads emitted by a vlist instance (§6). Event names are plain
//! strings, matching the public `on(event, handler)` / `off(event, handler)` surface.

use crate::viewport::ScrollDirection;

pub mod names {
    pub const ITEM_CLICK: &str = "item:click";
    pub const ITEM_DBLCLICK: &str = "item:dblclick";
    pub const SELECTION_CHANGE: &str = "selection:change";
    pub const SCROLL: &str = "scroll";
    pub const VELOCITY_CHANGE: &str = "velocity:change";
    pub const RANGE_CHANGE: &str = "range:change";
    pub const LOAD_START: &str = "load:start";
    pub const LOAD_END: &str = "load:end";
    pub const ERROR: &str = "error";
    pub const RESIZE: &str = "resize";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl From<crate::range::Range> for IndexRange {
    fn from(r: crate::range::Range) -> Self {
        IndexRange {
            start: r.start,
            end: r.end,
        }
    }
}

/// One emitted event. `T` is the caller's item type; events that don't carry an item
/// (scroll, velocity, range, resize) are monomorphic in all the type parameters the
/// generic facade carries, so they still live in the same enum as the item-bearing ones.
pub enum VlistEvent<T> {
    ItemClick { item: T, index: usize },
    ItemDblClick { item: T, index: usize },
    SelectionChange { selected: Vec<String>, items: Vec<T> },
    Scroll { scroll_position: f64, direction: ScrollDirection },
    VelocityChange { velocity: f64, reliable: bool },
    RangeChange { range: IndexRange },
    LoadStart { offset: usize, limit: usize },
    LoadEnd { items: Vec<T>, total: Option<usize>, offset: Option<usize> },
    Error { error: String, context: String },
    Resize { height: f64, width: f64 },
}

impl<T> VlistEvent<T> {
    pub fn name(&self) -> &'static str {
        match self {
            VlistEvent::ItemClick { .. } => names::ITEM_CLICK,
            VlistEvent::ItemDblClick { .. } => names::ITEM_DBLCLICK,
            VlistEvent::SelectionChange { .. } => names::SELECTION_CHANGE,
            VlistEvent::Scroll { .. } => names::SCROLL,
            VlistEvent::VelocityChange { .. } => names::VELOCITY_CHANGE,
            VlistEvent::RangeChange { .. } => names::RANGE_CHANGE,
            VlistEvent::LoadStart { .. } => names::LOAD_START,
            VlistEvent::LoadEnd { .. } => names::LOAD_END,
            VlistEvent::Error { .. } => names::ERROR,
            VlistEvent::Resize { .. } => names::RESIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name_matches_payload_variant() {
        let ev: VlistEvent<()> = VlistEvent::Scroll {
            scroll_position: 0.0,
            direction: ScrollDirection::None,
        };
        assert_eq!(ev.name(), names::SCROLL);
    }
}
