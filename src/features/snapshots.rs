//! withSnapshots (§4.9, §6): exposes `getScrollSnapshot`/`restoreScroll` for caller-driven
//! scroll persistence across reloads/remounts.

use crate::context::Shared;
use crate::item::Identified;

#[derive(Debug, Clone, Default)]
pub struct ScrollSnapshot {
    pub index: usize,
    pub offset_in_item: f64,
    pub total: Option<usize>,
    pub selected_ids: Option<Vec<String>>,
}

/// First fully visible index plus the pixel residual into it, derived from the current
/// render state rather than stored separately.
pub fn capture(
    visible_start: usize,
    scroll_position: f64,
    size_cache: &crate::size_cache::SizeCache,
    total: usize,
    selected: Option<Vec<String>>,
) -> ScrollSnapshot {
    let offset_in_item = scroll_position - size_cache.get_offset(visible_start);
    ScrollSnapshot {
        index: visible_start,
        offset_in_item: offset_in_item.max(0.0),
        total: Some(total),
        selected_ids: selected,
    }
}

pub struct SnapshotsFeature;

/// Named so callers (the facade) can downcast the registered method with the exact same
/// type: both non-capturing closures below coerce to these function-pointer types, which
/// — unlike an anonymous closure type — are nameable on both sides of the `methods` map.
pub type GetSnapshotFn<T> = fn(&Shared<T>) -> ScrollSnapshot;
pub type RestoreScrollFn<T> = fn(&Shared<T>, &ScrollSnapshot);

fn get_snapshot<T>(shared: &Shared<T>) -> ScrollSnapshot
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let ctx = shared.borrow();
    capture(
        ctx.viewport_state.visible_range.start,
        ctx.viewport_state.scroll_position,
        &ctx.size_cache,
        ctx.total(),
        Some(ctx.state.selected.iter().cloned().collect()),
    )
}

fn restore_scroll<T>(shared: &Shared<T>, snap: &ScrollSnapshot)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    if let Some(total) = snap.total {
        shared.borrow_mut().size_cache.rebuild(total);
    }
    let target_offset = {
        let ctx = shared.borrow();
        ctx.size_cache.get_offset(snap.index) + snap.offset_in_item
    };
    let mut ctx = shared.borrow_mut();
    ctx.viewport_state.scroll_position = target_offset;
    if let Some(ids) = &snap.selected_ids {
        ctx.state.selected = ids.iter().cloned().collect();
    }
}

impl<T> crate::features::Feature<T> for SnapshotsFeature
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "snapshots"
    }

    fn setup(&self, ctx: &Shared<T>) {
        crate::context::register_method(
            &mut ctx.borrow_mut().methods,
            "getScrollSnapshot",
            get_snapshot::<T> as GetSnapshotFn<T>,
        );
        crate::context::register_method(
            &mut ctx.borrow_mut().methods,
            "restoreScroll",
            restore_scroll::<T> as RestoreScrollFn<T>,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size_cache::SizeCache;

    #[test]
    fn capture_computes_residual_offset() {
        let cache = SizeCache::fixed(50.0, 100);
        let snap = capture(10, 520.0, &cache, 100, None);
        assert_eq!(snap.index, 10);
        assert_eq!(snap.offset_in_item, 20.0);
    }
}
