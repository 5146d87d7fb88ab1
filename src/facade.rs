//! Public facade (§6): the object returned by `.build()`. Thin wrapper over `Shared<T>`
//! that exposes the always-available methods plus whatever `withX` features registered
//! in `Context::methods`.

use web_sys::Element;

use crate::context::{get_method, Context, Shared};
use crate::events::HandlerId;
use crate::features::snapshots::{GetSnapshotFn, RestoreScrollFn, ScrollSnapshot};
use crate::features::Feature;
use crate::item::Identified;
use crate::size_cache::SizeCache;
use crate::vlist_event::VlistEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlign {
    Start,
    Center,
    End,
}

pub struct Instance<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    ctx: Shared<T>,
    features: Vec<Box<dyn Feature<T>>>,
}

impl<T> Instance<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    pub(crate) fn new(ctx: Shared<T>, features: Vec<Box<dyn Feature<T>>>) -> Self {
        Instance { ctx, features }
    }

    pub fn element(&self) -> Element {
        self.ctx.borrow().root.clone()
    }

    pub fn total(&self) -> usize {
        self.ctx.borrow().total()
    }

    /// Pool/renderer diagnostics (§4.4): elements created vs. recycled and current pool
    /// size. Exposed for callers tuning `overscan` or debugging recycling behavior.
    pub fn stats(&self) -> crate::pool::PoolStats {
        self.ctx.borrow().renderer.pool_stats()
    }

    /// Replaces the item list wholesale; only meaningful against the simple data source —
    /// an async-backed instance should call the adapter via `reload()` instead.
    pub fn set_items(&self, items: Vec<T>) {
        {
            let mut ctx = self.ctx.borrow_mut();
            let total = items.len();
            ctx.data = crate::context::DataSource::Simple(items);
            ctx.size_cache.rebuild(total);
            let total_size = ctx.size_cache.get_total_size();
            let horizontal = ctx.horizontal;
            crate::dom::set_main_axis_size(&ctx.content.clone(), total_size, horizontal);
        }
        Context::run_content_size_handlers(&self.ctx);
        crate::builder::refresh(&self.ctx);
    }

    pub fn append_items(&self, items: Vec<T>) {
        let new_total = {
            let mut ctx = self.ctx.borrow_mut();
            match &mut ctx.data {
                crate::context::DataSource::Simple(existing) => existing.extend(items),
                crate::context::DataSource::Async(manager) => manager.borrow_mut().append_items(items),
            }
            let total = ctx.total();
            ctx.size_cache.rebuild(total);
            total
        };
        let (total_size, horizontal, content) = {
            let ctx = self.ctx.borrow();
            (ctx.size_cache.get_total_size(), ctx.horizontal, ctx.content.clone())
        };
        crate::dom::set_main_axis_size(&content, total_size, horizontal);
        let _ = new_total;
        Context::run_content_size_handlers(&self.ctx);
        crate::builder::refresh(&self.ctx);
    }

    pub fn prepend_items(&self, items: Vec<T>) {
        let shift = items.len();
        {
            let mut ctx = self.ctx.borrow_mut();
            match &mut ctx.data {
                crate::context::DataSource::Simple(existing) => {
                    let mut merged = items;
                    merged.extend(existing.drain(..));
                    *existing = merged;
                }
                crate::context::DataSource::Async(manager) => manager.borrow_mut().prepend_items(items),
            }
            let total = ctx.total();
            ctx.size_cache.rebuild(total);
            let total_size = ctx.size_cache.get_total_size();
            let horizontal = ctx.horizontal;
            let content = ctx.content.clone();
            crate::dom::set_main_axis_size(&content, total_size, horizontal);
            // Keeps the same items on screen rather than jumping to the new top, per §8's
            // "prependItems preserves scroll position".
            let added_size = ctx.size_cache.get_offset(shift);
            ctx.viewport_state.scroll_position += added_size;
        }
        Context::run_content_size_handlers(&self.ctx);
        crate::builder::refresh(&self.ctx);
    }

    pub fn update_item(&self, id: &str, patch: impl FnOnce(&mut T)) {
        {
            let mut ctx = self.ctx.borrow_mut();
            match &mut ctx.data {
                crate::context::DataSource::Simple(items) => {
                    if let Some(item) = items.iter_mut().find(|i| i.id() == id) {
                        patch(item);
                    }
                }
                crate::context::DataSource::Async(manager) => manager.borrow_mut().update_item(id, patch),
            }
        }
        crate::builder::refresh(&self.ctx);
    }

    pub fn remove_item(&self, id: &str) -> bool {
        let removed = {
            let mut ctx = self.ctx.borrow_mut();
            match &mut ctx.data {
                crate::context::DataSource::Simple(items) => {
                    let before = items.len();
                    items.retain(|i| i.id() != id);
                    before != items.len()
                }
                crate::context::DataSource::Async(manager) => manager.borrow_mut().remove_item(id),
            }
        };
        if removed {
            let total = self.ctx.borrow().total();
            self.ctx.borrow_mut().size_cache.rebuild(total);
            let (total_size, horizontal, content) = {
                let ctx = self.ctx.borrow();
                (ctx.size_cache.get_total_size(), ctx.horizontal, ctx.content.clone())
            };
            crate::dom::set_main_axis_size(&content, total_size, horizontal);
            Context::run_content_size_handlers(&self.ctx);
            crate::builder::refresh(&self.ctx);
        }
        removed
    }

    /// Clears cached async state and re-dispatches an initial load; a no-op on the simple
    /// data source (§6 — "reload() -> promise" is meaningful only under `withAsync`).
    pub fn reload(&self) {
        let ctx = self.ctx.borrow();
        if let crate::context::DataSource::Async(manager) = &ctx.data {
            log::info!("vlist: reload() starting");
            manager.borrow_mut().reload();
        }
        drop(ctx);
        crate::builder::refresh(&self.ctx);
        log::info!("vlist: reload() finished");
    }

    /// Scrolls so index `index` aligns per `align`; out-of-range indices clamp unless
    /// `wrap` is enabled, in which case they wrap modulo `total` (§7, §9).
    pub fn scroll_to_index(&self, index: usize, align: ScrollAlign, smooth: bool) {
        let total = self.ctx.borrow().total();
        if total == 0 {
            return;
        }
        let index = index % total;

        let (size_cache, compression, container_size, horizontal): (SizeCache, _, _, _) = {
            let ctx = self.ctx.borrow();
            (ctx.size_cache.clone(), ctx.compression, ctx.viewport_state.container_size, ctx.horizontal)
        };
        let _ = horizontal;

        let target = if compression.is_compressed {
            crate::compression::compressed_scroll_to_index(
                index,
                &size_cache,
                total,
                &compression,
                container_size,
                matches!(align, ScrollAlign::End),
            )
        } else {
            let offset = size_cache.get_offset(index);
            match align {
                ScrollAlign::Start => offset,
                ScrollAlign::End => (offset + size_cache.get_size(index) - container_size).max(0.0),
                ScrollAlign::Center => {
                    (offset - (container_size - size_cache.get_size(index)) / 2.0).max(0.0)
                }
            }
        };
        let clamp_max = (size_cache.get_total_size() - container_size).max(0.0);
        let target = target.clamp(0.0, clamp_max);

        let scroll = self.ctx.borrow().scroll.clone();
        if smooth {
            let window = self.ctx.borrow().document.default_view().expect("document has a window");
            let now = crate::dom::now_ms(&window);
            let ctx = self.ctx.clone();
            crate::scroll::ScrollController::scroll_to(&scroll, target, 300.0, now, move || {
                crate::builder::refresh(&ctx);
            });
        } else {
            let current = scroll.borrow().read_position();
            scroll.borrow_mut().apply_delta(target - current, clamp_max);
            self.ctx.borrow_mut().viewport_state.scroll_position = target;
            crate::builder::refresh(&self.ctx);
        }
    }

    pub fn get_scroll_position(&self) -> f64 {
        self.ctx.borrow().viewport_state.scroll_position
    }

    pub fn cancel_scroll(&self) {
        self.ctx.borrow().scroll.borrow_mut().cancel_scroll();
    }

    pub fn on(&self, event: &str, handler: impl Fn(&VlistEvent<T>) + 'static) -> HandlerId {
        self.ctx.borrow().emitter.on(event.to_string(), handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) {
        self.ctx.borrow().emitter.off(&event.to_string(), id);
    }

    /// Downcasts a feature-registered method by key using the same function-pointer type
    /// it was registered under (see `features::snapshots` for why this must be a concrete,
    /// nameable type rather than an anonymous closure).
    fn method<F: Copy + 'static>(&self, key: &str) -> Option<F> {
        let ctx = self.ctx.borrow();
        get_method::<F>(&ctx.methods, key).copied()
    }

    pub fn get_scroll_snapshot(&self) -> Option<ScrollSnapshot> {
        let f: GetSnapshotFn<T> = self.method("getScrollSnapshot")?;
        Some(f(&self.ctx))
    }

    pub fn restore_scroll(&self, snapshot: &ScrollSnapshot) {
        if let Some(f) = self.method::<RestoreScrollFn<T>>("restoreScroll") {
            f(&self.ctx, snapshot);
            crate::builder::refresh(&self.ctx);
        }
    }

    pub fn destroy(&mut self) {
        {
            let mut ctx = self.ctx.borrow_mut();
            if ctx.state.is_destroyed {
                return;
            }
            ctx.state.is_destroyed = true;
        }
        log::info!("vlist: destroy() starting");
        for feature in &self.features {
            feature.destroy(&self.ctx);
        }
        Context::run_destroy_handlers(&self.ctx);
        let mut ctx = self.ctx.borrow_mut();
        let stats = ctx.renderer.pool_stats();
        log::debug!(
            "vlist: destroying instance, pool stats created={} reused={} pool_size={}",
            stats.created,
            stats.reused,
            stats.pool_size
        );
        ctx.renderer.disconnect_measure_observer();
        ctx.renderer.destroy();
        if let Some(observer) = ctx.resize_observer.take() {
            observer.disconnect();
        }
        ctx.root.remove();
        ctx.emitter.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_align_variants_are_distinct() {
        assert_ne!(ScrollAlign::Start, ScrollAlign::End);
        assert_ne!(ScrollAlign::Start, ScrollAlign::Center);
    }
}
