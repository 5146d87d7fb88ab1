//! Sparse async data layer (§3, §4.10): chunked storage with LRU chunk eviction,
//! concurrent-range de-duplication, and placeholder synthesis for unloaded indices.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::rc::Rc;

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::data::loaded_ranges::LoadedRanges;
use crate::data::placeholder::{self, MAX_SAMPLE_ITEMS};
use crate::item::Identified;
use crate::range::Range;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_MAX_CACHED_ITEMS: usize = 10_000;
pub const DEFAULT_EVICTION_BUFFER: usize = 500;
pub const DEFAULT_INITIAL_LOAD: usize = 50;

pub struct AdapterPage<T> {
    pub items: Vec<T>,
    pub total: Option<usize>,
    pub cursor: Option<String>,
}

pub type AdapterFuture<T> = Pin<Box<dyn Future<Output = Result<AdapterPage<T>, String>>>>;

/// User-supplied data source. `read` is called at most once per identical
/// `(offset, limit, cursor)` concurrently — the manager de-dups via `pending`.
pub trait Adapter<T> {
    fn read(&self, offset: usize, limit: usize, cursor: Option<String>) -> AdapterFuture<T>;
}

struct Chunk<T> {
    items: Vec<Option<T>>,
}

impl<T> Chunk<T> {
    fn empty(size: usize) -> Self {
        let mut items = Vec::with_capacity(size);
        items.resize_with(size, || None);
        Chunk { items }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RangeKey {
    start: usize,
    end: usize,
}

pub enum LoadOutcome<T> {
    Started,
    AlreadyPending,
    Resolved { items: Vec<T>, total: Option<usize> },
    Failed(String),
}

/// Owns the sparse item store. Held behind `Rc<RefCell<_>>` by the async feature so
/// `spawn_local` continuations can reach back into it after an adapter future resolves.
pub struct DataManager<T: Identified> {
    total: usize,
    chunk_size: usize,
    max_cached_items: usize,
    eviction_buffer: usize,
    chunks: HashMap<usize, Chunk<T>>,
    loaded: LoadedRanges,
    pending: HashSet<RangeKey>,
    lru: LruCache<usize, ()>,
    sample_items: Vec<serde_json::Value>,
}

impl<T> DataManager<T>
where
    T: Identified<Id = String> + Clone + Serialize + DeserializeOwned + 'static,
{
    pub fn new(total: usize) -> Self {
        DataManager {
            total,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_cached_items: DEFAULT_MAX_CACHED_ITEMS,
            eviction_buffer: DEFAULT_EVICTION_BUFFER,
            chunks: HashMap::new(),
            loaded: LoadedRanges::new(),
            pending: HashSet::new(),
            lru: LruCache::new(
                NonZeroUsize::new(usize::MAX.min(1 << 20)).expect("1 << 20 is non-zero"),
            ),
            sample_items: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn chunk_index_of(&self, index: usize) -> usize {
        index / self.chunk_size
    }

    /// Returns the loaded item at `index`, or a synthesized placeholder whose shape
    /// matches recently loaded items. `None` means neither is available yet — e.g. the
    /// very first render before any page has loaded, so there's no sample to shape a
    /// placeholder from that would satisfy `T`'s own required fields. Callers treat this
    /// the same as an out-of-range `Simple` index: leave it unrendered until a later
    /// refresh has real data (§4.10, §7 — no panics on valid input).
    pub fn get_item(&self, index: usize) -> Option<T> {
        let chunk_idx = self.chunk_index_of(index);
        if let Some(chunk) = self.chunks.get(&chunk_idx) {
            let local = index % self.chunk_size;
            if let Some(Some(item)) = chunk.items.get(local) {
                return Some(item.clone());
            }
        }
        let value = placeholder::synthesize(&self.sample_items, index);
        match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(err) => {
                log::warn!("vlist: placeholder synthesis for index {index} isn't shaped like T yet: {err}");
                None
            }
        }
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.loaded.is_loaded(index)
    }

    fn record_sample(&mut self, item: &T) {
        if self.sample_items.len() < MAX_SAMPLE_ITEMS {
            if let Ok(value) = serde_json::to_value(item) {
                self.sample_items.push(value);
            }
        }
    }

    fn touch_chunk(&mut self, chunk_idx: usize) {
        self.lru.put(chunk_idx, ());
    }

    fn cached_item_count(&self) -> usize {
        self.chunks
            .values()
            .map(|c| c.items.iter().filter(|i| i.is_some()).count())
            .sum()
    }

    /// Evicts least-recently-touched chunks outside a protection zone around `visible`
    /// once the cached-item budget is exceeded.
    pub fn evict_if_needed(&mut self, visible: Range) {
        if self.cached_item_count() <= self.max_cached_items {
            return;
        }
        let protect_start = visible.start.saturating_sub(self.eviction_buffer);
        let protect_end = (visible.end + self.eviction_buffer).min(self.total);
        let protected: HashSet<usize> = (self.chunk_index_of(protect_start)
            ..=self.chunk_index_of(protect_end.saturating_sub(1).max(protect_start)))
            .collect();

        // `LruCache::iter()` yields most-recently-used first; reverse it so eviction
        // removes the least-recently-touched chunks first, per §3/§4.10.
        let candidates: Vec<usize> = self
            .lru
            .iter()
            .rev()
            .map(|(idx, _)| *idx)
            .filter(|idx| !protected.contains(idx))
            .collect();

        for chunk_idx in candidates {
            if self.cached_item_count() <= self.max_cached_items {
                break;
            }
            self.chunks.remove(&chunk_idx);
            self.lru.pop(&chunk_idx);
            self.rebuild_loaded_from_chunks();
        }
    }

    fn rebuild_loaded_from_chunks(&mut self) {
        self.loaded.clear();
        let mut indices: Vec<usize> = self.chunks.keys().copied().collect();
        indices.sort_unstable();
        for chunk_idx in indices {
            let chunk = &self.chunks[&chunk_idx];
            let base = chunk_idx * self.chunk_size;
            let mut run_start: Option<usize> = None;
            for (local, item) in chunk.items.iter().enumerate() {
                let global = base + local;
                match (item.is_some(), run_start) {
                    (true, None) => run_start = Some(global),
                    (false, Some(s)) => {
                        self.loaded.mark_loaded(Range::new(s, global));
                        run_start = None;
                    }
                    _ => {}
                }
            }
            if let Some(s) = run_start {
                self.loaded
                    .mark_loaded(Range::new(s, base + chunk.items.len()));
            }
        }
    }

    fn merge_page(&mut self, offset: usize, items: Vec<T>) {
        for (i, item) in items.into_iter().enumerate() {
            let global = offset + i;
            self.record_sample(&item);
            let chunk_idx = self.chunk_index_of(global);
            let local = global % self.chunk_size;
            let chunk = self
                .chunks
                .entry(chunk_idx)
                .or_insert_with(|| Chunk::empty(self.chunk_size));
            if local >= chunk.items.len() {
                chunk.items.resize_with(local + 1, || None);
            }
            chunk.items[local] = Some(item);
            self.touch_chunk(chunk_idx);
        }
    }

    /// Computes missing sub-ranges inside `[offset, offset+limit)` and dispatches the
    /// adapter for each, de-duplicating identical concurrent requests. Results merge back
    /// in when they resolve — callers observe completion via the returned futures.
    pub fn load_range(
        manager: &Rc<RefCell<Self>>,
        adapter: Rc<dyn Adapter<T>>,
        offset: usize,
        limit: usize,
    ) -> Vec<Pin<Box<dyn Future<Output = Result<(), String>>>>> {
        let requested = Range::new(offset, offset + limit);
        let gaps = manager.borrow().loaded.missing_ranges(requested);

        let mut futures = Vec::new();
        for gap in gaps {
            let key = RangeKey {
                start: gap.start,
                end: gap.end,
            };
            if manager.borrow().pending.contains(&key) {
                continue;
            }
            manager.borrow_mut().pending.insert(key);

            let manager = manager.clone();
            let adapter = adapter.clone();
            let fut = async move {
                let result = adapter
                    .read(gap.start, gap.len(), None)
                    .await;
                manager.borrow_mut().pending.remove(&key);
                match result {
                    Ok(page) => {
                        if page.items.len() < gap.len() {
                            log::warn!(
                                "vlist: adapter returned {} items for a {}-item gap at offset {}",
                                page.items.len(),
                                gap.len(),
                                gap.start
                            );
                        }
                        let mut mgr = manager.borrow_mut();
                        mgr.merge_page(gap.start, page.items);
                        mgr.loaded.mark_loaded(gap);
                        if let Some(total) = page.total {
                            mgr.total = total;
                        }
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            };
            futures.push(Box::pin(fut) as Pin<Box<dyn Future<Output = Result<(), String>>>>);
        }
        futures
    }

    /// Clears all cached state; callers re-dispatch `loadRange(0, initial)` afterward.
    pub fn reload(&mut self) {
        self.chunks.clear();
        self.loaded.clear();
        self.pending.clear();
        self.lru.clear();
        self.sample_items.clear();
    }

    pub fn append_items(&mut self, items: Vec<T>) {
        let offset = self.total;
        self.total += items.len();
        self.merge_page(offset, items);
        self.loaded.mark_loaded(Range::new(offset, self.total));
    }

    pub fn prepend_items(&mut self, items: Vec<T>) {
        let count = items.len();
        self.chunks.clear();
        self.loaded.shift_from(0, count as isize);
        self.total += count;
        self.merge_page(0, items);
        self.rebuild_loaded_from_chunks();
    }

    pub fn update_item(&mut self, id: &str, patch: impl FnOnce(&mut T)) {
        for chunk in self.chunks.values_mut() {
            for slot in chunk.items.iter_mut() {
                if let Some(item) = slot {
                    if item.id() == id {
                        patch(item);
                        return;
                    }
                }
            }
        }
    }

    /// Removes the item with `id` if present and triggers a downstream prefix-sum
    /// rebuild (signalled to the caller via the returned bool).
    pub fn remove_item(&mut self, id: &str) -> bool {
        let mut found_global: Option<usize> = None;
        'outer: for (&chunk_idx, chunk) in self.chunks.iter() {
            for (local, slot) in chunk.items.iter().enumerate() {
                if let Some(item) = slot {
                    if item.id() == id {
                        found_global = Some(chunk_idx * self.chunk_size + local);
                        break 'outer;
                    }
                }
            }
        }
        let Some(global) = found_global else {
            return false;
        };
        // Chunk layout assumes contiguous occupancy; removing one item misaligns every
        // chunk after it, so the simplest correct move is to drop cached chunks entirely
        // and let the next `loadRange` refill from the adapter.
        self.chunks.clear();
        self.loaded.shift_from(global + 1, -1);
        self.total = self.total.saturating_sub(1);
        self.loaded.truncate_to(self.total);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Serialize, Deserialize)]
    struct Row {
        id: String,
        name: String,
        score: i64,
    }

    impl Identified for Row {
        type Id = String;
        fn id(&self) -> String {
            self.id.clone()
        }
    }

    #[test]
    fn unloaded_index_with_no_samples_returns_none_not_a_panic() {
        let manager: DataManager<Row> = DataManager::new(1000);
        assert!(manager.get_item(5).is_none());
    }

    #[test]
    fn unloaded_index_with_a_sample_returns_placeholder() {
        let mut manager: DataManager<Row> = DataManager::new(1000);
        manager.merge_page(
            0,
            vec![Row {
                id: "a".into(),
                name: "Alice".into(),
                score: 10,
            }],
        );
        manager.loaded.mark_loaded(Range::new(0, 1));
        let item = manager.get_item(5).expect("a sample is loaded, shape is known");
        assert!(placeholder::is_placeholder_id(&item.id));
    }

    #[test]
    fn loaded_item_is_returned_verbatim() {
        let mut manager: DataManager<Row> = DataManager::new(1000);
        manager.merge_page(
            0,
            vec![Row {
                id: "a".into(),
                name: "Alice".into(),
                score: 10,
            }],
        );
        manager.loaded.mark_loaded(Range::new(0, 1));
        let item = manager.get_item(0).expect("index 0 was just loaded");
        assert_eq!(item.id, "a");
        assert!(manager.is_loaded(0));
        assert!(!manager.is_loaded(1));
    }

    #[test]
    fn append_extends_total_and_marks_loaded() {
        let mut manager: DataManager<Row> = DataManager::new(0);
        manager.append_items(vec![Row {
            id: "x".into(),
            name: "X".into(),
            score: 1,
        }]);
        assert_eq!(manager.total(), 1);
        assert!(manager.is_loaded(0));
    }

    #[test]
    fn reload_clears_all_cached_state() {
        let mut manager: DataManager<Row> = DataManager::new(10);
        manager.merge_page(
            0,
            vec![Row {
                id: "a".into(),
                name: "Alice".into(),
                score: 10,
            }],
        );
        manager.loaded.mark_loaded(Range::new(0, 1));
        manager.reload();
        assert!(!manager.is_loaded(0));
    }

    #[test]
    fn eviction_removes_least_recently_used_chunk_first() {
        let mut manager: DataManager<Row> = DataManager::new(1000);
        manager.chunk_size = 10;
        manager.max_cached_items = 15;
        manager.eviction_buffer = 0;

        for (chunk_start, id_prefix) in [(0, "a"), (10, "b"), (20, "c")] {
            let items = (0..10)
                .map(|i| Row {
                    id: format!("{id_prefix}{i}"),
                    name: "x".into(),
                    score: 0,
                })
                .collect();
            manager.merge_page(chunk_start, items);
            manager
                .loaded
                .mark_loaded(Range::new(chunk_start, chunk_start + 10));
        }
        // Re-touch chunk 0 so chunk 1 becomes the least-recently-used of the three.
        manager.touch_chunk(0);

        // Visible range far from every cached chunk: nothing is protected.
        manager.evict_if_needed(Range::new(500, 501));

        assert!(
            !manager.chunks.contains_key(&1),
            "least-recently-used chunk should be evicted first"
        );
        assert!(
            manager.chunks.contains_key(&0),
            "recently re-touched chunk should survive eviction"
        );
    }
}
