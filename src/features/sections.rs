//! withSections (§4.9): inserts header rows at group boundaries, sizes them from
//! `header_size`, and tracks a sticky header that swaps when the next header crosses the
//! viewport top.

use std::collections::HashMap;
use std::rc::Rc;

use crate::context::Shared;
use crate::item::Identified;

pub struct SectionsConfig<T> {
    /// Maps an item to the key of the group it belongs to (e.g. a date bucket).
    pub group_key: Rc<dyn Fn(&T) -> String>,
    pub header_size: f64,
}

pub struct SectionsFeature<T> {
    config: SectionsConfig<T>,
}

impl<T> SectionsFeature<T> {
    pub fn new(config: SectionsConfig<T>) -> Self {
        SectionsFeature { config }
    }
}

/// Builds the boundary set: the set of logical slot indices (in the combined
/// header+item sequence) that are headers, each paired with its group key.
pub fn compute_boundaries<T>(items: &[T], group_key: &dyn Fn(&T) -> String) -> Vec<(usize, String)>
where
    T: Identified,
{
    let mut boundaries = Vec::new();
    let mut last_key: Option<String> = None;
    let mut slot = 0usize;
    for item in items {
        let key = group_key(item);
        if last_key.as_deref() != Some(key.as_str()) {
            boundaries.push((slot, key.clone()));
            slot += 1;
            last_key = Some(key);
        }
        slot += 1;
    }
    boundaries
}

/// The active sticky group for `visible_start` — the last boundary at or before it.
pub fn active_group(boundaries: &[(usize, String)], visible_start: usize) -> Option<&str> {
    boundaries
        .iter()
        .rev()
        .find(|(slot, _)| *slot <= visible_start)
        .map(|(_, key)| key.as_str())
}

/// For a slot sequence of `total_items + boundaries.len()` slots, maps each non-header
/// slot to the real item index it carries. Header slots are left at `usize::MAX`
/// (never read — callers check `header_for` first).
pub fn build_item_for_slot(total_items: usize, boundaries: &[(usize, String)]) -> Vec<usize> {
    let slot_count = total_items + boundaries.len();
    let mut item_for_slot = vec![usize::MAX; slot_count];
    let mut header_slots = boundaries.iter().map(|(slot, _)| *slot).peekable();
    let mut item_index = 0usize;
    for slot in 0..slot_count {
        if header_slots.peek() == Some(&slot) {
            header_slots.next();
            continue;
        }
        item_for_slot[slot] = item_index;
        item_index += 1;
    }
    item_for_slot
}

/// Recomputes boundaries from the current item set, replaces `size_cache` with a
/// sectioned one that inserts `header_size` at each boundary, and installs the
/// slot-classifying closures `Renderer`/`refresh` read (§4.9: "replaces the size function
/// with a sectioned one that inserts header sizes at boundaries"). Shared by `setup`
/// (initial layout) and the `contentSize` hook (re-run whenever items change).
fn recompute<T>(shared: &Shared<T>, header_size: f64, group_key: Rc<dyn Fn(&T) -> String>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let (items, horizontal, content, original_size_cache) = {
        let c = shared.borrow();
        let total = c.total();
        let items: Vec<T> = (0..total).filter_map(|i| c.data.get(i)).collect();
        (items, c.horizontal, c.content.clone(), c.size_cache.clone())
    };
    let boundaries = compute_boundaries(&items, group_key.as_ref());
    let item_for_slot = build_item_for_slot(items.len(), &boundaries);
    let slot_count = item_for_slot.len();
    let headers: HashMap<usize, String> = boundaries.into_iter().collect();

    let headers_for_size = headers.clone();
    let item_for_slot_for_size = item_for_slot.clone();
    let sectioned = crate::size_cache::SizeCache::variable(slot_count, move |slot| {
        if headers_for_size.contains_key(&slot) {
            header_size
        } else {
            let item_index = item_for_slot_for_size.get(slot).copied().unwrap_or(0);
            original_size_cache.get_size(item_index)
        }
    });

    let headers_for_map = headers;
    let item_for_slot_for_map = item_for_slot;
    let mut c = shared.borrow_mut();
    c.size_cache = sectioned;
    c.header_for = Some(Rc::new(move |slot| headers_for_map.get(&slot).cloned()));
    c.item_index_for = Some(Rc::new(move |slot| {
        item_for_slot_for_map.get(slot).copied().unwrap_or(slot)
    }));
    let total_size = c.size_cache.get_total_size();
    crate::dom::set_main_axis_size(&content, total_size, horizontal);
}

impl<T> crate::features::Feature<T> for SectionsFeature<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "sections"
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["grid", "horizontal"]
    }

    fn setup(&self, ctx: &Shared<T>) {
        let header_size = self.config.header_size;
        let group_key = self.config.group_key.clone();

        recompute(ctx, header_size, group_key.clone());
        {
            let group_key = group_key.clone();
            ctx.borrow_mut()
                .content_size_handlers
                .push(Rc::new(move |shared| recompute(shared, header_size, group_key.clone())));
        }

        let (document, class_prefix) = {
            let ctx = ctx.borrow();
            (ctx.document.clone(), ctx.class_prefix.clone())
        };
        let sticky = crate::dom::create_element(&document, "div", &format!("{class_prefix}-sticky-header"));
        let _ = ctx.borrow().root.append_child(&sticky);

        ctx.borrow_mut().after_scroll.push(Rc::new(move |shared| {
            let (items, visible_start) = {
                let ctx = shared.borrow();
                let total = ctx.total();
                (
                    (0..total).filter_map(|i| ctx.data.get(i)).collect::<Vec<T>>(),
                    ctx.viewport_state.visible_range.start,
                )
            };
            let boundaries = compute_boundaries(&items, group_key.as_ref());
            if let Some(key) = active_group(&boundaries, visible_start) {
                sticky.set_text_content(Some(key));
            }
        }));
    }

    fn destroy(&self, ctx: &Shared<T>) {
        let mut ctx = ctx.borrow_mut();
        ctx.header_for = None;
        ctx.item_index_for = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row {
        group: String,
    }
    impl Identified for Row {
        type Id = String;
        fn id(&self) -> String {
            self.group.clone()
        }
    }

    #[test]
    fn boundaries_inserted_at_group_changes() {
        let items = vec![
            Row { group: "a".into() },
            Row { group: "a".into() },
            Row { group: "b".into() },
        ];
        let boundaries = compute_boundaries(&items, &|r: &Row| r.group.clone());
        assert_eq!(boundaries, vec![(0, "a".to_string()), (3, "b".to_string())]);
    }

    #[test]
    fn active_group_picks_last_boundary_at_or_before() {
        let boundaries = vec![(0, "a".to_string()), (5, "b".to_string())];
        assert_eq!(active_group(&boundaries, 3), Some("a"));
        assert_eq!(active_group(&boundaries, 5), Some("b"));
        assert_eq!(active_group(&boundaries, 6), Some("b"));
    }

    #[test]
    fn item_for_slot_skips_header_slots() {
        let items = vec![
            Row { group: "a".into() },
            Row { group: "a".into() },
            Row { group: "b".into() },
        ];
        let boundaries = compute_boundaries(&items, &|r: &Row| r.group.clone());
        let item_for_slot = build_item_for_slot(items.len(), &boundaries);
        // slots: 0=header(a) 1=item0 2=item1 3=header(b) 4=item2
        assert_eq!(item_for_slot.len(), 5);
        assert_eq!(item_for_slot[1], 0);
        assert_eq!(item_for_slot[2], 1);
        assert_eq!(item_for_slot[4], 2);
    }

    #[test]
    fn no_boundaries_maps_slots_straight_through() {
        let item_for_slot = build_item_for_slot(3, &[]);
        assert_eq!(item_for_slot, vec![0, 1, 2]);
    }
}
