//! Renderer (§4.5): brings the items container into sync with a new render range by
//! diffing against the previous one, recycling pooled elements, and positioning every
//! mapped element along the main axis.

use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Document, DocumentFragment, Element, HtmlElement};

use crate::compression::CompressionState;
use crate::features::grid::GridState;
use crate::item::{Identified, ItemId};
use crate::pool::ElementPool;
use crate::range::{diff_ranges, Range};
use crate::size_cache::SizeCache;

/// What a user template produced for one item: raw HTML (assigned as `innerHTML`) or a
/// fully-built DOM element that replaces the pooled element's children.
pub enum TemplateOutput {
    Html(String),
    Element(Element),
}

pub type Template<T> = Rc<dyn Fn(&T, usize) -> TemplateOutput>;

/// Whether the measured-size path (Mode B) is active; `Some` carries the estimated size
/// used before an item is observed, so newly rendered elements can be left unconstrained.
#[derive(Clone, Copy)]
pub enum SizeMode {
    Explicit,
    Measured,
}

pub struct Renderer<T: Identified> {
    document: Document,
    items_container: Element,
    pool: ElementPool,
    mapped: HashMap<usize, Element>,
    /// Indices within `prev_range` that `get_item` couldn't produce a value for yet (an
    /// async index with no loaded item and no sample to shape a placeholder from). Retried
    /// on every subsequent `render` call instead of being silently dropped, since
    /// `diff_ranges` only sees range boundaries, not which indices inside them actually
    /// got mapped.
    pending: std::collections::HashSet<usize>,
    prev_range: Range,
    horizontal: bool,
    size_mode: SizeMode,
    template: Template<T>,
    class_prefix: String,
    measure_observer: Option<web_sys::ResizeObserver>,
}

impl<T: Identified> Renderer<T> {
    pub fn new(
        document: Document,
        items_container: Element,
        horizontal: bool,
        size_mode: SizeMode,
        template: Template<T>,
        class_prefix: impl Into<String>,
    ) -> Self {
        let class_prefix = class_prefix.into();
        Renderer {
            document: document.clone(),
            items_container,
            pool: ElementPool::new("div", format!("{class_prefix}-item")),
            mapped: HashMap::new(),
            pending: std::collections::HashSet::new(),
            prev_range: Range::EMPTY,
            horizontal,
            size_mode,
            template,
            class_prefix,
            measure_observer: None,
        }
    }

    /// Installed once, after `Context` exists, for `SizeMode::Measured` (§4.5 Mode B) —
    /// `Renderer::new` runs before `Context` does, so the observer can't be built until
    /// the callback has a `Shared<T>` to write measurements into.
    pub fn set_measure_observer(&mut self, observer: web_sys::ResizeObserver) {
        self.measure_observer = Some(observer);
    }

    /// Disconnects the measurement observer, if one was ever installed (§4.8 `destroy`).
    pub fn disconnect_measure_observer(&self) {
        if let Some(observer) = &self.measure_observer {
            observer.disconnect();
        }
    }

    pub fn mapped_count(&self) -> usize {
        self.mapped.len()
    }

    pub fn pool_stats(&self) -> crate::pool::PoolStats {
        self.pool.stats()
    }

    /// Brings the DOM in sync with `new_range` for the given `get_item` accessor. Template
    /// output, ARIA attributes, and sizing/positioning are applied per §4.5's contract.
    /// `get_item` returning `None` (an async index with no loaded item and no sample yet)
    /// leaves that index unrendered rather than panicking; it's retried on the next render
    /// once it's still within range. `get_item` also returns the real item index alongside
    /// the value, since under `withSections` the index iterated here is a header+item slot
    /// index rather than the item's own position. `header_for` classifies a slot as a
    /// sticky-section header instead of an item; `grid` carries row-major layout state for
    /// `withGrid`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        total: usize,
        new_range: Range,
        get_item: impl Fn(usize) -> Option<(T, usize)>,
        selected: &std::collections::HashSet<String>,
        focused_index: Option<usize>,
        size_cache: &SizeCache,
        compression: Option<&CompressionState>,
        header_for: Option<&dyn Fn(usize) -> Option<String>>,
        grid: Option<GridState>,
    ) where
        T::Id: ItemId,
    {
        if new_range.start > new_range.end {
            return;
        }
        if total == 0 {
            self.clear();
            self.prev_range = Range::EMPTY;
            return;
        }

        let diff = diff_ranges(&self.prev_range, &new_range);

        for index in &diff.remove {
            self.pending.remove(index);
            if let Some(el) = self.mapped.remove(index) {
                el.remove();
                self.pool.release(el);
            }
        }
        self.pending
            .retain(|index| new_range.start <= *index && *index < new_range.end);

        let mut to_try: Vec<usize> = diff.add.clone();
        to_try.extend(
            self.pending
                .iter()
                .copied()
                .filter(|index| !self.mapped.contains_key(index)),
        );

        let fragment: DocumentFragment = self.document.create_document_fragment();
        let mut newly_added = Vec::with_capacity(to_try.len());
        for index in to_try {
            if let Some(key) = header_for.and_then(|f| f(index)) {
                self.pending.remove(&index);
                let el = self.pool.acquire(&self.document);
                self.apply_header(&el, &key, index, size_cache);
                fragment
                    .append_child(&el)
                    .expect("appending a freshly created element must not fail");
                newly_added.push((index, el));
                continue;
            }

            let Some((item, real_index)) = get_item(index) else {
                self.pending.insert(index);
                continue;
            };
            self.pending.remove(&index);
            let el = self.pool.acquire(&self.document);
            self.apply_template(&el, &item, real_index);
            self.apply_attributes(&el, &item, real_index, total, selected, focused_index);
            self.apply_size(&el, index, size_cache, grid);
            fragment
                .append_child(&el)
                .expect("appending a document fragment must not fail");
            newly_added.push((index, el));
        }
        if !newly_added.is_empty() {
            self.items_container
                .append_child(&fragment)
                .expect("appending a document fragment must not fail");
        }
        for (index, el) in newly_added {
            self.mapped.insert(index, el);
        }

        self.reposition_all(size_cache, compression, new_range.start, grid);
        self.prev_range = new_range;
    }

    /// A panicking user template is caught so one bad item doesn't abort the render batch
    /// (§7): the element falls back to empty content and the panic is logged.
    fn apply_template(&self, el: &Element, item: &T, index: usize) {
        let template = &self.template;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| template(item, index)));
        match result {
            Ok(TemplateOutput::Html(html)) => el.set_inner_html(&html),
            Ok(TemplateOutput::Element(child)) => {
                el.set_inner_html("");
                let _ = el.append_child(&child);
            }
            Err(_) => {
                log::error!("vlist: template panicked for index {index}");
                el.set_inner_html("");
            }
        }
    }

    fn apply_attributes(
        &self,
        el: &Element,
        item: &T,
        index: usize,
        total: usize,
        selected: &std::collections::HashSet<String>,
        focused_index: Option<usize>,
    ) where
        T::Id: ItemId,
    {
        let _ = el.set_attribute("id", &format!("{}-option-{index}", self.class_prefix));
        let _ = el.set_attribute("data-index", &index.to_string());
        let id_string = item.id().to_string();
        let _ = el.set_attribute("data-id", &id_string);
        let _ = el.set_attribute("role", "option");
        let _ = el.set_attribute(
            "aria-selected",
            if selected.contains(&id_string) {
                "true"
            } else {
                "false"
            },
        );
        let _ = el.set_attribute("aria-setsize", &total.to_string());
        let _ = el.set_attribute("aria-posinset", &(index + 1).to_string());
        if focused_index == Some(index) {
            let _ = el.set_attribute("data-focused", "true");
        } else {
            let _ = el.remove_attribute("data-focused");
        }
    }

    /// Renders a sticky-section boundary slot: text content is the group key, sized from
    /// the sectioned size cache at its own slot index (§4.9 `withSections`).
    fn apply_header(&self, el: &Element, key: &str, index: usize, size_cache: &SizeCache) {
        el.set_text_content(Some(key));
        let _ = el.set_attribute("data-index", &index.to_string());
        let _ = el.set_attribute("role", "presentation");
        let _ = el.set_attribute("aria-hidden", "true");
        if let Ok(html_el) = el.clone().dyn_into::<HtmlElement>() {
            let _ = html_el
                .class_list()
                .add_1(&format!("{}-section-header", self.class_prefix));
        }
        crate::dom::set_main_axis_size(el, size_cache.get_size(index), self.horizontal);
    }

    fn apply_size(&self, el: &Element, index: usize, size_cache: &SizeCache, grid: Option<GridState>) {
        if grid.is_none() {
            if let SizeMode::Measured = self.size_mode {
                if let Some(measured) = size_cache.as_measured() {
                    if !measured.is_measured(index) {
                        // Mode B: unmeasured items render unconstrained so their natural
                        // content height can be observed, then get picked up once the
                        // measurement observer's callback fires.
                        if let Some(observer) = &self.measure_observer {
                            let _ = observer.observe(el);
                        }
                        return;
                    }
                }
            }
        }
        match grid {
            Some(g) => {
                let columns = g.columns.max(1);
                let row = index / columns;
                crate::dom::set_cell_size(el, size_cache.get_size(row), g.column_width, self.horizontal);
            }
            None => {
                crate::dom::set_main_axis_size(el, size_cache.get_size(index), self.horizontal);
            }
        }
    }

    fn reposition_all(
        &self,
        size_cache: &SizeCache,
        compression: Option<&CompressionState>,
        range_start: usize,
        grid: Option<GridState>,
    ) {
        for (&index, el) in self.mapped.iter() {
            match grid {
                Some(g) => {
                    let columns = g.columns.max(1);
                    let row = index / columns;
                    let col = index % columns;
                    let row_start = range_start / columns;
                    let main_offset = match compression {
                        Some(c) if c.is_compressed => crate::compression::compressed_item_position(
                            row,
                            row_start,
                            size_cache,
                            size_cache.get_total(),
                            c,
                        ),
                        _ => size_cache.get_offset(row),
                    };
                    let cross_offset = col as f64 * (g.column_width + g.gap);
                    crate::dom::set_translate_2d(el, main_offset, cross_offset, self.horizontal);
                }
                None => {
                    let offset = match compression {
                        Some(c) if c.is_compressed => crate::compression::compressed_item_position(
                            index,
                            range_start,
                            size_cache,
                            size_cache.get_total(),
                            c,
                        ),
                        _ => size_cache.get_offset(index),
                    };
                    crate::dom::set_translate(el, offset, self.horizontal);
                }
            }
        }
    }

    /// Clears every rendered element, releasing each back to the pool.
    pub fn clear(&mut self) {
        let indices: Vec<usize> = self.mapped.keys().copied().collect();
        for index in indices {
            if let Some(el) = self.mapped.remove(&index) {
                el.remove();
                self.pool.release(el);
            }
        }
        self.pending.clear();
    }

    pub fn destroy(&mut self) {
        self.clear();
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row {
        id: String,
    }

    impl Identified for Row {
        type Id = String;
        fn id(&self) -> String {
            self.id.clone()
        }
    }

    #[test]
    fn size_mode_is_copyable_and_matches() {
        let mode = SizeMode::Measured;
        assert!(matches!(mode, SizeMode::Measured));
        let mode2 = mode;
        assert!(matches!(mode2, SizeMode::Measured));
    }
}
