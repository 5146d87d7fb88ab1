//! Element pool (§4.4, §9 design note on the pool↔elements↔map cycle): an append-only
//! stack. An element is owned either by the pool or by the renderer's `index→element`
//! map, never both at once, which sidesteps the cyclic-reference problem entirely.

use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

#[derive(Debug, Default, Clone, Copy)]
pub struct PoolStats {
    pub created: usize,
    pub reused: usize,
    pub pool_size: usize,
}

pub struct ElementPool {
    stack: Vec<Element>,
    tag: String,
    static_class: String,
    stats: PoolStats,
}

impl ElementPool {
    pub fn new(tag: impl Into<String>, static_class: impl Into<String>) -> Self {
        ElementPool {
            stack: Vec::new(),
            tag: tag.into(),
            static_class: static_class.into(),
            stats: PoolStats::default(),
        }
    }

    /// Returns an existing element from the stack, or creates one tagged with the static
    /// role/class on first creation.
    pub fn acquire(&mut self, document: &web_sys::Document) -> Element {
        if let Some(el) = self.stack.pop() {
            self.stats.reused += 1;
            self.stats.pool_size = self.stack.len();
            el
        } else {
            let el = document
                .create_element(&self.tag)
                .expect("document.createElement must not fail for a static tag name");
            el.set_class_name(&self.static_class);
            self.stats.created += 1;
            el
        }
    }

    /// Clears dynamic content and transient classes/attributes, then pushes back onto the
    /// stack. Static role attributes are preserved so re-acquisition is cheap.
    pub fn release(&mut self, el: Element) {
        el.set_text_content(None);
        el.set_class_name(&self.static_class);
        if let Ok(html_el) = el.clone().dyn_into::<HtmlElement>() {
            let style = html_el.style();
            let _ = style.remove_property("transform");
            let _ = style.remove_property("height");
            let _ = style.remove_property("width");
        }
        let _ = el.remove_attribute("id");
        let _ = el.remove_attribute("data-index");
        let _ = el.remove_attribute("data-id");
        let _ = el.remove_attribute("aria-selected");
        let _ = el.remove_attribute("aria-setsize");
        let _ = el.remove_attribute("aria-posinset");
        let _ = el.remove_attribute("aria-hidden");
        self.stack.push(el);
        self.stats.pool_size = self.stack.len();
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Shrinks the backing stack to zero. Only called on destroy — pool growth is
    /// otherwise unbounded (§3).
    pub fn clear(&mut self) {
        self.stack.clear();
        self.stats.pool_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::PoolStats;

    #[test]
    fn stats_default_to_zero() {
        let stats = PoolStats::default();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.reused, 0);
        assert_eq!(stats.pool_size, 0);
    }
}
