//! Builder/Context (§4.8, §3 Ownership, §9 "handler arrays as middleware"). `Context` is
//! the orchestration substrate features cooperate through: they never hold references to
//! each other, only append to its handler arrays and methods map.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, KeyboardEvent, MouseEvent};

use crate::compression::CompressionState;
use crate::data::DataManager;
use crate::events::Emitter;
use crate::item::{Identified, ItemId};
use crate::range::Range;
use crate::renderer::Renderer;
use crate::scroll::ScrollController;
use crate::size_cache::SizeCache;
use crate::vlist_event::VlistEvent;

pub type Shared<T> = Rc<RefCell<Context<T>>>;
pub type Handler<T> = Rc<dyn Fn(&Shared<T>)>;
pub type ClickHandler<T> = Rc<dyn Fn(&Shared<T>, &MouseEvent)>;
pub type KeydownHandler<T> = Rc<dyn Fn(&Shared<T>, &KeyboardEvent)>;
pub type ResizeHandler<T> = Rc<dyn Fn(&Shared<T>, f64, f64)>;

/// Caller-supplied items (simple mode) or a chunked async store (`withAsync`), per §4.8
/// step 3 ("DataManager (simple or replaced by async)").
pub enum DataSource<T: Identified> {
    Simple(Vec<T>),
    Async(Rc<RefCell<DataManager<T>>>),
}

impl<T> DataSource<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    pub fn total(&self) -> usize {
        match self {
            DataSource::Simple(items) => items.len(),
            DataSource::Async(manager) => manager.borrow().total(),
        }
    }

    pub fn get(&self, index: usize) -> Option<T> {
        match self {
            DataSource::Simple(items) => items.get(index).cloned(),
            DataSource::Async(manager) => manager.borrow().get_item(index),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ViewportState {
    pub scroll_position: f64,
    pub container_size: f64,
    pub visible_range: Range,
    pub render_range: Range,
}

#[derive(Default)]
pub struct EngineState {
    pub is_destroyed: bool,
    pub selected: HashSet<String>,
    pub focused_index: Option<usize>,
    /// Set when a measurement batch changes `getTotalSize()` while the user is mid-scroll;
    /// the content element's main-axis size is written once scrolling goes idle instead of
    /// every frame (§4.5's "deferred correction in measured mode").
    pub pending_content_size_write: bool,
}

/// Everything a feature's `setup(ctx)` can see and mutate. Owned exclusively by the
/// builder (§3); features only append to handler arrays / the methods map.
pub struct Context<T: Identified> {
    pub document: Document,
    pub root: Element,
    pub viewport: Element,
    pub content: Element,
    pub items_el: Element,
    pub class_prefix: String,
    pub horizontal: bool,
    pub overscan: usize,

    pub size_cache: SizeCache,
    pub renderer: Renderer<T>,
    pub scroll: Rc<RefCell<ScrollController>>,
    pub data: DataSource<T>,

    pub state: EngineState,
    pub viewport_state: ViewportState,
    pub compression: CompressionState,

    /// Cleared by `withPage` (§4.9): a window-scrolled list has no fixed-size viewport to
    /// watch for resize.
    pub resize_observation_enabled: bool,
    /// Set by `withPage`: container size comes from the window, not the viewport element.
    pub use_window_container_size: bool,
    /// Tracked so `destroy()` can disconnect it; `None` if `resize_observation_enabled`
    /// was false at build time or the environment rejected the observer.
    pub resize_observer: Option<web_sys::ResizeObserver>,

    /// Set by `withGrid`: row-major layout state read by `refresh`/`Renderer`.
    pub grid: Option<crate::features::grid::GridState>,
    /// Set by `withSections`: classifies a rendered slot as a header (carrying its group
    /// key) or lets it fall through to an ordinary item. `None` outside `withSections`.
    pub header_for: Option<Rc<dyn Fn(usize) -> Option<String>>>,
    /// Set by `withSections` alongside `header_for`: maps a non-header slot index to the
    /// real item index it corresponds to.
    pub item_index_for: Option<Rc<dyn Fn(usize) -> usize>>,

    pub emitter: Emitter<String, VlistEvent<T>>,

    pub after_scroll: Vec<Handler<T>>,
    pub click_handlers: Vec<ClickHandler<T>>,
    pub keydown_handlers: Vec<KeydownHandler<T>>,
    pub resize_handlers: Vec<ResizeHandler<T>>,
    pub content_size_handlers: Vec<Handler<T>>,
    pub destroy_handlers: Vec<Handler<T>>,

    /// Feature-registered extra facade methods, type-erased. Callers downcast using the
    /// concrete closure signature they registered under a given key (§4.8 step 8).
    pub methods: HashMap<String, Rc<dyn Any>>,
}

/// Boxes `f` as `Any` so it can live in [`Context::methods`] under any call signature;
/// retrieve with `method::<F>(ctx, key)`.
pub fn register_method<F: 'static>(methods: &mut HashMap<String, Rc<dyn Any>>, key: &str, f: F) {
    let boxed: Box<F> = Box::new(f);
    let erased: Rc<dyn Any> = Rc::new(boxed);
    methods.insert(key.to_string(), erased);
}

pub fn get_method<'a, F: 'static>(
    methods: &'a HashMap<String, Rc<dyn Any>>,
    key: &str,
) -> Option<&'a F> {
    methods
        .get(key)
        .and_then(|f| f.downcast_ref::<Box<F>>())
        .map(|b| b.as_ref())
}

impl<T> Context<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
    T::Id: ItemId,
{
    pub fn total(&self) -> usize {
        self.data.total()
    }

    /// Invokes every handler in `selector(ctx)` in registration order, isolating panics
    /// per-handler exactly like the emitter (§7, §9).
    pub fn run_after_scroll(ctx: &Shared<T>) {
        let snapshot = ctx.borrow().after_scroll.clone();
        for handler in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(ctx)));
            if result.is_err() {
                log::error!("vlist: afterScroll handler panicked");
            }
        }
    }

    pub fn run_destroy_handlers(ctx: &Shared<T>) {
        let mut snapshot = ctx.borrow().destroy_handlers.clone();
        snapshot.reverse();
        for handler in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(ctx)));
            if result.is_err() {
                log::error!("vlist: destroy handler panicked");
            }
        }
    }

    pub fn run_resize_handlers(ctx: &Shared<T>, height: f64, width: f64) {
        let snapshot = ctx.borrow().resize_handlers.clone();
        for handler in snapshot {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(ctx, height, width)));
            if result.is_err() {
                log::error!("vlist: resize handler panicked");
            }
        }
    }

    pub fn run_content_size_handlers(ctx: &Shared<T>) {
        let snapshot = ctx.borrow().content_size_handlers.clone();
        for handler in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(ctx)));
            if result.is_err() {
                log::error!("vlist: contentSize handler panicked");
            }
        }
    }

    pub fn dispatch_click(ctx: &Shared<T>, event: &MouseEvent) {
        let snapshot = ctx.borrow().click_handlers.clone();
        for handler in snapshot {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(ctx, event)));
            if result.is_err() {
                log::error!("vlist: click handler panicked");
            }
        }
    }

    pub fn dispatch_keydown(ctx: &Shared<T>, event: &KeyboardEvent) {
        let snapshot = ctx.borrow().keydown_handlers.clone();
        for handler in snapshot {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(ctx, event)));
            if result.is_err() {
                log::error!("vlist: keydown handler panicked");
            }
        }
    }
}

/// Closest ancestor-or-self of `target` carrying `data-index`, used by click dispatch to
/// find which rendered item an event landed on.
pub fn closest_item_index(target: &web_sys::EventTarget) -> Option<usize> {
    let el = target.dyn_ref::<Element>()?;
    let mut current = Some(el.clone());
    while let Some(node) = current {
        if let Some(attr) = node.get_attribute("data-index") {
            return attr.parse().ok();
        }
        current = node.parent_element();
    }
    None
}
