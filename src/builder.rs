//! Builder & Context (§4.8, §6). `vlist(config)` returns a chainable builder; `.build()`
//! validates the config, constructs the DOM skeleton, assembles the engine's components,
//! runs the feature pipeline, wires DOM listeners, and performs the initial render.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Element, KeyboardEvent, MouseEvent, WheelEvent};

use crate::context::{Context, DataSource, EngineState, Shared, ViewportState};
use crate::compression::CompressionState;
use crate::dom;
use crate::error::ConfigError;
use crate::events::Emitter;
use crate::facade::Instance;
use crate::features::Feature;
use crate::item::Identified;
use crate::range::Range;
use crate::renderer::{Renderer, SizeMode, Template};
use crate::scroll::{ScrollController, ScrollMode};
use crate::size_cache::SizeCache;
use crate::vlist_event::{names, VlistEvent};

pub const DEFAULT_OVERSCAN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl Orientation {
    fn is_horizontal(self) -> bool {
        matches!(self, Orientation::Horizontal)
    }
}

/// Either a caller-supplied element or a selector resolved at `.build()` time.
pub enum ContainerRef {
    Element(Element),
    Selector(String),
}

/// `height?: integer | (index) -> integer` from §6 — a constant or a per-index function.
pub enum SizeSpec {
    Constant(f64),
    PerIndex(Rc<dyn Fn(usize) -> f64>),
}

pub struct ItemConfig<T> {
    pub height: Option<SizeSpec>,
    pub width: Option<SizeSpec>,
    pub estimated_height: Option<f64>,
    pub estimated_width: Option<f64>,
    pub template: Option<Template<T>>,
}

impl<T> Default for ItemConfig<T> {
    fn default() -> Self {
        ItemConfig {
            height: None,
            width: None,
            estimated_height: None,
            estimated_width: None,
            template: None,
        }
    }
}

pub enum ScrollbarMode {
    Native,
    None,
    Custom(crate::features::scrollbar::ScrollbarOptions),
}

impl Default for ScrollbarMode {
    fn default() -> Self {
        ScrollbarMode::Custom(crate::features::scrollbar::ScrollbarOptions::default())
    }
}

pub struct ScrollConfig {
    pub wheel: bool,
    pub wrap: bool,
    pub idle_timeout_ms: i32,
    /// `scroll.element: window-reference` in §6 — delegates to `withPage` at build time.
    pub window_scroll: bool,
    pub scrollbar: ScrollbarMode,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        ScrollConfig {
            wheel: true,
            wrap: false,
            idle_timeout_ms: 150,
            window_scroll: false,
            scrollbar: ScrollbarMode::default(),
        }
    }
}

pub struct BuilderConfig<T> {
    pub container: ContainerRef,
    pub item: ItemConfig<T>,
    pub items: Vec<T>,
    pub overscan: usize,
    pub orientation: Orientation,
    pub reverse: bool,
    pub class_prefix: String,
    pub aria_label: Option<String>,
    pub scroll: ScrollConfig,
}

impl<T> BuilderConfig<T> {
    pub fn new(container: ContainerRef, item: ItemConfig<T>) -> Self {
        BuilderConfig {
            container,
            item,
            items: Vec::new(),
            overscan: DEFAULT_OVERSCAN,
            orientation: Orientation::Vertical,
            reverse: false,
            class_prefix: "vlist".to_string(),
            aria_label: None,
            scroll: ScrollConfig::default(),
        }
    }
}

/// Entry point (§6): `vlist(config).use_feature(...).build()`.
pub fn vlist<T>(config: BuilderConfig<T>) -> Builder<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    Builder {
        config,
        features: Vec::new(),
    }
}

pub struct Builder<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    config: BuilderConfig<T>,
    features: Vec<Box<dyn Feature<T>>>,
}

impl<T> Builder<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    /// Registers a feature plugin; named `use_feature` since `use` is reserved (§4.8/§6's
    /// `.use(feature)`).
    pub fn use_feature(mut self, feature: Box<dyn Feature<T>>) -> Self {
        self.features.push(feature);
        self
    }

    pub fn build(mut self) -> Result<Instance<T>, ConfigError> {
        let window = web_sys::window()
            .ok_or(ConfigError::MissingEnvironmentApi("builder", "Window"))?;
        let document = window
            .document()
            .ok_or(ConfigError::MissingEnvironmentApi("builder", "Document"))?;

        // --- 1. Validate ---------------------------------------------------------
        let root = match &self.config.container {
            ContainerRef::Element(el) => el.clone(),
            ContainerRef::Selector(sel) => dom::resolve_container(&document, sel)
                .ok_or_else(|| ConfigError::ContainerNotFound(sel.clone()))?,
        };
        if self.config.item.template.is_none() {
            return Err(ConfigError::MissingTemplate);
        }
        let horizontal = self.config.orientation.is_horizontal();

        crate::features::sort_by_priority(&mut self.features);
        if let Err((a, b)) = crate::features::check_conflicts(&self.features) {
            return Err(ConfigError::FeatureConflict(a, b));
        }
        if horizontal && self.config.reverse {
            return Err(ConfigError::HorizontalIncompatible("reverse"));
        }
        if horizontal || self.config.reverse {
            for feature in &self.features {
                if feature.name() == "sections" || feature.name() == "grid" {
                    let reason = if horizontal { "horizontal" } else { "reverse" };
                    return Err(ConfigError::HorizontalIncompatible(
                        if reason == "horizontal" { "sections/grid" } else { "reverse" },
                    ));
                }
            }
        }

        let total = self.config.items.len();
        let (size_mode, size_cache) = if horizontal {
            match (&self.config.item.width, self.config.item.estimated_width) {
                (Some(SizeSpec::Constant(w)), _) => (SizeMode::Explicit, SizeCache::fixed(*w, total)),
                (Some(SizeSpec::PerIndex(f)), _) => {
                    let f = f.clone();
                    (SizeMode::Explicit, SizeCache::variable(total, move |i| f(i)))
                }
                (None, Some(estimate)) => (SizeMode::Measured, SizeCache::measured(estimate, total)),
                (None, None) => return Err(ConfigError::MissingSize("horizontal")),
            }
        } else {
            match (&self.config.item.height, self.config.item.estimated_height) {
                (Some(SizeSpec::Constant(h)), _) => (SizeMode::Explicit, SizeCache::fixed(*h, total)),
                (Some(SizeSpec::PerIndex(f)), _) => {
                    let f = f.clone();
                    (SizeMode::Explicit, SizeCache::variable(total, move |i| f(i)))
                }
                (None, Some(estimate)) => (SizeMode::Measured, SizeCache::measured(estimate, total)),
                (None, None) => return Err(ConfigError::MissingSize("vertical")),
            }
        };

        // --- 2. DOM structure (§6 DOM output contract) ----------------------------
        root.set_class_name(&self.config.class_prefix);
        let _ = root.set_attribute("role", "listbox");
        let _ = root.set_attribute("tabindex", "0");
        if let Some(label) = &self.config.aria_label {
            let _ = root.set_attribute("aria-label", label);
        }
        if horizontal {
            let _ = root.set_attribute("aria-orientation", "horizontal");
        }

        let viewport = dom::create_element(&document, "div", &format!("{}-viewport", self.config.class_prefix));
        dom::set_overflow(&viewport, horizontal, "auto");
        let content = dom::create_element(&document, "div", &format!("{}-content", self.config.class_prefix));
        if let Ok(html) = content.clone().dyn_into::<web_sys::HtmlElement>() {
            let _ = html.style().set_property("position", "relative");
        }
        let items_el = dom::create_element(&document, "div", &format!("{}-items", self.config.class_prefix));
        if let Ok(html) = items_el.clone().dyn_into::<web_sys::HtmlElement>() {
            let _ = html.style().set_property("contain", "layout");
        }

        let _ = content.append_child(&items_el);
        let _ = viewport.append_child(&content);
        let _ = root.append_child(&viewport);
        dom::set_main_axis_size(&content, size_cache.get_total_size(), horizontal);

        // --- 3. Components ---------------------------------------------------------
        let template = self.config.item.template.take().expect("checked above");
        let renderer = Renderer::new(document.clone(), items_el.clone(), horizontal, size_mode, template, self.config.class_prefix.clone());

        let initial_mode = if self.config.scroll.window_scroll {
            ScrollMode::Window
        } else {
            ScrollMode::Native
        };
        let mut scroll_controller = ScrollController::new(window.clone(), viewport.clone(), initial_mode, horizontal);
        scroll_controller.set_idle_timeout(self.config.scroll.idle_timeout_ms);
        scroll_controller.set_wheel_scroll(self.config.scroll.wheel);
        let scroll = Rc::new(RefCell::new(scroll_controller));

        let compression = CompressionState::compute(total, &size_cache);
        let data = DataSource::Simple(self.config.items);
        let emitter = Emitter::new();

        let ctx = Rc::new(RefCell::new(Context {
            document: document.clone(),
            root: root.clone(),
            viewport: viewport.clone(),
            content: content.clone(),
            items_el: items_el.clone(),
            class_prefix: self.config.class_prefix.clone(),
            horizontal,
            overscan: self.config.overscan,
            size_cache,
            renderer,
            scroll,
            data,
            state: EngineState::default(),
            viewport_state: ViewportState::default(),
            compression,
            resize_observation_enabled: true,
            use_window_container_size: false,
            resize_observer: None,
            grid: None,
            header_for: None,
            item_index_for: None,
            emitter,
            after_scroll: Vec::new(),
            click_handlers: Vec::new(),
            keydown_handlers: Vec::new(),
            resize_handlers: Vec::new(),
            content_size_handlers: Vec::new(),
            destroy_handlers: Vec::new(),
            methods: HashMap::new(),
        }));

        // --- 4/5. Feature pipeline ---------------------------------------------------
        if self.config.scroll.window_scroll {
            self.features.push(Box::new(crate::features::page::PageFeature));
        }
        match self.config.scroll.scrollbar {
            ScrollbarMode::Custom(opts) => {
                self.features
                    .push(Box::new(crate::features::scrollbar::ScrollbarFeature::new(opts)));
            }
            ScrollbarMode::Native | ScrollbarMode::None => {}
        }
        for feature in &self.features {
            log::info!("vlist: setting up feature `{}`", feature.name());
            feature.setup(&ctx);
        }

        if matches!(size_mode, SizeMode::Measured) {
            if let Some(observer) = wire_measurement_observer(&ctx) {
                ctx.borrow_mut().renderer.set_measure_observer(observer);
            }
        }

        // --- 6. DOM listeners ---------------------------------------------------------
        wire_listeners(&ctx);

        // --- 7. Initial render ---------------------------------------------------------
        refresh(&ctx);

        log::info!("vlist: built instance with {total} items, {} features", self.features.len());
        Ok(Instance::new(ctx, self.features))
    }
}

/// Recomputes ranges from current scroll position and re-renders — shared by the initial
/// render and every mutation that can change `total`/sizes (§4.1's per-frame pipeline).
pub fn refresh<T>(ctx: &Shared<T>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let (total, pos, container_size, horizontal, overscan) = {
        let c = ctx.borrow();
        (
            c.total(),
            c.viewport_state.scroll_position,
            c.viewport_state.container_size,
            c.horizontal,
            c.overscan,
        )
    };

    let container_size = if container_size > 0.0 {
        container_size
    } else {
        let measured = dom::measure_main_axis_size(&ctx.borrow().viewport, horizontal);
        measured
    };

    let (grid, has_header_map) = {
        let c = ctx.borrow();
        (c.grid, c.header_for.is_some())
    };
    // Under `withGrid`/`withSections`, `size_cache`'s own total is row count or slot count,
    // not item count; ranges must be computed in that space (§4.9).
    let size_total = if grid.is_some() || has_header_map {
        ctx.borrow().size_cache.get_total()
    } else {
        total
    };

    let mut visible = Range::EMPTY;
    let mut render_range = Range::EMPTY;
    {
        let mut c = ctx.borrow_mut();
        c.compression = CompressionState::compute(size_total, &c.size_cache);
        let size_cache = c.size_cache.clone();
        let compression = c.compression;
        crate::viewport::visible_range(pos, container_size, &size_cache, size_total, &compression, &mut visible);
        crate::viewport::calculate_render_range(&visible, overscan, size_total, &mut render_range);
        c.viewport_state.container_size = container_size;
        c.viewport_state.visible_range = visible;
        c.viewport_state.render_range = render_range;

        if let DataSource::Async(manager) = &c.data {
            let item_range = if let Some(g) = grid {
                Range::new(
                    (visible.start * g.columns).min(total),
                    (visible.end * g.columns).min(total),
                )
            } else if size_total == 0 {
                visible
            } else if let Some(item_index_for) = c.item_index_for.clone() {
                let last_slot = (visible.end.saturating_sub(1)).min(size_total - 1);
                let first_slot = visible.start.min(last_slot);
                Range::new(item_index_for(first_slot), item_index_for(last_slot) + 1)
            } else {
                visible
            };
            manager.borrow_mut().evict_if_needed(item_range);
        }
    }

    // Grid renders against a row-flattened item range; sections stay in slot space since
    // `header_for`/`item_index_for` already resolve slot→item per index.
    let dom_range = if let Some(g) = grid {
        Range::new(
            (render_range.start * g.columns).min(total),
            (render_range.end * g.columns).min(total),
        )
    } else {
        render_range
    };

    let (selected, focused, compression) = {
        let c = ctx.borrow();
        (c.state.selected.clone(), c.state.focused_index, c.compression)
    };

    {
        let mut c = ctx.borrow_mut();
        let c = &mut *c;
        let item_index_for = c.item_index_for.clone();
        let header_for = c.header_for.clone();
        let get_item = |i: usize| {
            let real = item_index_for.as_ref().map(|f| f(i)).unwrap_or(i);
            c.data.get(real).map(|item| (item, real))
        };
        c.renderer.render(
            total,
            dom_range,
            get_item,
            &selected,
            focused,
            &c.size_cache,
            if compression.is_compressed { Some(&compression) } else { None },
            header_for.as_deref(),
            grid,
        );
    }

    ctx.borrow().emitter.emit(
        &names::RANGE_CHANGE.to_string(),
        &VlistEvent::RangeChange { range: visible.into() },
    );
}

fn wire_listeners<T>(ctx: &Shared<T>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let root: web_sys::EventTarget = ctx.borrow().root.clone().into();

    let click_ctx = ctx.clone();
    dom::add_event_listener::<MouseEvent>(&root, "click", move |event: MouseEvent| {
        Context::dispatch_click(&click_ctx, &event);
    });

    let keydown_ctx = ctx.clone();
    dom::add_event_listener::<KeyboardEvent>(&root, "keydown", move |event: KeyboardEvent| {
        Context::dispatch_keydown(&keydown_ctx, &event);
    });

    let wheel_ctx = ctx.clone();
    let wheel_target: web_sys::EventTarget = wheel_ctx.borrow().viewport.clone().into();
    dom::add_event_listener::<WheelEvent>(&wheel_target, "wheel", move |event: WheelEvent| {
        let handled = {
            let scroll = wheel_ctx.borrow().scroll.clone();
            scroll
                .borrow_mut()
                .handle_wheel_delta(event.delta_x(), event.delta_y())
        };
        if handled {
            event.prevent_default();
            on_scroll_tick(&wheel_ctx);
        }
    });

    let scroll_ctx = ctx.clone();
    let scroll_target: web_sys::EventTarget = scroll_ctx.borrow().viewport.clone().into();
    dom::add_event_listener::<web_sys::Event>(&scroll_target, "scroll", move |_event: web_sys::Event| {
        on_scroll_tick(&scroll_ctx);
    });

    if ctx.borrow().use_window_container_size {
        let window_ctx = ctx.clone();
        let window = ctx.borrow().document.default_view().expect("document has a window");
        let window_target: web_sys::EventTarget = window.clone().into();
        dom::add_event_listener::<web_sys::Event>(&window_target, "scroll", move |_event: web_sys::Event| {
            on_scroll_tick(&window_ctx);
        });
    }

    if ctx.borrow().resize_observation_enabled {
        wire_resize_observer(ctx);
    }
}

/// One RAF-throttled scroll update (§4.6): read+clamp position, update velocity, recompute
/// ranges, render, emit `scroll`/`velocity:change`, run `afterScroll` hooks, schedule idle.
fn on_scroll_tick<T>(ctx: &Shared<T>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let window = ctx.borrow().document.default_view().expect("document has a window");
    let now = dom::now_ms(&window);
    let clamp_max = {
        let c = ctx.borrow();
        (c.size_cache.get_total_size() - c.viewport_state.container_size).max(0.0)
    };

    let scroll = ctx.borrow().scroll.clone();
    let payload = scroll.borrow_mut().process_scroll(now, clamp_max);
    ctx.borrow_mut().viewport_state.scroll_position = payload.scroll_position;

    refresh(ctx);

    ctx.borrow().emitter.emit(
        &names::SCROLL.to_string(),
        &VlistEvent::Scroll {
            scroll_position: payload.scroll_position,
            direction: payload.direction,
        },
    );
    ctx.borrow().emitter.emit(
        &names::VELOCITY_CHANGE.to_string(),
        &VlistEvent::VelocityChange {
            velocity: payload.velocity,
            reliable: payload.reliable,
        },
    );

    Context::run_after_scroll(ctx);

    let ctx_idle = ctx.clone();
    crate::scroll::ScrollController::schedule_idle_check(&scroll, move || {
        ctx_idle.borrow().emitter.emit(
            &names::VELOCITY_CHANGE.to_string(),
            &VlistEvent::VelocityChange {
                velocity: 0.0,
                reliable: true,
            },
        );
        Context::run_after_scroll(&ctx_idle);
        flush_pending_content_size_write(&ctx_idle);
    });
}

/// Writes the content element's main-axis size if a measurement batch deferred it while
/// the user was mid-scroll (§4.5's deferred correction in measured mode).
fn flush_pending_content_size_write<T>(ctx: &Shared<T>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let mut c = ctx.borrow_mut();
    if !c.state.pending_content_size_write {
        return;
    }
    c.state.pending_content_size_write = false;
    let total_size = c.size_cache.get_total_size();
    let horizontal = c.horizontal;
    dom::set_main_axis_size(&c.content, total_size, horizontal);
}

/// Per-item `ResizeObserver` for Mode B (§4.5): newly rendered unmeasured elements are
/// observed by `Renderer::apply_size`; this callback records each batch's measurements,
/// corrects scroll position for items above the viewport, and rebuilds the size cache.
fn wire_measurement_observer<T>(ctx: &Shared<T>) -> Option<web_sys::ResizeObserver>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let horizontal = ctx.borrow().horizontal;
    let measure_ctx = ctx.clone();
    let observer_cell: Rc<RefCell<Option<web_sys::ResizeObserver>>> = Rc::new(RefCell::new(None));
    let cell_for_cb = observer_cell.clone();

    let callback = wasm_bindgen::closure::Closure::wrap(Box::new(move |entries: js_sys::Array| {
        let mut scroll_delta = 0.0;
        let mut any_measured = false;

        for i in 0..entries.length() {
            let Some(entry) = entries.get(i).dyn_ref::<web_sys::ResizeObserverEntry>().cloned() else {
                continue;
            };
            let target = entry.target();
            let Some(index) = target
                .get_attribute("data-index")
                .and_then(|s| s.parse::<usize>().ok())
            else {
                continue;
            };
            let rect = entry.content_rect();
            let size = if horizontal { rect.width() } else { rect.height() };
            if size <= 0.0 {
                log::warn!("vlist: measured size collapsed to zero for index {index}");
                continue;
            }

            let (estimate, first_visible) = {
                let c = measure_ctx.borrow();
                let estimate = c.size_cache.as_measured().map(|m| m.estimate()).unwrap_or(size);
                (estimate, c.viewport_state.visible_range.start)
            };
            {
                let mut c = measure_ctx.borrow_mut();
                if let Some(measured) = c.size_cache.as_measured_mut() {
                    measured.measure(index, size);
                }
            }
            dom::set_main_axis_size(&target, size, horizontal);
            if let Some(observer) = cell_for_cb.borrow().as_ref() {
                observer.unobserve(&target);
            }
            if index < first_visible {
                scroll_delta += size - estimate;
            }
            any_measured = true;
        }

        if !any_measured {
            return;
        }

        let total = measure_ctx.borrow().total();
        let (clamp_max, is_scrolling, scroll) = {
            let mut c = measure_ctx.borrow_mut();
            c.size_cache.rebuild(total);
            let clamp_max = (c.size_cache.get_total_size() - c.viewport_state.container_size).max(0.0);
            let scroll = c.scroll.clone();
            let is_scrolling = scroll.borrow().is_scrolling();
            (clamp_max, is_scrolling, scroll)
        };

        if scroll_delta != 0.0 {
            // Above-viewport items got bigger/smaller: shift position immediately so
            // on-screen content doesn't appear to move (§8 "measurement scroll
            // correction").
            let new_pos = scroll.borrow_mut().apply_delta(scroll_delta, clamp_max);
            measure_ctx.borrow_mut().viewport_state.scroll_position = new_pos;
        }

        if is_scrolling {
            measure_ctx.borrow_mut().state.pending_content_size_write = true;
        } else {
            let (content, total_size) = {
                let c = measure_ctx.borrow();
                (c.content.clone(), c.size_cache.get_total_size())
            };
            dom::set_main_axis_size(&content, total_size, horizontal);
        }

        refresh(&measure_ctx);
    }) as Box<dyn FnMut(js_sys::Array)>);

    let observer = web_sys::ResizeObserver::new(callback.as_ref().unchecked_ref()).ok()?;
    *observer_cell.borrow_mut() = Some(observer.clone());
    // Leaked deliberately, same rationale as `wire_resize_observer`: the callback must
    // outlive this function and there's no tracked handle for `destroy()` to drop it.
    callback.forget();
    Some(observer)
}

fn wire_resize_observer<T>(ctx: &Shared<T>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let resize_ctx = ctx.clone();
    let horizontal = ctx.borrow().horizontal;
    let callback = wasm_bindgen::closure::Closure::wrap(Box::new(move |entries: js_sys::Array| {
        let Some(entry) = entries.get(0).dyn_ref::<web_sys::ResizeObserverEntry>().cloned() else {
            return;
        };
        let rect = entry.content_rect();
        let (height, width) = (rect.height(), rect.width());
        {
            let mut c = resize_ctx.borrow_mut();
            c.viewport_state.container_size = if horizontal { width } else { height };
        }
        refresh(&resize_ctx);
        resize_ctx.borrow().emitter.emit(&names::RESIZE.to_string(), &VlistEvent::Resize { height, width });
        Context::run_resize_handlers(&resize_ctx, height, width);
    }) as Box<dyn FnMut(js_sys::Array)>);

    if let Ok(observer) = web_sys::ResizeObserver::new(callback.as_ref().unchecked_ref()) {
        let _ = observer.observe(&ctx.borrow().viewport);
        // The callback closure itself is leaked (no tracked handle for it), but the
        // observer handle is retained on `Context` so `destroy()` can disconnect it.
        callback.forget();
        ctx.borrow_mut().resize_observer = Some(observer);
    }
}
