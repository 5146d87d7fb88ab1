//! Shared DOM plumbing: RAF/timeout scheduling and small element helpers used by the
//! scroll controller, renderer, and builder. Grounded in the teacher's own
//! `requestAnimationFrame` binding and `Closure::once_into_js` scheduling idiom.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Window};

/// Schedules `f` to run on the next animation frame. Fire-and-forget: the closure is
/// converted with `once_into_js` so it outlives the call and is dropped by the JS engine
/// after invocation, matching the teacher's `virtual_list.rs` scroll-throttle pattern.
pub fn request_animation_frame(window: &Window, f: impl FnOnce() + 'static) {
    let closure = Closure::once_into_js(f);
    let _ = window.request_animation_frame(closure.unchecked_ref());
}

/// Schedules `f` after `delay_ms`. Returns the timer id so callers can `clear_timeout` a
/// superseded scheduling (idle detection keeps only the most recent timer).
pub fn set_timeout(window: &Window, delay_ms: i32, f: impl FnOnce() + 'static) -> i32 {
    let closure = Closure::once_into_js(f);
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.unchecked_ref(),
            delay_ms,
        )
        .unwrap_or(0)
}

pub fn clear_timeout(window: &Window, id: i32) {
    if id != 0 {
        window.clear_timeout_with_handle(id);
    }
}

pub fn now_ms(window: &Window) -> f64 {
    window
        .performance()
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Resolves a container reference: an element passed directly, or a CSS selector string
/// looked up via `document.querySelector`.
pub fn resolve_container(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

pub fn create_element(document: &Document, tag: &str, class_name: &str) -> Element {
    let el = document
        .create_element(tag)
        .expect("document.createElement must not fail for a static tag name");
    el.set_class_name(class_name);
    el
}

pub fn set_translate(el: &Element, offset_px: f64, horizontal: bool) {
    if let Ok(html_el) = el.clone().dyn_into::<HtmlElement>() {
        let style = html_el.style();
        let transform = if horizontal {
            format!("translateX({offset_px}px)")
        } else {
            format!("translateY({offset_px}px)")
        };
        let _ = style.set_property("transform", &transform);
    }
}

pub fn set_main_axis_size(el: &Element, size_px: f64, horizontal: bool) {
    if let Ok(html_el) = el.clone().dyn_into::<HtmlElement>() {
        let style = html_el.style();
        let prop = if horizontal { "width" } else { "height" };
        let _ = style.set_property(prop, &format!("{size_px}px"));
    }
}

/// Two-axis translate for `withGrid` cells: `main_offset` is the row position along the
/// scroll axis, `cross_offset` the column position perpendicular to it.
pub fn set_translate_2d(el: &Element, main_offset: f64, cross_offset: f64, horizontal: bool) {
    if let Ok(html_el) = el.clone().dyn_into::<HtmlElement>() {
        let style = html_el.style();
        let transform = if horizontal {
            format!("translate({main_offset}px, {cross_offset}px)")
        } else {
            format!("translate({cross_offset}px, {main_offset}px)")
        };
        let _ = style.set_property("transform", &transform);
    }
}

/// Sets both axes of a `withGrid` cell: `main_size` along the scroll axis (row height),
/// `cross_size` the column width.
pub fn set_cell_size(el: &Element, main_size: f64, cross_size: f64, horizontal: bool) {
    if let Ok(html_el) = el.clone().dyn_into::<HtmlElement>() {
        let style = html_el.style();
        let (main_prop, cross_prop) = if horizontal { ("width", "height") } else { ("height", "width") };
        let _ = style.set_property(main_prop, &format!("{main_size}px"));
        let _ = style.set_property(cross_prop, &format!("{cross_size}px"));
    }
}

pub fn measure_main_axis_size(el: &Element, horizontal: bool) -> f64 {
    let rect = el.get_bounding_client_rect();
    if horizontal {
        rect.width()
    } else {
        rect.height()
    }
}

/// Toggles `overflow-x`/`overflow-y` on the main axis, leaving the cross axis at `hidden`.
/// Used both at construction and by `withScale` when compression flips native scrolling off.
pub fn set_overflow(el: &Element, horizontal: bool, value: &str) {
    if let Ok(html_el) = el.clone().dyn_into::<HtmlElement>() {
        let style = html_el.style();
        let (main, cross) = if horizontal {
            ("overflow-x", "overflow-y")
        } else {
            ("overflow-y", "overflow-x")
        };
        let _ = style.set_property(main, value);
        let _ = style.set_property(cross, "hidden");
    }
}

/// Wires a long-lived listener, matching the teacher's `Closure::wrap` + `.forget()`
/// idiom (`routes/videos_live_tag.rs`, `stores/cashu_ws.rs`): the closure is leaked
/// deliberately because its lifetime is the element's, which outlives the call site.
pub fn add_event_listener<E: wasm_bindgen::JsCast>(
    target: &web_sys::EventTarget,
    event: &str,
    f: impl FnMut(E) + 'static,
) {
    let mut f = f;
    let closure = Closure::wrap(Box::new(move |evt: web_sys::Event| {
        if let Ok(typed) = evt.dyn_into::<E>() {
            f(typed);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    let _ = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
    closure.forget();
}
