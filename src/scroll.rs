//! Scroll controller (§4.6): unifies native, compressed, and window scroll modes behind
//! one position/velocity interface, RAF-throttled, with idle detection and a plain
//! state-machine smooth-scroll animation (§9 design note: no coroutines, just a struct
//! advanced frame by frame).

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, Window};

use crate::dom;
use crate::velocity::VelocityTracker;
use crate::viewport::ScrollDirection;

const DEFAULT_IDLE_TIMEOUT_MS: i32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    Native,
    Compressed,
    Window,
}

pub struct ScrollEventPayload {
    pub scroll_position: f64,
    pub direction: ScrollDirection,
    pub velocity: f64,
    pub reliable: bool,
}

struct SmoothScrollAnim {
    start_time_ms: f64,
    start_pos: f64,
    target_pos: f64,
    duration_ms: f64,
}

fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u / 2.0
    }
}

/// Single source of truth for scroll position depends on mode (§9): native/window read
/// from the DOM; compressed tracks an internal variable because the real scrollbar is
/// disabled.
pub struct ScrollController {
    window: Window,
    viewport: Element,
    mode: ScrollMode,
    horizontal: bool,
    idle_timeout_ms: i32,
    wheel_scroll: bool,
    last_position: f64,
    compressed_position: f64,
    is_scrolling: bool,
    idle_timer_id: Rc<RefCell<i32>>,
    velocity_tracker: VelocityTracker,
    anim: Rc<RefCell<Option<SmoothScrollAnim>>>,
    anim_cancel_flag: Rc<RefCell<bool>>,
}

impl ScrollController {
    pub fn new(window: Window, viewport: Element, mode: ScrollMode, horizontal: bool) -> Self {
        ScrollController {
            window,
            viewport,
            mode,
            horizontal,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            wheel_scroll: true,
            last_position: 0.0,
            compressed_position: 0.0,
            is_scrolling: false,
            idle_timer_id: Rc::new(RefCell::new(0)),
            velocity_tracker: VelocityTracker::new(8, 3),
            anim: Rc::new(RefCell::new(None)),
            anim_cancel_flag: Rc::new(RefCell::new(false)),
        }
    }

    pub fn set_idle_timeout(&mut self, ms: i32) {
        self.idle_timeout_ms = ms;
    }

    pub fn set_wheel_scroll(&mut self, enabled: bool) {
        self.wheel_scroll = enabled;
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling
    }

    /// Reads the raw position from the mode's source of truth.
    pub fn read_position(&self) -> f64 {
        match self.mode {
            ScrollMode::Native => {
                if self.horizontal {
                    self.viewport.scroll_left() as f64
                } else {
                    self.viewport.scroll_top() as f64
                }
            }
            ScrollMode::Compressed => self.compressed_position,
            ScrollMode::Window => {
                let rect = self.viewport.get_bounding_client_rect();
                (-rect.top()).max(0.0)
            }
        }
    }

    fn write_position(&mut self, pos: f64) {
        match self.mode {
            ScrollMode::Native => {
                if self.horizontal {
                    self.viewport.set_scroll_left(pos as i32);
                } else {
                    self.viewport.set_scroll_top(pos as i32);
                }
            }
            ScrollMode::Compressed => {
                self.compressed_position = pos;
            }
            ScrollMode::Window => {
                let list_doc_top = self
                    .viewport
                    .dyn_ref::<HtmlElement>()
                    .map(|el| el.offset_top() as f64)
                    .unwrap_or(0.0);
                self.window.scroll_to_with_x_and_y(0.0, list_doc_top + pos);
            }
        }
    }

    /// Switching modes converts the current tracked position so the view doesn't jump.
    pub fn switch_mode(&mut self, new_mode: ScrollMode) {
        let current = self.read_position();
        self.mode = new_mode;
        self.write_position(current);
        self.last_position = current;
    }

    /// Clamps and processes one RAF-throttled scroll update, returning the payload to
    /// hand to `onScroll`. `now_ms` and `clamp_max` let callers (and tests) avoid reading
    /// from a live `Performance`/`SizeCache`.
    pub fn process_scroll(&mut self, now_ms: f64, clamp_max: f64) -> ScrollEventPayload {
        let raw = self.read_position().clamp(0.0, clamp_max.max(0.0));
        let direction = crate::viewport::detect_direction(self.last_position, raw);
        let velocity = self.velocity_tracker.update(raw, now_ms);
        let reliable = self.velocity_tracker.is_tracking();

        self.last_position = raw;
        self.is_scrolling = true;

        ScrollEventPayload {
            scroll_position: raw,
            direction,
            velocity,
            reliable,
        }
    }

    /// Schedules (or re-schedules) the idle timer; the last call before it fires wins, so
    /// a scroll controller driven every frame never calls `on_idle` mid-scroll. Call this
    /// once per `process_scroll` from the code that owns an `Rc<RefCell<Self>>`.
    pub fn schedule_idle_check(controller: &Rc<RefCell<Self>>, on_idle: impl Fn() + 'static) {
        let (window, timeout_ms, timer_cell) = {
            let ctrl = controller.borrow();
            (
                ctrl.window.clone(),
                ctrl.idle_timeout_ms,
                ctrl.idle_timer_id.clone(),
            )
        };
        dom::clear_timeout(&window, *timer_cell.borrow());
        let controller = controller.clone();
        let id = dom::set_timeout(&window, timeout_ms, move || {
            controller.borrow_mut().is_scrolling = false;
            on_idle();
        });
        *timer_cell.borrow_mut() = id;
    }

    pub fn velocity(&self) -> f64 {
        self.velocity_tracker.velocity()
    }

    pub fn is_velocity_reliable(&self) -> bool {
        self.velocity_tracker.is_tracking()
    }

    /// Wheel interception for native horizontal mode: translates `deltaY` to horizontal
    /// scroll unless `deltaX` is already present. Returns `true` if the event should be
    /// prevented (compressed mode, or `wheelScroll=false`).
    pub fn handle_wheel_delta(&mut self, delta_x: f64, delta_y: f64) -> bool {
        if !self.wheel_scroll {
            return true;
        }
        match self.mode {
            ScrollMode::Compressed => {
                let delta = if self.horizontal && delta_x.abs() > 0.0 {
                    delta_x
                } else {
                    delta_y
                };
                self.compressed_position = (self.compressed_position + delta).max(0.0);
                true
            }
            ScrollMode::Native if self.horizontal && delta_x == 0.0 => {
                let current = self.viewport.scroll_left();
                self.viewport.set_scroll_left(current + delta_y as i32);
                true
            }
            _ => false,
        }
    }

    /// Applies a raw position delta regardless of mode (used by touch momentum, which
    /// isn't a wheel event and so bypasses `handle_wheel_delta`'s routing). Returns the
    /// resulting position after `clamp_max` is applied.
    pub fn apply_delta(&mut self, delta: f64, clamp_max: f64) -> f64 {
        let pos = (self.read_position() + delta).clamp(0.0, clamp_max.max(0.0));
        self.write_position(pos);
        self.last_position = pos;
        pos
    }

    pub fn cancel_scroll(&mut self) {
        *self.anim_cancel_flag.borrow_mut() = true;
        *self.anim.borrow_mut() = None;
    }

    /// Starts (or replaces) a smooth-scroll animation. Each frame writes both the DOM
    /// scroll offset and `last_position` BEFORE the caller's render callback runs, so
    /// render range never lags behind the animated position (§9 design note).
    pub fn scroll_to(
        controller: &Rc<RefCell<Self>>,
        target_pos: f64,
        duration_ms: f64,
        now_ms: f64,
        on_frame: impl Fn() + 'static,
    ) {
        let start_pos = controller.borrow().read_position();
        *controller.borrow().anim_cancel_flag.borrow_mut() = false;
        let cancel_flag = controller.borrow().anim_cancel_flag.clone();
        *controller.borrow().anim.borrow_mut() = Some(SmoothScrollAnim {
            start_time_ms: now_ms,
            start_pos,
            target_pos,
            duration_ms,
        });

        Self::step(controller.clone(), cancel_flag, Rc::new(on_frame));
    }

    fn step(
        controller: Rc<RefCell<Self>>,
        cancel_flag: Rc<RefCell<bool>>,
        on_frame: Rc<dyn Fn()>,
    ) {
        let window = controller.borrow().window.clone();
        let controller_for_raf = controller.clone();
        let cancel_flag_for_raf = cancel_flag.clone();
        let on_frame_for_raf = on_frame.clone();
        dom::request_animation_frame(&window, move || {
            if *cancel_flag_for_raf.borrow() {
                return;
            }
            let now = dom::now_ms(&controller_for_raf.borrow().window.clone());
            let done = {
                let mut ctrl = controller_for_raf.borrow_mut();
                let Some(anim) = ctrl.anim.borrow().as_ref().map(|a| {
                    (a.start_time_ms, a.start_pos, a.target_pos, a.duration_ms)
                }) else {
                    return;
                };
                let (start_time, start_pos, target_pos, duration) = anim;
                let elapsed = (now - start_time).max(0.0);
                let t = if duration <= 0.0 {
                    1.0
                } else {
                    (elapsed / duration).min(1.0)
                };
                let eased = ease_in_out_quad(t);
                let pos = start_pos + (target_pos - start_pos) * eased;
                ctrl.write_position(pos);
                ctrl.last_position = pos;
                t >= 1.0
            };
            on_frame_for_raf();
            if done {
                *controller_for_raf.borrow().anim.borrow_mut() = None;
            } else {
                ScrollController::step(controller_for_raf.clone(), cancel_flag, on_frame);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_in_out_quad_boundaries() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert!((ease_in_out_quad(1.0) - 1.0).abs() < 1e-9);
        assert!((ease_in_out_quad(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn ease_in_out_quad_is_monotonic() {
        let mut prev = -1.0;
        let mut t = 0.0;
        while t <= 1.0 {
            let v = ease_in_out_quad(t);
            assert!(v >= prev);
            prev = v;
            t += 0.1;
        }
    }
}
