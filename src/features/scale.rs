//! withScale (§4.2, §4.9): keeps `CompressionState` wired to the live data size and adds
//! inertial touch scrolling — drag to set position directly, release to decay under
//! friction until the velocity dies or the content edge clamps it.

use std::cell::RefCell;
use std::rc::Rc;

use web_sys::TouchEvent;

use crate::compression::CompressionState;
use crate::context::Shared;
use crate::item::Identified;
use crate::scroll::ScrollMode;

pub struct ScaleConfig {
    /// Per-frame (16ms) velocity multiplier; lower decays faster.
    pub friction: f64,
    /// Momentum stops once `|velocity|` (px/ms) falls below this.
    pub min_velocity: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        ScaleConfig {
            friction: 0.95,
            min_velocity: 0.02,
        }
    }
}

pub struct ScaleFeature {
    config: ScaleConfig,
}

impl ScaleFeature {
    pub fn new(config: ScaleConfig) -> Self {
        ScaleFeature { config }
    }
}

/// Exponential decay scaled to `dt_ms` so frame-rate hiccups don't change the perceived
/// deceleration curve.
pub fn decay_velocity(velocity: f64, friction: f64, dt_ms: f64) -> f64 {
    velocity * friction.powf(dt_ms / 16.0)
}

/// Edge clamping: momentum never carries the position past `[0, max]`.
pub fn clamp_position(pos: f64, max: f64) -> f64 {
    pos.clamp(0.0, max.max(0.0))
}

struct TouchState {
    last_pos: f64,
    last_t: f64,
    velocity: f64,
}

impl<T> crate::features::Feature<T> for ScaleFeature
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "scale"
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["page"]
    }

    fn setup(&self, ctx: &Shared<T>) {
        // Re-derive compression whenever the content size changes, per §4.2's "read from
        // getTotalSize() each frame, not cached per item" rule.
        ctx.borrow_mut()
            .content_size_handlers
            .push(Rc::new(|shared| {
                let mut ctx = shared.borrow_mut();
                let total = ctx.total();
                ctx.compression = CompressionState::compute(total, &ctx.size_cache);
                let mode = if ctx.compression.is_compressed {
                    ScrollMode::Compressed
                } else {
                    ScrollMode::Native
                };
                if ctx.scroll.borrow().mode() != mode {
                    ctx.scroll.borrow_mut().switch_mode(mode);
                    // Native scrolling is meaningless once the controller owns position
                    // internally; the viewport's own scrollbar would fight it.
                    let overflow = if mode == ScrollMode::Compressed { "hidden" } else { "auto" };
                    let horizontal = ctx.horizontal;
                    crate::dom::set_overflow(&ctx.viewport, horizontal, overflow);
                }
            }));

        let (root, window, horizontal) = {
            let ctx = ctx.borrow();
            (
                ctx.root.clone(),
                ctx.document.default_view().expect("document has a window"),
                ctx.horizontal,
            )
        };

        let touch_state: Rc<RefCell<Option<TouchState>>> = Rc::new(RefCell::new(None));
        let friction = self.config.friction;
        let min_velocity = self.config.min_velocity;

        let shared = ctx.clone();
        let state = touch_state.clone();
        crate::dom::add_event_listener::<TouchEvent>(&root, "touchstart", {
            let shared = shared.clone();
            move |evt: TouchEvent| {
                if let Some(touch) = evt.touches().get(0) {
                    let pos = if horizontal {
                        touch.client_x() as f64
                    } else {
                        touch.client_y() as f64
                    };
                    let now = crate::dom::now_ms(&shared.borrow().document.default_view().expect("document has a window"));
                    shared.borrow().scroll.borrow_mut().cancel_scroll();
                    *state.borrow_mut() = Some(TouchState {
                        last_pos: pos,
                        last_t: now,
                        velocity: 0.0,
                    });
                }
            }
        });

        let state = touch_state.clone();
        let shared = ctx.clone();
        crate::dom::add_event_listener::<TouchEvent>(&root, "touchmove", {
            move |evt: TouchEvent| {
                let Some(touch) = evt.touches().get(0) else {
                    return;
                };
                let pos = if horizontal {
                    touch.client_x() as f64
                } else {
                    touch.client_y() as f64
                };
                let now = crate::dom::now_ms(&shared.borrow().document.default_view().expect("document has a window"));
                let mut guard = state.borrow_mut();
                let Some(touch_state) = guard.as_mut() else {
                    return;
                };
                let dt = (now - touch_state.last_t).max(1.0);
                let delta = touch_state.last_pos - pos;
                touch_state.velocity = delta / dt;
                touch_state.last_pos = pos;
                touch_state.last_t = now;

                let scroll = shared.borrow().scroll.clone();
                scroll.borrow_mut().handle_wheel_delta(
                    if horizontal { delta } else { 0.0 },
                    if horizontal { 0.0 } else { delta },
                );
                crate::context::Context::run_after_scroll(&shared);
            }
        });

        let state = touch_state.clone();
        let shared = ctx.clone();
        crate::dom::add_event_listener::<TouchEvent>(&root, "touchend", move |_evt: TouchEvent| {
            let Some(touch_state) = state.borrow_mut().take() else {
                return;
            };
            if touch_state.velocity.abs() < min_velocity {
                return;
            }
            step_momentum(shared.clone(), touch_state.velocity, window.clone(), friction, min_velocity, horizontal);
        });
    }
}

fn step_momentum<T>(
    shared: Shared<T>,
    velocity: f64,
    window: web_sys::Window,
    friction: f64,
    min_velocity: f64,
    horizontal: bool,
) where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let start = crate::dom::now_ms(&window);
    crate::dom::request_animation_frame(&window, move || {
        if shared.borrow().state.is_destroyed {
            return;
        }
        let now = crate::dom::now_ms(&window);
        let dt = (now - start).max(1.0);
        let next_velocity = decay_velocity(velocity, friction, dt);
        let delta = next_velocity * dt;

        let max = {
            let ctx = shared.borrow();
            (ctx.size_cache.get_total_size() - ctx.viewport_state.container_size).max(0.0)
        };
        let scroll = shared.borrow().scroll.clone();
        scroll.borrow_mut().apply_delta(delta, max);
        crate::context::Context::run_after_scroll(&shared);

        if next_velocity.abs() >= min_velocity {
            step_momentum(shared.clone(), next_velocity, window, friction, min_velocity, horizontal);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_velocity_shrinks_each_frame() {
        let v1 = decay_velocity(10.0, 0.95, 16.0);
        let v2 = decay_velocity(v1, 0.95, 16.0);
        assert!(v2 < v1);
        assert!(v1 < 10.0);
    }

    #[test]
    fn clamp_position_respects_bounds() {
        assert_eq!(clamp_position(-5.0, 100.0), 0.0);
        assert_eq!(clamp_position(150.0, 100.0), 100.0);
        assert_eq!(clamp_position(50.0, 100.0), 50.0);
    }
}
