//! withPage (§4.9): lets the list scroll with the surrounding document instead of owning a
//! fixed-height scroll container, for long pages where vlist is just one section.

use crate::context::Shared;
use crate::item::Identified;
use crate::scroll::ScrollMode;

pub struct PageFeature;

/// `window.innerHeight`/`innerWidth` stand in for `containerSize` once the viewport no
/// longer owns its own scrollable box.
pub fn window_container_size(window: &web_sys::Window, horizontal: bool) -> f64 {
    let dim = if horizontal {
        window.inner_width()
    } else {
        window.inner_height()
    };
    dim.ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

impl<T> crate::features::Feature<T> for PageFeature
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "page"
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["scale"]
    }

    fn setup(&self, ctx: &Shared<T>) {
        let scroll = ctx.borrow().scroll.clone();
        scroll.borrow_mut().switch_mode(ScrollMode::Window);
        scroll.borrow_mut().set_wheel_scroll(false);

        let mut ctx = ctx.borrow_mut();
        ctx.resize_observation_enabled = false;
        ctx.use_window_container_size = true;
    }
}
