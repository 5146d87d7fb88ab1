//! withAsync (§4.9, §4.10): replaces the simple data source with a chunked store and
//! registers velocity-aware range loading on the `afterScroll` hook.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::{Context, DataSource, Shared};
use crate::data::manager::{Adapter, DEFAULT_INITIAL_LOAD};
use crate::data::DataManager;
use crate::item::Identified;
use crate::range::Range;
use crate::vlist_event::{names, VlistEvent};

pub struct AsyncConfig {
    pub cancel_threshold: f64,
    pub preload_threshold: f64,
    pub preload_ahead: usize,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        AsyncConfig {
            cancel_threshold: 25.0,
            preload_threshold: 2.0,
            preload_ahead: 20,
        }
    }
}

pub struct AsyncFeature<T: Identified> {
    adapter: Rc<dyn Adapter<T>>,
    config: AsyncConfig,
}

impl<T: Identified> AsyncFeature<T> {
    pub fn new(adapter: Rc<dyn Adapter<T>>, config: AsyncConfig) -> Self {
        AsyncFeature { adapter, config }
    }
}

impl<T> crate::features::Feature<T> for AsyncFeature<T>
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "async"
    }

    fn setup(&self, ctx: &Shared<T>) {
        let total = ctx.borrow().total();
        let manager = Rc::new(RefCell::new(DataManager::<T>::new(total)));
        ctx.borrow_mut().data = DataSource::Async(manager.clone());

        let adapter = self.adapter.clone();
        let cancel_threshold = self.config.cancel_threshold;
        let preload_threshold = self.config.preload_threshold;
        let preload_ahead = self.config.preload_ahead;

        ctx.borrow_mut().after_scroll.push(Rc::new(move |shared| {
            let (velocity, reliable, visible, direction_forward) = {
                let ctx = shared.borrow();
                let scroll = ctx.scroll.borrow();
                (
                    scroll.velocity().abs(),
                    scroll.is_velocity_reliable(),
                    ctx.viewport_state.visible_range,
                    scroll.velocity() >= 0.0,
                )
            };

            if reliable && velocity > cancel_threshold {
                return;
            }

            let mut requested = visible;
            if reliable && velocity > preload_threshold {
                if direction_forward {
                    requested.end = (requested.end + preload_ahead).min(shared.borrow().total());
                } else {
                    requested.start = requested.start.saturating_sub(preload_ahead);
                }
            }

            dispatch_load(shared.clone(), manager.clone(), adapter.clone(), requested);
        }));

        // Initial page load so the first render has real data rather than placeholders
        // for every index.
        let initial = Range::new(0, DEFAULT_INITIAL_LOAD.min(total.max(DEFAULT_INITIAL_LOAD)));
        dispatch_load(ctx.clone(), manager, self.adapter.clone(), initial);
    }
}

fn dispatch_load<T>(
    shared: Shared<T>,
    manager: Rc<RefCell<DataManager<T>>>,
    adapter: Rc<dyn Adapter<T>>,
    requested: Range,
) where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    if requested.is_empty() {
        return;
    }
    let futures = DataManager::load_range(&manager, adapter, requested.start, requested.len());
    if futures.is_empty() {
        return;
    }

    shared.borrow().emitter.emit(
        &names::LOAD_START.to_string(),
        &VlistEvent::LoadStart {
            offset: requested.start,
            limit: requested.len(),
        },
    );

    for fut in futures {
        let shared = shared.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if shared.borrow().state.is_destroyed {
                return;
            }
            match fut.await {
                Ok(()) => {
                    if shared.borrow().state.is_destroyed {
                        return;
                    }
                    crate::builder::refresh(&shared);
                    shared.borrow().emitter.emit(
                        &names::LOAD_END.to_string(),
                        &VlistEvent::LoadEnd {
                            items: Vec::new(),
                            total: None,
                            offset: Some(requested.start),
                        },
                    );
                }
                Err(err) => {
                    if shared.borrow().state.is_destroyed {
                        return;
                    }
                    shared.borrow().emitter.emit(
                        &names::ERROR.to_string(),
                        &VlistEvent::Error {
                            error: err,
                            context: "async load".to_string(),
                        },
                    );
                    shared.borrow().emitter.emit(
                        &names::LOAD_END.to_string(),
                        &VlistEvent::LoadEnd {
                            items: Vec::new(),
                            total: None,
                            offset: Some(requested.start),
                        },
                    );
                }
            }
        });
    }
}
