//! withSelection (§4.9 scenario 6): click/keyboard-driven single, multiple, or
//! range-extending selection with `aria-activedescendant` tracking.

use crate::context::{closest_item_index, Context, Shared};
use crate::item::Identified;
use crate::vlist_event::{names, VlistEvent};
use web_sys::KeyboardEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Single,
    Multiple,
}

pub struct SelectionConfig {
    pub mode: SelectionMode,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            mode: SelectionMode::Single,
        }
    }
}

pub struct SelectionFeature {
    config: SelectionConfig,
}

impl SelectionFeature {
    pub fn new(config: SelectionConfig) -> Self {
        SelectionFeature { config }
    }
}

/// Computes the new selected-id set for a click, given modifier keys and the previously
/// focused index (for Shift-extend). Pure so it's independently testable.
pub fn apply_click<T: Identified<Id = String> + Clone>(
    mode: SelectionMode,
    current: &std::collections::HashSet<String>,
    items_in_range: impl Fn(usize, usize) -> Vec<T>,
    clicked_index: usize,
    clicked_id: &str,
    anchor_index: Option<usize>,
    shift: bool,
    ctrl_or_cmd: bool,
) -> std::collections::HashSet<String> {
    let mut next = current.clone();
    match mode {
        SelectionMode::Single => {
            next.clear();
            next.insert(clicked_id.to_string());
        }
        SelectionMode::Multiple => {
            if shift {
                if let Some(anchor) = anchor_index {
                    let (lo, hi) = if anchor <= clicked_index {
                        (anchor, clicked_index)
                    } else {
                        (clicked_index, anchor)
                    };
                    for item in items_in_range(lo, hi + 1) {
                        next.insert(item.id());
                    }
                } else {
                    next.insert(clicked_id.to_string());
                }
            } else if ctrl_or_cmd {
                if !next.insert(clicked_id.to_string()) {
                    next.remove(clicked_id);
                }
            } else {
                next.clear();
                next.insert(clicked_id.to_string());
            }
        }
    }
    next
}

impl<T> crate::features::Feature<T> for SelectionFeature
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "selection"
    }

    fn setup(&self, ctx: &Shared<T>) {
        let mode = self.config.mode;

        let click_ctx = ctx.clone();
        ctx.borrow_mut().click_handlers.push(std::rc::Rc::new(
            move |shared: &Shared<T>, event: &web_sys::MouseEvent| {
                let Some(target) = event.target() else {
                    return;
                };
                let Some(index) = closest_item_index(&target) else {
                    return;
                };
                let (clicked_id, anchor, current) = {
                    let ctx = shared.borrow();
                    let Some(item) = ctx.data.get(index) else {
                        return;
                    };
                    (item.id(), ctx.state.focused_index, ctx.state.selected.clone())
                };
                let shift = event.shift_key();
                let ctrl = event.ctrl_key() || event.meta_key();

                let next = {
                    let ctx = shared.borrow();
                    apply_click(
                        mode,
                        &current,
                        |lo, hi| {
                            (lo..hi)
                                .filter_map(|i| ctx.data.get(i))
                                .collect::<Vec<T>>()
                        },
                        index,
                        &clicked_id,
                        anchor,
                        shift,
                        ctrl,
                    )
                };

                let items: Vec<T> = {
                    let ctx = shared.borrow();
                    next.iter()
                        .filter_map(|id| {
                            (0..ctx.total()).find_map(|i| {
                                ctx.data.get(i).filter(|it| &it.id() == id)
                            })
                        })
                        .collect()
                };

                let (root, class_prefix) = {
                    let mut ctx = shared.borrow_mut();
                    ctx.state.selected = next.clone();
                    ctx.state.focused_index = Some(index);
                    (ctx.root.clone(), ctx.class_prefix.clone())
                };
                let _ = root.set_attribute("aria-activedescendant", &format!("{class_prefix}-option-{index}"));
                shared.borrow().emitter.emit(
                    &names::SELECTION_CHANGE.to_string(),
                    &VlistEvent::SelectionChange {
                        selected: next.into_iter().collect(),
                        items,
                    },
                );
                let _ = &click_ctx;
            },
        ));

        ctx.borrow_mut().keydown_handlers.push(std::rc::Rc::new(
            move |shared: &Shared<T>, event: &KeyboardEvent| {
                handle_keydown(shared, event, mode);
            },
        ));
    }
}

fn handle_keydown<T>(shared: &Shared<T>, event: &KeyboardEvent, mode: SelectionMode)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let total = shared.borrow().total();
    if total == 0 {
        return;
    }
    let current_focus = shared.borrow().state.focused_index.unwrap_or(0);

    match event.key().as_str() {
        "ArrowDown" => {
            let next = (current_focus + 1).min(total - 1);
            move_focus(shared, current_focus, next, mode, event.shift_key());
        }
        "ArrowUp" => {
            let next = current_focus.saturating_sub(1);
            move_focus(shared, current_focus, next, mode, event.shift_key());
        }
        " " => {
            if let Some(index) = shared.borrow().state.focused_index {
                toggle_one(shared, index);
            }
        }
        "a" | "A" => {
            if (event.ctrl_key() || event.meta_key()) && mode == SelectionMode::Multiple {
                select_all(shared);
            }
        }
        "Escape" => {
            clear_selection(shared);
        }
        _ => {}
    }
}

/// Moves focus from `from` to `to`, extending the selection over the traversed range when
/// Shift is held in multiple-selection mode (mirrors `apply_click`'s shift-extend), updates
/// `aria-activedescendant` to the newly focused option, and re-renders so the focus ring
/// and any newly selected rows repaint immediately.
fn move_focus<T>(shared: &Shared<T>, from: usize, to: usize, mode: SelectionMode, shift: bool)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    if shift && mode == SelectionMode::Multiple {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        let current = shared.borrow().state.selected.clone();
        let next = {
            let ctx = shared.borrow();
            let mut next = current;
            for i in lo..=hi {
                if let Some(item) = ctx.data.get(i) {
                    next.insert(item.id());
                }
            }
            next
        };
        shared.borrow_mut().state.selected = next.clone();
        emit_selection(shared, next);
    }

    let (root, class_prefix) = {
        let mut ctx = shared.borrow_mut();
        ctx.state.focused_index = Some(to);
        (ctx.root.clone(), ctx.class_prefix.clone())
    };
    let _ = root.set_attribute("aria-activedescendant", &format!("{class_prefix}-option-{to}"));

    crate::builder::refresh(shared);
}

fn toggle_one<T>(shared: &Shared<T>, index: usize)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let Some(item) = shared.borrow().data.get(index) else {
        return;
    };
    let id = item.id();
    let next = {
        let mut ctx = shared.borrow_mut();
        if !ctx.state.selected.insert(id.clone()) {
            ctx.state.selected.remove(&id);
        }
        ctx.state.selected.clone()
    };
    emit_selection(shared, next);
}

fn select_all<T>(shared: &Shared<T>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let total = shared.borrow().total();
    let ids: std::collections::HashSet<String> = (0..total)
        .filter_map(|i| shared.borrow().data.get(i).map(|it| it.id()))
        .collect();
    shared.borrow_mut().state.selected = ids.clone();
    emit_selection(shared, ids);
}

fn clear_selection<T>(shared: &Shared<T>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    shared.borrow_mut().state.selected.clear();
    emit_selection(shared, std::collections::HashSet::new());
}

fn emit_selection<T>(shared: &Shared<T>, selected: std::collections::HashSet<String>)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let items: Vec<T> = {
        let ctx = shared.borrow();
        (0..ctx.total())
            .filter_map(|i| ctx.data.get(i).filter(|it| selected.contains(&it.id())))
            .collect()
    };
    shared.borrow().emitter.emit(
        &names::SELECTION_CHANGE.to_string(),
        &VlistEvent::SelectionChange {
            selected: selected.into_iter().collect(),
            items,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row(String);
    impl Identified for Row {
        type Id = String;
        fn id(&self) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn single_mode_replaces_selection() {
        let mut current = std::collections::HashSet::new();
        current.insert("3".to_string());
        let next = apply_click::<Row>(
            SelectionMode::Single,
            &current,
            |_, _| vec![],
            5,
            "5",
            None,
            false,
            false,
        );
        assert_eq!(next.len(), 1);
        assert!(next.contains("5"));
    }

    #[test]
    fn multiple_mode_ctrl_toggles() {
        let mut current = std::collections::HashSet::new();
        current.insert("5".to_string());
        let next = apply_click::<Row>(
            SelectionMode::Multiple,
            &current,
            |_, _| vec![],
            5,
            "5",
            None,
            false,
            true,
        );
        assert!(!next.contains("5"));
    }

    #[test]
    fn multiple_mode_shift_extends_range() {
        let current = std::collections::HashSet::new();
        let items = |lo: usize, hi: usize| -> Vec<Row> {
            (lo..hi).map(|i| Row(i.to_string())).collect()
        };
        let next = apply_click(
            SelectionMode::Multiple,
            &current,
            items,
            9,
            "9",
            Some(5),
            true,
            false,
        );
        for id in ["5", "6", "7", "8", "9"] {
            assert!(next.contains(id), "missing {id}");
        }
    }
}
