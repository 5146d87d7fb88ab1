//! withGrid (§4.9): row-major grid layout. Replaces the virtual item-count function with
//! `ceil(itemCount/columns)` rows and recomputes column width on resize.

use std::rc::Rc;

use crate::context::Shared;
use crate::item::Identified;

pub struct GridConfig {
    pub columns: usize,
    pub gap: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig { columns: 1, gap: 0.0 }
    }
}

pub struct GridFeature {
    config: GridConfig,
}

impl GridFeature {
    pub fn new(config: GridConfig) -> Self {
        GridFeature { config }
    }
}

/// Per-instance grid layout state read by `builder::refresh` and `Renderer` once
/// `withGrid` is active. `column_width` is recomputed on resize.
#[derive(Clone, Copy)]
pub struct GridState {
    pub columns: usize,
    pub gap: f64,
    pub column_width: f64,
}

pub fn row_count(item_count: usize, columns: usize) -> usize {
    if columns == 0 {
        return item_count;
    }
    (item_count + columns - 1) / columns
}

pub fn column_width(container_width: f64, columns: usize, gap: f64) -> f64 {
    if columns == 0 {
        return container_width;
    }
    let total_gap = gap * (columns.saturating_sub(1)) as f64;
    ((container_width - total_gap) / columns as f64).max(0.0)
}

/// Maps a flat item index to its `(row, col)` in the grid.
pub fn cell_of(index: usize, columns: usize) -> (usize, usize) {
    if columns == 0 {
        (index, 0)
    } else {
        (index / columns, index % columns)
    }
}

/// Rebuilds `size_cache` over row count instead of item count, recomputes the column
/// width from the viewport's current measured width, and writes the new total through to
/// the content element's main-axis size. Shared by `setup` (initial layout) and the
/// `contentSize` hook (re-run whenever the item count changes).
fn recompute<T>(shared: &Shared<T>, columns: usize, gap: f64)
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let (viewport, content, horizontal) = {
        let c = shared.borrow();
        (c.viewport.clone(), c.content.clone(), c.horizontal)
    };
    let container_width = crate::dom::measure_main_axis_size(&viewport, true);
    let column_width_px = column_width(container_width, columns, gap);

    let mut c = shared.borrow_mut();
    let total = c.total();
    let rows = row_count(total, columns);
    c.size_cache.rebuild(rows);
    c.grid = Some(GridState {
        columns,
        gap,
        column_width: column_width_px,
    });
    let total_size = c.size_cache.get_total_size();
    crate::dom::set_main_axis_size(&content, total_size, horizontal);
}

impl<T> crate::features::Feature<T> for GridFeature
where
    T: Identified<Id = String> + Clone + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        "grid"
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["sections", "horizontal"]
    }

    fn setup(&self, ctx: &Shared<T>) {
        let columns = self.config.columns.max(1);
        let gap = self.config.gap;

        recompute(ctx, columns, gap);

        ctx.borrow_mut().content_size_handlers.push(Rc::new(move |shared| {
            recompute(shared, columns, gap);
        }));

        ctx.borrow_mut()
            .resize_handlers
            .push(Rc::new(move |shared, _height, width| {
                let col_width = column_width(width, columns, gap);
                {
                    let mut c = shared.borrow_mut();
                    if let Some(grid) = &mut c.grid {
                        grid.column_width = col_width;
                    }
                }
                log::debug!("vlist grid: recomputed column width {col_width}px for {columns} columns");
                crate::builder::refresh(shared);
            }));
    }

    fn destroy(&self, ctx: &Shared<T>) {
        ctx.borrow_mut().grid = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_rounds_up() {
        assert_eq!(row_count(10, 3), 4);
        assert_eq!(row_count(9, 3), 3);
        assert_eq!(row_count(0, 3), 0);
    }

    #[test]
    fn column_width_accounts_for_gaps() {
        let w = column_width(300.0, 3, 10.0);
        assert!((w - (280.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn cell_of_maps_row_major() {
        assert_eq!(cell_of(7, 3), (2, 1));
        assert_eq!(cell_of(0, 3), (0, 0));
    }
}
