//! Viewport/range computation (§4.3). Both hot functions mutate a caller-supplied
//! out-`Range` — no allocation on the scroll path.

use crate::compression::CompressionState;
use crate::range::Range;
use crate::size_cache::SizeCache;

/// Non-compressed visible-range computation: binary search for the first visible index,
/// then walk forward until cumulative size fills the container.
pub fn simple_visible_range(
    pos: f64,
    container_size: f64,
    size_cache: &SizeCache,
    total: usize,
    out: &mut Range,
) {
    if total == 0 {
        out.set(0, 0);
        return;
    }
    let start = size_cache.index_at_offset(pos);
    let mut end = start;
    let mut filled = size_cache.get_size(start);
    while filled < container_size && end + 1 < total {
        end += 1;
        filled += size_cache.get_size(end);
    }
    out.set(start, (end + 1).min(total));
}

/// Dispatches to the compressed or plain path depending on `compression.is_compressed`.
pub fn visible_range(
    pos: f64,
    container_size: f64,
    size_cache: &SizeCache,
    total: usize,
    compression: &CompressionState,
    out: &mut Range,
) {
    if compression.is_compressed {
        crate::compression::compressed_visible_range(
            pos,
            container_size,
            size_cache,
            total,
            compression,
            out,
        );
    } else {
        simple_visible_range(pos, container_size, size_cache, total, out);
    }
}

/// Render range = visible range expanded by `overscan` on each side, clamped to `[0,total)`.
pub fn calculate_render_range(visible: &Range, overscan: usize, total: usize, out: &mut Range) {
    if total == 0 {
        out.set(0, 0);
        return;
    }
    let start = visible.start.saturating_sub(overscan);
    let end = (visible.end + overscan).min(total);
    out.set(start, end);
}

/// Monotonic scroll-direction detection: compares previous and current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
    None,
}

pub fn detect_direction(prev_pos: f64, current_pos: f64) -> ScrollDirection {
    if current_pos > prev_pos {
        ScrollDirection::Forward
    } else if current_pos < prev_pos {
        ScrollDirection::Backward
    } else {
        ScrollDirection::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_height_simple_scroll_scenario() {
        // §8 scenario 1: 1000 items, height 50, container 500px, overscan 0.
        let cache = SizeCache::fixed(50.0, 1000);
        let mut visible = Range::EMPTY;
        simple_visible_range(0.0, 500.0, &cache, 1000, &mut visible);
        assert_eq!(visible, Range::new(0, 10));

        simple_visible_range(5000.0, 500.0, &cache, 1000, &mut visible);
        assert_eq!(visible, Range::new(100, 110));
    }

    #[test]
    fn variable_height_binary_search_scenario() {
        // §8 scenario 2: alternating [30,40], container 200, pos 340 -> indices 9..14.
        let cache = SizeCache::variable(1000, |i| if i % 2 == 0 { 30.0 } else { 40.0 });
        let mut visible = Range::EMPTY;
        simple_visible_range(340.0, 200.0, &cache, 1000, &mut visible);
        assert_eq!(visible.start, 9);
        assert_eq!(visible.end, 15);
    }

    #[test]
    fn render_range_expands_and_clamps() {
        let visible = Range::new(5, 15);
        let mut render = Range::EMPTY;
        calculate_render_range(&visible, 3, 1000, &mut render);
        assert_eq!(render, Range::new(2, 18));

        calculate_render_range(&visible, 10, 12, &mut render);
        assert_eq!(render, Range::new(0, 12));
    }

    #[test]
    fn empty_total_yields_empty_ranges() {
        let cache = SizeCache::fixed(50.0, 0);
        let mut visible = Range::EMPTY;
        simple_visible_range(0.0, 500.0, &cache, 0, &mut visible);
        assert!(visible.is_empty());

        let mut render = Range::EMPTY;
        calculate_render_range(&visible, 3, 0, &mut render);
        assert!(render.is_empty());
    }

    #[test]
    fn single_item_larger_than_container() {
        let cache = SizeCache::fixed(900.0, 1);
        let mut visible = Range::EMPTY;
        simple_visible_range(0.0, 500.0, &cache, 1, &mut visible);
        assert_eq!(visible, Range::new(0, 1));
    }

    #[test]
    fn direction_detection() {
        assert_eq!(detect_direction(0.0, 10.0), ScrollDirection::Forward);
        assert_eq!(detect_direction(10.0, 0.0), ScrollDirection::Backward);
        assert_eq!(detect_direction(5.0, 5.0), ScrollDirection::None);
    }
}
