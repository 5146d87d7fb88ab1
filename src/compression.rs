//! Scroll-space compression (§4.2). Browsers clamp scrollable content around 16M px;
//! beyond that, logical content size is remapped onto a bounded physical scroll range
//! via a ratio, and every per-frame read goes through `getTotalSize()` rather than a
//! value cached at construction — a changed measurement changes the ratio for free.

use crate::size_cache::SizeCache;

/// Design constant (§4.2): browsers get unreliable with scrollable content larger than
/// this, so logical content beyond it is compressed onto a virtual range of this size.
pub const SAFE_SCROLL_SIZE: f64 = 16_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionState {
    pub is_compressed: bool,
    pub actual_size: f64,
    pub virtual_size: f64,
    pub ratio: f64,
    fingerprint: usize,
}

impl CompressionState {
    pub fn uncompressed(actual_size: f64, fingerprint: usize) -> Self {
        CompressionState {
            is_compressed: false,
            actual_size,
            virtual_size: actual_size,
            ratio: 1.0,
            fingerprint,
        }
    }

    /// Recompute from the cache's current total size. Cheap enough to call every frame —
    /// callers cache the result only to avoid recomputing the fingerprint comparison, not
    /// to avoid this call.
    pub fn compute(total: usize, size_cache: &SizeCache) -> Self {
        let actual_size = size_cache.get_total_size();
        if actual_size > SAFE_SCROLL_SIZE {
            CompressionState {
                is_compressed: true,
                actual_size,
                virtual_size: SAFE_SCROLL_SIZE,
                ratio: SAFE_SCROLL_SIZE / actual_size,
                fingerprint: total,
            }
        } else {
            CompressionState::uncompressed(actual_size, total)
        }
    }

    /// True when `total` no longer matches the fingerprint this state was computed for —
    /// callers use this to decide whether `compute` must run again before trusting `ratio`.
    pub fn is_stale(&self, total: usize) -> bool {
        self.fingerprint != total
    }
}

/// Physical scroll position → logical offset, the inverse of compression's `ratio` scale.
fn logical_offset(physical_pos: f64, compression: &CompressionState) -> f64 {
    if compression.is_compressed {
        physical_pos / compression.ratio
    } else {
        physical_pos
    }
}

/// Logical offset → physical scroll position.
pub fn physical_offset(logical_pos: f64, compression: &CompressionState) -> f64 {
    if compression.is_compressed {
        logical_pos * compression.ratio
    } else {
        logical_pos
    }
}

/// Maps a physical scroll position to the first visible logical index, then walks forward
/// until rendered content fills `container_size`. Mirrors `simpleVisibleRange`'s shape but
/// operates in logical space via the ratio (§4.2).
pub fn compressed_visible_range(
    physical_pos: f64,
    container_size: f64,
    size_cache: &SizeCache,
    total: usize,
    compression: &CompressionState,
    out: &mut crate::range::Range,
) {
    if total == 0 {
        out.set(0, 0);
        return;
    }
    let logical_pos = logical_offset(physical_pos, compression);
    let start = size_cache.index_at_offset(logical_pos);
    let mut end = start;
    let mut filled = size_cache.get_size(start);
    while filled < container_size && end + 1 < total {
        end += 1;
        filled += size_cache.get_size(end);
    }
    out.set(start, (end + 1).min(total));
}

/// Logical pixel offset for `index`, scaled by the compression ratio, with a stabilization
/// bias relative to `range_start` so a row already on screen doesn't visibly drift as the
/// user drags (§4.2, §9 open question — bias form approximated from the invariant that the
/// item at `range_start` keeps its physical position across nearby frames).
pub fn compressed_item_position(
    index: usize,
    range_start: usize,
    size_cache: &SizeCache,
    total: usize,
    compression: &CompressionState,
) -> f64 {
    if !compression.is_compressed {
        return size_cache.get_offset(index);
    }
    if total > 0 && index + 1 >= total {
        // Exact-bottom snap: final row is flush with the bottom of the virtual range.
        let item_size = size_cache.get_size(index);
        return compression.virtual_size - item_size;
    }
    let anchor_logical = size_cache.get_offset(range_start);
    let anchor_physical = anchor_logical * compression.ratio;
    let delta_logical = size_cache.get_offset(index) - anchor_logical;
    anchor_physical + delta_logical * compression.ratio
}

/// Inverse of `compressed_visible_range`'s start mapping: logical index → physical scroll
/// position, with `align='end'` using the exact-bottom form so the last item is flush.
pub fn compressed_scroll_to_index(
    index: usize,
    size_cache: &SizeCache,
    total: usize,
    compression: &CompressionState,
    container_size: f64,
    align_end: bool,
) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let index = index.min(total - 1);
    if align_end {
        let logical_end = size_cache.get_offset(index + 1);
        let logical_pos = (logical_end - container_size).max(0.0);
        return physical_offset(logical_pos, compression);
    }
    physical_offset(size_cache.get_offset(index), compression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Range;

    #[test]
    fn uncompressed_below_threshold() {
        let cache = SizeCache::fixed(50.0, 1000);
        let state = CompressionState::compute(1000, &cache);
        assert!(!state.is_compressed);
        assert_eq!(state.ratio, 1.0);
    }

    #[test]
    fn threshold_boundary() {
        let total_at_threshold = (SAFE_SCROLL_SIZE / 50.0) as usize;
        let cache = SizeCache::fixed(50.0, total_at_threshold);
        let state = CompressionState::compute(total_at_threshold, &cache);
        assert!(!state.is_compressed);

        let cache_over = SizeCache::fixed(50.0, total_at_threshold + 1);
        let state_over = CompressionState::compute(total_at_threshold + 1, &cache_over);
        assert!(state_over.is_compressed);
    }

    #[test]
    fn million_items_ratio_matches_scenario() {
        // §8 scenario 3: 1,000,000 items × 50px → ratio 0.32.
        let cache = SizeCache::fixed(50.0, 1_000_000);
        let state = CompressionState::compute(1_000_000, &cache);
        assert!(state.is_compressed);
        assert_eq!(state.actual_size, 50_000_000.0);
        assert!((state.ratio - 0.32).abs() < 1e-9);
    }

    #[test]
    fn scroll_to_index_matches_scenario() {
        let cache = SizeCache::fixed(50.0, 1_000_000);
        let state = CompressionState::compute(1_000_000, &cache);
        let physical = compressed_scroll_to_index(500_000, &cache, 1_000_000, &state, 0.0, false);
        assert!((physical - 8_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn visible_range_after_wheel_delta_matches_scenario() {
        let cache = SizeCache::fixed(50.0, 1_000_000);
        let state = CompressionState::compute(1_000_000, &cache);
        let mut out = Range::EMPTY;
        compressed_visible_range(8_000_100.0, 200.0, &cache, 1_000_000, &state, &mut out);
        assert_eq!(out.start, 500_006);
    }

    #[test]
    fn stale_fingerprint_detected() {
        let cache = SizeCache::fixed(50.0, 1000);
        let state = CompressionState::compute(1000, &cache);
        assert!(!state.is_stale(1000));
        assert!(state.is_stale(1001));
    }
}
