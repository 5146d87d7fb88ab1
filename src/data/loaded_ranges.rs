//! Compact loaded-range bookkeeping for the sparse data store (§3, §4.10): a sorted list
//! of disjoint, non-adjacent half-open ranges, plus gap computation against a requested
//! window.

use crate::range::Range;

#[derive(Debug, Default, Clone)]
pub struct LoadedRanges {
    ranges: Vec<Range>,
}

impl LoadedRanges {
    pub fn new() -> Self {
        LoadedRanges { ranges: Vec::new() }
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(index))
    }

    pub fn as_slice(&self) -> &[Range] {
        &self.ranges
    }

    /// Merges `new_range` into the set, coalescing with any overlapping or adjacent
    /// existing range so the list stays minimal.
    pub fn mark_loaded(&mut self, new_range: Range) {
        if new_range.is_empty() {
            return;
        }
        self.ranges.push(new_range);
        self.ranges.sort_by_key(|r| r.start);

        let mut merged: Vec<Range> = Vec::with_capacity(self.ranges.len());
        for r in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if r.start <= last.end => {
                    last.end = last.end.max(r.end);
                }
                _ => merged.push(r),
            }
        }
        self.ranges = merged;
    }

    /// Drops ranges/portions at or beyond `total` after a shrink, and shifts ranges
    /// starting at/after `from` by `delta` after a prepend/insert at `from`.
    pub fn shift_from(&mut self, from: usize, delta: isize) {
        for r in self.ranges.iter_mut() {
            if r.start >= from {
                r.start = shift(r.start, delta);
                r.end = shift(r.end, delta);
            } else if r.end > from {
                r.end = shift(r.end, delta);
            }
        }
        self.ranges.retain(|r| !r.is_empty());
    }

    pub fn truncate_to(&mut self, total: usize) {
        for r in self.ranges.iter_mut() {
            r.end = r.end.min(total);
            r.start = r.start.min(total);
        }
        self.ranges.retain(|r| !r.is_empty());
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Returns the missing sub-ranges inside `[offset, offset+limit)`, merging contiguous
    /// gaps (§4.10 `loadRange`).
    pub fn missing_ranges(&self, requested: Range) -> Vec<Range> {
        if requested.is_empty() {
            return Vec::new();
        }
        let mut gaps = Vec::new();
        let mut cursor = requested.start;
        for r in &self.ranges {
            if r.end <= cursor || r.start >= requested.end {
                continue;
            }
            if r.start > cursor {
                gaps.push(Range::new(cursor, r.start.min(requested.end)));
            }
            cursor = cursor.max(r.end);
            if cursor >= requested.end {
                break;
            }
        }
        if cursor < requested.end {
            gaps.push(Range::new(cursor, requested.end));
        }
        gaps
    }
}

fn shift(value: usize, delta: isize) -> usize {
    if delta >= 0 {
        value + delta as usize
    } else {
        value.saturating_sub((-delta) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ranges_on_empty_store_is_whole_request() {
        let loaded = LoadedRanges::new();
        let gaps = loaded.missing_ranges(Range::new(0, 50));
        assert_eq!(gaps, vec![Range::new(0, 50)]);
    }

    #[test]
    fn missing_ranges_skips_loaded_portion() {
        let mut loaded = LoadedRanges::new();
        loaded.mark_loaded(Range::new(10, 20));
        let gaps = loaded.missing_ranges(Range::new(0, 30));
        assert_eq!(gaps, vec![Range::new(0, 10), Range::new(20, 30)]);
    }

    #[test]
    fn adjacent_ranges_coalesce() {
        let mut loaded = LoadedRanges::new();
        loaded.mark_loaded(Range::new(0, 10));
        loaded.mark_loaded(Range::new(10, 20));
        assert_eq!(loaded.as_slice(), &[Range::new(0, 20)]);
    }

    #[test]
    fn overlapping_ranges_merge() {
        let mut loaded = LoadedRanges::new();
        loaded.mark_loaded(Range::new(0, 15));
        loaded.mark_loaded(Range::new(10, 25));
        assert_eq!(loaded.as_slice(), &[Range::new(0, 25)]);
    }

    #[test]
    fn fully_covered_request_has_no_gaps() {
        let mut loaded = LoadedRanges::new();
        loaded.mark_loaded(Range::new(0, 100));
        assert!(loaded.missing_ranges(Range::new(10, 20)).is_empty());
    }
}
