//! Index↔offset mapping along the main axis (§4.1). A tagged-variant factory rather than
//! a trait object — design note in §9: "replace dynamic dispatch over size modes with a
//! tagged-variant factory returning one of three immutable implementations of the same
//! operation set." `Measured` wraps the same prefix-sum machinery `Variable` uses rather
//! than delegating to a boxed `Variable` instance, to avoid self-referential closures.

use std::collections::HashMap;
use std::rc::Rc;

fn build_prefix(total: usize, mut size_at: impl FnMut(usize) -> f64) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(total + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for i in 0..total {
        acc += size_at(i).max(0.0);
        prefix.push(acc);
    }
    prefix
}

/// Binary search for the index whose half-open `[offset(i), offset(i+1))` contains `x`.
/// `prefix` has length `total + 1`. Clamps below 0 to index 0 and at/above total size to
/// `total - 1`, per §4.1.
fn index_at_offset_in(prefix: &[f64], total: usize, x: f64) -> usize {
    if total == 0 {
        return 0;
    }
    let total_size = prefix[total];
    if x <= 0.0 {
        return 0;
    }
    if x >= total_size {
        return total - 1;
    }
    let mut lo = 0usize;
    let mut hi = total;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if prefix[mid + 1] <= x {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo.min(total - 1)
}

#[derive(Clone)]
pub struct FixedSizeCache {
    size: f64,
    total: usize,
}

impl FixedSizeCache {
    pub fn new(size: f64, total: usize) -> Self {
        FixedSizeCache {
            size: size.max(0.0),
            total,
        }
    }

    pub fn rebuild(&mut self, total: usize) {
        self.total = total;
    }

    pub fn get_offset(&self, i: usize) -> f64 {
        i.min(self.total) as f64 * self.size
    }

    pub fn get_size(&self, i: usize) -> f64 {
        if i < self.total {
            self.size
        } else {
            0.0
        }
    }

    pub fn get_total_size(&self) -> f64 {
        self.total as f64 * self.size
    }

    pub fn get_total(&self) -> usize {
        self.total
    }

    pub fn index_at_offset(&self, x: f64) -> usize {
        if self.total == 0 {
            return 0;
        }
        if x <= 0.0 {
            return 0;
        }
        let total_size = self.get_total_size();
        if x >= total_size || self.size <= 0.0 {
            return self.total - 1;
        }
        ((x / self.size).floor() as usize).min(self.total - 1)
    }
}

#[derive(Clone)]
pub struct VariableSizeCache {
    size_fn: Rc<dyn Fn(usize) -> f64>,
    prefix: Vec<f64>,
    total: usize,
}

impl VariableSizeCache {
    pub fn new(total: usize, size_fn: impl Fn(usize) -> f64 + 'static) -> Self {
        let size_fn: Rc<dyn Fn(usize) -> f64> = Rc::new(size_fn);
        let prefix = build_prefix(total, |i| (size_fn)(i));
        VariableSizeCache {
            size_fn,
            prefix,
            total,
        }
    }

    pub fn rebuild(&mut self, total: usize) {
        let size_fn = self.size_fn.clone();
        self.prefix = build_prefix(total, |i| (size_fn)(i));
        self.total = total;
    }

    pub fn get_offset(&self, i: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.prefix[i.min(self.total)]
    }

    pub fn get_size(&self, i: usize) -> f64 {
        if i >= self.total {
            0.0
        } else {
            self.prefix[i + 1] - self.prefix[i]
        }
    }

    pub fn get_total_size(&self) -> f64 {
        self.prefix.last().copied().unwrap_or(0.0)
    }

    pub fn get_total(&self) -> usize {
        self.total
    }

    pub fn index_at_offset(&self, x: f64) -> usize {
        index_at_offset_in(&self.prefix, self.total, x)
    }
}

/// Estimated size + sparse override map. Unmeasured indices fall back to the estimate.
/// `rebuild` drops measurements for indices that no longer exist but keeps the rest,
/// satisfying "rebuild preserves measurements for surviving indices" (§3).
#[derive(Clone)]
pub struct MeasuredSizeCache {
    estimate: f64,
    measurements: HashMap<usize, f64>,
    prefix: Vec<f64>,
    total: usize,
}

impl MeasuredSizeCache {
    pub fn new(estimate: f64, total: usize) -> Self {
        let estimate = estimate.max(0.0);
        let prefix = build_prefix(total, |_| estimate);
        MeasuredSizeCache {
            estimate,
            measurements: HashMap::new(),
            prefix,
            total,
        }
    }

    /// Record a measured size for `index`. Does not rebuild the prefix sum — callers
    /// batch measurements and call `rebuild` once per batch (§4.5 step 3).
    pub fn measure(&mut self, index: usize, size: f64) {
        self.measurements.insert(index, size.max(0.0));
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.measurements.contains_key(&index)
    }

    pub fn measured_size(&self, index: usize) -> Option<f64> {
        self.measurements.get(&index).copied()
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn rebuild(&mut self, total: usize) {
        self.measurements.retain(|&index, _| index < total);
        let estimate = self.estimate;
        let measurements = &self.measurements;
        let prefix = build_prefix(total, |i| {
            measurements.get(&i).copied().unwrap_or(estimate)
        });
        self.prefix = prefix;
        self.total = total;
    }

    pub fn get_offset(&self, i: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.prefix[i.min(self.total)]
    }

    pub fn get_size(&self, i: usize) -> f64 {
        if i >= self.total {
            0.0
        } else {
            self.prefix[i + 1] - self.prefix[i]
        }
    }

    pub fn get_total_size(&self) -> f64 {
        self.prefix.last().copied().unwrap_or(0.0)
    }

    pub fn get_total(&self) -> usize {
        self.total
    }

    pub fn index_at_offset(&self, x: f64) -> usize {
        index_at_offset_in(&self.prefix, self.total, x)
    }
}

/// One of three immutable implementations of the same operation set (§9). Axis-neutral —
/// the caller decides whether `size` means height or width.
#[derive(Clone)]
pub enum SizeCache {
    Fixed(FixedSizeCache),
    Variable(VariableSizeCache),
    Measured(MeasuredSizeCache),
}

impl SizeCache {
    pub fn fixed(size: f64, total: usize) -> Self {
        SizeCache::Fixed(FixedSizeCache::new(size, total))
    }

    pub fn variable(total: usize, size_fn: impl Fn(usize) -> f64 + 'static) -> Self {
        SizeCache::Variable(VariableSizeCache::new(total, size_fn))
    }

    pub fn measured(estimate: f64, total: usize) -> Self {
        SizeCache::Measured(MeasuredSizeCache::new(estimate, total))
    }

    pub fn get_offset(&self, i: usize) -> f64 {
        match self {
            SizeCache::Fixed(c) => c.get_offset(i),
            SizeCache::Variable(c) => c.get_offset(i),
            SizeCache::Measured(c) => c.get_offset(i),
        }
    }

    pub fn get_size(&self, i: usize) -> f64 {
        match self {
            SizeCache::Fixed(c) => c.get_size(i),
            SizeCache::Variable(c) => c.get_size(i),
            SizeCache::Measured(c) => c.get_size(i),
        }
    }

    pub fn index_at_offset(&self, x: f64) -> usize {
        match self {
            SizeCache::Fixed(c) => c.index_at_offset(x),
            SizeCache::Variable(c) => c.index_at_offset(x),
            SizeCache::Measured(c) => c.index_at_offset(x),
        }
    }

    pub fn get_total_size(&self) -> f64 {
        match self {
            SizeCache::Fixed(c) => c.get_total_size(),
            SizeCache::Variable(c) => c.get_total_size(),
            SizeCache::Measured(c) => c.get_total_size(),
        }
    }

    pub fn get_total(&self) -> usize {
        match self {
            SizeCache::Fixed(c) => c.get_total(),
            SizeCache::Variable(c) => c.get_total(),
            SizeCache::Measured(c) => c.get_total(),
        }
    }

    pub fn rebuild(&mut self, total: usize) {
        match self {
            SizeCache::Fixed(c) => c.rebuild(total),
            SizeCache::Variable(c) => c.rebuild(total),
            SizeCache::Measured(c) => c.rebuild(total),
        }
    }

    pub fn is_variable(&self) -> bool {
        !matches!(self, SizeCache::Fixed(_))
    }

    pub fn as_measured_mut(&mut self) -> Option<&mut MeasuredSizeCache> {
        match self {
            SizeCache::Measured(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_measured(&self) -> Option<&MeasuredSizeCache> {
        match self {
            SizeCache::Measured(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_offset_and_total() {
        let cache = SizeCache::fixed(50.0, 1000);
        assert_eq!(cache.get_total_size(), 50000.0);
        assert_eq!(cache.get_offset(0), 0.0);
        assert_eq!(cache.get_offset(100), 5000.0);
        assert_eq!(cache.get_size(5), 50.0);
    }

    #[test]
    fn fixed_index_at_offset_clamps() {
        let cache = SizeCache::fixed(50.0, 10);
        assert_eq!(cache.index_at_offset(-10.0), 0);
        assert_eq!(cache.index_at_offset(0.0), 0);
        assert_eq!(cache.index_at_offset(499.0), 9);
        assert_eq!(cache.index_at_offset(10_000.0), 9);
    }

    #[test]
    fn empty_fixed_cache_is_valid() {
        let cache = SizeCache::fixed(50.0, 0);
        assert_eq!(cache.get_total_size(), 0.0);
        assert_eq!(cache.index_at_offset(0.0), 0);
        assert_eq!(cache.index_at_offset(100.0), 0);
    }

    #[test]
    fn variable_alternating_sizes_binary_search() {
        // index_at_offset(340) should land on index 9, per spec §8 scenario 2.
        let cache = SizeCache::variable(1000, |i| if i % 2 == 0 { 30.0 } else { 40.0 });
        assert_eq!(cache.index_at_offset(340.0), 9);
    }

    #[test]
    fn variable_offset_invariant() {
        let cache = SizeCache::variable(100, |i| (i % 5 + 10) as f64);
        for i in 0..99 {
            let delta = cache.get_offset(i + 1) - cache.get_offset(i);
            assert_eq!(delta, cache.get_size(i));
        }
    }

    #[test]
    fn measured_falls_back_to_estimate() {
        let mut cache = MeasuredSizeCache::new(120.0, 5000);
        assert_eq!(cache.get_size(10), 120.0);
        cache.measure(10, 180.0);
        cache.rebuild(5000);
        assert_eq!(cache.get_size(10), 180.0);
        assert!(cache.is_measured(10));
        assert!(!cache.is_measured(11));
    }

    #[test]
    fn measured_rebuild_drops_out_of_range_measurements() {
        let mut cache = MeasuredSizeCache::new(100.0, 10);
        cache.measure(8, 50.0);
        cache.rebuild(5);
        assert!(!cache.is_measured(8));
        assert_eq!(cache.get_total(), 5);
    }

    #[test]
    fn rebuild_preserves_surviving_measurements() {
        let mut cache = MeasuredSizeCache::new(100.0, 20);
        cache.measure(3, 250.0);
        cache.measure(15, 75.0);
        cache.rebuild(10);
        assert!(cache.is_measured(3));
        assert!(!cache.is_measured(15));
        assert_eq!(cache.measured_size(3), Some(250.0));
    }
}
