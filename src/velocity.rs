//! Velocity tracker (§4.6): bounded circular buffer of (position, time) samples with
//! stale-gap reset. Pure arithmetic — no DOM — so the scroll controller can unit-test it
//! in isolation from the browser.

const STALE_GAP_MS: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
struct Sample {
    position: f64,
    time_ms: f64,
}

pub struct VelocityTracker {
    buffer: Vec<Option<Sample>>,
    head: usize,
    sample_count: usize,
    min_reliable: usize,
    last_time_ms: f64,
    velocity: f64,
}

impl VelocityTracker {
    /// `capacity` is 8 for scrollbar-driving instances, 5 for async-load-driving ones
    /// (§4.6). `min_reliable` is 2 or 3 depending on the same distinction.
    pub fn new(capacity: usize, min_reliable: usize) -> Self {
        VelocityTracker {
            buffer: vec![None; capacity.max(1)],
            head: 0,
            sample_count: 0,
            min_reliable,
            last_time_ms: 0.0,
            velocity: 0.0,
        }
    }

    /// Feed a new (position, time) sample. Returns the current velocity (px/ms) after
    /// the update — 0 immediately after a reset or stale gap.
    pub fn update(&mut self, position: f64, now_ms: f64) -> f64 {
        if self.sample_count == 0 || now_ms - self.last_time_ms > STALE_GAP_MS {
            self.reset_with(position, now_ms);
            return 0.0;
        }

        self.head = (self.head + 1) % self.buffer.len();
        self.buffer[self.head] = Some(Sample {
            position,
            time_ms: now_ms,
        });
        self.last_time_ms = now_ms;
        self.sample_count = (self.sample_count + 1).min(self.buffer.len());

        if self.sample_count >= 2 {
            let oldest = self.oldest_sample();
            let dt = now_ms - oldest.time_ms;
            self.velocity = if dt > 0.0 {
                (position - oldest.position) / dt
            } else {
                0.0
            };
        } else {
            self.velocity = 0.0;
        }
        self.velocity
    }

    fn reset_with(&mut self, position: f64, now_ms: f64) {
        for slot in self.buffer.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.buffer[0] = Some(Sample {
            position,
            time_ms: now_ms,
        });
        self.sample_count = 1;
        self.last_time_ms = now_ms;
        self.velocity = 0.0;
    }

    fn oldest_sample(&self) -> Sample {
        let n = self.buffer.len();
        let oldest_slot = (self.head + n - (self.sample_count - 1)) % n;
        self.buffer[oldest_slot].expect("slots within sample_count of head are always filled")
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Gates decisions that would otherwise misfire during the first few samples after
    /// idle — true only once `sampleCount >= minReliable`.
    pub fn is_tracking(&self) -> bool {
        self.sample_count >= self.min_reliable
    }

    pub fn reset(&mut self) {
        for slot in self.buffer.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.sample_count = 0;
        self.velocity = 0.0;
        self.last_time_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_unreliable_with_zero_velocity() {
        let mut tracker = VelocityTracker::new(8, 3);
        let v = tracker.update(0.0, 0.0);
        assert_eq!(v, 0.0);
        assert_eq!(tracker.sample_count(), 1);
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn velocity_computed_from_oldest_to_newest() {
        let mut tracker = VelocityTracker::new(8, 2);
        tracker.update(0.0, 0.0);
        tracker.update(50.0, 10.0);
        let v = tracker.update(100.0, 20.0);
        // oldest is the sample at t=0 (within 2-sample window only if capacity allows).
        assert!(tracker.is_tracking());
        assert!(v > 0.0);
    }

    #[test]
    fn stale_gap_resets_tracking() {
        let mut tracker = VelocityTracker::new(8, 2);
        tracker.update(0.0, 0.0);
        tracker.update(10.0, 10.0);
        assert!(tracker.is_tracking());

        let v = tracker.update(20.0, 500.0);
        assert_eq!(v, 0.0);
        assert_eq!(tracker.sample_count(), 1);
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn buffer_wraps_and_saturates_sample_count() {
        let mut tracker = VelocityTracker::new(3, 2);
        for i in 0..10 {
            tracker.update(i as f64 * 10.0, i as f64 * 10.0);
        }
        assert_eq!(tracker.sample_count(), 3);
    }

    #[test]
    fn reliability_threshold_differs_by_instance() {
        let mut async_tracker = VelocityTracker::new(5, 2);
        let mut scrollbar_tracker = VelocityTracker::new(8, 3);

        async_tracker.update(0.0, 0.0);
        async_tracker.update(1.0, 10.0);
        assert!(async_tracker.is_tracking());

        scrollbar_tracker.update(0.0, 0.0);
        scrollbar_tracker.update(1.0, 10.0);
        assert!(!scrollbar_tracker.is_tracking());
        scrollbar_tracker.update(2.0, 20.0);
        assert!(scrollbar_tracker.is_tracking());
    }
}
