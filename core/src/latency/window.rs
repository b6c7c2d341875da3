use std::collections::VecDeque;

/// Bounded FIFO window of round-trip samples with running aggregates.
///
/// `sum` always equals the sum of the window and `min`/`max` always equal its
/// extrema (both 0 when empty). Extrema are extended in O(1) on insert and
/// rescanned only when an extremum leaves the window.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<u32>,
    capacity: usize,
    sum: u64,
    min: u32,
    max: u32,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
            sum: 0,
            min: 0,
            max: 0,
        }
    }

    /// Append a sample, evicting the oldest one when over capacity.
    pub fn record(&mut self, rtt: u32) {
        self.samples.push_back(rtt);
        self.sum += u64::from(rtt);

        if self.samples.len() == 1 {
            self.min = rtt;
            self.max = rtt;
        } else {
            self.min = self.min.min(rtt);
            self.max = self.max.max(rtt);
        }

        while self.samples.len() > self.capacity {
            let Some(evicted) = self.samples.pop_front() else {
                break;
            };
            self.sum -= u64::from(evicted);
            if evicted == self.min || evicted == self.max {
                self.rescan();
            }
        }
    }

    /// Remove the most recent sample.
    pub fn pop_last(&mut self) -> Option<u32> {
        let last = self.samples.pop_back()?;
        self.sum -= u64::from(last);
        if last == self.min || last == self.max {
            self.rescan();
        }
        Some(last)
    }

    /// Replace the most recent sample with a corrected value.
    ///
    /// Returns the value that was replaced, if the window was not empty.
    pub fn correct_last(&mut self, rtt: u32) -> Option<u32> {
        let replaced = self.pop_last();
        self.record(rtt);
        replaced
    }

    fn rescan(&mut self) {
        let mut iter = self.samples.iter().copied();
        let Some(first) = iter.next() else {
            self.min = 0;
            self.max = 0;
            return;
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
        self.min = min;
        self.max = max;
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Mean of the window, 0 when empty.
    pub fn avg(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.sum as f64 / self.samples.len() as f64
    }

    /// Spread between the slowest and fastest sample.
    pub fn jitter(&self) -> u32 {
        self.max - self.min
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = u32> + '_ {
        self.samples.iter().copied()
    }
}
