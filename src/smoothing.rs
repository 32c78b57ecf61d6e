//! Angle smoothing via a fixed-window causal median filter.
//!
//! A median over the last W samples rejects single-frame landmark-jitter
//! outliers far better than a moving average, at the cost of up to W frames
//! of latency. For a posture classifier sampled many times per second that
//! latency is acceptable.
//!
//! Design note: the buffer is never reset for the lifetime of a session, so
//! the filter stays continuously warm across calibration runs and tests.
//! O(W log W) per sample with W = 5 is effectively free.

use std::collections::VecDeque;

/// Default smoothing window in frames.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Median of a slice of angles. Returns `None` for an empty slice.
///
/// Even-length inputs use the mean of the two middle values. Shared by the
/// smoothing filter and the calibration baseline computation so both agree
/// on what "median" means.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Causal median filter over the last W angle samples.
///
/// FIFO-evicts the oldest sample at capacity. Before the window fills, the
/// output is the median of however many samples have been seen, so the
/// filter produces usable output from the very first frame.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    window: VecDeque<f32>,
    capacity: usize,
}

impl MedianFilter {
    /// Create a filter with the given window size (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one instantaneous angle and return the de-jittered angle.
    ///
    /// Deterministic, no error conditions: the buffer is non-empty after the
    /// push, so a median always exists.
    pub fn observe(&mut self, angle: f32) -> f32 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(angle);
        let samples: Vec<f32> = self.window.iter().copied().collect();
        median(&samples).unwrap_or(angle)
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// True once the window has filled to capacity.
    pub fn is_warm(&self) -> bool {
        self.window.len() == self.capacity
    }
}

impl Default for MedianFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_median_odd_length() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn test_median_even_length() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_filter_output_before_window_fills() {
        let mut filter = MedianFilter::new(5);
        assert_eq!(filter.observe(10.0), 10.0);
        assert_eq!(filter.observe(20.0), 15.0); // median of [10, 20]
        assert_eq!(filter.observe(30.0), 20.0); // median of [10, 20, 30]
        assert!(!filter.is_warm());
    }

    #[test]
    fn test_filter_matches_median_of_last_w() {
        let mut filter = MedianFilter::new(5);
        let inputs = [90.0, 91.0, 170.0, 92.0, 89.0, 90.5, 93.0, 88.0];
        let mut last = 0.0;
        for &v in &inputs {
            last = filter.observe(v);
        }
        // Last 5 inputs: [92.0, 89.0, 90.5, 93.0, 88.0] → sorted
        // [88.0, 89.0, 90.5, 92.0, 93.0], median 90.5.
        assert_eq!(last, 90.5);
        assert!(filter.is_warm());
    }

    #[test]
    fn test_filter_rejects_single_frame_spike() {
        let mut filter = MedianFilter::new(5);
        for _ in 0..5 {
            filter.observe(90.0);
        }
        // One wild outlier must not move the median at all.
        let smoothed = filter.observe(400.0);
        assert_eq!(smoothed, 90.0);
    }

    #[test]
    fn test_filter_eviction_is_fifo() {
        let mut filter = MedianFilter::new(3);
        filter.observe(1.0);
        filter.observe(2.0);
        filter.observe(3.0);
        // 1.0 evicted: window is [2, 3, 100], median 3.
        assert_eq!(filter.observe(100.0), 3.0);
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut filter = MedianFilter::new(0);
        assert_eq!(filter.observe(42.0), 42.0);
        assert_eq!(filter.len(), 1);
    }
}
