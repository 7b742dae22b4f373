//! Fixed-capacity circular sample buffer.

/// Ring of the most recent `capacity` samples.
///
/// Storage is zero-initialized and never resized; before the first fill,
/// unwritten slots read as 0.0 in views. That transient inaccuracy is
/// accepted rather than masked.
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    data: Vec<f64>,
    /// Next write position; also the oldest retained slot once wrapped.
    idx: usize,
    total: u64,
}

impl CircularBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be at least 1");
        Self {
            data: vec![0.0; capacity],
            idx: 0,
            total: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Samples written so far, before overwrite accounting.
    pub fn total_pushed(&self) -> u64 {
        self.total
    }

    /// How many slots hold real samples (capped at capacity).
    pub fn populated(&self) -> usize {
        self.total.min(self.data.len() as u64) as usize
    }

    /// O(1) overwrite of the oldest slot.
    pub fn push(&mut self, value: f64) {
        self.data[self.idx] = value;
        self.idx = (self.idx + 1) % self.data.len();
        self.total += 1;
    }

    /// Buffer contents reordered so index 0 is the oldest retained sample
    /// and the last index is the newest. Materialized on demand; length is
    /// always `capacity()`, with leading zeros before first fill.
    pub fn chronological_view(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.data.len());
        out.extend_from_slice(&self.data[self.idx..]);
        out.extend_from_slice(&self.data[..self.idx]);
        out
    }

    /// Mean over only the populated slots; 0.0 when empty.
    pub fn populated_mean(&self) -> f64 {
        let n = self.populated();
        if n == 0 {
            return 0.0;
        }
        // Populated slots are contiguous from 0 before first wrap and the
        // whole buffer after it.
        let sum: f64 = if self.total < self.data.len() as u64 {
            self.data[..n].iter().sum()
        } else {
            self.data.iter().sum()
        };
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_fill_reads_zeros_then_values_in_order() {
        let mut buf = CircularBuffer::new(4);
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.populated(), 2);
        assert_eq!(buf.chronological_view(), vec![0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn overwrite_keeps_exactly_last_capacity_values() {
        let mut buf = CircularBuffer::new(3);
        for v in 1..=7 {
            buf.push(f64::from(v));
        }
        assert_eq!(buf.chronological_view(), vec![5.0, 6.0, 7.0]);
        assert_eq!(buf.populated(), 3);
        assert_eq!(buf.total_pushed(), 7);
    }

    #[test]
    fn populated_mean_ignores_unwritten_slots() {
        let mut buf = CircularBuffer::new(10);
        buf.push(4.0);
        buf.push(8.0);
        assert_eq!(buf.populated_mean(), 6.0);
    }
}
