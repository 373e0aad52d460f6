//! Bounded per-series sample buffers.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use agrosight_common::{Sample, SeriesKey};

/// Samples kept per series unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 60;

/// Owns one bounded FIFO of samples per series key.
///
/// Buffers are created on the first push for a key and are never removed.
/// Every buffer holds at most `capacity` samples; pushing into a full buffer
/// evicts its oldest sample.
#[derive(Debug, Clone)]
pub struct SeriesBuffers {
    series: BTreeMap<SeriesKey, VecDeque<Sample>>,
    capacity: usize,
    dirty: bool,
}

impl Default for SeriesBuffers {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SeriesBuffers {
    /// Create an empty manager. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            series: BTreeMap::new(),
            capacity: capacity.max(1),
            dirty: false,
        }
    }

    /// Current per-series capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample, evicting the oldest one if the buffer is full.
    ///
    /// The value is not validated; callers reject non-finite readings first.
    pub fn push(&mut self, key: SeriesKey, sample: Sample) {
        let capacity = self.capacity;
        let buffer = self
            .series
            .entry(key)
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        buffer.push_back(sample);
        if buffer.len() > capacity {
            buffer.pop_front();
        }

        self.dirty = true;
    }

    /// Buffer contents for `key`, oldest first. Empty for unknown keys.
    pub fn get(&self, key: &SeriesKey) -> Vec<Sample> {
        self.series
            .get(key)
            .map(|buffer| buffer.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Iterate over the samples of one series without copying them out.
    pub fn iter(&self, key: &SeriesKey) -> impl Iterator<Item = &Sample> {
        self.series.get(key).into_iter().flatten()
    }

    /// Every key that has ever received a sample, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Iterate over `(key, samples)` pairs in key order.
    pub fn series(&self) -> impl Iterator<Item = (&SeriesKey, &VecDeque<Sample>)> {
        self.series.iter()
    }

    /// Distinct entity ids across all series, sorted.
    pub fn sensor_ids(&self) -> BTreeSet<&str> {
        self.series.keys().map(|k| k.entity_id.as_str()).collect()
    }

    /// Most recent sample of a series.
    pub fn latest(&self, key: &SeriesKey) -> Option<Sample> {
        self.series.get(key).and_then(|b| b.back().copied())
    }

    /// Number of samples currently held for a series.
    pub fn len(&self, key: &SeriesKey) -> usize {
        self.series.get(key).map_or(0, VecDeque::len)
    }

    /// Whether no series exists yet.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Change the capacity, trimming every buffer from the front right away.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        self.capacity = capacity;

        for buffer in self.series.values_mut() {
            if buffer.len() > capacity {
                let excess = buffer.len() - capacity;
                buffer.drain(..excess);
                self.dirty = true;
            }
        }
    }

    /// Whether anything changed since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the next render pass.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(buffers: &SeriesBuffers, key: &SeriesKey) -> Vec<f64> {
        buffers.get(key).iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_push_evicts_oldest() {
        let key = SeriesKey::temperature("s1");
        let mut buffers = SeriesBuffers::new(3);

        for (i, v) in [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
            buffers.push(key.clone(), Sample::new(i as i64, v));
            assert!(buffers.len(&key) <= 3);
        }

        assert_eq!(values(&buffers, &key), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_buffer_equals_last_n_pushes() {
        let key = SeriesKey::humidity("s1");
        let mut buffers = SeriesBuffers::new(4);
        let mut pushed = Vec::new();

        for i in 0..11 {
            let sample = Sample::new(i * 1000, (i * 7 % 5) as f64);
            buffers.push(key.clone(), sample);
            pushed.push(sample);

            let start = pushed.len().saturating_sub(4);
            assert_eq!(buffers.get(&key), pushed[start..].to_vec());
        }
    }

    #[test]
    fn test_get_unknown_key_is_empty() {
        let buffers = SeriesBuffers::default();
        assert!(buffers.get(&SeriesKey::temperature("nope")).is_empty());
        assert_eq!(buffers.len(&SeriesKey::temperature("nope")), 0);
        assert!(buffers.latest(&SeriesKey::temperature("nope")).is_none());
    }

    #[test]
    fn test_keys_are_ordered_and_kept() {
        let mut buffers = SeriesBuffers::new(1);
        buffers.push(SeriesKey::humidity("b"), Sample::new(0, 1.0));
        buffers.push(SeriesKey::temperature("a"), Sample::new(0, 1.0));
        buffers.push(SeriesKey::temperature("b"), Sample::new(0, 1.0));

        let keys: Vec<String> = buffers.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a:temp", "b:temp", "b:hum"]);

        let sensors: Vec<&str> = buffers.sensor_ids().into_iter().collect();
        assert_eq!(sensors, vec!["a", "b"]);
    }

    #[test]
    fn test_set_capacity_trims_to_most_recent() {
        let key = SeriesKey::temperature("s1");
        let mut buffers = SeriesBuffers::new(60);
        for i in 0..60 {
            buffers.push(key.clone(), Sample::new(i, i as f64));
        }
        buffers.take_dirty();

        buffers.set_capacity(10);

        assert_eq!(buffers.len(&key), 10);
        assert_eq!(values(&buffers, &key), (50..60).map(|i| i as f64).collect::<Vec<_>>());
        assert!(buffers.is_dirty());
    }

    #[test]
    fn test_set_capacity_growth_keeps_samples() {
        let key = SeriesKey::temperature("s1");
        let mut buffers = SeriesBuffers::new(2);
        buffers.push(key.clone(), Sample::new(0, 1.0));
        buffers.push(key.clone(), Sample::new(1, 2.0));
        buffers.take_dirty();

        buffers.set_capacity(5);
        buffers.push(key.clone(), Sample::new(2, 3.0));

        assert_eq!(values(&buffers, &key), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let key = SeriesKey::temperature("s1");
        let mut buffers = SeriesBuffers::new(0);
        buffers.push(key.clone(), Sample::new(0, 1.0));
        buffers.push(key.clone(), Sample::new(1, 2.0));

        assert_eq!(buffers.capacity(), 1);
        assert_eq!(values(&buffers, &key), vec![2.0]);
    }

    #[test]
    fn test_dirty_flag() {
        let mut buffers = SeriesBuffers::default();
        assert!(!buffers.is_dirty());

        buffers.push(SeriesKey::temperature("s1"), Sample::new(0, 1.0));
        assert!(buffers.take_dirty());
        assert!(!buffers.take_dirty());

        buffers.mark_dirty();
        assert!(buffers.is_dirty());
    }
}
