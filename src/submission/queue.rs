/// A capacity-bounded, per-frame list of submissions.
///
/// Storage is allocated once for the full capacity, so pushes never
/// reallocate. Pushing past capacity drops the item and bumps a counter.
#[derive(Debug)]
pub struct SubmissionQueue<T> {
    label: &'static str,
    items: Vec<T>,
    capacity: usize,
    dropped: usize,
    high_water_mark: usize,
}

impl<T> SubmissionQueue<T> {
    /// Empty queue accepting up to `capacity` items per frame.
    #[must_use]
    pub fn new(label: &'static str, capacity: usize) -> Self {
        Self {
            label,
            items: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
            high_water_mark: 0,
        }
    }

    /// Start a new frame: forget every item and the dropped count.
    ///
    /// Only the used range is released, never the full capacity.
    pub fn reset(&mut self) {
        if self.dropped > 0 {
            log::debug!(
                "{} queue dropped {} submissions last frame (capacity {})",
                self.label,
                self.dropped,
                self.capacity
            );
        }
        self.items.clear();
        self.dropped = 0;
    }

    /// Append `item` if there is room. Returns `false` if it was dropped.
    pub fn push(&mut self, item: T) -> bool {
        if self.items.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.items.push(item);
        self.high_water_mark = self.high_water_mark.max(self.items.len());
        true
    }

    /// Live count for the current frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been submitted this frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum live count per frame.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Submissions rejected since the last reset.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Largest live count ever reached.
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Live items in submission order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate live items in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a SubmissionQueue<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
