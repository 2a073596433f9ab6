/// Fixed-capacity set of execution permits.
///
/// The pool only counts. Handing a released slot to a waiting caller is done one level
/// up, in the admission state, which checks the wait queue before returning the slot
/// here. Releasing is crate-private: the only caller is [`SlotPermit`](super::SlotPermit)'s
/// `Drop`, so a release without a matching acquire cannot be written.
#[derive(Debug)]
pub struct SlotPool {
    capacity: usize,
    available: usize,
}

impl SlotPool {
    /// Pool with `capacity` free slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            available: capacity,
        }
    }

    /// Take a slot if one is free. Never blocks.
    pub fn try_acquire(&mut self) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }

    pub(crate) fn release(&mut self) {
        debug_assert!(self.available < self.capacity, "slot released twice");
        self.available = (self.available + 1).min(self.capacity);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.available
    }

    #[inline]
    pub fn in_use(&self) -> usize {
        self.capacity - self.available
    }
}
