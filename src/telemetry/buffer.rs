/// Fixed-capacity ring buffer. Once full, each push overwrites the oldest
/// entry in place, so the buffer never holds more than `capacity` items.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    capacity: usize,
    position: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        RingBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
            len: 0,
        }
    }

    /// Add an item to the buffer. Overwrites oldest when full and returns
    /// the evicted item.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.buffer.len() < self.capacity {
            self.buffer.push(item);
            None
        } else {
            Some(std::mem::replace(&mut self.buffer[self.position], item))
        };
        self.position = (self.position + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
        evicted
    }

    /// Items from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = if self.len < self.capacity {
            0
        } else {
            self.position
        };
        (0..self.len).map(move |i| &self.buffer[(start + i) % self.capacity])
    }

    /// Most recently pushed item.
    pub fn latest(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        Some(&self.buffer[(self.position + self.capacity - 1) % self.capacity])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy of the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_len() {
        let mut buf = RingBuffer::new(10);
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());

        buf.push(1);
        assert_eq!(buf.len(), 1);

        for i in 0..9 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.capacity(), 10);
    }

    #[test]
    fn test_ring_buffer_overwrites() {
        let mut buf = RingBuffer::new(5);
        for i in 0..10 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.to_vec(), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_keeps_last_128_of_200_oldest_first() {
        let mut buf = RingBuffer::new(128);
        for i in 0..200u32 {
            buf.push(i);
            assert!(buf.len() <= 128);
        }
        let expected: Vec<u32> = (72..200).collect();
        assert_eq!(buf.to_vec(), expected);
        assert_eq!(buf.latest(), Some(&199));
    }

    #[test]
    fn test_push_returns_evicted() {
        let mut buf = RingBuffer::new(2);
        assert_eq!(buf.push('a'), None);
        assert_eq!(buf.push('b'), None);
        assert_eq!(buf.push('c'), Some('a'));
        assert_eq!(buf.push('d'), Some('b'));
        assert_eq!(buf.to_vec(), vec!['c', 'd']);
    }

    #[test]
    fn test_partial_fill_order() {
        let mut buf = RingBuffer::new(4);
        buf.push(10);
        buf.push(20);
        assert_eq!(buf.to_vec(), vec![10, 20]);
        assert_eq!(buf.latest(), Some(&20));
    }

    #[test]
    fn test_empty_latest() {
        let buf: RingBuffer<u8> = RingBuffer::new(3);
        assert_eq!(buf.latest(), None);
        assert_eq!(buf.iter().count(), 0);
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn test_zero_capacity() {
        let _ = RingBuffer::<u8>::new(0);
    }
}
