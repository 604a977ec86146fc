//! Fixed-capacity circular byte buffer used by the audio pump's output
//! stage. One writer (source thread), one reader (audio output thread).

/// A fixed-capacity rollover byte queue.
///
/// Writes past the remaining capacity are silently truncated (with a
/// warning); reads never block and return the number of bytes actually
/// copied. Passing `None` as the destination to [`read`](Self::read) drops
/// the bytes without copying them out, which the audio pump's start-gating
/// logic relies on.
pub struct RingBuffer {
    buffer: Vec<u8>,
    capacity: usize,
    size: usize,
    index_start: usize,
    index_end: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        RingBuffer {
            buffer: vec![0u8; capacity],
            capacity,
            size: 0,
            index_start: 0,
            index_end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn clear(&mut self) {
        self.size = 0;
        self.index_start = 0;
        self.index_end = 0;
    }

    /// Writes as much of `data` as fits in the remaining capacity, returning
    /// the number of bytes accepted. Never overwrites unread data.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let real_bytes = data.len().min(self.capacity - self.size);
        if real_bytes < data.len() {
            log::warn!(
                "ring buffer: overflow, accepted {} of {} bytes",
                real_bytes,
                data.len()
            );
        }

        if real_bytes <= self.capacity - self.index_end {
            self.buffer[self.index_end..self.index_end + real_bytes]
                .copy_from_slice(&data[..real_bytes]);
        } else {
            let first_bytes = self.capacity - self.index_end;
            self.buffer[self.index_end..].copy_from_slice(&data[..first_bytes]);
            self.buffer[..real_bytes - first_bytes]
                .copy_from_slice(&data[first_bytes..real_bytes]);
        }

        self.index_end = (self.index_end + real_bytes) % self.capacity;
        self.size += real_bytes;
        real_bytes
    }

    /// Reads up to `dst.len()` bytes into `dst`, or drops them if `dst` is
    /// `None`. Returns the number of bytes consumed either way.
    pub fn read(&mut self, dst: Option<&mut [u8]>) -> usize {
        let want = dst.as_ref().map(|d| d.len()).unwrap_or(self.size);
        let real_bytes = want.min(self.size);

        if let Some(dst) = dst {
            if real_bytes <= self.capacity - self.index_start {
                dst[..real_bytes]
                    .copy_from_slice(&self.buffer[self.index_start..self.index_start + real_bytes]);
            } else {
                let first_bytes = self.capacity - self.index_start;
                dst[..first_bytes].copy_from_slice(&self.buffer[self.index_start..]);
                dst[first_bytes..real_bytes].copy_from_slice(&self.buffer[..real_bytes - first_bytes]);
            }
        }

        self.index_start = (self.index_start + real_bytes) % self.capacity;
        self.size -= real_bytes;
        real_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let mut rb = RingBuffer::new(8);
        assert_eq!(rb.write(b"hello"), 5);
        let mut out = [0u8; 5];
        assert_eq!(rb.read(Some(&mut out)), 5);
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn write_truncates_on_overflow() {
        let mut rb = RingBuffer::new(4);
        assert_eq!(rb.write(b"hello"), 4);
        assert_eq!(rb.size(), 4);
    }

    #[test]
    fn rollover_write_and_read() {
        let mut rb = RingBuffer::new(4);
        rb.write(b"ab");
        let mut out = [0u8; 2];
        rb.read(Some(&mut out));
        rb.write(b"cdef");
        let mut out2 = [0u8; 4];
        assert_eq!(rb.read(Some(&mut out2)), 4);
        assert_eq!(&out2, b"cdef");
    }

    #[test]
    fn read_with_none_drops_bytes() {
        let mut rb = RingBuffer::new(8);
        rb.write(b"hello");
        assert_eq!(rb.read(None), 5);
        assert_eq!(rb.size(), 0);
    }

    #[test]
    fn clear_resets_state() {
        let mut rb = RingBuffer::new(8);
        rb.write(b"hello");
        rb.clear();
        assert_eq!(rb.size(), 0);
    }
}
