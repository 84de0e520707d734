/// Size of the command/response buffer.
///
/// Matches the 32 KiB socket memory of the W5100 the card's buffer was modelled on, and stays
/// below `u16::MAX` so the length always fits the two length registers.
pub const BUFFER_CAPACITY: usize = 0x8000;

/// Fixed-capacity byte store with a logical length and a read cursor.
///
/// `cursor <= len <= BUFFER_CAPACITY` holds at all times, and every byte at or beyond `len` is
/// zero.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    data: Box<[u8]>,
    len: usize,
    cursor: usize,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self {
            data: vec![0; BUFFER_CAPACITY].into_boxed_slice(),
            len: 0,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left to stream out through the data register.
    pub fn remaining(&self) -> usize {
        self.len - self.cursor
    }

    /// The filled portion of the buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The whole backing store, including the zeroed tail past `len`.
    pub fn storage(&self) -> &[u8] {
        &self.data
    }

    /// Clear contents, length and cursor together.
    pub fn reset(&mut self) {
        self.data[..self.len].fill(0);
        self.len = 0;
        self.cursor = 0;
    }

    /// Append one byte. Returns `false` (leaving the buffer untouched) when full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.len] = byte;
        self.len += 1;
        true
    }

    /// Shrink the filled portion to `len` bytes, zeroing the discarded tail.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        self.data[len..self.len].fill(0);
        self.len = len;
        self.cursor = self.cursor.min(len);
    }

    /// Replace the contents with `bytes`, truncated to capacity. Returns the number of bytes kept.
    pub fn fill(&mut self, bytes: &[u8]) -> usize {
        self.reset();
        let n = bytes.len().min(self.capacity());
        self.data[..n].copy_from_slice(&bytes[..n]);
        self.len = n;
        n
    }

    /// Return the byte under the cursor and advance, or `None` once the response is exhausted.
    pub fn read_next(&mut self) -> Option<u8> {
        if self.cursor >= self.len {
            return None;
        }
        let byte = self.data[self.cursor];
        self.cursor += 1;
        Some(byte)
    }

    pub fn len_lo(&self) -> u8 {
        (self.len & 0xFF) as u8
    }

    pub fn len_hi(&self) -> u8 {
        ((self.len >> 8) & 0xFF) as u8
    }

    /// Restore contents and cursor from snapshot data.
    ///
    /// Returns `false` without modifying the buffer if the pair would break the buffer
    /// invariants.
    pub fn restore(&mut self, bytes: &[u8], cursor: usize) -> bool {
        if bytes.len() > self.capacity() || cursor > bytes.len() {
            return false;
        }
        self.fill(bytes);
        self.cursor = cursor;
        true
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("len", &self.len)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
