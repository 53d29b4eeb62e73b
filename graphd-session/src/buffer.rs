// A buffered connection holds bytes read off (or waiting to go out on) a
// wire in a single growable byte vector, tracked by three offsets
// (spec.md §4.1 "Buffered Connection"): how much of `bytes` is valid
// data (`valid_n`), how much the buffer may hold before it is considered
// full (`capacity_m`), and how far a reader has already consumed
// (`cursor_i`).

use graphd_base::{err, Result};

/// A byte buffer with a once-only write hook: the hook fires the first
/// time the buffer is written to (never again), the way a connection
/// might lazily register itself with a scheduler on its first output
/// rather than at construction.
pub struct Buffer {
    bytes: Vec<u8>,
    valid_n: usize,
    capacity_m: usize,
    cursor_i: usize,
    hook: Option<Box<dyn FnMut() + Send>>,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("valid_n", &self.valid_n)
            .field("capacity_m", &self.capacity_m)
            .field("cursor_i", &self.cursor_i)
            .finish()
    }
}

impl Buffer {
    pub fn new(capacity_m: usize) -> Self {
        Buffer { bytes: Vec::new(), valid_n: 0, capacity_m, cursor_i: 0, hook: None }
    }

    pub fn with_write_hook(capacity_m: usize, hook: impl FnMut() + Send + 'static) -> Self {
        let mut buf = Self::new(capacity_m);
        buf.hook = Some(Box::new(hook));
        buf
    }

    pub fn capacity(&self) -> usize {
        self.capacity_m
    }

    pub fn is_full(&self) -> bool {
        self.valid_n >= self.capacity_m
    }

    /// Bytes still unread by [`Self::read`].
    pub fn unread(&self) -> usize {
        self.valid_n - self.cursor_i
    }

    /// Append `data`, firing the write hook (if any and not yet fired)
    /// before the first byte lands. Rejects writes that would exceed
    /// `capacity_m`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(mut hook) = self.hook.take() {
            hook();
        }
        if self.valid_n + data.len() > self.capacity_m {
            return Err(err("buffer write would exceed capacity"));
        }
        self.bytes.truncate(self.valid_n);
        self.bytes.extend_from_slice(data);
        self.valid_n += data.len();
        Ok(data.len())
    }

    /// Consume up to `want` unread bytes, advancing the cursor.
    pub fn read(&mut self, want: usize) -> &[u8] {
        let avail = self.unread().min(want);
        let start = self.cursor_i;
        self.cursor_i += avail;
        &self.bytes[start..start + avail]
    }

    /// Drop the already-consumed prefix, sliding the remainder to the
    /// front. Keeps long-lived connections from growing their buffer
    /// without bound as reads and writes interleave.
    pub fn compact(&mut self) {
        if self.cursor_i == 0 {
            return;
        }
        self.bytes.drain(0..self.cursor_i);
        self.valid_n -= self.cursor_i;
        self.cursor_i = 0;
    }
}
