//! Thread-local pool of read windows.

use std::cell::RefCell;

/// Size of a pooled read window.
pub const READ_WINDOW_SIZE: usize = 64 * 1024; // 64 KiB

/// Maximum number of windows to keep per thread.
pub const MAX_POOL_SIZE: usize = 4;

/// A reusable, zero-initialised read window of [`READ_WINDOW_SIZE`] bytes.
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    /// Takes a window from the thread-local pool or allocates a new one.
    pub fn take() -> Self {
        THREAD_BUFFER_POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            let data = pool
                .pop()
                .unwrap_or_else(|| vec![0u8; READ_WINDOW_SIZE]);
            Self { data }
        })
    }

    /// The whole window, for a reader to fill.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The first `n` bytes of the window.
    pub fn filled(&self, n: usize) -> &[u8] {
        &self.data[..n]
    }

    /// Window length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        THREAD_BUFFER_POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < MAX_POOL_SIZE {
                pool.push(std::mem::take(&mut self.data));
            }
        });
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::take()
    }
}

// Thread-local buffer pool
thread_local! {
    static THREAD_BUFFER_POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
}
