//! The shared receive buffer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receive buffer shared between the reader task and the poll loops.
///
/// The reader task is the only producer; the interpreter and the session
/// read it exclusively through lock-guarded snapshots.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<String>>,
}

impl SharedBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a decoded chunk.
    pub fn append(&self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.lock().push_str(chunk);
    }

    /// Copy out the current contents.
    #[must_use]
    pub fn snapshot(&self) -> String {
        self.lock().clone()
    }

    /// Discard the current contents.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Current length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check whether the buffer holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_snapshot_clear() {
        let buffer = SharedBuffer::new();
        assert!(buffer.is_empty());
        buffer.append("hello ");
        buffer.append("world");
        assert_eq!(buffer.snapshot(), "hello world");
        assert_eq!(buffer.len(), 11);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn clones_share_contents() {
        let buffer = SharedBuffer::new();
        let alias = buffer.clone();
        alias.append("->");
        assert_eq!(buffer.snapshot(), "->");
    }
}
