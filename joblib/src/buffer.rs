use bytes::{Bytes, BytesMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Growable byte buffer that one side appends to while another side snapshots it.
///
/// Clones share the same storage, so the launcher's output pump and the watcher can each hold one.
#[derive(Clone, Debug, Default)]
pub struct OutputBuffer {
    inner: Arc<Mutex<BytesMut>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, data: &[u8]) {
        self.lock().extend_from_slice(data);
    }

    /// Copy of everything appended so far. The buffer itself is left untouched.
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BytesMut> {
        // a panicking writer cannot leave a BytesMut half-extended, so the data is still usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
