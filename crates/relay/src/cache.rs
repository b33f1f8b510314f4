//! Single-slot latest-value cache.
//!
//! Holds at most one payload, replaced wholesale on each push. Payloads are
//! refcounted `Bytes`: a reader that cloned the slot keeps a complete
//! payload no matter how many overwrites happen afterwards, so replacement
//! is atomic from the reader's perspective.

use bytes::Bytes;
use std::sync::RwLock;

/// The most recently pushed payload, or nothing before the first push.
#[derive(Debug, Default)]
pub struct LatestValue {
    slot: RwLock<Option<Bytes>>,
}

impl LatestValue {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Replace the stored value unconditionally. Never fails.
    pub fn set(&self, payload: Bytes) {
        *self.slot.write().unwrap() = Some(payload);
    }

    /// Current value, or `None` if nothing has been pushed yet.
    pub fn get(&self) -> Option<Bytes> {
        if let Ok(slot) = self.slot.read() {
            slot.clone()
        } else {
            None
        }
    }

    /// Whether a payload has been pushed yet.
    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_first_set() {
        let cache = LatestValue::new();
        assert!(cache.get().is_none());
        assert!(!cache.is_set());
    }

    #[test]
    fn set_then_get() {
        let cache = LatestValue::new();
        cache.set(Bytes::from_static(b"\x12\x34"));
        assert_eq!(cache.get(), Some(Bytes::from_static(b"\x12\x34")));
    }

    #[test]
    fn overwrite_replaces_wholesale() {
        let cache = LatestValue::new();
        cache.set(Bytes::from_static(b"old payload"));
        cache.set(Bytes::from_static(b"new"));
        assert_eq!(cache.get(), Some(Bytes::from_static(b"new")));
    }

    #[test]
    fn repeated_identical_sets_are_harmless() {
        let cache = LatestValue::new();
        let payload = Bytes::from_static(b"same");
        cache.set(payload.clone());
        cache.set(payload.clone());
        assert_eq!(cache.get(), Some(payload));
    }

    #[test]
    fn reader_holds_complete_payload_across_overwrite() {
        let cache = LatestValue::new();
        cache.set(Bytes::from_static(b"first"));
        let held = cache.get().unwrap();
        cache.set(Bytes::from_static(b"second"));
        assert_eq!(held, Bytes::from_static(b"first"));
        assert_eq!(cache.get(), Some(Bytes::from_static(b"second")));
    }

    #[test]
    fn concurrent_writers_never_tear() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LatestValue::new());

        // Each writer repeats a distinct byte; a torn read would mix them.
        let writers: Vec<_> = (0u8..4)
            .map(|b| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        cache.set(Bytes::from(vec![b; 64]));
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(payload) = cache.get() {
                            assert_eq!(payload.len(), 64);
                            assert!(payload.iter().all(|b| *b == payload[0]));
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let last = cache.get().unwrap();
        assert!(last.iter().all(|b| *b == last[0]));
    }
}
