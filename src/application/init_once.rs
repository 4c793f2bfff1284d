//! Initialize-once, read-many cache for process-lifetime artifacts.
//!
//! Holds values like the fitted scaler or the scaled held-out split. Concurrent
//! first callers race on an init lock so at most one initializer succeeds and
//! every caller observes the same `Arc`.

use std::sync::{Arc, Mutex, OnceLock};

/// A fallible single-initialization cell.
#[derive(Debug)]
pub struct InitOnce<T> {
    cell: OnceLock<Arc<T>>,
    init_lock: Mutex<()>,
}

impl<T> Default for InitOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InitOnce<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// The cached value, if initialized.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Return the cached value, running `init` if nothing is cached yet.
    ///
    /// A failed `init` leaves the cell empty; the next caller retries.
    ///
    /// # Errors
    /// Returns whatever `init` returns on failure.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(Arc::clone(value));
        }

        // A poisoned lock only means another initializer panicked; the cell
        // itself is still consistent, so carry on.
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(value) = self.cell.get() {
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(init()?);
        Ok(Arc::clone(self.cell.get_or_init(|| value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_initializes_once() {
        let cache: InitOnce<u32> = InitOnce::new();
        assert!(!cache.is_initialized());

        let first = cache
            .get_or_try_init(|| Ok::<_, String>(7))
            .expect("Should init");
        let second = cache
            .get_or_try_init(|| Ok::<_, String>(8))
            .expect("Should reuse");

        assert_eq!(*second, 7);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_init_can_retry() {
        let cache: InitOnce<u32> = InitOnce::new();
        assert!(cache.get_or_try_init(|| Err("boom".to_string())).is_err());
        assert!(cache.get().is_none());

        let value = cache
            .get_or_try_init(|| Ok::<_, String>(3))
            .expect("Should init");
        assert_eq!(*value, 3);
    }

    #[test]
    fn test_concurrent_first_callers_share_one_value() {
        let cache: Arc<InitOnce<Vec<u64>>> = Arc::new(InitOnce::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let runs = Arc::clone(&runs);
                thread::spawn(move || {
                    cache
                        .get_or_try_init(|| {
                            runs.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(10));
                            Ok::<_, String>(vec![i])
                        })
                        .expect("Should init")
                })
            })
            .collect();

        let values: Vec<Arc<Vec<u64>>> = handles
            .into_iter()
            .map(|h| h.join().expect("Thread should finish"))
            .collect();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
