use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub type NextFn<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;
pub type ErrorFn = Arc<dyn Fn(&dyn Error) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct PartialObserver<T> {
    pub next: Option<NextFn<T>>,
    pub error: Option<ErrorFn>,
}

impl<T> PartialObserver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_next<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.next = Some(Arc::new(callback));
        self
    }

    pub fn with_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn Error) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(callback));
        self
    }
}

impl<T> Default for PartialObserver<T> {
    fn default() -> Self {
        Self {
            next: None,
            error: None,
        }
    }
}

pub type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

/// Observer registry whose subscriptions can be detached individually.
pub struct ChangeListeners<T> {
    next_id: AtomicU64,
    observers: Arc<Mutex<Vec<(u64, PartialObserver<T>)>>>,
}

impl<T: 'static> ChangeListeners<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers an observer and returns the handle that removes it.
    pub fn add_observer(&self, observer: PartialObserver<T>) -> Unsubscribe {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lock().push((id, observer));
        let observers = Arc::clone(&self.observers);
        Box::new(move || {
            observers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|(existing, _)| *existing != id);
        })
    }

    /// Delivers `value` to every registered observer.
    ///
    /// Callbacks run after the registry lock is released, so an observer may
    /// subscribe or unsubscribe from inside its callback.
    pub fn notify(&self, value: &T) {
        let callbacks: Vec<NextFn<T>> = self
            .lock()
            .iter()
            .filter_map(|(_, observer)| observer.next.clone())
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    pub fn notify_error(&self, error: &dyn Error) {
        let callbacks: Vec<ErrorFn> = self
            .lock()
            .iter()
            .filter_map(|(_, observer)| observer.error.clone())
            .collect();
        for callback in callbacks {
            callback(error);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, PartialObserver<T>)>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: 'static> Default for ChangeListeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_detaches_only_that_observer() {
        let listeners = ChangeListeners::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let detach_first =
            listeners.add_observer(PartialObserver::new().with_next(move |v: &u32| {
                first.lock().unwrap().push(("first", *v))
            }));
        let second = Arc::clone(&seen);
        let _keep = listeners.add_observer(PartialObserver::new().with_next(move |v: &u32| {
            second.lock().unwrap().push(("second", *v))
        }));

        listeners.notify(&1);
        detach_first();
        listeners.notify(&2);

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[("first", 1), ("second", 1), ("second", 2)]
        );
        assert_eq!(listeners.len(), 1);
    }
}
