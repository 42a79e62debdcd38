pub mod backoff;
pub mod subscribe;

pub use backoff::{BackoffConfig, MAX_BACKOFF_MILLIS, RANDOM_FACTOR};
pub use subscribe::{ChangeListeners, PartialObserver, Unsubscribe};
