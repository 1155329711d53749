//! Clock port — local wall-clock time for schedule evaluation.

use chrono::NaiveDateTime;

/// Source of the current local date and time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// [`Clock`] backed by the operating system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        relayhub_domain::time::now_local()
    }
}

impl<T: Clock> Clock for std::sync::Arc<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
