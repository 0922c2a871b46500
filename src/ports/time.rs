use std::time::Duration;

use time::OffsetDateTime;

/// Wall clock plus sleeping, so reminder timers can run against a manual clock in tests.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    /// Current instant; reminder timers convert it into each subscriber's zone.
    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
