use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Throttler bounds the volume of in-flight replication.
///
/// Admission is admit-then-add: a caller is admitted as soon as the pool is
/// below the limit, and only then adds its own credits. The pool can
/// therefore transiently overshoot by the size of one admitted request,
/// which keeps a request larger than half the limit from wedging the gate.
/// A request larger than the whole limit is admitted too; it simply occupies
/// the entire pool while in flight.
#[derive(Clone)]
pub struct Throttler {
    inner: Arc<ThrottlerInner>,
}

struct ThrottlerInner {
    credit_limit: i64,
    current_credit: Mutex<i64>,
    credit_released: Notify,
}

impl Throttler {
    pub fn new(credit_limit: i64) -> Self {
        assert!(credit_limit > 0, "credit limit must be positive");
        Throttler {
            inner: Arc::new(ThrottlerInner {
                credit_limit,
                current_credit: Mutex::new(0),
                credit_released: Notify::new(),
            }),
        }
    }

    /// Block until the pool is below the limit, then take `credits`. The
    /// guard returns them when dropped, however the holder exits. Cancelling
    /// the wait takes nothing.
    pub async fn acquire(&self, credits: i64) -> ThrottleGuard {
        assert!(credits >= 0, "credits must be non-negative");
        loop {
            // Register for the wake-up before checking, so a release between
            // the check and the await is not missed.
            let released = self.inner.credit_released.notified();
            {
                let mut current = self
                    .inner
                    .current_credit
                    .lock()
                    .expect("Throttler.acquire() mutex guard poison");
                if *current < self.inner.credit_limit {
                    *current += credits;
                    return ThrottleGuard {
                        inner: Arc::clone(&self.inner),
                        credits,
                    };
                }
            }
            released.await;
        }
    }

    /// Run `call` while holding `credits`; they are released when the call
    /// finishes, panics or is cancelled.
    pub async fn invoke<F, T>(&self, credits: i64, call: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.acquire(credits).await;
        call.await
    }

    pub fn credit_limit(&self) -> i64 {
        self.inner.credit_limit
    }

    pub fn current_credit(&self) -> i64 {
        *self
            .inner
            .current_credit
            .lock()
            .expect("Throttler.current_credit() mutex guard poison")
    }
}

/// Held credits. Dropping the guard returns them to the pool and wakes
/// blocked acquirers.
pub struct ThrottleGuard {
    inner: Arc<ThrottlerInner>,
    credits: i64,
}

impl Drop for ThrottleGuard {
    fn drop(&mut self) {
        let mut current = self
            .inner
            .current_credit
            .lock()
            .expect("ThrottleGuard.drop() mutex guard poison");
        *current -= self.credits;
        debug_assert!(*current >= 0, "credit pool went negative");
        self.inner.credit_released.notify_waiters();
    }
}
