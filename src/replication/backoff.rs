use rand::Rng;
use std::cmp;
use tokio::time::Duration;

/// Exponential backoff strategy for the replicator's retry timeouts. Each
/// `new_timeout()` starts an independent doubling sequence, so the progress
/// and leader timeouts of one submission grow separately.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialBackoff {
    initial: Duration,
    upper_bound: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, upper_bound: Duration) -> Self {
        assert!(
            initial <= upper_bound,
            "initial timeout must not exceed the upper bound"
        );
        ExponentialBackoff {
            initial,
            upper_bound,
        }
    }

    pub fn new_timeout(&self) -> BackoffTimeout {
        BackoffTimeout {
            current: self.initial,
            upper_bound: self.upper_bound,
        }
    }
}

/// One live timeout sequence.
#[derive(Clone, Debug)]
pub struct BackoffTimeout {
    current: Duration,
    upper_bound: Duration,
}

impl BackoffTimeout {
    /// Current timeout plus a little jitter, so submitters that timed out
    /// together do not retry in lockstep.
    pub fn duration(&self) -> Duration {
        let jitter_bound = self.current.as_millis() as u64 / 4;
        let jitter = rand::thread_rng().gen_range(0..=jitter_bound);
        self.current + Duration::from_millis(jitter)
    }

    pub fn base(&self) -> Duration {
        self.current
    }

    pub fn increment(&mut self) {
        self.current = cmp::min(self.current * 2, self.upper_bound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_the_upper_bound() {
        let strategy =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(500));
        let mut timeout = strategy.new_timeout();

        assert_eq!(Duration::from_millis(100), timeout.base());
        timeout.increment();
        assert_eq!(Duration::from_millis(200), timeout.base());
        timeout.increment();
        assert_eq!(Duration::from_millis(400), timeout.base());
        timeout.increment();
        assert_eq!(Duration::from_millis(500), timeout.base());
        timeout.increment();
        assert_eq!(Duration::from_millis(500), timeout.base());
    }

    #[test]
    fn timeouts_are_independent_sequences() {
        let strategy = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));

        let mut first = strategy.new_timeout();
        first.increment();

        let second = strategy.new_timeout();
        assert_eq!(Duration::from_millis(200), first.base());
        assert_eq!(Duration::from_millis(100), second.base());
    }

    #[test]
    fn jitter_stays_within_a_quarter_of_the_base() {
        let strategy = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
        let timeout = strategy.new_timeout();

        for _ in 0..50 {
            let duration = timeout.duration();
            assert!(duration >= Duration::from_millis(100));
            assert!(duration <= Duration::from_millis(125));
        }
    }
}
