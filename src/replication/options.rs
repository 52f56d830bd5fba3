use crate::replication::backoff::ExponentialBackoff;
use std::convert::TryFrom;
use tokio::time::Duration;

/// Tunables for the replicator. Unset fields use defaults.
#[derive(Clone, Default)]
pub struct ReplicatorOptions {
    /// How long to wait for a replication acknowledgment before resending.
    pub progress_retry_initial: Option<Duration>,
    pub progress_retry_upper_bound: Option<Duration>,
    /// How long to wait after a failed leader lookup before retrying it.
    pub leader_retry_initial: Option<Duration>,
    pub leader_retry_upper_bound: Option<Duration>,
    /// Bounded wait for database availability per retry-loop iteration.
    pub availability_timeout: Option<Duration>,
    /// Throttle credit pool, in content bytes.
    pub credit_limit: Option<i64>,
}

pub(crate) struct ReplicatorOptionsValidated {
    pub progress_backoff: ExponentialBackoff,
    pub leader_backoff: ExponentialBackoff,
    pub availability_timeout: Duration,
    pub credit_limit: i64,
}

struct RawValues {
    progress_retry_initial: Duration,
    progress_retry_upper_bound: Duration,
    leader_retry_initial: Duration,
    leader_retry_upper_bound: Duration,
    availability_timeout: Duration,
    credit_limit: i64,
}

impl RawValues {
    fn validate(&self) -> Result<(), &'static str> {
        if self.progress_retry_initial > self.progress_retry_upper_bound {
            return Err("Progress retry timeout must not start above its upper bound");
        }
        if self.leader_retry_initial > self.leader_retry_upper_bound {
            return Err("Leader retry timeout must not start above its upper bound");
        }
        if self.progress_retry_initial.is_zero() || self.leader_retry_initial.is_zero() {
            return Err("Retry timeouts must be non-zero");
        }
        if self.credit_limit <= 0 {
            return Err("Throttle credit limit must be positive");
        }
        Ok(())
    }
}

impl TryFrom<ReplicatorOptions> for ReplicatorOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ReplicatorOptions) -> Result<Self, Self::Error> {
        let values = RawValues {
            progress_retry_initial: options
                .progress_retry_initial
                .unwrap_or(Duration::from_secs(1)),
            progress_retry_upper_bound: options
                .progress_retry_upper_bound
                .unwrap_or(Duration::from_secs(5)),
            leader_retry_initial: options
                .leader_retry_initial
                .unwrap_or(Duration::from_millis(500)),
            leader_retry_upper_bound: options
                .leader_retry_upper_bound
                .unwrap_or(Duration::from_secs(3)),
            availability_timeout: options.availability_timeout.unwrap_or(Duration::from_secs(10)),
            credit_limit: options.credit_limit.unwrap_or(128 * 1024 * 1024),
        };

        values.validate()?;

        Ok(ReplicatorOptionsValidated {
            progress_backoff: ExponentialBackoff::new(
                values.progress_retry_initial,
                values.progress_retry_upper_bound,
            ),
            leader_backoff: ExponentialBackoff::new(
                values.leader_retry_initial,
                values.leader_retry_upper_bound,
            ),
            availability_timeout: values.availability_timeout,
            credit_limit: values.credit_limit,
        })
    }
}
