use backoff::ExponentialBackoff;
use std::time::Duration;

/// Retry policy for a single remote call.
///
/// Only the total time spent retrying is configurable; the intervals follow
/// the `backoff` defaults.
pub(crate) fn policy(max_elapsed: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..ExponentialBackoff::default()
    }
}
