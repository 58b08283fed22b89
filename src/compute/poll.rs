//! Polling until a readiness predicate holds.
//!
//! Every wait in the crate goes through [`Poller`]: public IPs becoming
//! available, nodes reaching running, asynchronous deletes completing and
//! `ProfitBricks` requests finishing.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::TimeoutConfig;
use crate::error::{ProvisionError, Result};

/// Repeatedly evaluates a check until it returns true or a deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    /// Overall deadline.
    pub timeout: Duration,
    /// Delay between evaluations.
    pub interval: Duration,
}

impl Poller {
    /// Creates a poller.
    #[must_use]
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Poller for asynchronous operations such as deletes.
    #[must_use]
    pub const fn for_operations(timeouts: &TimeoutConfig) -> Self {
        Self::new(timeouts.operation(), timeouts.poll_interval())
    }

    /// Poller for public IP availability.
    #[must_use]
    pub const fn for_public_ip(timeouts: &TimeoutConfig) -> Self {
        Self::new(timeouts.public_ip(), timeouts.poll_interval())
    }

    /// Poller for nodes reaching running.
    #[must_use]
    pub const fn for_node_running(timeouts: &TimeoutConfig) -> Self {
        Self::new(timeouts.node_running(), timeouts.poll_interval())
    }

    /// Evaluates `check` until it returns `Ok(true)` or the timeout elapses.
    ///
    /// The check is always evaluated at least once. Returns `Ok(false)` on
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the check.
    pub async fn until<F, Fut>(&self, description: &str, mut check: F) -> Result<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let start = Instant::now();
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            if check().await? {
                debug!("{description} satisfied after {attempts} attempt(s)");
                return Ok(true);
            }

            if start.elapsed() + self.interval > self.timeout {
                debug!("{description} not satisfied within {:?}", self.timeout);
                return Ok(false);
            }

            trace!("{description} not yet satisfied, sleeping {:?}", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Like [`Poller::until`], but a timeout becomes an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Timeout`] if the check never holds, or the
    /// first error produced by the check.
    pub async fn require<F, Fut>(&self, resource: &str, expected_state: &str, check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let description = format!("{resource} {expected_state}");
        if self.until(&description, check).await? {
            Ok(())
        } else {
            Err(ProvisionError::timeout(resource, expected_state).into())
        }
    }
}
