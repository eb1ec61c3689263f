//! Sliding-window rate limiting for NCBI API compliance
//!
//! NCBI E-utilities rate limits:
//! - 3 requests per second without API key
//! - 10 requests per second with API key
//! - Violations can result in IP blocking

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::{PubMedError, Result};

/// Length of the trailing window the ceiling applies to
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Rate limiter admitting at most `ceiling` requests in any trailing one-second window
///
/// Clones share the same window, so one limiter can guard every request a client
/// (and its clones) makes, including concurrent window fetches.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    ceiling: usize,
    admitted: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `ceiling` - Maximum requests admitted per trailing second
    ///
    /// # Errors
    ///
    /// A ceiling of zero would never admit anything and is rejected with
    /// `PubMedError::Configuration`.
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_history_client::rate_limit::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(3).unwrap();
    /// assert_eq!(limiter.ceiling(), 3);
    /// assert!(RateLimiter::new(0).is_err());
    /// ```
    pub fn new(ceiling: u32) -> Result<Self> {
        if ceiling == 0 {
            return Err(PubMedError::Configuration(
                "rate limit must admit at least one request per second".to_string(),
            ));
        }

        Ok(Self {
            ceiling: ceiling as usize,
            admitted: Arc::new(Mutex::new(VecDeque::with_capacity(ceiling as usize))),
        })
    }

    /// Requests admitted per trailing second
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Wait for a free slot and reserve it
    ///
    /// Returns once admitting one more request keeps the number of requests in the
    /// trailing second at or below the ceiling. The slot's timestamp is recorded
    /// before returning.
    pub async fn acquire(&self) -> Result<()> {
        self.acquire_with(None, &CancellationToken::new()).await
    }

    /// Like [`acquire`](Self::acquire), bounded by a deadline and a cancellation token
    ///
    /// # Errors
    ///
    /// * `PubMedError::RateLimitWaitExceeded` - if no slot opens within `max_wait`
    /// * `PubMedError::Cancelled` - if `cancel` fires while waiting
    #[instrument(skip(self, cancel), fields(ceiling = self.ceiling))]
    pub async fn acquire_with(
        &self,
        max_wait: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return Err(PubMedError::Cancelled);
            }

            let wait = match self.try_admit(Instant::now()).await {
                None => {
                    debug!("Rate limit slot acquired");
                    return Ok(());
                }
                Some(wait) => wait,
            };

            if let Some(max_wait) = max_wait {
                let waited = started.elapsed();
                if waited + wait > max_wait {
                    return Err(PubMedError::RateLimitWaitExceeded { waited });
                }
            }

            debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            tokio::select! {
                _ = cancel.cancelled() => return Err(PubMedError::Cancelled),
                _ = sleep(wait) => {}
            }
        }
    }

    /// Number of requests admitted within the trailing window
    pub async fn in_flight_window(&self) -> usize {
        let mut admitted = self.admitted.lock().await;
        prune(&mut admitted, Instant::now());
        admitted.len()
    }

    /// Admit at `now` if possible, otherwise return how long until the oldest entry expires
    async fn try_admit(&self, now: Instant) -> Option<Duration> {
        let mut admitted = self.admitted.lock().await;
        prune(&mut admitted, now);

        if admitted.len() < self.ceiling {
            admitted.push_back(now);
            return None;
        }

        // Non-empty: ceiling is at least one
        let oldest = admitted.front().copied().unwrap_or(now);
        Some((oldest + RATE_WINDOW).saturating_duration_since(now))
    }
}

fn prune(admitted: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&oldest) = admitted.front() {
        if now.duration_since(oldest) >= RATE_WINDOW {
            admitted.pop_front();
        } else {
            break;
        }
    }
}
