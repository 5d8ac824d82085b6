//! Retry policy for bulk operations.
//!
//! Bulk imports and deletes run item by item. An item that hits a rate limit
//! is retried with exponential backoff plus jitter; any other failure is
//! recorded and the batch moves on. The batch never aborts early.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Why a single operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The backend asked us to slow down; worth retrying.
    #[error("rate limited")]
    RateLimited,
    /// Any other failure; not retried.
    #[error("{0}")]
    Failed(String),
}

/// Successful outcome of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The item was written.
    Done,
    /// Nothing to do, e.g. already logged.
    Skipped,
}

/// Backoff settings for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first rate-limited attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each retry.
    pub base_delay: Duration,
    /// Upper bound for the doubled delay, before jitter.
    pub max_delay: Duration,
    /// Upper bound (exclusive) for the added jitter.
    pub jitter: Duration,
    /// Pause after each successful item.
    pub inter_op_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            inter_op_delay: Duration::from_millis(config.inter_op_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries `max_retries` times without ever sleeping.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            inter_op_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (zero-based) of the item `key`.
    ///
    /// `base * 2^attempt`, capped at `max_delay`, plus jitter in `[0, jitter)`.
    /// Jitter is derived from the key and attempt, so different items spread
    /// apart while a given item's schedule is reproducible.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32, key: &str) -> Duration {
        let base_ms = duration_ms(self.base_delay);
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let backoff_ms = base_ms.saturating_mul(factor).min(duration_ms(self.max_delay));

        let jitter_ms = duration_ms(self.jitter);
        let jitter = if jitter_ms == 0 {
            0
        } else {
            let mut hasher = blake3::Hasher::new();
            hasher.update(key.as_bytes());
            hasher.update(&attempt.to_le_bytes());
            let digest = hasher.finalize();
            let mut seed = [0_u8; 8];
            seed.copy_from_slice(&digest.as_bytes()[..8]);
            u64::from_le_bytes(seed) % jitter_ms
        };

        Duration::from_millis(backoff_ms.saturating_add(jitter))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Something a batch applies items to.
///
/// Futures are not required to be `Send`; batches run on the caller's task.
#[async_trait(?Send)]
pub trait BatchTarget<T> {
    /// Name of the operation, for logs and errors.
    fn operation(&self) -> &'static str;

    /// Short identifier for an item, for logs and jitter.
    fn item_key(&self, item: &T) -> String;

    /// Apply one item.
    async fn apply(&self, item: &T) -> std::result::Result<Applied, OperationError>;
}

/// An item that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Position in the input.
    pub index: usize,
    /// The item's key.
    pub key: String,
    /// Attempts made.
    pub attempts: u32,
    /// Last error.
    pub error: OperationError,
}

/// Per-item accounting for a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Name of the operation.
    pub operation: &'static str,
    /// Items in the batch.
    pub total: usize,
    /// Items applied.
    pub succeeded: usize,
    /// Items that needed no change.
    pub skipped: usize,
    /// Items that failed.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every item was applied or skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a report with failures into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchIncomplete`] when any item failed.
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(Error::BatchIncomplete {
                operation: self.operation,
                failed: self.failed(),
                total: self.total,
            })
        }
    }
}

/// Apply `items` to `target` one at a time under `policy`.
pub async fn run_batch<T, B>(policy: &RetryPolicy, target: &B, items: &[T]) -> BatchReport
where
    B: BatchTarget<T> + ?Sized,
{
    let operation = target.operation();
    let mut report = BatchReport {
        operation,
        total: items.len(),
        succeeded: 0,
        skipped: 0,
        failures: Vec::new(),
    };

    for (index, item) in items.iter().enumerate() {
        let key = target.item_key(item);
        let mut attempt = 0_u32;

        loop {
            match target.apply(item).await {
                Ok(applied) => {
                    match applied {
                        Applied::Done => report.succeeded += 1,
                        Applied::Skipped => report.skipped += 1,
                    }
                    debug!(operation, %key, attempts = attempt + 1, ?applied, "item applied");
                    if !policy.inter_op_delay.is_zero() {
                        tokio::time::sleep(policy.inter_op_delay).await;
                    }
                    break;
                }
                Err(OperationError::RateLimited) if attempt < policy.max_retries => {
                    let delay = policy.delay_for_attempt(attempt, &key);
                    warn!(
                        operation,
                        %key,
                        retry = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(operation, %key, attempts = attempt + 1, %error, "item failed");
                    report.failures.push(BatchFailure {
                        index,
                        key,
                        attempts: attempt + 1,
                        error,
                    });
                    break;
                }
            }
        }
    }

    info!(
        operation,
        total = report.total,
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed(),
        "batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Fails each item with a scripted sequence of errors, then succeeds.
    struct Scripted {
        script: HashMap<u32, Vec<OperationError>>,
        calls: RefCell<HashMap<u32, u32>>,
    }

    impl Scripted {
        fn new(script: HashMap<u32, Vec<OperationError>>) -> Self {
            Self {
                script,
                calls: RefCell::new(HashMap::new()),
            }
        }

        fn calls_for(&self, item: u32) -> u32 {
            self.calls.borrow().get(&item).copied().unwrap_or(0)
        }
    }

    #[async_trait(?Send)]
    impl BatchTarget<u32> for Scripted {
        fn operation(&self) -> &'static str {
            "test"
        }

        fn item_key(&self, item: &u32) -> String {
            format!("item-{item}")
        }

        async fn apply(&self, item: &u32) -> std::result::Result<Applied, OperationError> {
            let call = {
                let mut calls = self.calls.borrow_mut();
                let count = calls.entry(*item).or_insert(0);
                *count += 1;
                *count
            };
            let errors = self.script.get(item).map_or(&[][..], Vec::as_slice);
            match errors.get(call as usize - 1) {
                Some(error) => Err(error.clone()),
                None if *item == 0 => Ok(Applied::Skipped),
                None => Ok(Applied::Done),
            }
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter: Duration::ZERO,
            inter_op_delay: Duration::ZERO,
        };
        assert_eq!(policy.delay_for_attempt(0, "a"), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1, "a"), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2, "a"), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3, "a"), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(80, "a"), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_is_bounded_and_reproducible() {
        let policy = RetryPolicy {
            jitter: Duration::from_millis(250),
            ..RetryPolicy::immediate(3)
        };
        for attempt in 0..20 {
            let delay = policy.delay_for_attempt(attempt, "flight-7");
            assert!(delay < Duration::from_millis(250));
            assert_eq!(delay, policy.delay_for_attempt(attempt, "flight-7"));
        }
    }

    #[test]
    fn test_default_policy_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_rate_limited_item_recovers() {
        crate::logging::init_test_logging();
        let target = Scripted::new(HashMap::from([(
            1,
            vec![OperationError::RateLimited, OperationError::RateLimited],
        )]));
        let report = run_batch(&RetryPolicy::immediate(3), &target, &[1, 2]).await;

        assert_eq!(report.succeeded, 2);
        assert!(report.is_complete());
        assert_eq!(target.calls_for(1), 3);
        assert_eq!(target.calls_for(2), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries_and_continues() {
        let target = Scripted::new(HashMap::from([(1, vec![OperationError::RateLimited; 10])]));
        let report = run_batch(&RetryPolicy::immediate(4), &target, &[1, 2, 3]).await;

        assert_eq!(target.calls_for(1), 5);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].attempts, 5);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[0].error, OperationError::RateLimited);
        assert_eq!(report.succeeded, 2);
    }

    #[tokio::test]
    async fn test_hard_failure_is_not_retried() {
        let target = Scripted::new(HashMap::from([(
            2,
            vec![OperationError::Failed("constraint".to_string())],
        )]));
        let report = run_batch(&RetryPolicy::immediate(4), &target, &[1, 2, 3]).await;

        assert_eq!(target.calls_for(2), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].key, "item-2");
        assert_eq!(report.succeeded, 2);

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("1 of 3 test operations failed"));
    }

    #[tokio::test]
    async fn test_skipped_items_are_counted() {
        let target = Scripted::new(HashMap::new());
        let report = run_batch(&RetryPolicy::immediate(0), &target, &[0, 1]).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 1);
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let target = Scripted::new(HashMap::new());
        let report = run_batch(&RetryPolicy::immediate(1), &target, &[]).await;
        assert_eq!(report.total, 0);
        assert!(report.is_complete());
    }
}
