//! Bounded re-attempt of a single chunk transfer

use std::future::Future;

use tracing::warn;

use crate::config::DEFAULT_MAX_RETRIES;
use crate::error::UploadError;

/// Value produced by a successful attempt plus how many attempts it took
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub value: T,
    /// Total attempts made, including the successful one (>= 1)
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    /// Re-attempts used before success
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Retries a failed action at the same offset and chunk boundaries.
///
/// Attempts follow each other immediately with no backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `action` up to `max_retries + 1` times.
    ///
    /// `action` receives the zero-based attempt number. Only retryable
    /// errors are re-attempted; anything else is returned as-is. When every
    /// attempt fails the result is `RetryExhausted` carrying `offset`.
    pub async fn attempt<T, F, Fut>(
        &self,
        resource_id: &str,
        offset: u64,
        mut action: F,
    ) -> Result<RetryOutcome<T>, UploadError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let total_attempts = self.max_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 0..total_attempts {
            match action(attempt).await {
                Ok(value) => {
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempt + 1,
                    })
                }
                Err(e) if e.is_retryable() => {
                    if attempt + 1 < total_attempts {
                        warn!(
                            "Chunk at offset {} failed (attempt {}/{}): {}, retrying...",
                            offset,
                            attempt + 1,
                            total_attempts,
                            e
                        );
                    }
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }

        Err(UploadError::RetryExhausted {
            resource_id: resource_id.to_string(),
            offset,
            attempts: total_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transfer_error(offset: u64) -> UploadError {
        UploadError::transfer(offset, Some(503), "HTTP 503")
    }

    #[tokio::test]
    async fn test_max_retries_at_u32_max_still_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(u32::MAX);

        let outcome = policy
            .attempt("abc123", 0, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, UploadError>(7) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.value, 7);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_always_failing_action_runs_max_retries_plus_one() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3);

        let result: Result<RetryOutcome<()>, _> = policy
            .attempt("abc123", 4096, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transfer_error(4096)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(UploadError::RetryExhausted {
                resource_id,
                offset,
                attempts,
                ..
            }) => {
                assert_eq!(resource_id, "abc123");
                assert_eq!(offset, 4096);
                assert_eq!(attempts, 4);
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3);

        let outcome = policy
            .attempt("abc123", 0, |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transfer_error(0))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.value, 2);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.retries(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3);

        let result: Result<RetryOutcome<()>, _> = policy
            .attempt("abc123", 0, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(UploadError::Source {
                        offset: 0,
                        message: "disk gone".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(UploadError::Source { .. })));
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0);

        let result: Result<RetryOutcome<()>, _> = policy
            .attempt("abc123", 0, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transfer_error(0)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(UploadError::RetryExhausted { attempts: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_action_sees_attempt_numbers() {
        let seen = std::sync::Mutex::new(Vec::new());
        let policy = RetryPolicy::default();

        let _: Result<RetryOutcome<()>, _> = policy
            .attempt("abc123", 0, |attempt| {
                seen.lock().unwrap().push(attempt);
                async { Err(transfer_error(0)) }
            })
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
