//! Retry utilities for GitHub calls that fail transiently.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::import::{ImportEvent, ProgressCallback, emit};

/// Initial delay before the first retry.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Cap on the delay between retries.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Retries after the first attempt.
pub const MAX_RETRIES: usize = 3;

/// Configuration for retry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// No retries at all; the first failure is final.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 0).with_jitter(false)
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Execute `operation`, retrying errors for which `is_retryable` holds.
///
/// Each retry is reported as [`ImportEvent::ListingRetry`] and logged at debug
/// level. `context` names what is being fetched (e.g. `alice/following`).
pub async fn with_retry<T, E, F, Fut, IsRetryable, ShortMsg>(
    mut operation: F,
    is_retryable: IsRetryable,
    short_message: ShortMsg,
    context: &str,
    config: &RetryConfig,
    on_progress: Option<&ProgressCallback>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    IsRetryable: Fn(&E) -> bool,
    ShortMsg: Fn(&E) -> String,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.clone().into_backoff())
        .notify(|err, dur| {
            let current_attempt = attempt.load(Ordering::SeqCst);
            let message = short_message(err);
            tracing::debug!(
                "Transient failure on {}, retrying in {:?} (attempt {}): {}",
                context,
                dur,
                current_attempt,
                message
            );
            emit(
                on_progress,
                ImportEvent::ListingRetry {
                    context: context.to_string(),
                    attempt: current_attempt,
                    retry_after_ms: dur.as_millis() as u64,
                    message,
                },
            );
        })
        .when(is_retryable)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(if self.transient { "flaky" } else { "fatal" })
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.min_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.max_retries, MAX_RETRIES);
        assert!(config.with_jitter);
    }

    #[test]
    fn test_retry_config_disabled() {
        let config = RetryConfig::disabled();
        assert_eq!(config.max_retries, 0);
        assert!(!config.with_jitter);
        let _backoff = config.into_backoff();
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_retries_transient_errors_and_emits_events() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                if calls_capture.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError { transient: true })
                } else {
                    Ok(7u32)
                }
            }
        };

        let events: Arc<Mutex<Vec<ImportEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            events_capture
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event);
        });

        let config = RetryConfig::new(Duration::from_millis(10), Duration::from_millis(50), 5)
            .with_jitter(false);
        let result = with_retry(
            operation,
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "alice/following",
            &config,
            Some(&callback),
        )
        .await;

        assert_eq!(result.expect("should eventually succeed"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let events = events.lock().unwrap_or_else(|e| e.into_inner());
        let retries = events
            .iter()
            .filter(|e| matches!(e, ImportEvent::ListingRetry { context, .. } if context == "alice/following"))
            .count();
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError { transient: false })
            }
        };

        let err = with_retry(
            operation,
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "alice/followers",
            &RetryConfig::default(),
            None,
        )
        .await
        .expect_err("expected error");

        assert_eq!(err.to_string(), "fatal");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn with_retry_disabled_gives_up_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError { transient: true })
            }
        };

        let result = with_retry(
            operation,
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "alice/following",
            &RetryConfig::disabled(),
            None,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
