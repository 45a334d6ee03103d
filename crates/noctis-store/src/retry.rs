// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transient-error retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use noctis_core::NoctisError;
use tracing::warn;

/// Retry an operation on transient errors with exponential backoff.
///
/// Delay for attempt `n` is `base_delay * 2^n`. Permanent errors are
/// rethrown immediately; transient errors are retried up to `max_retries`
/// times before the last error surfaces.
pub async fn retry_on_transient<T, F, Fut>(
    op_name: &str,
    max_retries: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, NoctisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NoctisError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_retries => {
                let delay = base_delay * 2_u32.saturating_pow(attempt);
                warn!(
                    operation = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> NoctisError {
        NoctisError::Reasoning {
            message: "503".into(),
            transient: true,
        }
    }

    fn permanent() -> NoctisError {
        NoctisError::Validation("bad".into())
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_on_transient("test", 3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(transient()) } else { Ok(42) }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_transient("test", 3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(permanent()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_transient("test", 2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3, "initial + 2 retries");
    }
}
