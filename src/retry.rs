use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_DELAY_MS: u64 = 1000;

/// Bounded attempts with a fixed pause between failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Call `op` until it yields a value or attempts run out.
    ///
    /// Both `Err` and `Ok(None)` count as a failed attempt. The delay follows
    /// every failed attempt except the last one.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Display,
    {
        for attempt in 1..=self.attempts {
            match op().await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => debug!(
                    "No match for {} (attempt {}/{})",
                    label, attempt, self.attempts
                ),
                Err(e) => debug!(
                    "Lookup failed for {} (attempt {}/{}): {}",
                    label, attempt, self.attempts, e
                ),
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.delay).await;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn three_failures_two_delays() {
        let calls = &AtomicU32::new(0);
        let start = Instant::now();
        let out: Option<u32> = RetryPolicy::default()
            .run("addr", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Option<u32>, _>("boom")
            })
            .await;
        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn no_match_waits_like_an_error() {
        let calls = &AtomicU32::new(0);
        let start = Instant::now();
        let out: Option<u32> = RetryPolicy::default()
            .run("addr", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(None)
            })
            .await;
        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn no_match_counts_as_failure() {
        let calls = &AtomicU32::new(0);
        let start = Instant::now();
        let out = RetryPolicy::default()
            .run("addr", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(if n == 1 { Some("hit") } else { None })
            })
            .await;
        assert_eq!(out, Some("hit"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn success_first_try_does_not_sleep() {
        let start = Instant::now();
        let out = RetryPolicy::default()
            .run("addr", || async { Ok::<_, String>(Some(7)) })
            .await;
        assert_eq!(out, Some(7));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn zero_attempts_never_calls() {
        let calls = &AtomicU32::new(0);
        let out: Option<u32> = RetryPolicy::new(0, Duration::from_secs(1))
            .run("addr", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(1))
            })
            .await;
        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
