use std::{future::Future, time::Duration};

use log::{debug, warn};
use thiserror::Error;
use tokio::time::{sleep, Instant};

#[derive(Debug, Error)]
pub enum AwaitError {
    #[error("Timed out after {}s waiting for {}!", .timeout.as_secs(), .description)]
    Timeout {
        description: String,
        timeout: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Checks `condition` every `settings.interval` until it holds or `settings.timeout` elapses.
///
/// Errors returned by the check are treated as transient: they're logged and polling continues.
pub async fn await_condition<F, Fut>(
    settings: &PollSettings,
    description: &str,
    mut condition: F,
) -> Result<(), AwaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let deadline = Instant::now() + settings.timeout;

    loop {
        match condition().await {
            Ok(true) => return Ok(()),
            Ok(false) => debug!("Still waiting for {description}..."),
            Err(error) => warn!("Couldn't check {description}, retrying... ({error:#})"),
        }

        if Instant::now() >= deadline {
            return Err(AwaitError::Timeout {
                description: description.to_owned(),
                timeout: settings.timeout,
            });
        }

        sleep(settings.interval).await;
    }
}

/// Like [`await_condition`], but without a deadline. The first check happens after one interval.
pub async fn await_condition_indefinitely<F, Fut>(
    interval: Duration,
    description: &str,
    mut condition: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    loop {
        sleep(interval).await;

        match condition().await {
            Ok(true) => return,
            Ok(false) => debug!("Still waiting for {description}..."),
            Err(error) => warn!("Couldn't check {description}, retrying... ({error:#})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, time::Duration};

    use anyhow::anyhow;

    use super::{await_condition, await_condition_indefinitely, AwaitError, PollSettings};

    const FAST: PollSettings = PollSettings::new(Duration::from_millis(1), Duration::from_millis(50));

    #[tokio::test]
    async fn returns_once_condition_holds() {
        let calls = Cell::new(0);

        await_condition(&FAST, "the third call", || {
            calls.set(calls.get() + 1);
            let done = calls.get() >= 3;
            async move { Ok(done) }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn transient_errors_keep_polling() {
        let calls = Cell::new(0);

        await_condition(&FAST, "a flaky check", || {
            calls.set(calls.get() + 1);
            let call = calls.get();
            async move {
                match call {
                    1 => Err(anyhow!("connection reset")),
                    _ => Ok(true),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn times_out_when_condition_never_holds() {
        let result = await_condition(&FAST, "never", || async { Ok(false) }).await;

        assert!(matches!(result, Err(AwaitError::Timeout { description, .. }) if description == "never"));
    }

    #[tokio::test]
    async fn indefinite_wait_survives_errors() {
        let calls = Cell::new(0);

        await_condition_indefinitely(Duration::from_millis(1), "progress", || {
            calls.set(calls.get() + 1);
            let call = calls.get();
            async move {
                match call {
                    1 => Ok(false),
                    2 => Err(anyhow!("etcd leader changed")),
                    _ => Ok(true),
                }
            }
        })
        .await;

        assert_eq!(calls.get(), 3);
    }
}
