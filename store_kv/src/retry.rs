//! Bounded retry for transient connection errors (§7 "Bounded retry
//! exhausted").

use std::{future::Future, time::Duration};

use logger::warn;
use snafu::ResultExt;

use crate::error::{Result, RetryExhaustedSnafu};

/// Calls `attempt` up to `max_attempts` times, sleeping `backoff` between
/// tries, and surfaces a [`crate::error::Error::RetryExhausted`] if every
/// attempt fails.
pub async fn with_retries<T, E, F, Fut>(
    op: &'static str,
    key: &str,
    max_attempts: u32,
    backoff: Duration,
    mut attempt: F,
) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    for tried in 0..max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!("store op {op} failed on key {key}, attempt {}/{max_attempts}: {err}", tried + 1);
                if tried + 1 == max_attempts {
                    return Err(err)
                        .map_err(Box::<dyn std::error::Error + Send + Sync>::from)
                        .context(RetryExhaustedSnafu { op, key: key.to_string(), attempts: max_attempts });
                }
                tokio::time::sleep(backoff).await;
            }
        }
    }
    unreachable!("max_attempts is always > 0")
}
