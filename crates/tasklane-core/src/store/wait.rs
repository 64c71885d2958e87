//! Subscribe-with-predicate state watch over the object store.

use std::time::Duration;

use tasklane_types::error::{StoreError, TaskError};
use tasklane_types::resource::Resource;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{ObjectStore, get_optional};

/// How [`wait_for`] treats time and missing resources.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Give up with [`TaskError::Timeout`] after this long. `None` waits
    /// until cancelled.
    pub timeout: Option<Duration>,
    /// Keep waiting while the resource does not exist yet instead of failing
    /// with not-found.
    pub wait_for_exists: bool,
    /// Re-read the resource at this interval even if the change feed is
    /// quiet.
    pub resync: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            wait_for_exists: false,
            resync: Duration::from_secs(30),
        }
    }
}

/// Wait until the resource `name` satisfies `predicate` and return it.
///
/// Subscribes to the change feed before the first read so a transition
/// between the read and the subscription cannot be missed. Every relevant
/// change, feed lag and resync tick triggers a fresh read.
pub async fn wait_for<S, R, P>(
    store: &S,
    name: &str,
    mut predicate: P,
    opts: WaitOptions,
    cancel: &CancellationToken,
) -> Result<R, TaskError>
where
    S: ObjectStore,
    R: Resource,
    P: FnMut(&R) -> bool,
{
    let mut changes = store.changes();
    let deadline = opts.timeout.map(|timeout| Instant::now() + timeout);
    // A zero period would make `interval_at` panic.
    let period = opts.resync.max(Duration::from_millis(10));
    let mut resync = tokio::time::interval_at(Instant::now() + period, period);
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        match get_optional::<S, R>(store, name).await? {
            Some(resource) if predicate(&resource) => return Ok(resource),
            Some(_) => {}
            None if opts.wait_for_exists => {}
            None => {
                return Err(StoreError::NotFound {
                    kind: R::KIND,
                    name: name.to_string(),
                }
                .into());
            }
        }

        tracing::debug!(kind = %R::KIND, name, "waiting for resource state");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TaskError::Cancelled),
                _ = sleep_until(deadline) => {
                    return Err(TaskError::Timeout(format!("{} '{}'", R::KIND, name)));
                }
                _ = resync.tick() => break,
                change = changes.recv() => match change {
                    Ok(change) if change.kind == R::KIND && change.name == name => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change feed lagged, re-reading");
                        break;
                    }
                    Err(RecvError::Closed) => {
                        return Err(StoreError::Backend("change feed closed".to_string()).into());
                    }
                },
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
