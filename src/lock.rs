//! The contract a lock backend satisfies.

use std::fmt;

use async_trait::async_trait;

use crate::BoxError;

/// Outcome of a successful call into a [`Lock`].
///
/// A backend failure is reported through the `Err` side of the call instead, so
/// every attempt ends in exactly one of: granted, denied, failed.
#[derive(Debug)]
pub enum LockDecision {
    /// The key is now held by this request. Dropping or running the
    /// [`Release`] frees it.
    Granted(Release),
    /// The key is held by another request.
    Denied,
}

/// Single-use action that frees a granted lock.
///
/// Runs exactly once: on [`Release::release`], or when dropped. Holding it in a
/// local binding ties the lock to that scope, so unwinding or cancelling the
/// owning future frees the key as well.
#[must_use = "dropping a Release frees the lock immediately"]
pub struct Release {
    action: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Release {
    /// Wrap a release action.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// A release with nothing to free.
    pub fn noop() -> Self {
        Self { action: None }
    }

    /// Run the release action now.
    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("pending", &self.action.is_some())
            .finish()
    }
}

/// A locking backend.
///
/// `lock` must be an atomic check-and-set per key: when several attempts race
/// for the same key, exactly one is granted and the rest are denied until the
/// returned [`Release`] runs. The limiter neither retries nor times out the
/// call; latency and lease policy belong to the backend.
///
/// Plain functions and closures with the signature
/// `Fn(&str, &C) -> Result<LockDecision, BoxError>` implement this trait:
///
/// ```
/// use std::sync::Arc;
///
/// use concurrent_limiter::{BoxError, Lock, LockDecision, Release, RequestSnapshot};
///
/// let lock: Arc<dyn Lock<RequestSnapshot>> =
///     Arc::new(|_key: &str, _ctx: &RequestSnapshot| -> Result<LockDecision, BoxError> {
///         Ok(LockDecision::Granted(Release::noop()))
///     });
/// # let _ = lock;
/// ```
#[async_trait]
pub trait Lock<C: Sync>: Send + Sync {
    /// Try to take the lock for `key` on behalf of the request `ctx`.
    async fn lock(&self, key: &str, ctx: &C) -> Result<LockDecision, BoxError>;
}

#[async_trait]
impl<C, F> Lock<C> for F
where
    C: Sync,
    F: Fn(&str, &C) -> Result<LockDecision, BoxError> + Send + Sync,
{
    async fn lock(&self, key: &str, ctx: &C) -> Result<LockDecision, BoxError> {
        self(key, ctx)
    }
}
