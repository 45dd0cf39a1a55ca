//! The admission guard.
//!
//! [`ConcurrentLimiter`] lets at most one request per lock key run its
//! downstream work at a time. A second request arriving while the first still
//! holds the key is rejected at once with
//! [`ConcurrentLimiterError::SubmitTooFrequently`]; nothing is queued or retried.

use std::{fmt, future::Future, sync::Arc};

use crate::{
    ConcurrentLimiterError, KeySource, Lock, LockDecision, LockKeyBuilder, RequestContext,
};

/// Predicate deciding whether a request bypasses the limiter entirely.
pub type Skipper<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Configuration for [`ConcurrentLimiter`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use concurrent_limiter::{ConcurrentLimiterOptions, LocalLock, RequestContext, RequestSnapshot};
///
/// let options = ConcurrentLimiterOptions::<RequestSnapshot> {
///     keys: vec![":ip".into(), "h:X-Token".into(), "account".into()],
///     lock: Some(Arc::new(LocalLock::new())),
///     // Let dry runs through unguarded.
///     skipper: Some(Arc::new(|ctx: &RequestSnapshot| ctx.query("dry_run").is_some())),
/// };
/// # let _ = options;
/// ```
pub struct ConcurrentLimiterOptions<C: Sync> {
    /// Raw key sources, in key order. See [`KeySource`] for the syntax.
    pub keys: Vec<String>,
    /// Lock backend. Required.
    pub lock: Option<Arc<dyn Lock<C>>>,
    /// Optional bypass predicate. Defaults to never skipping.
    pub skipper: Option<Skipper<C>>,
}

impl<C: Sync> Default for ConcurrentLimiterOptions<C> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            lock: None,
            skipper: None,
        }
    }
}

impl<C: Sync> Clone for ConcurrentLimiterOptions<C> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            lock: self.lock.clone(),
            skipper: self.skipper.clone(),
        }
    }
}

impl<C: Sync> fmt::Debug for ConcurrentLimiterOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentLimiterOptions")
            .field("keys", &self.keys)
            .field("lock", &self.lock.is_some())
            .field("skipper", &self.skipper.is_some())
            .finish()
    }
}

/// Single-flight admission guard.
///
/// # Flow
///
/// 1. If the skipper matches, run downstream and return its result untouched.
/// 2. Build the lock key from the configured sources.
/// 3. Ask the lock backend for the key.
///    - backend error: fail with [`ConcurrentLimiterError::Lock`]
///    - denied: fail with [`ConcurrentLimiterError::SubmitTooFrequently`]
///    - granted: run downstream once, then release
///
/// The release is bound to the scope of [`ConcurrentLimiter::handle`]. It runs
/// whether downstream returns `Ok`, returns `Err`, panics, or the returned
/// future is dropped before completion.
///
/// The limiter holds no lock state of its own; all coordination happens in the
/// backend. Share it across tasks with an [`Arc`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use concurrent_limiter::{
///     ConcurrentLimiter, ConcurrentLimiterError, ConcurrentLimiterOptions, LocalLock,
///     RequestSnapshot,
/// };
///
/// # async fn run() -> Result<(), ConcurrentLimiterError> {
/// let limiter = ConcurrentLimiter::new(ConcurrentLimiterOptions::<RequestSnapshot> {
///     keys: vec![":ip".into(), "account".into()],
///     lock: Some(Arc::new(LocalLock::new())),
///     skipper: None,
/// })?;
///
/// let ctx = RequestSnapshot::new().with_body(r#"{"account":"tree.xie"}"#);
///
/// let body = limiter
///     .handle(&ctx, || async { Ok::<_, ConcurrentLimiterError>("hello world") })
///     .await?;
/// # let _ = body;
/// # Ok(())
/// # }
/// ```
pub struct ConcurrentLimiter<C: Sync> {
    key_builder: LockKeyBuilder,
    lock: Arc<dyn Lock<C>>,
    skipper: Option<Skipper<C>>,
}

impl<C: RequestContext + Sync> ConcurrentLimiter<C> {
    /// Create a limiter.
    ///
    /// Fails with [`ConcurrentLimiterError::MissingLock`] when no lock is
    /// configured, so a misconfigured limiter never reaches request handling.
    pub fn new(options: ConcurrentLimiterOptions<C>) -> Result<Self, ConcurrentLimiterError> {
        let Some(lock) = options.lock else {
            return Err(ConcurrentLimiterError::MissingLock);
        };

        Ok(Self {
            key_builder: LockKeyBuilder::new(&options.keys),
            lock,
            skipper: options.skipper,
        })
    } // end constructor

    /// Parsed key sources, in key order.
    pub fn key_sources(&self) -> &[KeySource] {
        self.key_builder.sources()
    }

    /// The lock key this limiter derives for `ctx`.
    pub fn lock_key(&self, ctx: &C) -> String {
        self.key_builder.build(ctx)
    }

    /// Admit or reject one request.
    ///
    /// `next` is the downstream work. It runs at most once, and only when the
    /// request is skipped or the lock is granted. Its error type only needs to
    /// absorb [`ConcurrentLimiterError`]; downstream errors pass through as-is.
    pub async fn handle<F, Fut, T, E>(&self, ctx: &C, next: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ConcurrentLimiterError>,
    {
        if let Some(skipper) = &self.skipper
            && skipper(ctx)
        {
            tracing::debug!("concurrent limiter skipped");
            return next().await;
        }

        let key = self.key_builder.build(ctx);

        let release = match self.lock.lock(&key, ctx).await {
            Ok(LockDecision::Granted(release)) => release,
            Ok(LockDecision::Denied) => {
                tracing::debug!(key = %key, "submit too frequently");
                return Err(ConcurrentLimiterError::SubmitTooFrequently.into());
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "lock backend failed");
                return Err(ConcurrentLimiterError::Lock(err).into());
            }
        };

        tracing::debug!(key = %key, "lock acquired");

        // Held until this frame is left, however it is left.
        let _release = release;

        next().await
    } // end method handle
}

impl<C: Sync> fmt::Debug for ConcurrentLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentLimiter")
            .field("key_builder", &self.key_builder)
            .field("skipper", &self.skipper.is_some())
            .finish_non_exhaustive()
    }
}
