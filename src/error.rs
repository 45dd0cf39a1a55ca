use http::StatusCode;

use crate::common::ERR_CATEGORY;

/// Boxed error returned by a [`Lock`](crate::Lock) backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum ConcurrentLimiterError {
    /// The limiter was configured without a lock.
    #[error("require lock function")]
    MissingLock,
    /// The lock for this request's key is already held.
    #[error("submit too frequently")]
    SubmitTooFrequently,
    /// The lock backend failed.
    #[error("lock failed: {0}")]
    Lock(#[source] BoxError),
    /// Redis error.
    #[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
    #[cfg_attr(docsrs, doc(cfg(any(feature = "redis-tokio", feature = "redis-smol"))))]
    #[error("redis error: {0}")]
    RedisError(#[from] redis::RedisError),
    /// Invalid Redis key prefix.
    #[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
    #[cfg_attr(docsrs, doc(cfg(any(feature = "redis-tokio", feature = "redis-smol"))))]
    #[error("invalid redis key: {0}")]
    InvalidRedisKey(String),
}

impl ConcurrentLimiterError {
    /// Category tag attached to every error raised by the limiter.
    pub fn category(&self) -> &'static str {
        ERR_CATEGORY
    }

    /// HTTP status a host framework should answer with.
    ///
    /// Duplicate submissions are a client error; everything else is a server fault.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SubmitTooFrequently => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error is the duplicate-submission rejection.
    pub fn is_submit_too_frequently(&self) -> bool {
        matches!(self, Self::SubmitTooFrequently)
    }
}
