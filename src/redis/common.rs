use std::{ops::Deref, sync::Arc};

use crate::ConcurrentLimiterError;

/// A validated newtype for the Redis key prefix.
///
/// This is a string with the following constraints:
/// - Must not be empty
/// - Must not be longer than 255 bytes
/// - Must not contain colons
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash, Eq)]
pub struct RedisKey(Arc<str>);

impl RedisKey {
    /// Create a new default prefix.
    pub fn default_prefix() -> Self {
        Self(Arc::from("concurrent_limiter"))
    }
}

impl Deref for RedisKey {
    type Target = Arc<str>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<String> for RedisKey {
    type Error = ConcurrentLimiterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(ConcurrentLimiterError::InvalidRedisKey(
                "Redis key must not be empty".to_string(),
            ))
        } else if value.len() > 255 {
            Err(ConcurrentLimiterError::InvalidRedisKey(
                "Redis key must not be longer than 255 characters".to_string(),
            ))
        } else if value.contains(':') {
            Err(ConcurrentLimiterError::InvalidRedisKey(
                "Redis key must not contain colons".to_string(),
            ))
        } else {
            Ok(Self(Arc::from(value)))
        }
    }
}

/// Lease length of a Redis lock, in milliseconds.
///
/// Bounds how long a key stays held if its holder dies without releasing.
/// Pick it longer than the slowest downstream work you guard: when the lease
/// runs out mid-request, a duplicate can be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockTtlMs(u64);

impl Default for LockTtlMs {
    fn default() -> Self {
        Self(60_000)
    }
}

impl Deref for LockTtlMs {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u64> for LockTtlMs {
    type Error = &'static str;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            Err("Lock ttl must be greater than 0")
        } else {
            Ok(Self(value))
        }
    }
}

pub(crate) fn redis_lock_key(prefix: &RedisKey, key: &str) -> String {
    format!("{}:lock:{}", **prefix, key)
}
