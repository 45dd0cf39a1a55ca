use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{
    BoxError, ConcurrentLimiterError, Lock, LockDecision, LockTtlMs, RedisKey, Release,
    redis_lock_key, runtime,
};

const UNLOCK_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    end

    return 0
"#;

/// Configuration for [`RedisLock`].
///
/// # Examples
///
/// ```ignore
/// use concurrent_limiter::{LockTtlMs, RedisKey, RedisLockOptions};
///
/// let client = redis::Client::open("redis://127.0.0.1:6379/")?;
/// let connection_manager = client.get_connection_manager().await?;
///
/// let options = RedisLockOptions {
///     connection_manager,
///     prefix: Some(RedisKey::try_from("myapp".to_string())?), // Keys: myapp:lock:<key>
///     ttl_ms: LockTtlMs::try_from(30_000)?,
/// };
/// ```
#[derive(Clone, Debug)]
pub struct RedisLockOptions {
    /// Redis connection manager from the `redis` crate.
    pub connection_manager: ConnectionManager,

    /// Optional prefix for all Redis keys.
    ///
    /// Keys are laid out as `<prefix>:lock:<lock key>`. If `None`, defaults to
    /// `"concurrent_limiter"`.
    pub prefix: Option<RedisKey>,

    /// Lease after which Redis frees a key nobody released.
    pub ttl_ms: LockTtlMs,
}

/// Distributed lock backed by Redis.
///
/// # Algorithm
///
/// 1. **Acquire:** `SET <prefix>:lock:<key> <token> NX PX <ttl>`. Redis applies
///    it atomically, so among racing processes only one sees `OK`.
/// 2. **Release:** a Lua script deletes the key only if it still stores this
///    grant's token, so an expired-and-retaken lock is never freed by its
///    previous holder.
///
/// The [`Release`] handed to the limiter runs on drop, which cannot await; it
/// spawns the delete on the active runtime instead. The key therefore becomes
/// free shortly after the request completes rather than exactly when.
pub struct RedisLock {
    connection_manager: ConnectionManager,
    prefix: RedisKey,
    ttl_ms: LockTtlMs,
}

impl RedisLock {
    /// Create a lock.
    pub fn new(options: RedisLockOptions) -> Self {
        Self {
            connection_manager: options.connection_manager,
            prefix: options.prefix.unwrap_or_else(RedisKey::default_prefix),
            ttl_ms: options.ttl_ms,
        }
    }

    /// Take `key` if it is free.
    ///
    /// Returns the grant's token, or `None` when another holder has the key.
    /// Pair a token with [`RedisLock::unlock`] to release from async code.
    pub async fn try_lock_token(
        &self,
        key: &str,
    ) -> Result<Option<String>, ConcurrentLimiterError> {
        let token = format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>());
        let mut connection_manager = self.connection_manager.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(redis_lock_key(&self.prefix, key))
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(*self.ttl_ms)
            .query_async(&mut connection_manager)
            .await?;

        Ok(reply.map(|_| token))
    } // end method try_lock_token

    /// Take `key` if it is free, returning a [`Release`] for the grant.
    pub async fn try_lock(&self, key: &str) -> Result<Option<Release>, ConcurrentLimiterError> {
        let Some(token) = self.try_lock_token(key).await? else {
            return Ok(None);
        };

        let connection_manager = self.connection_manager.clone();
        let redis_key = redis_lock_key(&self.prefix, key);

        Ok(Some(Release::new(move || {
            let spawned = runtime::spawn_task(async move {
                if let Err(err) = unlock_redis_key(connection_manager, &redis_key, &token).await {
                    tracing::error!(error = ?err, key = %redis_key, "Failed to release Redis lock");
                }
            });

            if !spawned {
                tracing::error!("No runtime to release Redis lock on, waiting for ttl");
            }
        })))
    } // end method try_lock

    /// Release `key` if it is still held under `token`.
    ///
    /// Returns whether a key was deleted.
    pub async fn unlock(&self, key: &str, token: &str) -> Result<bool, ConcurrentLimiterError> {
        unlock_redis_key(
            self.connection_manager.clone(),
            &redis_lock_key(&self.prefix, key),
            token,
        )
        .await
    } // end method unlock

    /// Whether `key` is currently held.
    pub async fn is_locked(&self, key: &str) -> Result<bool, ConcurrentLimiterError> {
        let mut connection_manager = self.connection_manager.clone();
        let exists: bool = connection_manager
            .exists(redis_lock_key(&self.prefix, key))
            .await?;

        Ok(exists)
    }
} // end impl RedisLock

async fn unlock_redis_key(
    mut connection_manager: ConnectionManager,
    redis_key: &str,
    token: &str,
) -> Result<bool, ConcurrentLimiterError> {
    let deleted: i64 = redis::Script::new(UNLOCK_SCRIPT)
        .key(redis_key)
        .arg(token)
        .invoke_async(&mut connection_manager)
        .await?;

    Ok(deleted > 0)
}

#[async_trait]
impl<C: Sync> Lock<C> for RedisLock {
    async fn lock(&self, key: &str, _ctx: &C) -> Result<LockDecision, BoxError> {
        Ok(match self.try_lock(key).await? {
            Some(release) => LockDecision::Granted(release),
            None => LockDecision::Denied,
        })
    }
}
