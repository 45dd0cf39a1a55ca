//! Distributed lock backend on Redis.
//!
//! Lets several processes sharing one Redis deployment reject each other's
//! duplicate submissions. Available with the `redis-tokio` or `redis-smol`
//! feature.

mod common;
pub use common::*;

mod redis_lock;
pub use redis_lock::*;
