//! In-process lock backend.
//!
//! [`LocalLock`] keeps held keys in a [`DashMap`](dashmap::DashMap) inside the
//! current process.
//!
//! # When to Use
//!
//! ✅ **Use the local lock when:**
//! - A single process serves every request for a given key
//! - No external service should sit on the request path
//!
//! ❌ **Don't use the local lock when:**
//! - Several instances behind a load balancer must see each other's locks
//!   (use the Redis backend instead)
//!
//! # Examples
//!
//! ```
//! use concurrent_limiter::LocalLock;
//!
//! let lock = LocalLock::new();
//!
//! let release = lock.try_lock("192.0.2.1,tree.xie").expect("key is free");
//! assert!(lock.try_lock("192.0.2.1,tree.xie").is_none());
//!
//! release.release();
//! assert!(!lock.is_locked("192.0.2.1,tree.xie"));
//! ```

mod local_lock;
pub use local_lock::*;
