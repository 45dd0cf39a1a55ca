#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod concurrent_limiter;
pub use concurrent_limiter::*;

mod context;
pub use context::*;

mod key_builder;
pub use key_builder::*;

mod lock;
pub use lock::*;

mod local;
pub use local::*;

#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
mod runtime;

#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
mod redis;
#[cfg(any(feature = "redis-tokio", feature = "redis-smol"))]
pub use self::redis::*;

mod error;
pub use error::*;

mod common;
pub use common::{ERR_CATEGORY, KEY_SEPARATOR, KeySource};

#[cfg(test)]
mod tests;
