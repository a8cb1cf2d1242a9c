#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "bindctx-facade: 单类便捷入口与以类型身份为键的无锁单槽上下文缓存。"]

mod binder;
mod cache;

pub use binder::Binder;
pub use cache::{CacheStats, ContextCache};
