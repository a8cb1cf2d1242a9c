use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use bindctx_core::{BindingContext, ResolveError, TypeHandle, WeakTypeHandle};
use tracing::{debug, trace};

/// 缓存槽中的不可变条目。
///
/// - `key` 为弱引用，缓存不会延长被绑定类型的生命周期；
/// - 条目发布后从不修改，替换时整体换新。
struct CacheEntry {
    key: WeakTypeHandle,
    context: BindingContext,
}

/// 缓存命中统计快照。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// `ContextCache` 是以类型身份为键的单槽上下文缓存。
///
/// # 设计动机（Why）
/// - 便捷入口的典型用法是“同一个类型反复绑定”，只记住最近一次结果即可覆盖绝大多数调用；
/// - 利用 `ArcSwapOption` 的“读无锁、写整体替换”特性，命中路径不需要任何锁。
///
/// # 核心契约（What）
/// - 命中条件：槽中条目的弱键仍可升级，且与请求的类型是同一份描述符；
/// - 未命中时重新解析并以 `store` 发布新条目，旧条目由最后一个读者释放；
/// - 解析失败时槽位保持不变，错误原样返回。
///
/// # 风险提示（Trade-offs & Gotchas）
/// - 并发未命中可能各自解析并各自发布，后发布者覆盖先发布者；每个调用方都拿到合法上下文，
///   只是槽位中留下哪一个不确定；
/// - 交替请求两个类型会让每次调用都未命中，需要多键缓存的调用方应自行维护。
#[derive(Default)]
pub struct ContextCache {
    slot: ArcSwapOption<CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取与 `ty` 对应的缓存上下文，不触发解析也不计数。
    pub fn lookup(&self, ty: &TypeHandle) -> Option<BindingContext> {
        let entry = self.slot.load_full()?;
        let key = entry.key.upgrade()?;
        key.same_as(ty).then(|| entry.context.clone())
    }

    /// 命中时返回缓存上下文，否则调用 `resolve` 并发布结果。
    ///
    /// # 实现（How）
    /// - 先 `load` 当前条目做身份比较；
    /// - 未命中时在无锁状态下执行 `resolve`，成功后 `store` 新条目。
    pub fn get_or_resolve<F>(&self, ty: &TypeHandle, resolve: F) -> Result<BindingContext, ResolveError>
    where
        F: FnOnce() -> Result<BindingContext, ResolveError>,
    {
        if let Some(context) = self.lookup(ty) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(type_name = ty.name(), "binding context cache hit");
            return Ok(context);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(type_name = ty.name(), "binding context cache miss, resolving");
        let context = resolve()?;
        self.slot.store(Some(Arc::new(CacheEntry {
            key: ty.downgrade(),
            context: context.clone(),
        })));
        Ok(context)
    }

    /// 清空槽位，统计不受影响。
    pub fn clear(&self) {
        self.slot.store(None);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.slot.load_full();
        f.debug_struct("ContextCache")
            .field("cached", &cached.as_ref().map(|entry| &entry.key))
            .field("stats", &self.stats())
            .finish()
    }
}
