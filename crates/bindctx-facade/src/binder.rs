use std::fmt;
use std::sync::Arc;

use bindctx_core::{
    BindingContext, ContextFinder, LoadingScope, Properties, ResolveError, TypeHandle,
};

use crate::cache::{CacheStats, ContextCache};

/// `Binder` 是面向单个类型的便捷入口。
///
/// # 设计动机（Why）
/// - 多数调用方只想“拿到某个类型的上下文”，不关心配置表与发现链细节；
/// - 把查找器、作用域与单槽缓存组合在一起，同一类型的重复调用直接复用上次的上下文。
///
/// # 核心契约（What）
/// - `context_for(ty)` 以 `[ty]` 与空配置表调用 [`ContextFinder::find_for_classes`]；
/// - 缓存以类型身份为键，名称相同但来源不同的类型不会互相命中；
/// - 解析错误原样返回，不做包装。
pub struct Binder {
    finder: Arc<ContextFinder>,
    scope: Arc<dyn LoadingScope>,
    cache: ContextCache,
}

impl Binder {
    pub fn new(finder: Arc<ContextFinder>, scope: Arc<dyn LoadingScope>) -> Self {
        Self {
            finder,
            scope,
            cache: ContextCache::new(),
        }
    }

    /// 以默认查找器构造。
    pub fn with_scope(scope: impl LoadingScope + 'static) -> Self {
        Self::new(Arc::new(ContextFinder::new()), Arc::new(scope))
    }

    /// 获取 `ty` 的绑定上下文，优先复用缓存。
    pub fn context_for(&self, ty: &TypeHandle) -> Result<BindingContext, ResolveError> {
        self.cache.get_or_resolve(ty, || {
            self.finder.find_for_classes(
                std::slice::from_ref(ty),
                self.scope.as_ref(),
                &Properties::new(),
            )
        })
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn finder(&self) -> &ContextFinder {
        &self.finder
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("finder", &self.finder)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
