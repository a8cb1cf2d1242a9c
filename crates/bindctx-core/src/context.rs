use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// `BindingContext` 是解析成功后交给调用方的不透明句柄。
///
/// # 设计背景（Why）
/// - 解析核心并不关心提供者如何实现序列化，只需把提供者构造出的对象原样交回；
/// - 句柄内部使用 `Arc`，克隆成本为一次引用计数，便于外层缓存复用同一实例。
///
/// # 契约说明（What）
/// - 创建后不可变，核心不再持有也不管理其生命周期；
/// - `provider()` 返回构造该上下文的工厂类型名，用于诊断；
/// - `downcast_ref` 让知道具体提供者类型的调用方取回原始对象；
/// - `same_as` 以指针身份比较，两次解析即便产出结构相同的对象也不相等。
#[derive(Clone)]
pub struct BindingContext {
    provider: Arc<str>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl BindingContext {
    /// 以提供者名称与任意负载构造上下文。
    pub fn new<T>(provider: impl Into<Arc<str>>, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            provider: provider.into(),
            payload: Arc::new(payload),
        }
    }

    /// 构造该上下文的工厂类型名。
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// 尝试以具体类型借用负载。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// 判断两个句柄是否指向同一次解析的产物。
    pub fn same_as(&self, other: &BindingContext) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Payload(u32);

    #[test]
    fn clones_share_identity() {
        let ctx = BindingContext::new("demo.Factory", Payload(7));
        let copy = ctx.clone();
        assert!(ctx.same_as(&copy));
        assert_eq!(copy.downcast_ref::<Payload>(), Some(&Payload(7)));
        assert_eq!(copy.provider(), "demo.Factory");
    }

    #[test]
    fn separate_constructions_differ() {
        let a = BindingContext::new("demo.Factory", Payload(1));
        let b = BindingContext::new("demo.Factory", Payload(1));
        assert!(!a.same_as(&b));
        assert!(a.downcast_ref::<String>().is_none());
    }
}
