use std::fmt;
use std::sync::Arc;

use crate::context::BindingContext;
use crate::error::{ProviderError, ResolveError};
use crate::properties::Properties;
use crate::scope::LoadingScope;
use crate::types::{TypeHandle, TypeShape};

/// `ContextFactory` 定义提供者构造绑定上下文的能力。
///
/// # 教案级注释
/// - **意图 (Why)**
///   - 解析核心只负责选出并实例化一个工厂，真正的上下文由工厂构造；
///   - 两个入口分别对应“按类列表”与“按上下文路径”两种请求。
/// - **契约说明 (What)**
///   - `properties` 默认已剔除保留的工厂覆盖键；不认识其余键的实现应当返回错误；
///   - 返回的 [`ProviderError`] 会被核心原样交还调用方，不做包装；
///   - 实现必须满足 `Send + Sync`，工厂实例可能跨线程使用。
/// - **风险提示 (Trade-offs)**
///   - 工厂在构造期间可能立即内省被绑定类型，核心保证在调用前完成可达性授权。
pub trait ContextFactory: Send + Sync {
    /// 按类列表构造上下文。
    fn create_context(
        &self,
        classes: &[TypeHandle],
        properties: &Properties,
    ) -> Result<BindingContext, ProviderError>;

    /// 按冒号分隔的上下文路径构造上下文。
    fn create_context_for_path(
        &self,
        context_path: &str,
        scope: &dyn LoadingScope,
        properties: &Properties,
    ) -> Result<BindingContext, ProviderError>;
}

/// 工厂类型的无参构造器。
///
/// 构造失败以 [`ProviderError`] 描述，核心会将其归类为实例化失败。
pub type FactoryConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn ContextFactory>, ProviderError> + Send + Sync>;

/// 旧式“静态方法”工厂按类列表构造上下文的入口。
pub type LegacyClassesEntry =
    fn(&[TypeHandle], &Properties) -> Result<BindingContext, ProviderError>;

/// 旧式工厂按上下文路径构造上下文的入口；旧形态不接收配置表。
pub type LegacyPathEntry = fn(&str, &dyn LoadingScope) -> Result<BindingContext, ProviderError>;

/// 旧式工厂暴露的入口集合。
///
/// 旧形态不需要实例化，直接调用入口函数；缺少请求所需的入口视为形态不符。
#[derive(Clone, Copy, Default)]
pub struct LegacyEntryPoints {
    pub for_classes: Option<LegacyClassesEntry>,
    pub for_path: Option<LegacyPathEntry>,
}

impl LegacyEntryPoints {
    /// 同时提供两个入口的旧式工厂。
    pub fn new(for_classes: LegacyClassesEntry, for_path: LegacyPathEntry) -> Self {
        Self {
            for_classes: Some(for_classes),
            for_path: Some(for_path),
        }
    }
}

impl fmt::Debug for LegacyEntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyEntryPoints")
            .field("for_classes", &self.for_classes.is_some())
            .field("for_path", &self.for_path.is_some())
            .finish()
    }
}

/// 已实例化、可直接调用的工厂。
pub(crate) enum LoadedFactory {
    Instance(Arc<dyn ContextFactory>),
    Legacy(LegacyEntryPoints),
}

impl LoadedFactory {
    /// 按类型形态实例化工厂。
    ///
    /// - `ContextFactory`：调用构造器，失败归为 [`ResolveError::ProviderInstantiation`]；
    /// - `LegacyFactory`：无需实例化；
    /// - `Plain`：类型不具备工厂能力，同样是实例化失败。
    pub(crate) fn instantiate(factory_type: &TypeHandle) -> Result<Self, ResolveError> {
        match factory_type.shape() {
            TypeShape::ContextFactory(constructor) => constructor()
                .map(LoadedFactory::Instance)
                .map_err(|err| ResolveError::ProviderInstantiation {
                    provider: factory_type.name().to_owned(),
                    reason: format!("constructor failed: {err}"),
                    source: Some(Box::new(err)),
                }),
            TypeShape::LegacyFactory(entries) => Ok(LoadedFactory::Legacy(*entries)),
            TypeShape::Plain => Err(ResolveError::instantiation(
                factory_type.name(),
                "type does not implement the context factory capability",
            )),
        }
    }

    pub(crate) fn create_for_classes(
        &self,
        provider: &str,
        classes: &[TypeHandle],
        properties: &Properties,
    ) -> Result<BindingContext, ResolveError> {
        match self {
            LoadedFactory::Instance(factory) => Ok(factory.create_context(classes, properties)?),
            LoadedFactory::Legacy(entries) => {
                let entry = entries.for_classes.ok_or_else(|| {
                    ResolveError::instantiation(provider, "legacy factory has no class-list entry point")
                })?;
                Ok(entry(classes, properties)?)
            }
        }
    }

    pub(crate) fn create_for_path(
        &self,
        provider: &str,
        context_path: &str,
        scope: &dyn LoadingScope,
        properties: &Properties,
    ) -> Result<BindingContext, ResolveError> {
        match self {
            LoadedFactory::Instance(factory) => {
                Ok(factory.create_context_for_path(context_path, scope, properties)?)
            }
            LoadedFactory::Legacy(entries) => {
                let entry = entries.for_path.ok_or_else(|| {
                    ResolveError::instantiation(provider, "legacy factory has no context-path entry point")
                })?;
                Ok(entry(context_path, scope)?)
            }
        }
    }
}
