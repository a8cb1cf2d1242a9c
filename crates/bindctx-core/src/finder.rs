//! 发现链解析器：选出唯一的工厂类型，完成可达性授权后调用它构造上下文。
//!
//! # 设计背景（Why）
//! - 同一进程内可能同时存在多个提供者，调用方、部署方、提供者自身都可以声明“用哪一个”，
//!   需要一条有明确优先级的链来裁决；
//! - 工厂一旦选定就不再降级：装载或构造失败说明配置有误，应立即暴露而不是悄悄换一个实现。
//!
//! # 契约说明（What）
//! - 层级顺序固定为 [`Tier::Properties`] → [`Tier::ProcessOverride`] →
//!   [`Tier::ServiceRegistry`] → [`Tier::LegacyProperties`]（仅路径请求）→ [`Tier::Default`]；
//! - 第一个命中的层级胜出，结果从不合并；
//! - 保留键默认在转发前剔除，`forward_factory_key = true` 时原样转发；
//! - 提供者返回的错误以 [`ResolveError::Provider`] 透传。
//!
//! # 风险提示（Trade-offs）
//! - 每次调用都会重新走一遍发现链并实例化工厂，需要复用的调用方应在外层缓存上下文。

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::access::delegate_access;
use crate::classes::resolve_content_classes;
use crate::config::FinderConfig;
use crate::context::BindingContext;
use crate::error::{ConfigError, ResolveError};
use crate::factory::LoadedFactory;
use crate::properties::{
    ProcessProperties, Properties, PropertySource, PropertyValue, parse_legacy_properties,
};
use crate::registry::{DiscoveryRegistry, ServiceFileRegistry};
use crate::scope::{LoadingScope, package_to_path};
use crate::types::TypeHandle;
use crate::unit::{IsolationUnit, UnitHandle};

/// 解析核心所在隔离单元的默认名称。
pub const CORE_UNIT_NAME: &str = "bindctx.core";

/// 发现链层级。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// 请求配置表中的保留键。
    Properties,
    /// 进程级覆盖：全局属性表与环境变量。
    ProcessOverride,
    /// 发现注册表。
    ServiceRegistry,
    /// 旧式位置文件，仅路径请求使用。
    LegacyProperties,
    /// 硬编码默认工厂。
    Default,
}

impl Tier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::Properties => "properties",
            Tier::ProcessOverride => "process-override",
            Tier::ServiceRegistry => "service-registry",
            Tier::LegacyProperties => "legacy-properties",
            Tier::Default => "default",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 发现链的裁决结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    pub tier: Tier,
}

/// 一次解析请求。
///
/// `classes` 的元素是 [`TypeHandle`]，不存在“空元素”；路径在解析时校验。
#[derive(Clone, Copy)]
pub enum ResolutionRequest<'a> {
    Classes {
        classes: &'a [TypeHandle],
        scope: &'a dyn LoadingScope,
        properties: &'a Properties,
    },
    Path {
        path: &'a str,
        scope: &'a dyn LoadingScope,
        properties: &'a Properties,
    },
}

impl fmt::Debug for ResolutionRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionRequest::Classes {
                classes, properties, ..
            } => f
                .debug_struct("Classes")
                .field("classes", classes)
                .field("properties", properties)
                .finish_non_exhaustive(),
            ResolutionRequest::Path { path, properties, .. } => f
                .debug_struct("Path")
                .field("path", path)
                .field("properties", properties)
                .finish_non_exhaustive(),
        }
    }
}

/// `ContextFinder` 负责把一次请求解析为绑定上下文。
///
/// # 教案级注释
/// - **意图 (Why)**：把“选哪个工厂”“能否访问被绑定类型”“如何调用工厂”三步收敛到一个入口；
/// - **关键要素 (How)**：
///   - `config` 提供全部命名约定；
///   - `overrides` 是进程级覆盖源，`registry` 是发现注册表，二者都以 trait 对象注入；
///   - `core_unit` 是核心自身所在的隔离单元，可达性校验以它为参照；
/// - **契约 (What)**：
///   - 解析是同步的，全程在调用线程执行；
///   - 查找器本身不可变，可在线程间共享。
pub struct ContextFinder {
    config: FinderConfig,
    core_unit: UnitHandle,
    overrides: Arc<dyn PropertySource>,
    registry: Arc<dyn DiscoveryRegistry>,
}

impl ContextFinder {
    /// 以默认配置构造查找器。
    pub fn new() -> Self {
        Self::from_parts(
            FinderConfig::default(),
            IsolationUnit::named(CORE_UNIT_NAME),
            None,
            None,
        )
    }

    pub fn builder() -> ContextFinderBuilder {
        ContextFinderBuilder::default()
    }

    fn from_parts(
        config: FinderConfig,
        core_unit: UnitHandle,
        overrides: Option<Arc<dyn PropertySource>>,
        registry: Option<Arc<dyn DiscoveryRegistry>>,
    ) -> Self {
        let overrides = overrides.unwrap_or_else(|| match &config.env_override {
            Some(env_var) => Arc::new(ProcessProperties::with_env_fallback(
                config.factory_key.clone(),
                env_var.clone(),
            )),
            None => Arc::new(ProcessProperties::new()),
        });
        let registry = registry
            .unwrap_or_else(|| Arc::new(ServiceFileRegistry::new(config.services_dir.clone())));
        Self {
            config,
            core_unit,
            overrides,
            registry,
        }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn core_unit(&self) -> &UnitHandle {
        &self.core_unit
    }

    /// 按请求形态分派。
    pub fn resolve(&self, request: ResolutionRequest<'_>) -> Result<BindingContext, ResolveError> {
        match request {
            ResolutionRequest::Classes {
                classes,
                scope,
                properties,
            } => self.find_for_classes(classes, scope, properties),
            ResolutionRequest::Path {
                path,
                scope,
                properties,
            } => self.find_for_path(path, scope, properties),
        }
    }

    /// 按类列表解析上下文。
    ///
    /// # Why
    /// - 调用方已经持有要绑定的类型，只需选出工厂并确保工厂能访问这些类型。
    ///
    /// # How
    /// 1. 依次询问请求配置表、进程覆盖、注册表、默认值，得到工厂名；
    /// 2. 在 `scope` 中装载并实例化工厂；
    /// 3. 校验 `classes` 对核心可达，并把授权传递给工厂所在单元；
    /// 4. 以剔除保留键后的配置表调用 `create_context`。
    ///
    /// # What
    /// - 空类列表是合法请求，交由工厂决定如何处理；
    /// - 任一步失败都立即返回，不再尝试其它工厂。
    pub fn find_for_classes(
        &self,
        classes: &[TypeHandle],
        scope: &dyn LoadingScope,
        properties: &Properties,
    ) -> Result<BindingContext, ResolveError> {
        let resolution = self.resolve_factory_name(properties, scope, None)?;
        let (factory_type, factory) = self.load_factory(&resolution, scope)?;
        delegate_access(classes, &self.core_unit, factory_type.unit())?;
        let forwarded = self.forwarded_properties(properties);
        factory.create_for_classes(factory_type.name(), classes, &forwarded)
    }

    /// 按冒号分隔的上下文路径解析上下文。
    ///
    /// # How
    /// 1. 校验路径，并为每个包解析代表类；
    /// 2. 发现链额外启用旧式位置文件层，文件位于第一个代表类所在包下；
    /// 3. 装载、实例化、授权与转发同 [`ContextFinder::find_for_classes`]，
    ///    但调用的是 `create_context_for_path`，传入原始路径。
    pub fn find_for_path(
        &self,
        context_path: &str,
        scope: &dyn LoadingScope,
        properties: &Properties,
    ) -> Result<BindingContext, ResolveError> {
        let classes = resolve_content_classes(context_path, scope, &self.config)?;
        let anchor = classes.first().map(TypeHandle::package);
        let resolution = self.resolve_factory_name(properties, scope, anchor)?;
        let (factory_type, factory) = self.load_factory(&resolution, scope)?;
        delegate_access(&classes, &self.core_unit, factory_type.unit())?;
        let forwarded = self.forwarded_properties(properties);
        factory.create_for_path(factory_type.name(), context_path, scope, &forwarded)
    }

    /// 按层级裁决工厂名称，不装载类型。
    ///
    /// # What
    /// - `legacy_package` 为旧式位置文件所在的包；`None` 时跳过该层
    ///   （类列表请求，或路径请求没有解析出任何代表类）；
    /// - 所有层级都未命中时返回 [`ResolveError::NoProvider`]，列出已询问的层级。
    pub fn resolve_factory_name(
        &self,
        properties: &Properties,
        scope: &dyn LoadingScope,
        legacy_package: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        let mut exhausted = Vec::with_capacity(5);

        if let Some(name) = self.from_request_properties(properties)? {
            return Ok(self.hit(name, Tier::Properties));
        }
        self.miss(Tier::Properties, &mut exhausted);

        if let Some(name) = self.overrides.property(&self.config.factory_key) {
            return Ok(self.hit(name, Tier::ProcessOverride));
        }
        self.miss(Tier::ProcessOverride, &mut exhausted);

        if let Some(name) = self.from_registry(scope)? {
            return Ok(self.hit(name, Tier::ServiceRegistry));
        }
        self.miss(Tier::ServiceRegistry, &mut exhausted);

        if let Some(package) = legacy_package {
            if let Some(name) = self.from_legacy_file(package, scope)? {
                return Ok(self.hit(name, Tier::LegacyProperties));
            }
            self.miss(Tier::LegacyProperties, &mut exhausted);
        }

        if let Some(name) = self.config.default_factory.clone() {
            return Ok(self.hit(name, Tier::Default));
        }
        self.miss(Tier::Default, &mut exhausted);

        Err(ResolveError::NoProvider { exhausted })
    }

    fn hit(&self, name: String, tier: Tier) -> Resolution {
        debug!(tier = %tier, provider = %name, "selected context factory");
        Resolution { name, tier }
    }

    fn miss(&self, tier: Tier, exhausted: &mut Vec<Tier>) {
        trace!(tier = %tier, "no context factory declared at tier");
        exhausted.push(tier);
    }

    fn from_request_properties(&self, properties: &Properties) -> Result<Option<String>, ResolveError> {
        match properties.get(&self.config.factory_key) {
            None => Ok(None),
            Some(PropertyValue::Text(name)) => {
                let name = name.trim();
                Ok((!name.is_empty()).then(|| name.to_owned()))
            }
            Some(other) => Err(ResolveError::invalid_request(format!(
                "property `{}` must hold a factory type name, found {other:?}",
                self.config.factory_key
            ))),
        }
    }

    fn from_registry(&self, scope: &dyn LoadingScope) -> Result<Option<String>, ResolveError> {
        match self.registry.providers(&self.config.factory_key, scope).next() {
            None => Ok(None),
            Some(Ok(name)) => Ok(Some(name)),
            Some(Err(err)) => Err(ResolveError::configuration_with_cause(
                err.name().to_owned(),
                "discovery registry failed while listing providers",
                err,
            )),
        }
    }

    fn from_legacy_file(
        &self,
        package: &str,
        scope: &dyn LoadingScope,
    ) -> Result<Option<String>, ResolveError> {
        let path = if package.is_empty() {
            self.config.legacy_properties_file.clone()
        } else {
            format!("{}/{}", package_to_path(package), self.config.legacy_properties_file)
        };
        let text = scope.resource(&path).map_err(|err| {
            ResolveError::configuration_with_cause(path.as_str(), "failed to read legacy properties file", err)
        })?;
        let Some(text) = text else {
            return Ok(None);
        };
        let values = parse_legacy_properties(&text);
        let name = [&self.config.factory_key, &self.config.legacy_factory_key]
            .into_iter()
            .filter_map(|key| values.get(key.as_str()))
            .find(|value| !value.is_empty())
            .cloned();
        if name.is_none() {
            trace!(resource = %path, "legacy properties file declares no factory");
        }
        Ok(name)
    }

    fn load_factory(
        &self,
        resolution: &Resolution,
        scope: &dyn LoadingScope,
    ) -> Result<(TypeHandle, LoadedFactory), ResolveError> {
        let factory_type =
            scope
                .load_type(&resolution.name)
                .map_err(|source| ResolveError::ProviderNotFound {
                    provider: resolution.name.clone(),
                    tier: resolution.tier,
                    source,
                })?;
        let factory = LoadedFactory::instantiate(&factory_type)?;
        Ok((factory_type, factory))
    }

    fn forwarded_properties(&self, properties: &Properties) -> Properties {
        if self.config.forward_factory_key {
            properties.clone()
        } else {
            properties.without(&self.config.factory_key)
        }
    }
}

impl Default for ContextFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextFinder")
            .field("config", &self.config)
            .field("core_unit", &self.core_unit)
            .finish_non_exhaustive()
    }
}

/// [`ContextFinder`] 的构建器。
///
/// # 教案级注释
/// - **意图 (Why)**：四个组件都有合理默认值，调用方只替换关心的部分；
/// - **契约 (What)**：
///   - 未指定覆盖源时，按配置构造带环境变量回退的 [`ProcessProperties`]；
///   - 未指定注册表时，使用读取 `services_dir` 的 [`ServiceFileRegistry`]；
///   - `build()` 会校验配置，非法配置返回 [`ConfigError`]。
#[derive(Default)]
pub struct ContextFinderBuilder {
    config: Option<FinderConfig>,
    core_unit: Option<UnitHandle>,
    overrides: Option<Arc<dyn PropertySource>>,
    registry: Option<Arc<dyn DiscoveryRegistry>>,
}

impl ContextFinderBuilder {
    pub fn config(mut self, config: FinderConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn core_unit(mut self, unit: UnitHandle) -> Self {
        self.core_unit = Some(unit);
        self
    }

    pub fn property_source(mut self, source: impl PropertySource + 'static) -> Self {
        self.overrides = Some(Arc::new(source));
        self
    }

    pub fn registry(mut self, registry: impl DiscoveryRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// 共享已有的注册表实例。
    pub fn shared_registry(mut self, registry: Arc<dyn DiscoveryRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<ContextFinder, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let core_unit = self
            .core_unit
            .unwrap_or_else(|| IsolationUnit::named(CORE_UNIT_NAME));
        Ok(ContextFinder::from_parts(
            config,
            core_unit,
            self.overrides,
            self.registry,
        ))
    }
}
