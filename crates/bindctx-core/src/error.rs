//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为绑定上下文解析链路集中定义错误语义，调用方据此判断失败发生在“发现”“实例化”“可达性”
//!   还是“配置”阶段；
//! - 提供者自身抛出的错误以 [`ResolveError::Provider`] 透明传播，不做二次包装。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，保证与 `std::error::Error` 生态兼容；
//! - 每个变体映射到 [`codes`] 中的稳定错误码，日志与告警只依赖错误码做聚合；
//! - `source()` 链路保持原样，不吞掉任何底层原因。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::finder::Tier;

/// 稳定错误码集合。
///
/// 码值遵循 `<域>.<语义>` 约定；同一语义的多个变体可共享同一码值。
pub mod codes {
    /// 请求参数不满足前置条件。
    pub const INVALID_REQUEST: &str = "resolve.invalid_request";
    /// 未能确定或加载提供者工厂。
    pub const PROVIDER_NOT_FOUND: &str = "resolve.provider_not_found";
    /// 工厂类型已加载但无法构造。
    pub const PROVIDER_INSTANTIATION: &str = "resolve.provider_instantiation";
    /// 被绑定类型所在隔离单元未向核心开放。
    pub const ACCESSIBILITY: &str = "resolve.accessibility";
    /// 配置资源存在但内容非法。
    pub const CONFIGURATION: &str = "resolve.configuration";
    /// 提供者在 `create_context` 中返回的原始错误。
    pub const PROVIDER: &str = "resolve.provider";
}

/// 类型装载失败的原因。
///
/// - `NotFound`：作用域内不存在该名称；
/// - `Rejected`：名称存在但作用域拒绝交付（例如名称格式非法）。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("type `{name}` not found")]
    NotFound { name: String },
    #[error("type `{name}` rejected: {reason}")]
    Rejected { name: String, reason: String },
}

impl LoadError {
    /// 构造 `NotFound`。
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// 返回装载失败所涉及的类型名。
    pub fn name(&self) -> &str {
        match self {
            Self::NotFound { name } | Self::Rejected { name, .. } => name,
        }
    }
}

/// 底层原因的统一装箱形态。
pub type ErrorCause = Box<dyn StdError + Send + Sync + 'static>;

/// `ProviderError` 表示提供者工厂在构造上下文时抛出的类型化错误。
///
/// # 设计背景（Why）
/// - 提供者实现位于解析核心之外，核心只负责把它的错误原样交还给调用方；
/// - 结构与 `CoreError` 的“消息 + 可选原因”一致，便于排障时对照。
///
/// # 契约说明（What）
/// - `Display` 仅输出 `message`，不附加任何前缀；
/// - `source()` 返回构造时附带的原因，未附带时为 `None`。
#[derive(Debug)]
pub struct ProviderError {
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
}

impl ProviderError {
    /// 以消息构造提供者错误，初始不含底层原因。
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ProviderError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn StdError + 'static))
    }
}

/// 解析链路的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把“没有名字”“名字加载失败”“类型形态不对”“可达性拒绝”“配置损坏”
///   五类失败显式区分，调用方无需解析字符串即可定位阶段；
/// - **契约 (What)**：
///   - 所有失败对当前调用都是终止性的，解析器不会在拿到名字之后降级重试；
///   - [`ResolveError::Provider`] 使用 `#[error(transparent)]`，`Display` 与 `source()`
///     都直接转发给提供者错误本身；
/// - **设计权衡 (Trade-offs)**：`NoProvider` 与 `ProviderNotFound` 拆成两个变体以便携带
///   不同上下文，但共享 [`codes::PROVIDER_NOT_FOUND`]。
#[derive(Debug, Error)]
pub enum ResolveError {
    /// 请求本身不合法，例如上下文路径为空或含空包名。
    #[error("invalid resolution request: {reason}")]
    InvalidRequest { reason: String },

    /// 所有发现层级都没有给出工厂名称。
    #[error("no context factory could be determined; exhausted tiers: {}", display_tiers(.exhausted))]
    NoProvider { exhausted: Vec<Tier> },

    /// 已确定工厂名称，但作用域无法加载该类型。
    #[error("provider `{provider}` (selected by {tier}) not found")]
    ProviderNotFound {
        provider: String,
        tier: Tier,
        #[source]
        source: LoadError,
    },

    /// 工厂类型已加载，但形态不符或构造失败。
    #[error("provider `{provider}` could not be instantiated: {reason}")]
    ProviderInstantiation {
        provider: String,
        reason: String,
        #[source]
        source: Option<ErrorCause>,
    },

    /// 被绑定类型所在单元没有向核心开放对应包。
    #[error("package `{package}` of type `{type_name}` is not open to the binding core by unit `{unit}`")]
    Accessibility {
        package: String,
        type_name: String,
        unit: String,
    },

    /// 配置资源存在但内容非法或不可读。
    #[error("configuration resource `{resource}` is invalid: {reason}")]
    Configuration {
        resource: String,
        reason: String,
        #[source]
        source: Option<ErrorCause>,
    },

    /// 提供者返回的原始错误，原样透传。
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ResolveError {
    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => codes::INVALID_REQUEST,
            Self::NoProvider { .. } | Self::ProviderNotFound { .. } => codes::PROVIDER_NOT_FOUND,
            Self::ProviderInstantiation { .. } => codes::PROVIDER_INSTANTIATION,
            Self::Accessibility { .. } => codes::ACCESSIBILITY,
            Self::Configuration { .. } => codes::CONFIGURATION,
            Self::Provider(_) => codes::PROVIDER,
        }
    }

    /// 是否属于“找不到提供者”语义。
    pub fn is_provider_not_found(&self) -> bool {
        self.code() == codes::PROVIDER_NOT_FOUND
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration_with_cause(
        resource: impl Into<String>,
        reason: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Configuration {
            resource: resource.into(),
            reason: reason.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub(crate) fn instantiation(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderInstantiation {
            provider: provider.into(),
            reason: reason.into(),
            source: None,
        }
    }
}

fn display_tiers(tiers: &[Tier]) -> String {
    tiers
        .iter()
        .map(|tier| tier.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 查找器配置解析失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 文本无法反序列化。
    #[error("failed to parse finder configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// 字段取值非法。
    #[error("invalid finder configuration field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_is_transparent() {
        let err: ResolveError = ProviderError::new("test").into();
        assert_eq!(err.to_string(), "test");
        assert!(err.source().is_none(), "透传错误不得额外附加原因");
        assert_eq!(err.code(), codes::PROVIDER);
    }

    #[test]
    fn provider_error_keeps_its_cause() {
        let io = std::io::Error::other("disk gone");
        let err: ResolveError = ProviderError::new("boom").with_cause(io).into();
        let source = err.source().expect("原因必须沿 source 链暴露");
        assert_eq!(source.to_string(), "disk gone");
    }

    #[test]
    fn no_provider_lists_tiers() {
        let err = ResolveError::NoProvider {
            exhausted: vec![Tier::Properties, Tier::Default],
        };
        let text = err.to_string();
        assert!(text.contains("properties"));
        assert!(text.contains("default"));
        assert!(err.is_provider_not_found());
    }
}
