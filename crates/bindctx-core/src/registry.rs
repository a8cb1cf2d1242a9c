//! 提供者发现注册表。
//!
//! # 设计背景（Why）
//! - 发现链第三层需要“按能力名列出已登记的提供者名称”，且结果依赖请求所在的作用域；
//! - 两种登记方式并存：初始化期代码登记（[`StaticRegistry`]）与作用域内的服务清单文件
//!   （[`ServiceFileRegistry`]）。
//!
//! # 契约说明（What）
//! - 迭代器按实现定义的顺序产出名称，解析器只取第一个；
//! - 迭代过程中的故障以 `Err(LoadError)` 产出，解析器将其视为配置错误；
//! - 注册表只提供名称，不负责装载类型。

use std::collections::HashMap;
use std::fmt;
use std::iter;

use parking_lot::RwLock;

use crate::error::LoadError;
use crate::scope::LoadingScope;

/// 注册表迭代器的产出类型。
pub type ProviderNames<'a> = Box<dyn Iterator<Item = Result<String, LoadError>> + 'a>;

/// 提供者发现注册表。
pub trait DiscoveryRegistry: Send + Sync {
    /// 列出 `capability` 的提供者名称。
    fn providers<'a>(&'a self, capability: &str, scope: &'a dyn LoadingScope) -> ProviderNames<'a>;
}

/// 初始化期登记的注册表。
///
/// 同一能力的多个提供者按登记顺序产出；与作用域无关。
#[derive(Default)]
pub struct StaticRegistry {
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式登记。
    pub fn with(self, capability: impl Into<String>, provider: impl Into<String>) -> Self {
        self.register(capability, provider);
        self
    }

    /// 为 `capability` 追加一个提供者名称。
    pub fn register(&self, capability: impl Into<String>, provider: impl Into<String>) {
        self.entries
            .write()
            .entry(capability.into())
            .or_default()
            .push(provider.into());
    }
}

impl DiscoveryRegistry for StaticRegistry {
    fn providers<'a>(&'a self, capability: &str, _scope: &'a dyn LoadingScope) -> ProviderNames<'a> {
        let names = self
            .entries
            .read()
            .get(capability)
            .cloned()
            .unwrap_or_default();
        Box::new(names.into_iter().map(Ok))
    }
}

impl fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticRegistry")
            .field("capabilities", &self.entries.read().len())
            .finish()
    }
}

/// 从作用域读取 `<services_dir>/<capability>` 清单文件的注册表。
///
/// # 教案级注释
/// - **意图 (Why)**：让提供者随自身资源一并发布，调用方无需改代码即可切换实现；
/// - **关键要素 (How)**：
///   - 每行一个名称，`#` 之后为注释，去除首尾空白后跳过空行；
///   - 名称按文件行序产出；
/// - **契约 (What)**：
///   - 清单文件不存在时不产出任何名称；
///   - 读取清单的 I/O 故障以 `LoadError::Rejected` 产出一次。
#[derive(Clone, Debug)]
pub struct ServiceFileRegistry {
    services_dir: String,
}

impl ServiceFileRegistry {
    pub fn new(services_dir: impl Into<String>) -> Self {
        Self {
            services_dir: services_dir.into(),
        }
    }

    pub fn services_dir(&self) -> &str {
        &self.services_dir
    }
}

impl DiscoveryRegistry for ServiceFileRegistry {
    fn providers<'a>(&'a self, capability: &str, scope: &'a dyn LoadingScope) -> ProviderNames<'a> {
        let path = format!("{}/{}", self.services_dir.trim_end_matches('/'), capability);
        match scope.resource(&path) {
            Ok(Some(text)) => Box::new(parse_service_lines(&text).into_iter().map(Ok)),
            Ok(None) => Box::new(iter::empty()),
            Err(err) => Box::new(iter::once(Err(LoadError::Rejected {
                name: path,
                reason: err.to_string(),
            }))),
        }
    }
}

fn parse_service_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::StaticScope;

    #[test]
    fn static_registry_keeps_registration_order() {
        let registry = StaticRegistry::new()
            .with("bindctx.ContextFactory", "first.Factory")
            .with("bindctx.ContextFactory", "second.Factory");
        let scope = StaticScope::new();
        let names: Vec<_> = registry
            .providers("bindctx.ContextFactory", &scope)
            .collect::<Result<_, _>>()
            .expect("静态注册表不会失败");
        assert_eq!(names, ["first.Factory", "second.Factory"]);
        assert_eq!(registry.providers("other", &scope).count(), 0);
    }

    #[test]
    fn service_file_lines_strip_comments() {
        let scope = StaticScope::new().resource_text(
            "META-INF/services/bindctx.ContextFactory",
            "# providers\n\n  vendor.Factory  # primary\nbackup.Factory\n",
        );
        let registry = ServiceFileRegistry::new("META-INF/services");
        let names: Vec<_> = registry
            .providers("bindctx.ContextFactory", &scope)
            .collect::<Result<_, _>>()
            .expect("清单可读");
        assert_eq!(names, ["vendor.Factory", "backup.Factory"]);
    }

    #[test]
    fn missing_service_file_yields_nothing() {
        let registry = ServiceFileRegistry::new("META-INF/services/");
        assert_eq!(registry.providers("bindctx.ContextFactory", &StaticScope::new()).count(), 0);
    }
}
