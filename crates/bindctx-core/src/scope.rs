//! 装载作用域：按名称交付类型、按路径交付资源文本。
//!
//! # 设计背景（Why）
//! - 解析核心不关心类型从何而来，只需“名字 → 类型”与“路径 → 文本”两种能力；
//! - 链接期注册表（[`StaticScope`]）覆盖绝大多数部署，磁盘资源根用于读取外部配置文件。
//!
//! # 契约说明（What）
//! - `load_type` 失败以 [`LoadError`] 描述，调用方决定它是“无提供者”还是“配置错误”；
//! - `resource` 不存在时返回 `Ok(None)`，只有真正的 I/O 故障才返回 `Err`。

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::LoadError;
use crate::types::TypeHandle;

/// 装载作用域。
pub trait LoadingScope: Send + Sync {
    /// 按全限定名装载类型。
    fn load_type(&self, name: &str) -> Result<TypeHandle, LoadError>;

    /// 读取以 `/` 分隔的资源文本。
    fn resource(&self, path: &str) -> io::Result<Option<String>>;
}

/// 基于链接期注册表的作用域。
///
/// # 教案级注释
/// - **意图 (Why)**：以显式注册替代运行时反射，测试与嵌入式部署都能精确控制可见类型；
/// - **关键要素 (How)**：
///   - 类型与资源都在构造期登记，之后只读，天然线程安全；
///   - 可选的 `resource_root` 让未登记的资源回落到磁盘目录；
/// - **契约 (What)**：
///   - 同名类型后登记者覆盖先登记者；
///   - 内存资源优先于磁盘资源；
///   - 含 `..` 或绝对前缀的资源路径被拒绝，返回 `InvalidInput`。
#[derive(Default)]
pub struct StaticScope {
    types: HashMap<String, TypeHandle>,
    resources: HashMap<String, String>,
    resource_root: Option<PathBuf>,
}

impl StaticScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记类型，名称取自类型自身。
    pub fn define(mut self, ty: TypeHandle) -> Self {
        self.types.insert(ty.name().to_owned(), ty);
        self
    }

    /// 登记内存资源。
    pub fn resource_text(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.resources.insert(path.into(), text.into());
        self
    }

    /// 设置磁盘资源根目录。
    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = Some(root.into());
        self
    }

    /// 已登记的类型数量。
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn read_from_root(root: &Path, path: &str) -> io::Result<Option<String>> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("resource path `{path}` must be relative and normalized"),
            ));
        }
        match std::fs::read_to_string(root.join(relative)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl LoadingScope for StaticScope {
    fn load_type(&self, name: &str) -> Result<TypeHandle, LoadError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(LoadError::Rejected {
                name: name.to_owned(),
                reason: "type names must be non-empty and contain no whitespace".to_owned(),
            });
        }
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::not_found(name))
    }

    fn resource(&self, path: &str) -> io::Result<Option<String>> {
        if let Some(text) = self.resources.get(path) {
            return Ok(Some(text.clone()));
        }
        match &self.resource_root {
            Some(root) => Self::read_from_root(root, path),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for StaticScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticScope")
            .field("types", &self.types.len())
            .field("resources", &self.resources.len())
            .field("resource_root", &self.resource_root)
            .finish()
    }
}

/// 把包名转换为资源路径前缀，例如 `a.b.c` → `a/b/c`。
pub fn package_to_path(package: &str) -> String {
    package.replace('.', "/")
}
