//! 内容类解析：把冒号分隔的包列表展开为代表类列表。
//!
//! # 设计背景（Why）
//! - 按路径请求时，可达性校验需要具体的类型才能拿到所属单元，因此必须先从包名推出类；
//! - 每个包优先使用约定的工厂类，其次使用包内索引文件的第一条记录。
//!
//! # 契约说明（What）
//! - 约定类装载失败不是错误，只是转入索引文件分支；
//! - 索引文件缺失时该包不贡献任何类；
//! - 索引文件中第一条记录装载失败是配置错误，错误信息同时包含类名与包名；
//! - 读取资源时的 I/O 故障同样是配置错误。

use tracing::debug;

use crate::config::FinderConfig;
use crate::error::ResolveError;
use crate::scope::{LoadingScope, package_to_path};
use crate::types::TypeHandle;

/// 校验上下文路径并拆分为包名列表。
///
/// 路径为空或出现空段（如 `a::b`、`:a`）时返回 [`ResolveError::InvalidRequest`]。
pub fn split_context_path(context_path: &str) -> Result<Vec<&str>, ResolveError> {
    if context_path.is_empty() {
        return Err(ResolveError::invalid_request("context path must not be empty"));
    }
    let packages: Vec<&str> = context_path.split(':').collect();
    if let Some(position) = packages.iter().position(|package| package.trim().is_empty()) {
        return Err(ResolveError::invalid_request(format!(
            "context path `{context_path}` has an empty package at position {position}"
        )));
    }
    Ok(packages)
}

/// 为上下文路径中的每个包解析代表类。
///
/// # Why
/// - 路径请求本身不携带类，可达性校验却需要类来定位隔离单元。
///
/// # How
/// - 逐包尝试 `<pkg>.<conventional_factory_name>`；
/// - 未命中时读取 `<pkg 路径>/<index_file>`，只取第一条有效记录并停止读取。
///
/// # What
/// - 输入：已校验的路径、作用域、配置；
/// - 返回：按包顺序排列的类列表，可能为空；
/// - 前置条件：`context_path` 可通过 [`split_context_path`]。
pub fn resolve_content_classes(
    context_path: &str,
    scope: &dyn LoadingScope,
    config: &FinderConfig,
) -> Result<Vec<TypeHandle>, ResolveError> {
    let mut classes = Vec::new();
    for package in split_context_path(context_path)? {
        let package = package.trim();
        let conventional = format!("{package}.{}", config.conventional_factory_name);
        if let Ok(ty) = scope.load_type(&conventional) {
            classes.push(ty);
            continue;
        }

        let index_path = format!("{}/{}", package_to_path(package), config.index_file);
        let text = scope.resource(&index_path).map_err(|err| {
            ResolveError::configuration_with_cause(index_path.as_str(), "failed to read index file", err)
        })?;
        let Some(text) = text else {
            continue;
        };
        let Some(entry) = first_index_entry(&text) else {
            continue;
        };

        let class_name = format!("{package}.{entry}");
        let ty = scope.load_type(&class_name).map_err(|err| {
            ResolveError::configuration_with_cause(
                index_path.as_str(),
                format!("class `{class_name}` listed for package `{package}` could not be loaded"),
                err,
            )
        })?;
        classes.push(ty);
    }
    debug!(
        context_path,
        resolved = classes.len(),
        classes = ?classes.iter().map(TypeHandle::name).collect::<Vec<_>>(),
        "resolved content classes for context path"
    );
    Ok(classes)
}

/// 索引文件中第一条有效记录：去除空白后非空且不以 `#` 开头的行。
pub(crate) fn first_index_entry(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
}
