//! 查找器配置：发现链涉及的全部命名约定。
//!
//! # 设计背景（Why）
//! - 保留键、默认工厂、索引文件名等约定在不同部署中可能需要替换，集中为一个结构体后，
//!   解析逻辑只读配置，不再散落字面量；
//! - 支持从 TOML 文本加载，便于随部署包一起分发。
//!
//! # 契约说明（What）
//! - 所有字段都有默认值，`FinderConfig::default()` 即标准约定；
//! - 未知字段在反序列化时直接报错，防止拼写错误被静默忽略；
//! - `validate()` 拒绝空名称，`from_toml_str` 会自动调用它。

use serde::Deserialize;

use crate::error::ConfigError;

/// 保留的工厂覆盖键。
pub const DEFAULT_FACTORY_KEY: &str = "bindctx.ContextFactory";
/// 旧式位置文件中同样被识别的历史键。
pub const DEFAULT_LEGACY_FACTORY_KEY: &str = "bindctx.context.factory";
/// 内置默认工厂。
pub const DEFAULT_FACTORY_NAME: &str = "bindctx.runtime.DefaultContextFactory";
/// 包内约定的工厂类简单名。
pub const DEFAULT_CONVENTIONAL_FACTORY_NAME: &str = "ObjectFactory";
/// 包内索引文件名。
pub const DEFAULT_INDEX_FILE: &str = "ctx.index";
/// 旧式位置文件名。
pub const DEFAULT_LEGACY_PROPERTIES_FILE: &str = "ctx.properties";
/// 服务清单目录。
pub const DEFAULT_SERVICES_DIR: &str = "META-INF/services";
/// 进程级覆盖的环境变量名。
pub const DEFAULT_ENV_OVERRIDE: &str = "BINDCTX_CONTEXT_FACTORY";

/// `FinderConfig` 汇总 [`ContextFinder`](crate::ContextFinder) 使用的命名约定。
///
/// # 教案级注释
/// - **意图 (Why)**：让“哪个键、哪个文件、哪个默认值”成为可审计的数据，而不是代码分支；
/// - **关键要素 (How)**：`#[serde(default, deny_unknown_fields)]`，缺省字段取 [`Default`]；
/// - **契约 (What)**：
///   - `default_factory = None` 表示不提供硬编码兜底，发现链穷尽时返回错误；
///   - `env_override = None` 表示进程级覆盖只读属性表；
///   - `forward_factory_key` 为 `true` 时保留键会原样转发给提供者。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinderConfig {
    pub factory_key: String,
    pub legacy_factory_key: String,
    pub default_factory: Option<String>,
    pub conventional_factory_name: String,
    pub index_file: String,
    pub legacy_properties_file: String,
    pub services_dir: String,
    pub env_override: Option<String>,
    pub forward_factory_key: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            factory_key: DEFAULT_FACTORY_KEY.to_owned(),
            legacy_factory_key: DEFAULT_LEGACY_FACTORY_KEY.to_owned(),
            default_factory: Some(DEFAULT_FACTORY_NAME.to_owned()),
            conventional_factory_name: DEFAULT_CONVENTIONAL_FACTORY_NAME.to_owned(),
            index_file: DEFAULT_INDEX_FILE.to_owned(),
            legacy_properties_file: DEFAULT_LEGACY_PROPERTIES_FILE.to_owned(),
            services_dir: DEFAULT_SERVICES_DIR.to_owned(),
            env_override: Some(DEFAULT_ENV_OVERRIDE.to_owned()),
            forward_factory_key: false,
        }
    }
}

impl FinderConfig {
    /// 从 TOML 文本解析并校验配置。
    ///
    /// # Why
    /// - 部署方以文件形式下发约定，解析与校验需要一步完成。
    ///
    /// # How
    /// - `toml::from_str` 反序列化，随后调用 [`FinderConfig::validate`]。
    ///
    /// # What
    /// - 输入：TOML 文本；返回：校验通过的配置或 [`ConfigError`]。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: FinderConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验所有名称字段非空且不含空白。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("factory_key", self.factory_key.as_str()),
            ("legacy_factory_key", self.legacy_factory_key.as_str()),
            ("conventional_factory_name", self.conventional_factory_name.as_str()),
            ("index_file", self.index_file.as_str()),
            ("legacy_properties_file", self.legacy_properties_file.as_str()),
            ("services_dir", self.services_dir.as_str()),
        ];
        for (field, value) in required {
            check_name(field, value)?;
        }
        if let Some(name) = &self.default_factory {
            check_name("default_factory", name)?;
        }
        if let Some(name) = &self.env_override {
            check_name("env_override", name)?;
        }
        if self.conventional_factory_name.contains('.') {
            return Err(ConfigError::Invalid {
                field: "conventional_factory_name",
                reason: "must be a simple name without a package".to_owned(),
            });
        }
        Ok(())
    }
}

fn check_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must not be empty".to_owned(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("`{value}` must not contain whitespace"),
        });
    }
    Ok(())
}
