//! 配置表与进程级覆盖源。
//!
//! # 设计背景（Why）
//! - 请求携带的配置表既可能包含保留的工厂覆盖键，也可能包含只有提供者才认识的键，
//!   因此值类型需要覆盖文本、布尔、整数与任意不透明对象；
//! - 进程级覆盖是发现链的第二层，读取顺序为“进程属性表 → 环境变量”。
//!
//! # 契约说明（What）
//! - [`Properties`] 以 `BTreeMap` 保存，迭代顺序稳定，便于日志与测试断言；
//! - [`PropertySource`] 只读，解析核心从不写入覆盖源；
//! - 旧式位置文件采用 `key=value` / `key:value` 行格式，`#` 与 `!` 开头为注释。

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

/// 配置表中的单个值。
#[derive(Clone)]
pub enum PropertyValue {
    Text(String),
    Bool(bool),
    Integer(i64),
    /// 只有提供者认识的任意对象。
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl PropertyValue {
    /// 以文本形式读取；非文本值返回 `None`。
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// 借出不透明对象的具体类型。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            PropertyValue::Opaque(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            PropertyValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            PropertyValue::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
            PropertyValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

/// 请求携带的配置表。
///
/// 空表与“未提供”等价；解析核心只读取保留键，其余键原样交给提供者。
#[derive(Clone, Debug, Default)]
pub struct Properties {
    entries: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式插入，便于在测试与调用点一次性构造。
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// 返回去掉 `key` 后的副本。
    pub fn without(&self, key: &str) -> Properties {
        let mut copy = self.clone();
        copy.remove(key);
        copy
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

/// 只读的进程级覆盖源。
pub trait PropertySource: Send + Sync {
    /// 读取 `key` 对应的文本值；未设置时返回 `None`。
    fn property(&self, key: &str) -> Option<String>;
}

static PROCESS_PROPERTIES: LazyLock<RwLock<HashMap<String, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// `ProcessProperties` 是进程范围的覆盖源。
///
/// # 教案级注释
/// - **意图 (Why)**：部署方无需改动调用代码即可替换提供者；
/// - **关键要素 (How)**：
///   - 全局属性表使用 `LazyLock<RwLock<..>>`，读多写少；
///   - 属性表未命中时回退到 `env_var` 指定的环境变量；
/// - **契约 (What)**：
///   - 环境变量只对工厂覆盖键生效，键名由构造参数给定；
///   - 空串视为未设置。
#[derive(Clone, Debug)]
pub struct ProcessProperties {
    env_key: Option<String>,
    env_var: Option<String>,
}

impl ProcessProperties {
    /// 仅读取全局属性表，不回退到环境变量。
    pub fn new() -> Self {
        Self {
            env_key: None,
            env_var: None,
        }
    }

    /// 查询 `key` 未命中属性表时，回退到环境变量 `env_var`。
    pub fn with_env_fallback(key: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self {
            env_key: Some(key.into()),
            env_var: Some(env_var.into()),
        }
    }

    /// 设置全局属性。
    pub fn set(key: impl Into<String>, value: impl Into<String>) {
        PROCESS_PROPERTIES.write().insert(key.into(), value.into());
    }

    /// 清除全局属性，返回旧值。
    pub fn clear(key: &str) -> Option<String> {
        PROCESS_PROPERTIES.write().remove(key)
    }

    /// 读取全局属性，不考虑环境变量。
    pub fn get(key: &str) -> Option<String> {
        PROCESS_PROPERTIES.read().get(key).cloned()
    }
}

impl Default for ProcessProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for ProcessProperties {
    fn property(&self, key: &str) -> Option<String> {
        if let Some(value) = Self::get(key).filter(|value| !value.is_empty()) {
            return Some(value);
        }
        match (&self.env_key, &self.env_var) {
            (Some(env_key), Some(env_var)) if env_key == key => std::env::var(env_var)
                .ok()
                .filter(|value| !value.is_empty()),
            _ => None,
        }
    }
}

/// 基于固定映射的覆盖源，适合测试与嵌入式场景。
#[derive(Clone, Debug, Default)]
pub struct MapPropertySource {
    values: HashMap<String, String>,
}

impl MapPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl PropertySource for MapPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|value| !value.is_empty()).cloned()
    }
}

/// 解析旧式位置文件。
///
/// - 键止于第一个 `=`、`:` 或空白字符；
/// - 键之后的空白连同至多一个 `=`/`:` 构成分隔符，因此 `key=value`、`key: value`
///   与 `key value` 等价；
/// - 以 `#` 或 `!` 开头的行与空行被忽略；
/// - 没有分隔符的行视为值为空的键；
/// - 同名键以后出现者为准。
pub fn parse_legacy_properties(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = match line.find(|c: char| c == '=' || c == ':' || c.is_whitespace()) {
            Some(index) => {
                let rest = line[index..].trim_start();
                let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
                (&line[..index], rest.trim())
            }
            None => (line, ""),
        };
        values.insert(key.to_owned(), value.to_owned());
    }
    values
}
