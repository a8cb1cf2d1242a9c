//! 隔离单元与开放授权表。
//!
//! # 设计背景（Why）
//! - 被绑定类型与提供者可能分属不同的隔离单元，提供者在构造上下文时需要对类型做内省；
//! - 单元之间的可见性以显式的“包 → 受众”授权表表达，校验与授权都通过编程方式完成。
//!
//! # 契约说明（What）
//! - 未命名单元视为完全开放：`is_open` 恒为 `true`，且不会被授权逻辑修改；
//! - `grant_open` 是单向授权，只扩展“本单元向目标单元开放某包”，不会产生反向信任；
//! - 授权受众以单元身份记录，未命名单元同样可以成为授权目标。

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// 平台内置单元的名称。
pub const PLATFORM_UNIT_NAME: &str = "platform.base";

/// 共享的隔离单元句柄。
pub type UnitHandle = Arc<IsolationUnit>;

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// 单元身份标识，进程内每个单元唯一。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct UnitId(u64);

impl UnitId {
    fn next() -> Self {
        Self(NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// 单个包的开放受众。
#[derive(Clone, Debug, PartialEq, Eq)]
enum Audience {
    /// 对所有单元开放（无条件 `opens`）。
    Everyone,
    /// 仅对列出的单元开放。
    Units(HashSet<UnitId>),
}

/// `IsolationUnit` 描述一个拥有独立可见性边界的组件。
///
/// # 教案级注释
/// - **意图 (Why)**：为“包是否向某单元开放”提供可查询、可扩展的权限表，替代语言级的模块指令；
/// - **关键要素 (How)**：
///   - `id` 在构造时分配，是单元身份的唯一依据；
///   - `name` 为 `None` 表示未命名单元（扁平部署）；
///   - `platform` 标记平台内置单元，其类型在可达性校验中直接跳过；
///   - `opens` 使用 `RwLock` 保护，读多写少，授权只在解析期间偶发写入；
/// - **契约 (What)**：单元身份以构造时分配的标识比较；名称只用于诊断，同名的两个单元互不相同。
pub struct IsolationUnit {
    id: UnitId,
    name: Option<String>,
    platform: bool,
    opens: RwLock<HashMap<String, Audience>>,
}

impl IsolationUnit {
    /// 创建命名单元，初始不开放任何包。
    pub fn named(name: impl Into<String>) -> UnitHandle {
        Arc::new(Self {
            id: UnitId::next(),
            name: Some(name.into()),
            platform: false,
            opens: RwLock::new(HashMap::new()),
        })
    }

    /// 创建未命名单元。
    pub fn unnamed() -> UnitHandle {
        Arc::new(Self {
            id: UnitId::next(),
            name: None,
            platform: false,
            opens: RwLock::new(HashMap::new()),
        })
    }

    /// 创建平台内置单元。
    pub fn platform() -> UnitHandle {
        Arc::new(Self {
            id: UnitId::next(),
            name: Some(PLATFORM_UNIT_NAME.to_owned()),
            platform: true,
            opens: RwLock::new(HashMap::new()),
        })
    }

    /// 单元名称；未命名单元返回 `None`。
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 便于诊断输出的名称，未命名单元显示为 `<unnamed>`。
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// 是否为命名单元。
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// 是否为平台内置单元。
    pub fn is_platform(&self) -> bool {
        self.platform
    }

    /// 判断两个单元是否为同一单元。
    pub fn same_unit(&self, other: &IsolationUnit) -> bool {
        self.id == other.id
    }

    /// 无条件向所有单元开放 `package`。
    pub fn open_to_all(&self, package: impl Into<String>) {
        self.opens.write().insert(package.into(), Audience::Everyone);
    }

    /// 查询 `package` 是否向 `requester` 开放。
    ///
    /// - 未命名单元始终返回 `true`；
    /// - 单元对自身始终开放；
    /// - 否则查表：`Everyone` 命中任意单元，`Units` 只命中被授权的单元（含未命名单元）。
    pub fn is_open(&self, package: &str, requester: &IsolationUnit) -> bool {
        if !self.is_named() || self.same_unit(requester) {
            return true;
        }
        match self.opens.read().get(package) {
            Some(Audience::Everyone) => true,
            Some(Audience::Units(units)) => units.contains(&requester.id),
            None => false,
        }
    }

    /// 以编程方式把 `package` 的开放授权扩展给 `target`。
    ///
    /// # 契约说明（What）
    /// - 未命名单元本身完全开放，授权调用为空操作；
    /// - 目标可以是未命名单元，授权按身份记录；
    /// - 已对所有单元开放的包保持 `Everyone`，不会被收窄；
    /// - 重复授权是幂等的。
    pub fn grant_open(&self, package: &str, target: &IsolationUnit) {
        if !self.is_named() || self.same_unit(target) {
            return;
        }
        let mut opens = self.opens.write();
        match opens
            .entry(package.to_owned())
            .or_insert_with(|| Audience::Units(HashSet::new()))
        {
            Audience::Everyone => {}
            Audience::Units(units) => {
                units.insert(target.id);
            }
        }
    }
}

impl fmt::Debug for IsolationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolationUnit")
            .field("name", &self.display_name())
            .field("platform", &self.platform)
            .field("open_packages", &self.opens.read().len())
            .finish()
    }
}
