//! 类型描述符：解析链路中“类”的运行时表示。
//!
//! # 设计背景（Why）
//! - 发现链需要按名称装载工厂类型、区分工厂形态，并在可达性校验中拿到类型所属单元与包名；
//! - 外层缓存以类型“身份”作键，因此句柄必须可做指针比较并支持弱引用。
//!
//! # 契约说明（What）
//! - [`TypeHandle`] 克隆只增加引用计数，`same_as` 比较的是同一份描述符；
//! - 数组类型的名称为元素名加 `[]`，所属单元与元素一致；
//! - 名称中最后一个 `.` 之前的部分为包名，没有 `.` 时包名为空串。

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::ProviderError;
use crate::factory::{ContextFactory, FactoryConstructor, LegacyEntryPoints};
use crate::unit::UnitHandle;

/// 类型的工厂形态。
#[derive(Clone)]
pub enum TypeShape {
    /// 普通类型，不具备构造上下文的能力。
    Plain,
    /// 通过无参构造器实例化的工厂。
    ContextFactory(FactoryConstructor),
    /// 暴露静态入口函数的旧式工厂。
    LegacyFactory(LegacyEntryPoints),
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Plain => f.write_str("Plain"),
            TypeShape::ContextFactory(_) => f.write_str("ContextFactory(..)"),
            TypeShape::LegacyFactory(entries) => f.debug_tuple("LegacyFactory").field(entries).finish(),
        }
    }
}

struct TypeInfo {
    name: String,
    unit: UnitHandle,
    element: Option<TypeHandle>,
    platform: bool,
    shape: TypeShape,
}

/// `TypeHandle` 是共享、可按身份比较的类型描述符。
///
/// # 教案级注释
/// - **意图 (Why)**：把“全限定名 + 所属单元 + 形态”绑在一起，既能交给作用域装载，
///   也能交给可达性校验与缓存使用；
/// - **关键要素 (How)**：内部为 `Arc<TypeInfo>`，构造后不可变；
/// - **契约 (What)**：两个句柄即便名称相同，只要来自不同的构造调用就不是同一类型。
#[derive(Clone)]
pub struct TypeHandle(Arc<TypeInfo>);

impl TypeHandle {
    fn build(name: String, unit: UnitHandle, shape: TypeShape) -> Self {
        Self(Arc::new(TypeInfo {
            name,
            unit,
            element: None,
            platform: false,
            shape,
        }))
    }

    /// 普通类型。
    pub fn plain(name: impl Into<String>, unit: UnitHandle) -> Self {
        Self::build(name.into(), unit, TypeShape::Plain)
    }

    /// 平台内置类型，可达性校验会直接跳过。
    pub fn platform(name: impl Into<String>, unit: UnitHandle) -> Self {
        Self(Arc::new(TypeInfo {
            name: name.into(),
            unit,
            element: None,
            platform: true,
            shape: TypeShape::Plain,
        }))
    }

    /// 以 `element` 为元素的数组类型。
    pub fn array_of(element: &TypeHandle) -> Self {
        Self(Arc::new(TypeInfo {
            name: format!("{}[]", element.name()),
            unit: element.unit().clone(),
            element: Some(element.clone()),
            platform: element.is_platform(),
            shape: TypeShape::Plain,
        }))
    }

    /// 通过构造器实例化的工厂类型。
    pub fn factory<F>(name: impl Into<String>, unit: UnitHandle, constructor: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ContextFactory>, ProviderError> + Send + Sync + 'static,
    {
        Self::build(name.into(), unit, TypeShape::ContextFactory(Arc::new(constructor)))
    }

    /// 旧式静态入口工厂类型。
    pub fn legacy(name: impl Into<String>, unit: UnitHandle, entries: LegacyEntryPoints) -> Self {
        Self::build(name.into(), unit, TypeShape::LegacyFactory(entries))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// 包名；数组类型返回元素的包名。
    pub fn package(&self) -> &str {
        if let Some(element) = &self.0.element {
            return element.package();
        }
        self.0
            .name
            .rsplit_once('.')
            .map(|(package, _)| package)
            .unwrap_or("")
    }

    pub fn simple_name(&self) -> &str {
        self.0
            .name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.0.name)
    }

    pub fn unit(&self) -> &UnitHandle {
        &self.0.unit
    }

    pub fn element_type(&self) -> Option<&TypeHandle> {
        self.0.element.as_ref()
    }

    pub fn is_array(&self) -> bool {
        self.0.element.is_some()
    }

    pub fn is_platform(&self) -> bool {
        self.0.platform
    }

    pub fn shape(&self) -> &TypeShape {
        &self.0.shape
    }

    /// 剥离所有数组层，返回最内层元素类型。
    pub fn innermost(&self) -> &TypeHandle {
        let mut current = self;
        while let Some(element) = current.element_type() {
            current = element;
        }
        current
    }

    /// 是否为同一份描述符。
    pub fn same_as(&self, other: &TypeHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// 降级为不延长生命周期的弱引用。
    pub fn downgrade(&self) -> WeakTypeHandle {
        WeakTypeHandle(Arc::downgrade(&self.0))
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.0.name)
            .field("unit", &self.0.unit.display_name())
            .field("shape", &self.0.shape)
            .finish()
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// [`TypeHandle`] 的弱引用形态。
#[derive(Clone, Default)]
pub struct WeakTypeHandle(Weak<TypeInfo>);

impl WeakTypeHandle {
    /// 类型仍存活时返回强句柄。
    pub fn upgrade(&self) -> Option<TypeHandle> {
        self.0.upgrade().map(TypeHandle)
    }
}

impl fmt::Debug for WeakTypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(ty) => write!(f, "WeakTypeHandle({})", ty.name()),
            None => f.write_str("WeakTypeHandle(<dropped>)"),
        }
    }
}
