//! 解析链路集成测试的公共桩件。
//!
//! # 模块定位（Why）
//! - 各测试文件都需要“可观测的工厂”：记录收到的参数、按需失败或拒绝保留键；
//! - 集中维护后，测试只关心发现链本身，不必重复拼装工厂与作用域。
//!
//! # 契约说明（What）
//! - 记录型工厂把调用参数写入 [`Invocation`] 作为上下文负载，测试通过 `downcast_ref` 读取；
//! - 所有查找器都通过 [`isolated_finder`] 构造，隔离进程级覆盖与磁盘清单。

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bindctx_core::{
    BindingContext, ContextFactory, ContextFinder, ContextFinderBuilder, LegacyEntryPoints,
    LoadingScope, MapPropertySource, Properties, ProviderError, StaticRegistry, TypeHandle,
    UnitHandle,
};

pub const FACTORY_KEY: &str = "bindctx.ContextFactory";
pub const DEFAULT_FACTORY: &str = "bindctx.runtime.DefaultContextFactory";

/// 工厂收到的一次调用。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub factory: String,
    pub classes: Vec<String>,
    pub path: Option<String>,
    pub property_keys: Vec<String>,
}

/// 记录调用参数的工厂。
pub struct RecordingFactory {
    name: String,
    calls: Arc<AtomicUsize>,
}

impl RecordingFactory {
    fn invocation(&self, classes: Vec<String>, path: Option<String>, properties: &Properties) -> BindingContext {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BindingContext::new(
            self.name.clone(),
            Invocation {
                factory: self.name.clone(),
                classes,
                path,
                property_keys: properties.keys().map(str::to_owned).collect(),
            },
        )
    }
}

impl ContextFactory for RecordingFactory {
    fn create_context(
        &self,
        classes: &[TypeHandle],
        properties: &Properties,
    ) -> Result<BindingContext, ProviderError> {
        let names = classes.iter().map(|ty| ty.name().to_owned()).collect();
        Ok(self.invocation(names, None, properties))
    }

    fn create_context_for_path(
        &self,
        context_path: &str,
        _scope: &dyn LoadingScope,
        properties: &Properties,
    ) -> Result<BindingContext, ProviderError> {
        Ok(self.invocation(Vec::new(), Some(context_path.to_owned()), properties))
    }
}

/// 构造记录型工厂类型，返回类型与调用计数器。
pub fn recording_type(name: &str, unit: UnitHandle) -> (TypeHandle, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let factory_name = name.to_owned();
    let ty = TypeHandle::factory(name, unit, move || {
        Ok(Arc::new(RecordingFactory {
            name: factory_name.clone(),
            calls: Arc::clone(&counter),
        }) as Arc<dyn ContextFactory>)
    });
    (ty, calls)
}

/// 收到保留键即拒绝的工厂，模拟只认识自身键的提供者。
pub struct StrictFactory;

impl StrictFactory {
    fn check(properties: &Properties) -> Result<(), ProviderError> {
        match properties.keys().next() {
            Some(key) => Err(ProviderError::new(format!("unsupported property `{key}`"))),
            None => Ok(()),
        }
    }
}

impl ContextFactory for StrictFactory {
    fn create_context(
        &self,
        _classes: &[TypeHandle],
        properties: &Properties,
    ) -> Result<BindingContext, ProviderError> {
        Self::check(properties)?;
        Ok(BindingContext::new("strict", ()))
    }

    fn create_context_for_path(
        &self,
        _context_path: &str,
        _scope: &dyn LoadingScope,
        properties: &Properties,
    ) -> Result<BindingContext, ProviderError> {
        Self::check(properties)?;
        Ok(BindingContext::new("strict", ()))
    }
}

pub fn strict_type(name: &str, unit: UnitHandle) -> TypeHandle {
    TypeHandle::factory(name, unit, || Ok(Arc::new(StrictFactory) as Arc<dyn ContextFactory>))
}

/// 总是以消息 `test` 失败且不附带原因的工厂。
pub struct FailingFactory;

impl ContextFactory for FailingFactory {
    fn create_context(
        &self,
        _classes: &[TypeHandle],
        _properties: &Properties,
    ) -> Result<BindingContext, ProviderError> {
        Err(ProviderError::new("test"))
    }

    fn create_context_for_path(
        &self,
        _context_path: &str,
        _scope: &dyn LoadingScope,
        _properties: &Properties,
    ) -> Result<BindingContext, ProviderError> {
        Err(ProviderError::new("test"))
    }
}

pub fn failing_type(name: &str, unit: UnitHandle) -> TypeHandle {
    TypeHandle::factory(name, unit, || Ok(Arc::new(FailingFactory) as Arc<dyn ContextFactory>))
}

/// 构造器本身失败的工厂类型。
pub fn broken_constructor_type(name: &str, unit: UnitHandle) -> TypeHandle {
    TypeHandle::factory(name, unit, || Err(ProviderError::new("constructor exploded")))
}

fn legacy_for_classes(classes: &[TypeHandle], properties: &Properties) -> Result<BindingContext, ProviderError> {
    Ok(BindingContext::new(
        "legacy",
        Invocation {
            factory: "legacy".to_owned(),
            classes: classes.iter().map(|ty| ty.name().to_owned()).collect(),
            path: None,
            property_keys: properties.keys().map(str::to_owned).collect(),
        },
    ))
}

fn legacy_for_path(context_path: &str, _scope: &dyn LoadingScope) -> Result<BindingContext, ProviderError> {
    Ok(BindingContext::new(
        "legacy",
        Invocation {
            factory: "legacy".to_owned(),
            classes: Vec::new(),
            path: Some(context_path.to_owned()),
            property_keys: Vec::new(),
        },
    ))
}

/// 同时暴露两个静态入口的旧式工厂类型。
pub fn legacy_type(name: &str, unit: UnitHandle) -> TypeHandle {
    TypeHandle::legacy(name, unit, LegacyEntryPoints::new(legacy_for_classes, legacy_for_path))
}

/// 只暴露类列表入口的旧式工厂类型。
pub fn legacy_classes_only_type(name: &str, unit: UnitHandle) -> TypeHandle {
    TypeHandle::legacy(
        name,
        unit,
        LegacyEntryPoints {
            for_classes: Some(legacy_for_classes),
            for_path: None,
        },
    )
}

/// 隔离进程级覆盖与磁盘清单的查找器构建器。
pub fn isolated_finder() -> ContextFinderBuilder {
    ContextFinder::builder()
        .property_source(MapPropertySource::new())
        .registry(StaticRegistry::new())
}

/// 读取记录型工厂写入的调用参数。
pub fn invocation(ctx: &BindingContext) -> &Invocation {
    ctx.downcast_ref::<Invocation>()
        .expect("上下文负载必须是 Invocation")
}
