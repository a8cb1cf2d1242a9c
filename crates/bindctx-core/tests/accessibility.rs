//! 边界可达性校验在完整解析链路中的行为。
//!
//! # 测试目标（Why）
//! - 未开放的包必须在工厂被调用之前拦截；
//! - 已开放的包在调用工厂之前被授权给工厂所在单元，无论该单元是否命名。

mod support;

use std::sync::atomic::Ordering;

use bindctx_core::{
    CORE_UNIT_NAME, IsolationUnit, Properties, ResolveError, StaticScope, TypeHandle, codes,
};
use support::*;

#[test]
fn denied_package_fails_before_factory_runs() {
    let core = IsolationUnit::named(CORE_UNIT_NAME);
    let app = IsolationUnit::named("app");
    let provider_unit = IsolationUnit::named("vendor.runtime");
    let (default, calls) = recording_type(DEFAULT_FACTORY, provider_unit);
    let scope = StaticScope::new().define(default);
    let finder = isolated_finder().core_unit(core).build().expect("默认配置");

    let order = TypeHandle::plain("app.model.Order", app);
    let err = finder
        .find_for_classes(&[order], &scope, &Properties::new())
        .expect_err("app 未开放");
    match &err {
        ResolveError::Accessibility {
            package,
            type_name,
            unit,
        } => {
            assert_eq!(package, "app.model");
            assert_eq!(type_name, "app.model.Order");
            assert_eq!(unit, "app");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.code(), codes::ACCESSIBILITY);
    assert_eq!(calls.load(Ordering::SeqCst), 0, "校验失败时工厂不得被调用");
}

#[test]
fn open_package_is_granted_to_provider_unit() {
    let core = IsolationUnit::named(CORE_UNIT_NAME);
    let app = IsolationUnit::named("app");
    app.grant_open("app.model", &core);
    let provider_unit = IsolationUnit::named("vendor.runtime");
    let (default, calls) = recording_type(DEFAULT_FACTORY, provider_unit.clone());
    let scope = StaticScope::new().define(default);
    let finder = isolated_finder().core_unit(core).build().expect("默认配置");

    assert!(!app.is_open("app.model", &provider_unit));
    let order = TypeHandle::plain("app.model.Order", app.clone());
    finder
        .find_for_classes(&[TypeHandle::array_of(&order)], &scope, &Properties::new())
        .expect("已开放");
    assert!(app.is_open("app.model", &provider_unit), "授权传递给工厂单元");
    assert!(!provider_unit.is_open("vendor.runtime", &app), "授权是单向的");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// 提供者位于未命名单元时，授权同样要落到该单元上。
#[test]
fn unnamed_provider_unit_receives_the_grant() {
    let core = IsolationUnit::named(CORE_UNIT_NAME);
    let app = IsolationUnit::named("app");
    app.grant_open("app.model", &core);
    let provider_unit = IsolationUnit::unnamed();
    let (default, calls) = recording_type(DEFAULT_FACTORY, provider_unit.clone());
    let scope = StaticScope::new().define(default);
    let finder = isolated_finder().core_unit(core).build().expect("默认配置");

    assert!(!app.is_open("app.model", &provider_unit));
    let order = TypeHandle::plain("app.model.Order", app.clone());
    finder
        .find_for_classes(&[order], &scope, &Properties::new())
        .expect("已开放");
    assert!(app.is_open("app.model", &provider_unit), "授权传递给未命名工厂单元");
    assert!(
        !app.is_open("app.model", &IsolationUnit::unnamed()),
        "其他未命名单元不受影响"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unnamed_core_skips_all_checks() {
    let app = IsolationUnit::named("app");
    let (default, calls) = recording_type(DEFAULT_FACTORY, IsolationUnit::named("vendor.runtime"));
    let scope = StaticScope::new().define(default);
    let finder = isolated_finder()
        .core_unit(IsolationUnit::unnamed())
        .build()
        .expect("默认配置");

    let order = TypeHandle::plain("app.model.Order", app);
    finder
        .find_for_classes(&[order], &scope, &Properties::new())
        .expect("未命名核心不做校验");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn path_requests_check_resolved_content_classes() {
    let core = IsolationUnit::named(CORE_UNIT_NAME);
    let app = IsolationUnit::named("app");
    let (default, calls) = recording_type(DEFAULT_FACTORY, IsolationUnit::named("vendor.runtime"));
    let scope = StaticScope::new()
        .define(default)
        .define(TypeHandle::plain("app.model.ObjectFactory", app.clone()));
    let finder = isolated_finder().core_unit(core.clone()).build().expect("默认配置");

    let err = finder
        .find_for_path("app.model", &scope, &Properties::new())
        .expect_err("代表类所在包未开放");
    assert_eq!(err.code(), codes::ACCESSIBILITY);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    app.grant_open("app.model", &core);
    finder
        .find_for_path("app.model", &scope, &Properties::new())
        .expect("开放后可解析");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn platform_types_are_not_checked() {
    let core = IsolationUnit::named(CORE_UNIT_NAME);
    let (default, _) = recording_type(DEFAULT_FACTORY, IsolationUnit::named("vendor.runtime"));
    let scope = StaticScope::new().define(default);
    let finder = isolated_finder().core_unit(core).build().expect("默认配置");

    let text = TypeHandle::platform("platform.lang.Text", IsolationUnit::platform());
    finder
        .find_for_classes(&[text], &scope, &Properties::new())
        .expect("平台类型跳过");
}
