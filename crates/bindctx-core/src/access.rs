//! 边界可达性校验：确认被绑定类型向核心开放，并把开放授权传递给提供者。
//!
//! # 设计背景（Why）
//! - 提供者在构造上下文时会内省被绑定类型，若类型所在单元只向核心开放，提供者仍无法访问；
//! - 核心在调用提供者之前，以“自己已获开放”为前提，把同一包的开放授权传递给提供者单元。
//!
//! # 契约说明（What）
//! - 核心单元未命名时跳过全部检查；
//! - 数组类型剥离到最内层元素；平台类型与未命名单元中的类型不参与检查；
//! - 任一类型所在单元未向核心开放其包时返回 [`ResolveError::Accessibility`]，此时不做任何授权；
//! - 提供者单元与核心单元相同时只做检查，不做授权。

use tracing::debug;

use crate::error::ResolveError;
use crate::types::TypeHandle;
use crate::unit::IsolationUnit;

/// 校验 `classes` 并向 `provider_unit` 传递开放授权。
///
/// # Why
/// - 授权必须发生在提供者第一次内省类型之前，否则提供者会在构造期间遇到访问拒绝。
///
/// # How
/// - 第一遍收集需要处理的 `(类型, 包)`，遇到未开放的包立即失败；
/// - 第二遍对每个包调用 [`IsolationUnit::grant_open`]，授权是单向且幂等的。
///
/// # What
/// - 输入：待绑定类型、核心单元、提供者单元；
/// - 返回：全部可达时 `Ok(())`；
/// - 后置条件：成功后每个相关包都向 `provider_unit` 开放。
pub fn delegate_access(
    classes: &[TypeHandle],
    core_unit: &IsolationUnit,
    provider_unit: &IsolationUnit,
) -> Result<(), ResolveError> {
    if !core_unit.is_named() {
        return Ok(());
    }

    let mut checked = Vec::with_capacity(classes.len());
    for ty in classes {
        let ty = ty.innermost();
        let unit = ty.unit();
        if ty.is_platform() || unit.is_platform() || !unit.is_named() {
            continue;
        }
        let package = ty.package();
        if !unit.is_open(package, core_unit) {
            return Err(ResolveError::Accessibility {
                package: package.to_owned(),
                type_name: ty.name().to_owned(),
                unit: unit.display_name().to_owned(),
            });
        }
        checked.push(ty);
    }

    if provider_unit.same_unit(core_unit) {
        return Ok(());
    }
    for ty in checked {
        let unit = ty.unit();
        unit.grant_open(ty.package(), provider_unit);
        debug!(
            package = ty.package(),
            unit = unit.display_name(),
            provider_unit = provider_unit.display_name(),
            "propagated open grant to provider unit"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use tracing_test::traced_test;

    #[test]
    fn unnamed_core_skips_checks() {
        let app = IsolationUnit::named("app");
        let ty = TypeHandle::plain("app.model.Order", app.clone());
        let provider = IsolationUnit::named("provider");
        delegate_access(&[ty], &IsolationUnit::unnamed(), &provider).expect("未命名核心不校验");
        assert!(!app.is_open("app.model", &provider), "跳过校验时也不授权");
    }

    #[test]
    fn closed_package_is_reported_without_grants() {
        let core = IsolationUnit::named("bindctx.core");
        let provider = IsolationUnit::named("provider");
        let open_unit = IsolationUnit::named("open");
        open_unit.grant_open("open.model", &core);
        let closed_unit = IsolationUnit::named("closed");

        let classes = [
            TypeHandle::plain("open.model.A", open_unit.clone()),
            TypeHandle::plain("closed.model.B", closed_unit),
        ];
        let err = delegate_access(&classes, &core, &provider).expect_err("closed 未开放");
        assert_eq!(err.code(), codes::ACCESSIBILITY);
        let text = err.to_string();
        assert!(text.contains("closed.model") && text.contains("closed.model.B"), "{text}");
        assert!(!open_unit.is_open("open.model", &provider), "失败时不得产生部分授权");
    }

    #[test]
    fn arrays_platform_and_unnamed_types() {
        let core = IsolationUnit::named("bindctx.core");
        let provider = IsolationUnit::named("provider");
        let app = IsolationUnit::named("app");
        app.grant_open("app.model", &core);
        let element = TypeHandle::plain("app.model.Order", app.clone());

        let classes = [
            TypeHandle::array_of(&element),
            TypeHandle::platform("platform.lang.Text", IsolationUnit::platform()),
            TypeHandle::plain("flat.Thing", IsolationUnit::unnamed()),
        ];
        delegate_access(&classes, &core, &provider).expect("全部可达");
        assert!(app.is_open("app.model", &provider), "数组元素的包被授权");
    }

    #[test]
    fn same_unit_provider_gets_no_extra_grant() {
        let core = IsolationUnit::named("bindctx.core");
        let app = IsolationUnit::named("app");
        app.grant_open("app.model", &core);
        let ty = TypeHandle::plain("app.model.Order", app.clone());
        delegate_access(&[ty], &core, &core).expect("核心自身即提供者");
        assert!(!app.is_open("app.model", &IsolationUnit::named("provider")));
    }

    #[test]
    fn unnamed_provider_receives_grant() {
        let core = IsolationUnit::named("bindctx.core");
        let app = IsolationUnit::named("app");
        app.grant_open("app.model", &core);
        let provider = IsolationUnit::unnamed();
        let ty = TypeHandle::plain("app.model.Order", app.clone());
        delegate_access(&[ty], &core, &provider).expect("可达");
        assert!(app.is_open("app.model", &provider), "未命名提供者单元同样获得授权");
    }

    #[traced_test]
    #[test]
    fn grants_are_logged() {
        let core = IsolationUnit::named("bindctx.core");
        let app = IsolationUnit::named("app");
        app.open_to_all("app.model");
        let ty = TypeHandle::plain("app.model.Order", app);
        delegate_access(&[ty], &core, &IsolationUnit::named("provider")).expect("可达");
        assert!(logs_contain("propagated open grant"));
    }
}
