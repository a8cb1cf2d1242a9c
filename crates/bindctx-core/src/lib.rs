#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "bindctx-core: 绑定上下文解析核心，负责发现提供者工厂、校验边界可达性并构造上下文。"]

pub mod access;
pub mod classes;
pub mod config;
mod context;
pub mod error;
mod factory;
pub mod finder;
pub mod properties;
pub mod registry;
pub mod scope;
mod types;
pub mod unit;

pub use config::FinderConfig;
pub use context::BindingContext;
pub use error::{ConfigError, ErrorCause, LoadError, ProviderError, ResolveError, codes};
pub use factory::{
    ContextFactory, FactoryConstructor, LegacyClassesEntry, LegacyEntryPoints, LegacyPathEntry,
};
pub use finder::{
    CORE_UNIT_NAME, ContextFinder, ContextFinderBuilder, Resolution, ResolutionRequest, Tier,
};
pub use properties::{MapPropertySource, ProcessProperties, Properties, PropertySource, PropertyValue};
pub use registry::{DiscoveryRegistry, ServiceFileRegistry, StaticRegistry};
pub use scope::{LoadingScope, StaticScope};
pub use types::{TypeHandle, TypeShape, WeakTypeHandle};
pub use unit::{IsolationUnit, UnitHandle};
