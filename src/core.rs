//! # Core Module / 核心模块
//!
//! This module contains the core functionality of FluxCheck: definitions and
//! their loaders, parameter expansion, the instance tree, the result tree,
//! the id registry and the suite that ties them together.
//!
//! 此模块包含 FluxCheck 的核心功能：测试定义及其加载器、参数展开、实例树、
//! 结果树、ID 注册表以及将它们组合在一起的测试套件。

pub mod config;
pub mod error;
pub mod execution;
pub mod loader;
pub mod models;
pub mod planner;
pub mod provider;
pub mod registry;
pub mod script;
pub mod suite;

// Re-exports
pub use config::{ParamList, ParameterSelector, SuiteConfig, TestSpec};
pub use error::{CollectReport, ProviderError, ResourceKind, SuiteError};
pub use models::{RecordReport, ResultRecord};
pub use provider::{FluxModel, ModelProvider};
pub use script::{case_fn, CaseLog, Registrar, ScriptCompiler, ScriptModule};
pub use suite::{TestSource, TestSuite};
