//! # FluxCheck Library / FluxCheck 库
//!
//! A hierarchical test-orchestration engine for constraint-based metabolic
//! models. Tests come from declarative JSON sources and script modules; each
//! is expanded across models, condition sets and strain designs, run in
//! isolation, and rolled up into an addressable result tree.
//!
//! 面向约束代谢模型的分层测试编排引擎。测试来自声明式 JSON 源和脚本模块；
//! 每个测试按模型、条件集和菌株设计展开，隔离运行，并汇总为可寻址的结果树。
//!
//! ## Modules / 模块
//!
//! - `core` - Definitions, parameter expansion, execution engine and result tree
//! - `infra` - Test-source discovery and i18n support
//! - `reporting` - Console and HTML presentation of results
//!
//! - `core` - 测试定义、参数展开、执行引擎和结果树
//! - `infra` - 测试源发现和国际化支持
//! - `reporting` - 结果的控制台和 HTML 展示

pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;
pub use core::{
    case_fn, CaseLog, FluxModel, ModelProvider, ParamList, ParameterSelector, Registrar,
    ResultRecord, ScriptCompiler, ScriptModule, SuiteConfig, TestSuite,
};

/// Initializes the library's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for console and HTML output. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    // Detect system locale and set it for i18n.
    // Fallback to "en" if detection fails.
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    rust_i18n::set_locale(resolve_locale(&locale));
}

/// Maps a locale string onto one of the bundled locales.
pub fn resolve_locale(locale: &str) -> &'static str {
    let available_locales = rust_i18n::available_locales!();

    available_locales
        .iter()
        .copied()
        .find(|available| *available == locale)
        .or_else(|| {
            let lang_code = locale.split('-').next()?;
            available_locales.iter().copied().find(|available| *available == lang_code)
        })
        .unwrap_or("en")
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
