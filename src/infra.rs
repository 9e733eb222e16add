//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for FluxCheck,
//! namely test-source discovery and i18n support.
//!
//! 此模块为 FluxCheck 提供基础设施服务，
//! 即测试源发现和国际化支持。

pub mod fs;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
