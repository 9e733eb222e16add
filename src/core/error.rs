//! # Error Types Module / 错误类型模块
//!
//! Typed errors for every failure the engine knows how to contain. None of the
//! collection-time errors escape `collect()`; they are stored in a
//! [`CollectReport`] and mirrored as error entries on the owning record.
//!
//! 引擎能够隔离的所有失败的类型化错误。收集阶段的错误不会从 `collect()` 中逃逸，
//! 而是保存在 [`CollectReport`] 中，并作为错误条目记录在所属节点上。

use std::fmt;
use thiserror::Error;

/// The kind of resource a [`ModelProvider`](crate::core::provider::ModelProvider) failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Model,
    Conditions,
    Design,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Model => "model",
            ResourceKind::Conditions => "conditions",
            ResourceKind::Design => "design",
        };
        f.write_str(name)
    }
}

/// Errors raised by the model provider collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("no feasible solution: {0}")]
    Infeasible(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        ProviderError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// A declarative source that could not be read or parsed as structured data.
#[derive(Debug, Clone, Error)]
#[error("failed to load {source_name}: {message}")]
pub struct LoadError {
    pub source_name: String,
    pub message: String,
}

/// A script source that failed to compile.
#[derive(Debug, Clone, Error)]
#[error("syntax error in {source_name}{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
pub struct SyntaxError {
    pub source_name: String,
    pub line: Option<usize>,
    pub message: String,
}

impl SyntaxError {
    pub fn new(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// A declarative entry that failed validation and was left out of the tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("test {entry} in {source_name} is missing fields: {}", .missing.join(", "))]
    MissingFields {
        source_name: String,
        entry: String,
        missing: Vec<String>,
    },

    #[error("test {entry} in {source_name} is invalid: {message}")]
    InvalidEntry {
        source_name: String,
        entry: String,
        message: String,
    },
}

impl SchemaError {
    pub fn entry(&self) -> &str {
        match self {
            SchemaError::MissingFields { entry, .. } | SchemaError::InvalidEntry { entry, .. } => {
                entry
            }
        }
    }

    /// Missing field names, empty for invalid-value errors.
    pub fn missing_fields(&self) -> &[String] {
        match self {
            SchemaError::MissingFields { missing, .. } => missing,
            SchemaError::InvalidEntry { .. } => &[],
        }
    }
}

/// A script whose top-level registration failed; none of its cases run.
#[derive(Debug, Clone, Error)]
#[error("error with code file {source_name}: {message}")]
pub struct ModuleError {
    pub source_name: String,
    pub message: String,
}

/// Raised when a parameter leaf is asked to grow children.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("parameter variation {0} cannot have child records")]
    ParamLeaf(String),
}

/// Misuse of the public suite API.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("unknown test id: {0}")]
    UnknownId(String),

    #[error("test id {0} does not refer to a runnable node")]
    Detached(String),
}

/// Everything that went wrong while collecting, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    pub load_errors: Vec<LoadError>,
    pub syntax_errors: Vec<SyntaxError>,
    pub invalid_tests: Vec<SchemaError>,
    pub module_errors: Vec<ModuleError>,
}

impl CollectReport {
    pub fn is_clean(&self) -> bool {
        self.load_errors.is_empty()
            && self.syntax_errors.is_empty()
            && self.invalid_tests.is_empty()
            && self.module_errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.load_errors.len()
            + self.syntax_errors.len()
            + self.invalid_tests.len()
            + self.module_errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_clean()
    }
}
