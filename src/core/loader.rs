//! # Definition Loader Module / 定义加载模块
//!
//! Turns raw sources into validated [`TestDefinition`]s. A broken source never
//! stops its siblings from loading: every failure is returned alongside the
//! source it came from.
//!
//! 将原始测试源转换为经过验证的 [`TestDefinition`]。损坏的源永远不会阻止其他源加载：
//! 每个失败都会与其来源一起返回。

use std::fmt;
use std::sync::Arc;

use crate::core::config::{missing_fields, ParameterSelector, TestSpec, TEST_PREFIX};
use crate::core::error::{LoadError, ModuleError, SchemaError, SyntaxError};
use crate::core::execution::{catch_quietly, panic_message};
use crate::core::models::join_address;
use crate::core::provider::ModelProvider;
use crate::core::script::{CaseFn, Registrar, ScriptCompiler, ScriptModule};

/// What a definition runs.
pub enum DefinitionKind<P: ModelProvider> {
    /// A declarative entry, checked by the built-in flux assertions.
    Declarative(Arc<TestSpec>),
    /// A registered script callable.
    Script(CaseFn<P>),
}

impl<P: ModelProvider> Clone for DefinitionKind<P> {
    fn clone(&self) -> Self {
        match self {
            DefinitionKind::Declarative(spec) => DefinitionKind::Declarative(Arc::clone(spec)),
            DefinitionKind::Script(body) => DefinitionKind::Script(Arc::clone(body)),
        }
    }
}

/// One loaded test, before parameter expansion.
pub struct TestDefinition<P: ModelProvider> {
    /// Name of the source that defined it.
    pub group: String,
    /// Entry key or callable name.
    pub name: String,
    pub kind: DefinitionKind<P>,
    pub selector: ParameterSelector,
}

impl<P: ModelProvider> TestDefinition<P> {
    /// Address of the definition's group node.
    pub fn id(&self) -> String {
        join_address([self.group.as_str(), self.name.as_str()])
    }

    pub fn description(&self) -> Option<&str> {
        match &self.kind {
            DefinitionKind::Declarative(spec) => Some(&spec.description),
            DefinitionKind::Script(_) => None,
        }
    }

    pub fn is_declarative(&self) -> bool {
        matches!(self.kind, DefinitionKind::Declarative(_))
    }
}

impl<P: ModelProvider> Clone for TestDefinition<P> {
    fn clone(&self) -> Self {
        Self {
            group: self.group.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            selector: self.selector.clone(),
        }
    }
}

impl<P: ModelProvider> fmt::Debug for TestDefinition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("declarative", &self.is_declarative())
            .field("selector", &self.selector)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Declarative,
    Script,
}

/// Why a whole source produced no definitions.
#[derive(Debug, Clone)]
pub enum SourceFailure {
    Load(LoadError),
    Syntax(SyntaxError),
    Module(ModuleError),
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFailure::Load(e) => e.fmt(f),
            SourceFailure::Syntax(e) => e.fmt(f),
            SourceFailure::Module(e) => e.fmt(f),
        }
    }
}

/// The outcome of loading one source.
pub struct LoadedSource<P: ModelProvider> {
    pub name: String,
    pub kind: SourceKind,
    pub definitions: Vec<TestDefinition<P>>,
    /// Declarative entries excluded by validation.
    pub invalid: Vec<SchemaError>,
    pub failure: Option<SourceFailure>,
    /// Text written by module-scope code.
    pub output: String,
}

impl<P: ModelProvider> LoadedSource<P> {
    fn empty(name: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            definitions: Vec::new(),
            invalid: Vec::new(),
            failure: None,
            output: String::new(),
        }
    }

    pub(crate) fn failed(name: &str, kind: SourceKind, failure: SourceFailure) -> Self {
        let mut source = Self::empty(name, kind);
        source.failure = Some(failure);
        source
    }
}

/// Parses a declarative source: a JSON mapping of test name to entry.
pub fn load_declarative<P: ModelProvider>(name: &str, text: &str) -> LoadedSource<P> {
    let load_error = |message: String| {
        SourceFailure::Load(LoadError {
            source_name: name.to_string(),
            message,
        })
    };

    let document: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return LoadedSource::failed(name, SourceKind::Declarative, load_error(e.to_string())),
    };

    let serde_json::Value::Object(entries) = document else {
        return LoadedSource::failed(
            name,
            SourceKind::Declarative,
            load_error("expected a mapping of test names to entries".to_string()),
        );
    };

    let mut source = LoadedSource::empty(name, SourceKind::Declarative);
    let no_fields = serde_json::Map::new();

    for (entry_key, entry) in entries {
        let fields = entry.as_object().unwrap_or(&no_fields);
        let missing = missing_fields(fields);
        if !missing.is_empty() {
            source.invalid.push(SchemaError::MissingFields {
                source_name: name.to_string(),
                entry: entry_key,
                missing,
            });
            continue;
        }

        match serde_json::from_value::<TestSpec>(entry) {
            Ok(spec) => source.definitions.push(TestDefinition {
                group: name.to_string(),
                name: entry_key,
                selector: spec.selector(),
                kind: DefinitionKind::Declarative(Arc::new(spec)),
            }),
            Err(e) => source.invalid.push(SchemaError::InvalidEntry {
                source_name: name.to_string(),
                entry: entry_key,
                message: e.to_string(),
            }),
        }
    }

    source
}

/// Compiles a script source and loads the resulting module.
pub fn load_script<P: ModelProvider>(
    name: &str,
    code: &str,
    compiler: &dyn ScriptCompiler<P>,
) -> LoadedSource<P> {
    match compiler.compile(name, code) {
        Ok(module) => load_module(name, module.as_ref()),
        Err(e) => LoadedSource::failed(name, SourceKind::Script, SourceFailure::Syntax(e)),
    }
}

/// Runs a module's top-level code and keeps its `test_` callables.
///
/// If the top-level code fails (error or panic) the module contributes no cases.
pub fn load_module<P: ModelProvider>(name: &str, module: &dyn ScriptModule<P>) -> LoadedSource<P> {
    let mut registrar = Registrar::new();
    let outcome = catch_quietly(|| module.load(&mut registrar));
    let (functions, output) = registrar.into_parts();

    let mut source = LoadedSource::empty(name, SourceKind::Script);
    source.output = output;

    let message = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{e:#}")),
        Err(payload) => Some(panic_message(payload.as_ref())),
    };

    if let Some(message) = message {
        source.failure = Some(SourceFailure::Module(ModuleError {
            source_name: name.to_string(),
            message,
        }));
        return source;
    }

    source.definitions = functions
        .into_iter()
        .filter(|f| f.name.starts_with(TEST_PREFIX))
        .map(|f| TestDefinition {
            group: name.to_string(),
            name: f.name,
            selector: f.selector.unwrap_or_default(),
            kind: DefinitionKind::Script(f.body),
        })
        .collect();

    source
}
