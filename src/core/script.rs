//! # Script Module / 脚本模块
//!
//! The plugin boundary for script-defined tests. A script source is compiled
//! once by a [`ScriptCompiler`] into a [`ScriptModule`]; loading the module
//! runs its top-level code, which registers named callables on a [`Registrar`].
//! Callables whose name starts with [`TEST_PREFIX`](crate::core::config::TEST_PREFIX)
//! become test definitions.
//!
//! 脚本测试的插件边界。脚本源由 [`ScriptCompiler`] 编译为 [`ScriptModule`]；
//! 加载模块时执行其顶层代码，在 [`Registrar`] 上注册具名函数。
//! 名称以 `test_` 开头的函数成为测试定义。

use anyhow::Result;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::core::config::ParameterSelector;
use crate::core::error::SyntaxError;
use crate::core::models::ResultRecord;
use crate::core::provider::ModelProvider;

/// A test body: `(model, project handle, result log)`.
pub type CaseFn<P> = Arc<
    dyn Fn(&mut <P as ModelProvider>::Model, &P, &mut CaseLog<'_>) -> Result<()> + Send + Sync,
>;

/// Wraps a closure as a [`CaseFn`], letting the bound drive closure signature inference.
pub fn case_fn<P, F>(body: F) -> CaseFn<P>
where
    P: ModelProvider,
    F: Fn(&mut P::Model, &P, &mut CaseLog<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(body)
}

/// The result record handed to a running body, plus the body's output sink.
///
/// Text written with `write!`/`writeln!` is kept in a buffer owned by this single
/// call and attached to the record as captured output once the body returns.
pub struct CaseLog<'a> {
    record: &'a mut ResultRecord,
    output: String,
}

impl<'a> CaseLog<'a> {
    pub(crate) fn new(record: &'a mut ResultRecord) -> Self {
        Self {
            record,
            output: String::new(),
        }
    }

    /// Text written so far during this call.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub(crate) fn into_output(self) -> String {
        self.output
    }
}

impl Deref for CaseLog<'_> {
    type Target = ResultRecord;

    fn deref(&self) -> &ResultRecord {
        self.record
    }
}

impl DerefMut for CaseLog<'_> {
    fn deref_mut(&mut self) -> &mut ResultRecord {
        self.record
    }
}

impl fmt::Write for CaseLog<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

/// A callable registered by a module, with its optional parameter selector.
pub struct RegisteredFn<P: ModelProvider> {
    pub name: String,
    pub selector: Option<ParameterSelector>,
    pub body: CaseFn<P>,
}

impl<P: ModelProvider> Clone for RegisteredFn<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            selector: self.selector.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<P: ModelProvider> fmt::Debug for RegisteredFn<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFn")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

/// Collects the callables a module registers while its top-level code runs.
pub struct Registrar<P: ModelProvider> {
    functions: Vec<RegisteredFn<P>>,
    output: String,
}

impl<P: ModelProvider> Default for Registrar<P> {
    fn default() -> Self {
        Self {
            functions: Vec::new(),
            output: String::new(),
        }
    }
}

impl<P: ModelProvider> Registrar<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callable that runs once with the provider defaults.
    pub fn register<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&mut P::Model, &P, &mut CaseLog<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(name.into(), None, Arc::new(body));
        self
    }

    /// Registers a callable expanded across `selector`.
    pub fn register_with<F>(
        &mut self,
        name: impl Into<String>,
        selector: ParameterSelector,
        body: F,
    ) -> &mut Self
    where
        F: Fn(&mut P::Model, &P, &mut CaseLog<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(name.into(), Some(selector), Arc::new(body));
        self
    }

    /// A later registration under the same name replaces the earlier one in place.
    fn insert(&mut self, name: String, selector: Option<ParameterSelector>, body: CaseFn<P>) {
        let function = RegisteredFn {
            name,
            selector,
            body,
        };
        match self.functions.iter_mut().find(|f| f.name == function.name) {
            Some(existing) => *existing = function,
            None => self.functions.push(function),
        }
    }

    pub fn functions(&self) -> &[RegisteredFn<P>] {
        &self.functions
    }

    pub(crate) fn into_parts(self) -> (Vec<RegisteredFn<P>>, String) {
        (self.functions, self.output)
    }
}

impl<P: ModelProvider> fmt::Write for Registrar<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

/// A compiled script unit. `load` is its module-scope code.
pub trait ScriptModule<P: ModelProvider> {
    fn load(&self, registrar: &mut Registrar<P>) -> Result<()>;
}

impl<P, F> ScriptModule<P> for F
where
    P: ModelProvider,
    F: Fn(&mut Registrar<P>) -> Result<()>,
{
    fn load(&self, registrar: &mut Registrar<P>) -> Result<()> {
        self(registrar)
    }
}

/// Turns script source text into a [`ScriptModule`].
pub trait ScriptCompiler<P: ModelProvider> {
    /// File extension (without the dot) of sources this compiler accepts.
    fn extension(&self) -> &str;

    fn compile(
        &self,
        source_name: &str,
        code: &str,
    ) -> std::result::Result<Arc<dyn ScriptModule<P>>, SyntaxError>;
}
