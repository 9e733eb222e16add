//! # Test Suite Module / 测试套件模块
//!
//! [`TestSuite`] ties the engine together: it gathers sources, builds the
//! instance tree and its paired result tree, flattens both into the id
//! registry and runs all of it, one id, or one case at a time.
//!
//! [`TestSuite`] 将引擎的各部分组合在一起：收集测试源，构建实例树及与之配对的结果树，
//! 将二者展平为 ID 注册表，并运行全部、单个 id 或逐个用例。

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::SuiteConfig;
use crate::core::error::{CollectReport, LoadError, SuiteError};
use crate::core::execution::{GroupInstance, TestInstance};
use crate::core::loader::{
    load_declarative, load_module, load_script, LoadedSource, SourceFailure, SourceKind,
};
use crate::core::models::{tags, RecordReport, ResultRecord};
use crate::core::planner::{plan_default_tests, plan_definition, DEFAULT_TESTS_GROUP};
use crate::core::provider::ModelProvider;
use crate::core::registry::{resolve, IdRegistry};
use crate::core::script::{ScriptCompiler, ScriptModule};
use crate::infra::fs::{discover_sources, is_directory};
use crate::reporting::{console, html};

/// A test source held in memory.
pub enum TestSource<P: ModelProvider> {
    /// A JSON mapping of test names to declarative entries.
    Declarative { name: String, text: String },
    /// Script text, compiled by the compiler registered for its extension.
    Script { name: String, text: String },
    /// An already compiled module.
    Module {
        name: String,
        module: Arc<dyn ScriptModule<P>>,
    },
}

impl<P: ModelProvider> TestSource<P> {
    pub fn name(&self) -> &str {
        match self {
            TestSource::Declarative { name, .. }
            | TestSource::Script { name, .. }
            | TestSource::Module { name, .. } => name,
        }
    }

    pub fn is_declarative(&self) -> bool {
        matches!(self, TestSource::Declarative { .. })
    }
}

/// The collected test tree of one project.
pub struct TestSuite<P: ModelProvider> {
    provider: P,
    config: SuiteConfig,
    compilers: Vec<Box<dyn ScriptCompiler<P>>>,
    sources: Vec<TestSource<P>>,
    root: GroupInstance<P>,
    records: ResultRecord,
    registry: IdRegistry,
    report: CollectReport,
    collected: bool,
}

impl<P: ModelProvider> TestSuite<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, SuiteConfig::default())
    }

    pub fn with_config(provider: P, config: SuiteConfig) -> Self {
        Self {
            provider,
            config,
            compilers: Vec::new(),
            sources: Vec::new(),
            root: GroupInstance::new(""),
            records: ResultRecord::new(""),
            registry: IdRegistry::default(),
            report: CollectReport::default(),
            collected: false,
        }
    }

    /// Registers a compiler for script sources with its extension.
    pub fn add_compiler(&mut self, compiler: impl ScriptCompiler<P> + 'static) -> &mut Self {
        self.compilers.push(Box::new(compiler));
        self
    }

    /// Adds an in-memory source, picked up by the next [`collect`](Self::collect).
    pub fn add_source(&mut self, source: TestSource<P>) -> &mut Self {
        self.sources.push(source);
        self
    }

    pub fn add_declarative(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.add_source(TestSource::Declarative {
            name: name.into(),
            text: text.into(),
        })
    }

    pub fn add_script(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.add_source(TestSource::Script {
            name: name.into(),
            text: text.into(),
        })
    }

    pub fn add_module(
        &mut self,
        name: impl Into<String>,
        module: impl ScriptModule<P> + 'static,
    ) -> &mut Self {
        self.add_source(TestSource::Module {
            name: name.into(),
            module: Arc::new(module),
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Problems found by the last collection.
    pub fn report(&self) -> &CollectReport {
        &self.report
    }

    /// Root of the result tree; its id is the empty string.
    pub fn records(&self) -> &ResultRecord {
        &self.records
    }

    /// The result record for an address.
    pub fn record(&self, id: &str) -> Option<&ResultRecord> {
        let path = self.registry.path(id)?;
        let (first, rest) = path.split_first()?;
        let mut node = self.root.children().get(*first)?;
        let mut record = self.records.child(node.id())?;
        for index in rest {
            node = node.children().get(*index)?;
            record = record.child(node.id())?;
        }
        Some(record)
    }

    /// The instance registered under an address.
    pub fn instance(&self, id: &str) -> Option<&TestInstance<P>> {
        let path = self.registry.path(id)?;
        let (first, rest) = path.split_first()?;
        let mut node = self.root.children().get(*first)?;
        for index in rest {
            node = node.children().get(*index)?;
        }
        Some(node)
    }

    /// Every registered address, in collection order.
    pub fn test_ids(&self) -> &[String] {
        self.registry.ids()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    /// Discards the previous tree and rebuilds it from the current sources.
    ///
    /// Order: built-in checks, then declarative sources, then scripts. Sources
    /// from `tests_dir` are read again on every call and come before in-memory
    /// ones of the same kind. Never fails; problems end up in [`report`](Self::report)
    /// and as error entries on the source's record.
    pub fn collect(&mut self) -> &CollectReport {
        let mut records = ResultRecord::new("");
        let mut root = GroupInstance::new("");
        let mut report = CollectReport::default();

        if self.config.default_tests {
            match plan_default_tests(&self.provider, &mut records) {
                Ok(group) => root.push(TestInstance::Group(group)),
                Err(e) => records.add_error(e.to_string(), tags::EXECUTION_ERROR),
            }
        }

        let mut loaded = self.load_disk_sources(&mut records, &mut report);
        loaded.extend(self.sources.iter().map(|source| self.load_source(source)));
        // Stable: disk order, then insertion order, within each kind.
        loaded.sort_by_key(|source| source.kind != SourceKind::Declarative);

        let mut seen: Vec<String> = Vec::new();
        for source in loaded {
            let reserved = self.config.default_tests && source.name == DEFAULT_TESTS_GROUP;
            if reserved || seen.contains(&source.name) {
                report.load_errors.push(LoadError {
                    source_name: source.name.clone(),
                    message: "duplicate source name, source skipped".to_string(),
                });
                records.add_error(
                    format!("duplicate source name {}", source.name),
                    tags::SOURCE_ERROR,
                );
                continue;
            }
            seen.push(source.name.clone());

            if let Some(group) = self.attach_source(source, &mut records, &mut report) {
                root.push(TestInstance::Group(group));
            }
        }

        self.registry = IdRegistry::build(&root);
        self.root = root;
        self.records = records;
        self.report = report;
        self.collected = true;

        if self.config.verbose && !self.report.is_clean() {
            console::print_collection_errors(&self.report);
        }
        &self.report
    }

    fn load_disk_sources(
        &self,
        records: &mut ResultRecord,
        report: &mut CollectReport,
    ) -> Vec<LoadedSource<P>> {
        let Some(dir) = &self.config.tests_dir else {
            return Vec::new();
        };
        if !is_directory(dir) {
            records.warning(
                true,
                format!("tests directory {} does not exist", dir.display()),
                tags::SOURCE_ERROR,
            );
            return Vec::new();
        }

        let extensions: Vec<&str> = self.compilers.iter().map(|c| c.extension()).collect();
        let files = match discover_sources(dir, &extensions) {
            Ok(files) => files,
            Err(e) => {
                report.load_errors.push(LoadError {
                    source_name: dir.display().to_string(),
                    message: format!("{e:#}"),
                });
                records.add_error(format!("{e:#}"), tags::SOURCE_ERROR);
                return Vec::new();
            }
        };

        files
            .into_iter()
            .map(|file| {
                let text = match file.read() {
                    Ok(text) => text,
                    Err(e) => return unreadable(&file.name, file.is_declarative(), format!("{e:#}")),
                };
                if file.is_declarative() {
                    load_declarative(&file.name, &text)
                } else {
                    match self.compiler_for(&file.name) {
                        Some(compiler) => load_script(&file.name, &text, compiler),
                        None => unreadable(&file.name, false, "no compiler for this source".to_string()),
                    }
                }
            })
            .collect()
    }

    fn load_source(&self, source: &TestSource<P>) -> LoadedSource<P> {
        match source {
            TestSource::Declarative { name, text } => load_declarative(name, text),
            TestSource::Script { name, text } => match self.compiler_for(name) {
                Some(compiler) => load_script(name, text, compiler),
                None => unreadable(
                    name,
                    false,
                    "no compiler registered for this extension".to_string(),
                ),
            },
            TestSource::Module { name, module } => load_module(name, module.as_ref()),
        }
    }

    fn compiler_for(&self, name: &str) -> Option<&dyn ScriptCompiler<P>> {
        let extension = name.rsplit_once('.').map(|(_, ext)| ext)?;
        self.compilers
            .iter()
            .find(|c| c.extension() == extension)
            .map(|c| c.as_ref())
    }

    /// Creates the source's group and record, records its problems, and plans its definitions.
    fn attach_source(
        &self,
        source: LoadedSource<P>,
        records: &mut ResultRecord,
        report: &mut CollectReport,
    ) -> Option<GroupInstance<P>> {
        let source_record = match records.create_child(source.name.clone(), false) {
            Ok(record) => record,
            Err(e) => {
                records.add_error(e.to_string(), tags::EXECUTION_ERROR);
                return None;
            }
        };
        let mut group = GroupInstance::new(source.name.clone());
        source_record.attach_output(&source.output);

        if let Some(failure) = source.failure {
            let tag = match &failure {
                SourceFailure::Load(_) => tags::SOURCE_ERROR,
                SourceFailure::Syntax(_) => tags::SYNTAX_ERROR,
                SourceFailure::Module(_) => tags::COMPILE_ERROR,
            };
            source_record.add_error(failure.to_string(), tag);
            match failure {
                SourceFailure::Load(e) => report.load_errors.push(e),
                SourceFailure::Syntax(e) => report.syntax_errors.push(e),
                SourceFailure::Module(e) => report.module_errors.push(e),
            }
        }

        for invalid in source.invalid {
            source_record.add_error(invalid.to_string(), tags::SCHEMA_ERROR);
            report.invalid_tests.push(invalid);
        }

        for definition in &source.definitions {
            match plan_definition(definition, &self.provider, source_record) {
                Ok(planned) => group.push(TestInstance::Group(planned)),
                Err(e) => source_record.add_error(e.to_string(), tags::EXECUTION_ERROR),
            }
        }

        Some(group)
    }

    fn ensure_collected(&mut self) {
        if !self.collected {
            self.collect();
        }
    }

    /// Runs every collected case, collecting first if needed.
    pub fn run_all(&mut self) -> &ResultRecord {
        self.run_all_with_progress(|_| {})
    }

    /// Like [`run_all`](Self::run_all), calling `progress` after each case.
    pub fn run_all_with_progress<F>(&mut self, mut progress: F) -> &ResultRecord
    where
        F: FnMut(&ResultRecord),
    {
        self.ensure_collected();
        let verbose = self.config.verbose;
        let mut on_case = |record: &ResultRecord| {
            if verbose {
                console::print_case_progress(record);
            }
            progress(record);
        };
        self.root
            .run(&self.provider, &mut self.records, None, &mut on_case);
        &self.records
    }

    /// Runs one registered node: a whole group subtree, or a single case.
    /// No other record is touched.
    pub fn run_by_id(&mut self, id: &str) -> Result<&ResultRecord, SuiteError> {
        self.run_node(id, None)
    }

    /// Like [`run_by_id`](Self::run_by_id), but every case works on a clone of `model`.
    pub fn run_by_id_with_model(
        &mut self,
        id: &str,
        model: &P::Model,
    ) -> Result<&ResultRecord, SuiteError> {
        self.run_node(id, Some(model))
    }

    /// Runs several ids in order. Every id is checked before anything runs.
    pub fn run_by_ids<I, S>(&mut self, ids: I) -> Result<(), SuiteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_collected();
        let ids: Vec<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        if let Some(unknown) = ids.iter().find(|id| !self.registry.contains(id)) {
            return Err(SuiteError::UnknownId(unknown.clone()));
        }
        for id in &ids {
            self.run_node(id, None)?;
        }
        Ok(())
    }

    fn run_node(&mut self, id: &str, model: Option<&P::Model>) -> Result<&ResultRecord, SuiteError> {
        self.ensure_collected();
        let path = self
            .registry
            .path(id)
            .ok_or_else(|| SuiteError::UnknownId(id.to_string()))?
            .to_vec();
        let (node, record) = resolve(&self.root, &mut self.records, &path)
            .ok_or_else(|| SuiteError::Detached(id.to_string()))?;

        let verbose = self.config.verbose;
        let mut on_case = |record: &ResultRecord| {
            if verbose {
                console::print_case_progress(record);
            }
        };
        node.run_with_model(&self.provider, record, model, &mut on_case);
        Ok(record)
    }

    /// Runs cases one at a time as the iterator is advanced, yielding a snapshot
    /// of each finished case record.
    ///
    /// The sequence is fixed when the iterator is created; collect again to get a fresh one.
    pub fn iter_tests(&mut self, skip_default: bool) -> TestIter<'_, P> {
        self.ensure_collected();
        let mut paths = Vec::new();
        for (index, child) in self.root.children().iter().enumerate() {
            if skip_default && child.id() == DEFAULT_TESTS_GROUP {
                continue;
            }
            case_paths(child, &mut vec![index], &mut paths);
        }
        TestIter {
            suite: self,
            paths: paths.into_iter(),
        }
    }

    /// `true` when no record in the tree carries an error.
    pub fn is_success(&self) -> bool {
        self.records.is_success()
    }

    /// `(assertions, errors)` over the whole tree.
    pub fn log_count(&self) -> (usize, usize) {
        self.records.log_count()
    }

    /// Serializable snapshot of the whole result tree.
    pub fn to_dict(&self) -> RecordReport {
        self.records.to_dict()
    }

    /// Prints the result tree in the configured language.
    pub fn print_summary(&self) {
        console::print_summary(&self.records, &self.config.language);
        console::print_failure_details(&self.records, &self.config.language);
    }

    /// Writes an HTML report of the result tree in the configured language.
    pub fn write_html_report(&self, output_path: &Path) -> Result<()> {
        html::generate_html_report(&self.records, output_path, &self.config.language)
    }
}

fn unreadable<P: ModelProvider>(name: &str, declarative: bool, message: String) -> LoadedSource<P> {
    let kind = if declarative {
        SourceKind::Declarative
    } else {
        SourceKind::Script
    };
    let error = LoadError {
        source_name: name.to_string(),
        message,
    };
    LoadedSource::failed(name, kind, SourceFailure::Load(error))
}

fn case_paths<P: ModelProvider>(
    node: &TestInstance<P>,
    path: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if node.is_case() {
        out.push(path.clone());
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        path.push(index);
        case_paths(child, path, out);
        path.pop();
    }
}

/// Iterator returned by [`TestSuite::iter_tests`].
pub struct TestIter<'a, P: ModelProvider> {
    suite: &'a mut TestSuite<P>,
    paths: std::vec::IntoIter<Vec<usize>>,
}

impl<P: ModelProvider> Iterator for TestIter<'_, P> {
    type Item = ResultRecord;

    fn next(&mut self) -> Option<ResultRecord> {
        loop {
            let path = self.paths.next()?;
            let suite = &mut *self.suite;
            let Some((node, record)) = resolve(&suite.root, &mut suite.records, &path) else {
                continue;
            };
            let verbose = suite.config.verbose;
            let mut on_case = |record: &ResultRecord| {
                if verbose {
                    console::print_case_progress(record);
                }
            };
            node.run(&suite.provider, record, &mut on_case);
            return Some(record.clone());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.paths.len()))
    }
}
