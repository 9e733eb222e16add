//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! The instance tree: groups delegate to their children, cases acquire a model,
//! call their body and record the outcome. Whatever a body does (return an
//! error, panic, write output) stays inside its own case record.
//!
//! 实例树：分组将执行委托给子节点，用例获取模型、调用其函数体并记录结果。
//! 函数体的任何行为（返回错误、panic、写出输出）都只影响其自身的用例记录。

use anyhow::Result;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};
use std::thread;

use crate::core::config::TestSpec;
use crate::core::error::ProviderError;
use crate::core::models::{tags, ParamTuple, ResultRecord};
use crate::core::provider::{FluxModel, ModelProvider};
use crate::core::script::{case_fn, CaseFn, CaseLog};

/// Fluxes with a smaller magnitude count as zero.
pub const FLUX_TOLERANCE: f64 = 1e-9;

/// Called once for every finished case.
pub type Progress<'a> = &'a mut dyn FnMut(&ResultRecord);

/// Where a case body came from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOrigin {
    pub source_name: String,
    pub name: String,
}

/// A node of the instance tree.
pub enum TestInstance<P: ModelProvider> {
    Group(GroupInstance<P>),
    Case(CaseInstance<P>),
}

impl<P: ModelProvider> TestInstance<P> {
    pub fn id(&self) -> &str {
        match self {
            TestInstance::Group(group) => &group.id,
            TestInstance::Case(case) => &case.id,
        }
    }

    pub fn is_case(&self) -> bool {
        matches!(self, TestInstance::Case(_))
    }

    /// Direct children; always empty for a case.
    pub fn children(&self) -> &[TestInstance<P>] {
        match self {
            TestInstance::Group(group) => &group.children,
            TestInstance::Case(_) => &[],
        }
    }

    /// Ids of every descendant, depth first.
    pub fn child_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for child in self.children() {
            ids.push(child.id().to_string());
            ids.extend(child.child_ids());
        }
        ids
    }

    /// Number of cases in this subtree.
    pub fn case_count(&self) -> usize {
        match self {
            TestInstance::Case(_) => 1,
            TestInstance::Group(group) => group.children.iter().map(TestInstance::case_count).sum(),
        }
    }

    /// Runs this node against its paired record.
    pub fn run(&self, provider: &P, record: &mut ResultRecord, progress: Progress<'_>) {
        self.run_with_model(provider, record, None, progress);
    }

    /// Like [`run`](Self::run), but cases work on a clone of `model` instead of
    /// acquiring one from the provider.
    pub fn run_with_model(
        &self,
        provider: &P,
        record: &mut ResultRecord,
        model: Option<&P::Model>,
        progress: Progress<'_>,
    ) {
        match self {
            TestInstance::Group(group) => group.run(provider, record, model, progress),
            TestInstance::Case(case) => case.run(provider, record, model, progress),
        }
    }
}

/// A composite node with no body of its own.
pub struct GroupInstance<P: ModelProvider> {
    id: String,
    children: Vec<TestInstance<P>>,
}

impl<P: ModelProvider> GroupInstance<P> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn children(&self) -> &[TestInstance<P>] {
        &self.children
    }

    pub(crate) fn push(&mut self, child: TestInstance<P>) {
        self.children.push(child);
    }

    pub(crate) fn run(
        &self,
        provider: &P,
        record: &mut ResultRecord,
        model: Option<&P::Model>,
        progress: Progress<'_>,
    ) {
        for child in &self.children {
            match record.child_mut(child.id()) {
                Some(child_record) => child.run_with_model(provider, child_record, model, progress),
                None => record.add_error(
                    format!("no result record for {}", child.id()),
                    tags::EXECUTION_ERROR,
                ),
            }
        }
    }
}

/// A leaf bound to one parameter tuple and one body.
pub struct CaseInstance<P: ModelProvider> {
    id: String,
    params: ParamTuple,
    origin: CaseOrigin,
    body: CaseFn<P>,
}

impl<P: ModelProvider> CaseInstance<P> {
    pub fn new(id: impl Into<String>, params: ParamTuple, origin: CaseOrigin, body: CaseFn<P>) -> Self {
        Self {
            id: id.into(),
            params,
            origin,
            body,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn params(&self) -> &ParamTuple {
        &self.params
    }

    pub fn origin(&self) -> &CaseOrigin {
        &self.origin
    }

    fn run(
        &self,
        provider: &P,
        record: &mut ResultRecord,
        model: Option<&P::Model>,
        progress: Progress<'_>,
    ) {
        record.begin_run();

        let acquired = match model {
            Some(model) => Ok(model.clone()),
            None => acquire_model(provider, &self.params),
        };
        let mut model = match acquired {
            Ok(model) => model,
            Err(e) => {
                record.add_error(format!("Error loading model: {e}"), tags::LOAD_ERROR);
                progress(record);
                return;
            }
        };

        let mut log = CaseLog::new(record);
        let outcome = catch_quietly(|| (self.body)(&mut model, provider, &mut log));
        let output = log.into_output();

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        if let Some(message) = failure {
            record.add_error(
                format!(
                    "Error executing function {} in file {} error - {}",
                    self.origin.name, self.origin.source_name, message
                ),
                tags::EXECUTION_ERROR,
            );
        }

        record.attach_output(&output);
        progress(record);
    }
}

/// Loads the tuple's model, then applies its conditions, then its design.
pub fn acquire_model<P: ModelProvider>(
    provider: &P,
    params: &ParamTuple,
) -> Result<P::Model, ProviderError> {
    let mut model = provider.load_model(params.model.as_deref())?;
    if let Some(conditions_id) = &params.conditions {
        model = provider.load_conditions(conditions_id, model)?;
    }
    if let Some(design_id) = &params.design {
        model = provider.load_design(design_id, model)?;
    }
    Ok(model)
}

thread_local! {
    static QUIET: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Runs `f` and catches a panic out of it.
///
/// While `f` runs, a panic on this thread is not reported by the panic hook;
/// the message reaches the caller through the returned payload instead. Other
/// threads keep the hook that was installed before.
pub fn catch_quietly<R>(f: impl FnOnce() -> R) -> thread::Result<R> {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !QUIET.with(Cell::get) {
                previous(info);
            }
        }));
    });

    let outer = QUIET.with(|quiet| quiet.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    QUIET.with(|quiet| quiet.set(outer));
    outcome
}

/// Text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}

/// Checks a solved model against a declarative entry.
///
/// An infeasible model yields a single `.no_solution` error and nothing else.
pub fn check_spec<M: FluxModel>(spec: &TestSpec, model: &mut M, log: &mut ResultRecord) -> Result<()> {
    match model.optimize() {
        Ok(_) => {}
        Err(ProviderError::Infeasible(_)) => {
            log.add_error("No solution found with model configuration", tags::NO_SOLUTION);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    for reaction_id in &spec.required_reactions {
        match model.reaction_flux(reaction_id) {
            Some(flux) => log.assertion(
                flux.abs() > FLUX_TOLERANCE,
                format!("required reaction {reaction_id} active at steady state"),
                format!("required reaction {reaction_id} not active at steady state"),
                tags::REQUIRED_REACTION,
            ),
            None => log.add_error(
                format!("required reaction {reaction_id} not found in model"),
                tags::REACTION_NOT_FOUND,
            ),
        }
    }

    for (reaction_id, (lower, upper)) in &spec.reaction_fluxes {
        match model.reaction_flux(reaction_id) {
            Some(flux) => log.assertion(
                flux >= *lower && flux <= *upper,
                format!("reaction {reaction_id} inside of flux bounds {lower}, {upper}"),
                format!("reaction {reaction_id} outside of flux bounds {lower}, {upper}"),
                tags::REACTION_FLUX,
            ),
            None => log.add_error(
                format!("reaction {reaction_id} not found in model"),
                tags::REACTION_NOT_FOUND,
            ),
        }
    }

    Ok(())
}

/// Body of every case expanded from a declarative entry.
pub fn declarative_body<P: ModelProvider>(spec: Arc<TestSpec>) -> CaseFn<P> {
    case_fn(move |model: &mut P::Model, _project: &P, log: &mut CaseLog<'_>| {
        check_spec(&spec, model, log)
    })
}

fn grows<M: FluxModel>(model: &mut M) -> bool {
    matches!(model.optimize(), Ok(objective) if objective.abs() > FLUX_TOLERANCE)
}

/// Built-in check that a model (optionally under conditions) grows exactly when expected.
pub fn default_model_body<P: ModelProvider>(growth_expected: bool) -> CaseFn<P> {
    case_fn(move |model: &mut P::Model, _project: &P, log: &mut CaseLog<'_>| {
        match (grows(model), growth_expected) {
            (true, true) => log.add_success("Model grows", tags::DEFAULT),
            (true, false) => log.add_error("Model grows when it should not", tags::DEFAULT),
            (false, false) => log.add_success("Model does not grow", tags::DEFAULT),
            (false, true) => log.add_error("Model does not grow", tags::DEFAULT),
        }
        Ok(())
    })
}

/// Built-in check that a design applied to the default model still solves.
pub fn default_design_body<P: ModelProvider>() -> CaseFn<P> {
    case_fn(|model: &mut P::Model, _project: &P, log: &mut CaseLog<'_>| {
        if grows(model) {
            log.add_success("Design functions", tags::DEFAULT);
        } else {
            log.add_error("Design failure", tags::DEFAULT);
        }
        Ok(())
    })
}
