// Shared test helpers for integration tests
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use fluxcheck::core::error::{ProviderError, ResourceKind, SyntaxError};
use fluxcheck::{
    CaseLog, FluxModel, ModelProvider, ParamList, ParameterSelector, Registrar, ScriptCompiler,
    ScriptModule,
};
use tempfile::{tempdir, TempDir};

/// A model whose "solution" is a fixed flux table.
#[derive(Debug, Clone, PartialEq)]
pub struct ToyModel {
    pub id: String,
    pub objective: f64,
    pub feasible: bool,
    pub fluxes: BTreeMap<String, f64>,
    /// Conditions and designs applied, in order.
    pub applied: Vec<String>,
}

impl ToyModel {
    pub fn new(id: &str, objective: f64) -> Self {
        Self {
            id: id.to_string(),
            objective,
            feasible: true,
            fluxes: BTreeMap::new(),
            applied: Vec::new(),
        }
    }

    pub fn with_flux(mut self, reaction: &str, flux: f64) -> Self {
        self.fluxes.insert(reaction.to_string(), flux);
        self
    }
}

impl FluxModel for ToyModel {
    fn optimize(&mut self) -> Result<f64, ProviderError> {
        if self.feasible {
            Ok(self.objective)
        } else {
            Err(ProviderError::Infeasible(format!("model {} is infeasible", self.id)))
        }
    }

    fn reaction_flux(&self, reaction_id: &str) -> Option<f64> {
        self.fluxes.get(reaction_id).copied()
    }
}

/// A condition set or design: overrides applied on top of a model.
#[derive(Debug, Clone, Default)]
pub struct Perturbation {
    pub fluxes: Vec<(String, f64)>,
    pub objective: Option<f64>,
    pub infeasible: bool,
    pub growth_expected: bool,
}

impl Perturbation {
    pub fn growing() -> Self {
        Self {
            growth_expected: true,
            ..Default::default()
        }
    }

    pub fn knockout(reaction: &str) -> Self {
        Self {
            fluxes: vec![(reaction.to_string(), 0.0)],
            objective: Some(0.0),
            infeasible: false,
            growth_expected: false,
        }
    }

    pub fn infeasible() -> Self {
        Self {
            infeasible: true,
            ..Default::default()
        }
    }

    fn apply(&self, id: &str, mut model: ToyModel) -> ToyModel {
        for (reaction, flux) in &self.fluxes {
            model.fluxes.insert(reaction.clone(), *flux);
        }
        if let Some(objective) = self.objective {
            model.objective = objective;
        }
        if self.infeasible {
            model.feasible = false;
        }
        model.applied.push(id.to_string());
        model
    }
}

/// In-memory project with models, condition sets and designs.
#[derive(Debug)]
pub struct ToyProvider {
    pub default_model: String,
    pub models: BTreeMap<String, ToyModel>,
    pub conditions: BTreeMap<String, Perturbation>,
    pub designs: BTreeMap<String, Perturbation>,
    pub loads: Cell<usize>,
}

impl ToyProvider {
    /// One growing model `e_coli` with reactions R1 (active), R2 (inactive) and BIOMASS.
    pub fn new() -> Self {
        let model = ToyModel::new("e_coli", 0.8)
            .with_flux("R1", 1.5)
            .with_flux("R2", 0.0)
            .with_flux("BIOMASS", 0.8);
        let mut models = BTreeMap::new();
        models.insert("e_coli".to_string(), model);
        Self {
            default_model: "e_coli".to_string(),
            models,
            conditions: BTreeMap::new(),
            designs: BTreeMap::new(),
            loads: Cell::new(0),
        }
    }

    pub fn with_model(mut self, model: ToyModel) -> Self {
        self.models.insert(model.id.clone(), model);
        self
    }

    pub fn with_conditions(mut self, id: &str, perturbation: Perturbation) -> Self {
        self.conditions.insert(id.to_string(), perturbation);
        self
    }

    pub fn with_design(mut self, id: &str, perturbation: Perturbation) -> Self {
        self.designs.insert(id.to_string(), perturbation);
        self
    }
}

impl ModelProvider for ToyProvider {
    type Model = ToyModel;

    fn load_model(&self, id: Option<&str>) -> Result<ToyModel, ProviderError> {
        self.loads.set(self.loads.get() + 1);
        let id = id.unwrap_or(&self.default_model);
        self.models
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(ResourceKind::Model, id))
    }

    fn load_conditions(&self, id: &str, model: ToyModel) -> Result<ToyModel, ProviderError> {
        let conditions = self
            .conditions
            .get(id)
            .ok_or_else(|| ProviderError::not_found(ResourceKind::Conditions, id))?;
        Ok(conditions.apply(id, model))
    }

    fn load_design(&self, id: &str, model: ToyModel) -> Result<ToyModel, ProviderError> {
        let design = self
            .designs
            .get(id)
            .ok_or_else(|| ProviderError::not_found(ResourceKind::Design, id))?;
        Ok(design.apply(id, model))
    }

    fn list_models(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    fn list_conditions(&self) -> Vec<String> {
        self.conditions.keys().cloned().collect()
    }

    fn list_designs(&self) -> Vec<String> {
        self.designs.keys().cloned().collect()
    }

    fn growth_expected(&self, conditions_id: &str) -> bool {
        self.conditions
            .get(conditions_id)
            .map(|c| c.growth_expected)
            .unwrap_or(true)
    }
}

/// One statement of a toy test body.
#[derive(Debug, Clone)]
pub enum Step {
    Pass(String),
    Fail(String),
    Warn(String),
    Print(String),
    Panic(String),
    Error(String),
    Grows,
}

#[derive(Debug, Clone)]
struct ToyFunction {
    name: String,
    selector: Option<ParameterSelector>,
    steps: Vec<Step>,
}

/// A compiled toy script.
#[derive(Debug, Clone, Default)]
pub struct ToyModule {
    top_level: Vec<Step>,
    functions: Vec<ToyFunction>,
}

impl ScriptModule<ToyProvider> for ToyModule {
    fn load(&self, registrar: &mut Registrar<ToyProvider>) -> anyhow::Result<()> {
        for step in &self.top_level {
            match step {
                Step::Print(text) => writeln!(registrar, "{text}")?,
                Step::Error(message) => bail!("{message}"),
                Step::Panic(message) => panic!("{message}"),
                other => bail!("{other:?} is not allowed at module level"),
            }
        }

        for function in &self.functions {
            let steps = function.steps.clone();
            let body = move |model: &mut ToyModel, _project: &ToyProvider, log: &mut CaseLog<'_>| {
                run_steps(&steps, model, log)
            };
            match &function.selector {
                Some(selector) => registrar.register_with(function.name.clone(), selector.clone(), body),
                None => registrar.register(function.name.clone(), body),
            };
        }
        Ok(())
    }
}

pub fn run_steps(steps: &[Step], model: &mut ToyModel, log: &mut CaseLog<'_>) -> anyhow::Result<()> {
    for step in steps {
        match step {
            Step::Pass(message) => log.assertion(true, message.clone(), "", ".toy"),
            Step::Fail(message) => log.assertion(false, "", message.clone(), ".toy"),
            Step::Warn(message) => log.warning(true, message.clone(), ".toy"),
            Step::Print(text) => writeln!(log, "{text}")?,
            Step::Panic(message) => panic!("{message}"),
            Step::Error(message) => return Err(anyhow!("{message}")),
            Step::Grows => {
                let objective = model.optimize()?;
                log.assertion(objective > 0.0, "model grows", "model does not grow", ".toy");
            }
        }
    }
    Ok(())
}

/// Compiles `.toy` scripts.
///
/// ```text
/// print loading          # module-level output
/// raise boom             # module-level failure
/// def test_a models=m1,m2 conditions=* designs=
///   pass it works
///   fail it broke
///   warn heads up
///   print some text
///   panic oh no
///   error bad thing
///   grows
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ToyCompiler;

impl ScriptCompiler<ToyProvider> for ToyCompiler {
    fn extension(&self) -> &str {
        "toy"
    }

    fn compile(
        &self,
        source_name: &str,
        code: &str,
    ) -> Result<Arc<dyn ScriptModule<ToyProvider>>, SyntaxError> {
        Ok(Arc::new(parse_toy(source_name, code)?))
    }
}

fn parse_selector_axis(value: &str) -> ParamList {
    match value {
        "" => ParamList::Default,
        "*" => ParamList::All,
        ids => ParamList::ids(ids.split(',')),
    }
}

pub fn parse_toy(source_name: &str, code: &str) -> Result<ToyModule, SyntaxError> {
    let mut module = ToyModule::default();

    for (index, raw) in code.lines().enumerate() {
        let line_no = index + 1;
        let indented = raw.starts_with(' ') || raw.starts_with('\t');
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim().to_string();
        let err = |message: String| SyntaxError::new(source_name, message).at_line(line_no);

        if keyword == "def" {
            if indented {
                return Err(err("def must not be indented".to_string()));
            }
            let mut parts = rest.split_whitespace();
            let name = parts
                .next()
                .ok_or_else(|| err("def needs a name".to_string()))?
                .to_string();
            let mut selector: Option<ParameterSelector> = None;
            for part in parts {
                let (key, value) = part
                    .split_once('=')
                    .ok_or_else(|| err(format!("bad selector {part}")))?;
                let axis = parse_selector_axis(value);
                let current = selector.take().unwrap_or_default();
                selector = Some(match key {
                    "models" => current.models(axis),
                    "conditions" => current.conditions(axis),
                    "designs" => current.designs(axis),
                    other => return Err(err(format!("unknown selector axis {other}"))),
                });
            }
            module.functions.push(ToyFunction {
                name,
                selector,
                steps: Vec::new(),
            });
            continue;
        }

        let step = match keyword {
            "pass" => Step::Pass(rest),
            "fail" => Step::Fail(rest),
            "warn" => Step::Warn(rest),
            "print" => Step::Print(rest),
            "panic" => Step::Panic(rest),
            "error" | "raise" => Step::Error(rest),
            "grows" => Step::Grows,
            other => return Err(err(format!("unknown statement {other}"))),
        };

        if indented {
            let function = module
                .functions
                .last_mut()
                .ok_or_else(|| err("statement outside of a def".to_string()))?;
            function.steps.push(step);
        } else {
            module.top_level.push(step);
        }
    }

    Ok(module)
}

/// Temporary directory with a `tests` subdirectory.
pub fn setup_tests_dir() -> (TempDir, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let tests_dir = temp_dir.path().join("tests");
    fs::create_dir_all(&tests_dir).expect("Failed to create tests directory");
    (temp_dir, tests_dir)
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// A declarative entry with every required field.
pub fn declarative_entry(
    models: &[&str],
    conditions: &[&str],
    designs: &[&str],
    required_reactions: &[&str],
) -> serde_json::Value {
    serde_json::json!({
        "description": "generated entry",
        "models": models,
        "conditions": conditions,
        "designs": designs,
        "required_reactions": required_reactions,
        "reaction_fluxes": {},
    })
}
