//! # Configuration Module / 配置模块
//!
//! Suite configuration (loaded from TOML) and the declarative test format
//! (loaded from JSON), together with the parameter selector shared by
//! declarative entries and script callables.
//!
//! 测试套件配置（从 TOML 加载）和声明式测试格式（从 JSON 加载），
//! 以及声明式条目和脚本函数共用的参数选择器。

use anyhow::{Context, Result};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::infra::fs::expand_path;

/// Marker meaning "every id the provider knows at expansion time".
pub const WILDCARD: &str = "*";

/// Callables and source files are only picked up when named with this prefix.
pub const TEST_PREFIX: &str = "test_";

/// Fields every declarative entry must carry.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "description",
    "models",
    "conditions",
    "designs",
    "required_reactions",
    "reaction_fluxes",
];

/// Returns the required fields absent from a declarative entry, in declaration order.
pub fn missing_fields(entry: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| !entry.contains_key(**field))
        .map(|field| field.to_string())
        .collect()
}

/// One axis of a [`ParameterSelector`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParamList {
    /// Nothing requested: run once with the provider's default.
    #[default]
    Default,
    /// An explicit, ordered id list.
    Ids(Vec<String>),
    /// Every id known to the provider, resolved at expansion time.
    All,
}

impl ParamList {
    /// Builds an id list; an empty input yields [`ParamList::Default`].
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            ParamList::Default
        } else {
            ParamList::Ids(ids)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParamList {
    Ids(Vec<String>),
    Marker(String),
}

impl<'de> Deserialize<'de> for ParamList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawParamList::deserialize(deserializer)? {
            RawParamList::Ids(ids) => Ok(ParamList::ids(ids)),
            RawParamList::Marker(marker) if marker == WILDCARD => Ok(ParamList::All),
            RawParamList::Marker(other) => Err(de::Error::custom(format!(
                "expected an id list or \"{WILDCARD}\", found \"{other}\""
            ))),
        }
    }
}

impl Serialize for ParamList {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ParamList::Default => serializer.collect_seq(std::iter::empty::<&str>()),
            ParamList::Ids(ids) => serializer.collect_seq(ids),
            ParamList::All => serializer.serialize_str(WILDCARD),
        }
    }
}

/// The {models, conditions, designs} triple a definition is expanded across.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterSelector {
    #[serde(default)]
    pub models: ParamList,
    #[serde(default)]
    pub conditions: ParamList,
    #[serde(default)]
    pub designs: ParamList,
}

impl ParameterSelector {
    pub fn new(models: ParamList, conditions: ParamList, designs: ParamList) -> Self {
        Self {
            models,
            conditions,
            designs,
        }
    }

    /// Every axis set to the wildcard.
    pub fn all() -> Self {
        Self::new(ParamList::All, ParamList::All, ParamList::All)
    }

    pub fn models(mut self, models: ParamList) -> Self {
        self.models = models;
        self
    }

    pub fn conditions(mut self, conditions: ParamList) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn designs(mut self, designs: ParamList) -> Self {
        self.designs = designs;
        self
    }
}

/// A single entry of a declarative (`test_*.json`) source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TestSpec {
    pub description: String,
    pub models: ParamList,
    pub conditions: ParamList,
    pub designs: ParamList,
    /// Reactions expected to carry non-zero flux at steady state.
    pub required_reactions: Vec<String>,
    /// Reaction id to inclusive `[lower, upper]` flux bounds.
    pub reaction_fluxes: BTreeMap<String, (f64, f64)>,
}

impl TestSpec {
    pub fn selector(&self) -> ParameterSelector {
        ParameterSelector::new(
            self.models.clone(),
            self.conditions.clone(),
            self.designs.clone(),
        )
    }
}

/// Settings for a [`TestSuite`](crate::core::suite::TestSuite), typically read from `FluxCheck.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuiteConfig {
    /// Language for console and HTML output (e.g. "en", "zh-CN").
    #[serde(default = "default_language")]
    pub language: String,

    /// Directory scanned for `test_*` sources on every `collect()`.
    #[serde(default)]
    pub tests_dir: Option<PathBuf>,

    /// Adds the built-in model, condition and design checks.
    #[serde(default = "default_true")]
    pub default_tests: bool,

    /// Prints per-case progress and collection problems to the console.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            tests_dir: None,
            default_tests: true,
            verbose: false,
        }
    }
}

impl SuiteConfig {
    /// Loads a TOML configuration file.
    ///
    /// A relative `tests_dir` is resolved against the directory holding the file,
    /// after `~` and environment variable expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: SuiteConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(dir) = config.tests_dir.take() {
            let expanded = expand_path(&dir)?;
            let resolved = if expanded.is_relative() {
                path.parent()
                    .map(|base| base.join(&expanded))
                    .unwrap_or(expanded)
            } else {
                expanded
            };
            config.tests_dir = Some(resolved);
        }

        Ok(config)
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}
