//! # Data Models Module / 数据模型模块
//!
//! This module defines the result tree produced by a run: [`ResultRecord`]
//! nodes holding success, error and warning entries, plus the parameter
//! tuple and addressing helpers used to name every node.
//!
//! 此模块定义运行产生的结果树：保存成功、错误和警告条目的 [`ResultRecord`] 节点，
//! 以及用于命名每个节点的参数元组和地址辅助函数。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::core::error::RecordError;

/// Separator between address segments.
pub const ADDRESS_SEPARATOR: &str = "::";

/// Metadata tags attached to entries.
pub mod tags {
    pub const LOAD_ERROR: &str = ".load_error";
    pub const EXECUTION_ERROR: &str = ".execution_error";
    pub const COMPILE_ERROR: &str = ".compile_error";
    pub const SYNTAX_ERROR: &str = ".syntax_error";
    pub const SOURCE_ERROR: &str = ".source_error";
    pub const SCHEMA_ERROR: &str = ".schema_error";
    pub const NO_SOLUTION: &str = ".no_solution";
    pub const REQUIRED_REACTION: &str = ".required_reaction";
    pub const REACTION_FLUX: &str = ".reaction_flux";
    pub const REACTION_NOT_FOUND: &str = ".reaction_not_found";
    pub const DEFAULT: &str = ".default";
    pub const ADDRESS_COLLISION: &str = ".address_collision";
}

/// Joins non-empty segments with [`ADDRESS_SEPARATOR`].
pub fn join_address<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(ADDRESS_SEPARATOR)
}

/// One concrete (model, conditions, design) combination; `None` means "provider default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ParamTuple {
    pub model: Option<String>,
    pub conditions: Option<String>,
    pub design: Option<String>,
}

impl ParamTuple {
    pub fn new(model: Option<String>, conditions: Option<String>, design: Option<String>) -> Self {
        Self {
            model,
            conditions,
            design,
        }
    }

    pub fn is_default(&self) -> bool {
        self.model.is_none() && self.conditions.is_none() && self.design.is_none()
    }

    /// The non-`None` segments in model, conditions, design order, or `None` if all are unset.
    pub fn label(&self) -> Option<String> {
        if self.is_default() {
            return None;
        }
        Some(join_address(
            [&self.model, &self.conditions, &self.design]
                .into_iter()
                .flatten()
                .map(String::as_str),
        ))
    }

    /// Address of the case bound to this tuple under `group_id`.
    pub fn address(&self, group_id: &str) -> String {
        match self.label() {
            Some(label) => join_address([group_id, label.as_str()]),
            None => group_id.to_string(),
        }
    }
}

impl fmt::Display for ParamTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segment = |value: &Option<String>| value.as_deref().unwrap_or("-").to_string();
        write!(
            f,
            "model={}, conditions={}, design={}",
            segment(&self.model),
            segment(&self.conditions),
            segment(&self.design)
        )
    }
}

/// A single success, error or warning line with its tag and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub message: String,
    pub tag: String,
    pub time: DateTime<Utc>,
}

impl Entry {
    pub fn new(message: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tag: tag.into(),
            time: Utc::now(),
        }
    }
}

/// A node of the result tree, paired with exactly one test instance.
///
/// Roll-ups (`is_success`, `log_count`) are computed on every call and never cached.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    id: String,
    parent: Option<String>,
    success: Vec<Entry>,
    error: Vec<Entry>,
    warnings: Vec<Entry>,
    std_out: Option<String>,
    run_time: DateTime<Utc>,
    children: BTreeMap<String, ResultRecord>,
    param_child: bool,
}

impl ResultRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            success: Vec::new(),
            error: Vec::new(),
            warnings: Vec::new(),
            std_out: None,
            run_time: Utc::now(),
            children: BTreeMap::new(),
            param_child: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the parent record, if any.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// `true` for case records produced by parameter expansion.
    pub fn is_param_leaf(&self) -> bool {
        self.param_child
    }

    pub fn run_time(&self) -> DateTime<Utc> {
        self.run_time
    }

    pub fn std_out(&self) -> Option<&str> {
        self.std_out.as_deref()
    }

    pub fn success(&self) -> &[Entry] {
        &self.success
    }

    pub fn error(&self) -> &[Entry] {
        &self.error
    }

    pub fn warnings(&self) -> &[Entry] {
        &self.warnings
    }

    pub fn children(&self) -> impl Iterator<Item = &ResultRecord> {
        self.children.values()
    }

    pub fn child(&self, id: &str) -> Option<&ResultRecord> {
        self.children.get(id)
    }

    pub fn child_mut(&mut self, id: &str) -> Option<&mut ResultRecord> {
        self.children.get_mut(id)
    }

    /// Depth-first lookup by id. Never creates nodes.
    pub fn find(&self, id: &str) -> Option<&ResultRecord> {
        if self.id == id {
            return Some(self);
        }
        self.children.values().find_map(|child| child.find(id))
    }

    /// Creates (or replaces) a child record.
    ///
    /// Fails on parameter leaves, which keeps the tree depth bounded.
    pub fn create_child(
        &mut self,
        id: impl Into<String>,
        param_child: bool,
    ) -> Result<&mut ResultRecord, RecordError> {
        let id = id.into();
        if self.param_child {
            return Err(RecordError::ParamLeaf(self.id.clone()));
        }

        let mut record = ResultRecord::new(id.clone());
        record.parent = Some(self.id.clone());
        record.param_child = param_child;

        let slot = match self.children.entry(id) {
            btree_map::Entry::Occupied(mut occupied) => {
                occupied.insert(record);
                occupied.into_mut()
            }
            btree_map::Entry::Vacant(vacant) => vacant.insert(record),
        };
        Ok(slot)
    }

    /// Stores `success_msg` when `condition` holds, `error_msg` otherwise.
    pub fn assertion(
        &mut self,
        condition: bool,
        success_msg: impl Into<String>,
        error_msg: impl Into<String>,
        tag: &str,
    ) {
        if condition {
            self.success.push(Entry::new(success_msg, tag));
        } else {
            self.error.push(Entry::new(error_msg, tag));
        }
    }

    /// Stores a warning when `condition` holds. Warnings never fail a record.
    pub fn warning(&mut self, condition: bool, message: impl Into<String>, tag: &str) {
        if condition {
            self.warnings.push(Entry::new(message, tag));
        }
    }

    pub fn add_success(&mut self, message: impl Into<String>, tag: &str) {
        self.success.push(Entry::new(message, tag));
    }

    /// For failures that stop assertions from being reached at all,
    /// e.g. a model that does not load.
    pub fn add_error(&mut self, message: impl Into<String>, tag: &str) {
        self.error.push(Entry::new(message, tag));
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty() && self.children.values().all(ResultRecord::is_success)
    }

    /// `(assertions, errors)` over this record and all descendants.
    pub fn log_count(&self) -> (usize, usize) {
        let own = (self.success.len() + self.error.len(), self.error.len());
        self.children.values().fold(own, |(total, errors), child| {
            let (child_total, child_errors) = child.log_count();
            (total + child_total, errors + child_errors)
        })
    }

    /// Serializable snapshot of this subtree.
    pub fn to_dict(&self) -> RecordReport {
        self.to_dict_guarded(&[])
    }

    /// `ancestors` holds the ids above this record; a child repeating one of them is skipped.
    fn to_dict_guarded(&self, ancestors: &[&str]) -> RecordReport {
        let mut stack: Vec<&str> = ancestors.to_vec();
        stack.push(self.id.as_str());

        let children = self
            .children
            .values()
            .filter(|child| !ancestors.contains(&child.id.as_str()))
            .map(|child| (child.id.clone(), child.to_dict_guarded(&stack)))
            .collect();

        RecordReport {
            id: self.id.clone(),
            children,
            error: self.error.clone(),
            success: self.success.clone(),
            warnings: self.warnings.clone(),
            std_out: self.std_out.clone(),
            is_success: self.is_success(),
            run_time: self.run_time,
        }
    }

    /// Clears this record's own entries and output and stamps a new run time.
    pub(crate) fn begin_run(&mut self) {
        self.success.clear();
        self.error.clear();
        self.warnings.clear();
        self.std_out = None;
        self.run_time = Utc::now();
    }

    /// Appends captured text; blank text is ignored.
    pub(crate) fn attach_output(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        match &mut self.std_out {
            Some(existing) => existing.push_str(text),
            None => self.std_out = Some(text.to_string()),
        }
    }
}

/// Plain nested form of a [`ResultRecord`], ready for JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub id: String,
    pub children: BTreeMap<String, RecordReport>,
    pub error: Vec<Entry>,
    pub success: Vec<Entry>,
    pub warnings: Vec<Entry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_out: Option<String>,
    pub is_success: bool,
    pub run_time: DateTime<Utc>,
}
