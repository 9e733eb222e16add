//! # ID Registry Module / ID 注册表模块
//!
//! Flattens the instance tree into an address map so a single node can be
//! found and run without touching its siblings.
//!
//! 将实例树展平为地址映射，使单个节点可以被查找和运行而不影响其兄弟节点。

use std::collections::HashMap;

use crate::core::execution::{GroupInstance, TestInstance};
use crate::core::models::ResultRecord;
use crate::core::provider::ModelProvider;

/// Address to child-index path from the root group.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    paths: HashMap<String, Vec<usize>>,
    order: Vec<String>,
}

impl IdRegistry {
    /// Registers every node below `root`, depth first; the first node with an
    /// address keeps it.
    ///
    /// A group whose only child is a case with the group's own address hands
    /// the key to that case, so lookups reach the record holding the outcome.
    pub fn build<P: ModelProvider>(root: &GroupInstance<P>) -> Self {
        let mut registry = IdRegistry::default();
        let mut path = Vec::new();
        registry.visit(root.children(), &mut path);
        registry
    }

    fn visit<P: ModelProvider>(&mut self, nodes: &[TestInstance<P>], path: &mut Vec<usize>) {
        for (index, node) in nodes.iter().enumerate() {
            path.push(index);
            if !self.paths.contains_key(node.id()) {
                let mut target = path.clone();
                if let [only] = node.children() {
                    if only.is_case() && only.id() == node.id() {
                        target.push(0);
                    }
                }
                self.paths.insert(node.id().to_string(), target);
                self.order.push(node.id().to_string());
            }
            self.visit(node.children(), path);
            path.pop();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.paths.contains_key(id)
    }

    pub fn path(&self, id: &str) -> Option<&[usize]> {
        self.paths.get(id).map(Vec::as_slice)
    }

    /// Every address, in collection order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Follows `path` through the instance tree and the record tree in lockstep.
pub fn resolve<'a, P: ModelProvider>(
    root: &'a GroupInstance<P>,
    records: &'a mut ResultRecord,
    path: &[usize],
) -> Option<(&'a TestInstance<P>, &'a mut ResultRecord)> {
    let (first, rest) = path.split_first()?;
    let mut node = root.children().get(*first)?;
    let mut record = records.child_mut(node.id())?;
    for index in rest {
        node = node.children().get(*index)?;
        record = record.child_mut(node.id())?;
    }
    Some((node, record))
}
