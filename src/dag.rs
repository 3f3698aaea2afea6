//! The task DAG: a mapping from task node to its direct children.

use std::collections::HashMap;
use std::sync::Arc;

use crate::task::{TaskId, TaskNode};

/// Mapping from task node to ordered children, rooted at the service body task.
///
/// Every node appears exactly once as a key; it also appears in exactly one
/// parent's child list unless it is a root.
#[derive(Default)]
pub(crate) struct TaskDag {
    nodes: HashMap<TaskId, Arc<TaskNode>>,
    children: HashMap<TaskId, Vec<TaskId>>,
    roots: Vec<TaskId>,
}

impl TaskDag {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, node: Arc<TaskNode>) {
        let id = node.id();
        self.children.insert(id, Vec::new());
        match node.parent() {
            Some(parent_id) => self.children.entry(parent_id).or_default().push(id),
            None => self.roots.push(id),
        }
        self.nodes.insert(id, node);
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: TaskId) -> Option<&Arc<TaskNode>> {
        self.nodes.get(&id)
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = &Arc<TaskNode>> {
        self.nodes.values()
    }

    /// Find the node whose bound runtime task id matches `runtime_id`.
    /// Nodes that haven't started executing yet (no runtime id bound) are
    /// skipped — they cannot have spawned anyone.
    pub(crate) fn parent_of(&self, runtime_id: tokio::task::Id) -> Option<TaskId> {
        self.nodes
            .values()
            .find(|node| node.try_runtime_id() == Some(runtime_id))
            .map(|node| node.id())
    }

    /// Nodes in reverse topological order: every descendant of a node
    /// appears before it. Among siblings, later-inserted children are
    /// visited first, and one subtree is fully visited before its next
    /// sibling subtree begins.
    pub(crate) fn reverse_topological(&self) -> Vec<Arc<TaskNode>> {
        let mut order = Vec::with_capacity(self.nodes.len());
        for &root in self.roots.iter().rev() {
            self.visit_post_order(root, &mut order);
        }
        order
    }

    fn visit_post_order(&self, id: TaskId, order: &mut Vec<Arc<TaskNode>>) {
        if let Some(children) = self.children.get(&id) {
            for &child in children.iter().rev() {
                self.visit_post_order(child, order);
            }
        }
        if let Some(node) = self.nodes.get(&id) {
            order.push(node.clone());
        }
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
