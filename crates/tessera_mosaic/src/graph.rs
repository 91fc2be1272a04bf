//! Composition cycle detection.
//!
//! Two guards exist. Inside one resolution the task-local chain of modules
//! currently being processed catches a module reaching itself through
//! nested host loads. Batch callers that resolve many files at once should
//! also build a [`DependencyGraph`] up front, since two files waiting on
//! each other from different tasks never share a chain.

use std::future::Future;

use tessera_grout::{FxHashMap, IndexMap, IndexSet};

use crate::error::{ResolveError, ResolveResult};

tokio::task_local! {
    static CHAIN: Vec<String>;
}

/// Modules currently being resolved in this task, outermost first.
pub fn current_chain() -> Vec<String> {
    CHAIN.try_with(Clone::clone).unwrap_or_default()
}

/// Fail if `id` is already being resolved further up this task's chain.
pub fn ensure_acyclic(id: &str) -> ResolveResult<()> {
    let chain = current_chain();
    match chain.iter().position(|entry| entry == id) {
        Some(start) => {
            let mut cycle = chain[start..].to_vec();
            cycle.push(id.to_string());
            Err(ResolveError::Cycle { chain: cycle })
        }
        None => Ok(()),
    }
}

/// Run `fut` with `id` pushed onto the resolution chain.
pub async fn within<F, T>(id: &str, fut: F) -> ResolveResult<T>
where
    F: Future<Output = ResolveResult<T>>,
{
    ensure_acyclic(id)?;
    let mut chain = current_chain();
    chain.push(id.to_string());
    CHAIN.scope(chain, fut).await
}

/// Directed module graph: importer -> dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: IndexMap<String, IndexSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, id: &str) {
        self.edges.entry(id.to_string()).or_default();
    }

    /// Record that `from` depends on `to`. Modules keep first-mention order.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.add_module(to);
    }

    pub fn dependencies(&self, id: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(id)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every cycle reachable by depth-first search in insertion order.
    ///
    /// Each cycle starts and ends with the same module.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut marks: FxHashMap<&str, Mark> = FxHashMap::default();
        let mut stack: Vec<&str> = Vec::new();
        let mut found = Vec::new();
        for id in self.edges.keys() {
            if !marks.contains_key(id.as_str()) {
                self.visit(id, &mut marks, &mut stack, &mut found);
            }
        }
        found
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        marks: &mut FxHashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        found: &mut Vec<Vec<String>>,
    ) {
        marks.insert(id, Mark::Active);
        stack.push(id);
        for dep in self.dependencies(id) {
            match marks.get(dep) {
                Some(Mark::Active) => {
                    if let Some(start) = stack.iter().position(|entry| *entry == dep) {
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(dep.to_string());
                        found.push(cycle);
                    }
                }
                Some(Mark::Done) => {}
                None => self.visit(dep, marks, stack, found),
            }
        }
        stack.pop();
        marks.insert(id, Mark::Done);
    }

    /// Modules on a cycle, or depending on one, with the cycle blocking each.
    ///
    /// Resolving any of these concurrently can leave two loads waiting on
    /// each other, so batch callers fail them before resolution starts.
    pub fn blocked_by_cycles(&self) -> IndexMap<String, Vec<String>> {
        let mut blocked: IndexMap<String, Vec<String>> = IndexMap::default();
        for cycle in self.cycles() {
            for id in &cycle[..cycle.len() - 1] {
                blocked.entry(id.clone()).or_insert_with(|| cycle.clone());
            }
        }
        if blocked.is_empty() {
            return blocked;
        }

        loop {
            let mut changed = false;
            for (id, deps) in &self.edges {
                if blocked.contains_key(id) {
                    continue;
                }
                if let Some(cycle) = deps.iter().find_map(|dep| blocked.get(dep)).cloned() {
                    blocked.insert(id.clone(), cycle);
                    changed = true;
                }
            }
            if !changed {
                return blocked;
            }
        }
    }
}
