//! Dependency graph over element definitions, keyed by canonical id
//!
//! Backed by `petgraph::StableDiGraph` with an `IndexMap` from id to node
//! index so iteration always follows insertion order. Edges point from a
//! dependent node to the node it depends on.

use crate::canonical::{create_canonical_id, CanonicalId};
use crate::error::GraphError;
use crate::exports::{resolve_in_set, ExportTables, ModuleSet};
use crate::model::{Definition, ImportKind, ModuleAnalysis};
use indexmap::IndexMap;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Local name (possibly dotted) → canonical id it denotes in one module.
pub type ReferenceMap = IndexMap<String, CanonicalId>;

/// One definition with its resolved edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraphNode {
    pub id: CanonicalId,
    pub definition: Definition,
    /// Direct dependencies in first-discovered order, without duplicates.
    pub dependencies: Vec<CanonicalId>,
    /// Matched reference prefix → canonical id.
    pub references: IndexMap<String, CanonicalId>,
}

/// Acyclic graph of definitions. Only [`build_dependency_graph`] constructs
/// one, and it never returns a graph containing a cycle.
pub struct DependencyGraph {
    inner: StableDiGraph<DependencyGraphNode, ()>,
    index: IndexMap<CanonicalId, NodeIndex>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    fn new() -> Self {
        DependencyGraph {
            inner: StableDiGraph::new(),
            index: IndexMap::new(),
        }
    }

    fn add_node(&mut self, node: DependencyGraphNode) -> Result<NodeIndex, GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateCanonicalId(node.id));
        }
        let id = node.id.clone();
        let idx = self.inner.add_node(node);
        self.index.insert(id, idx);
        Ok(idx)
    }

    pub fn node(&self, id: &CanonicalId) -> Option<&DependencyGraphNode> {
        self.index.get(id).and_then(|idx| self.inner.node_weight(*idx))
    }

    pub fn contains(&self, id: &CanonicalId) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes in insertion order (module discovery order, then
    /// definition order).
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyGraphNode> {
        self.index.values().filter_map(|idx| self.inner.node_weight(*idx))
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Nodes that depend directly on `id`, in insertion order.
    pub fn dependents(&self, id: &CanonicalId) -> Vec<&CanonicalId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = self
            .inner
            .neighbors_directed(idx, Direction::Incoming)
            .filter_map(|n| self.index.get_index_of(&self.inner[n].id))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .filter_map(|pos| self.index.get_index(pos).map(|(id, _)| id))
            .collect()
    }

    /// Nodes defined in one file, in definition order.
    pub fn nodes_in_file(&self, path: &Path) -> Vec<&DependencyGraphNode> {
        let wanted = crate::canonical::normalize_path(&path.to_string_lossy());
        self.nodes().filter(|n| n.id.file_path() == wanted).collect()
    }

    /// Dependencies-first order: a depth-first post-order from every node in
    /// insertion order, following `dependencies` in their recorded order.
    pub fn evaluation_order(&self) -> Vec<&DependencyGraphNode> {
        let mut order = Vec::with_capacity(self.len());
        let mut visited: FxHashSet<NodeIndex> = FxHashSet::default();

        for &start in self.index.values() {
            if !visited.insert(start) {
                continue;
            }
            let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];
            while let Some(frame) = stack.last_mut() {
                let node = &self.inner[frame.0];
                if let Some(dep) = node.dependencies.get(frame.1) {
                    frame.1 += 1;
                    if let Some(&next) = self.index.get(dep) {
                        if visited.insert(next) {
                            stack.push((next, 0));
                        }
                    }
                } else {
                    order.push(node);
                    stack.pop();
                }
            }
        }

        order
    }

    /// Depth-first search with an on-stack set and a global visited set.
    /// Returns the first cycle found as a closed chain.
    fn find_cycle(&self) -> Option<Vec<CanonicalId>> {
        let mut visited: FxHashSet<NodeIndex> = FxHashSet::default();
        let mut on_stack: FxHashSet<NodeIndex> = FxHashSet::default();

        for &start in self.index.values() {
            if !visited.insert(start) {
                continue;
            }
            on_stack.insert(start);
            let mut path: Vec<(NodeIndex, usize)> = vec![(start, 0)];

            while let Some(frame) = path.last_mut() {
                let current = frame.0;
                let deps = &self.inner[current].dependencies;
                let Some(dep) = deps.get(frame.1) else {
                    on_stack.remove(&current);
                    path.pop();
                    continue;
                };
                frame.1 += 1;

                let Some(&next) = self.index.get(dep) else {
                    continue;
                };
                if on_stack.contains(&next) {
                    let begin = path.iter().position(|(n, _)| *n == next).unwrap_or(0);
                    let mut chain: Vec<CanonicalId> = path[begin..]
                        .iter()
                        .map(|(n, _)| self.inner[*n].id.clone())
                        .collect();
                    chain.push(self.inner[next].id.clone());
                    return Some(chain);
                }
                if visited.insert(next) {
                    on_stack.insert(next);
                    path.push((next, 0));
                }
            }
        }

        None
    }
}

/// Build the reference map of one module: its own definitions by local
/// path, plus every import binding resolved through the export tables.
pub fn build_reference_map(
    path: &Path,
    analysis: &ModuleAnalysis,
    tables: &ExportTables,
    modules: &ModuleSet,
) -> ReferenceMap {
    let mut map = ReferenceMap::new();

    for def in &analysis.definitions {
        if let Ok(id) = create_canonical_id(path, &def.ast_path) {
            map.entry(def.ast_path.clone()).or_insert(id);
        }
    }

    let mut bare: Vec<(String, CanonicalId)> = Vec::new();
    for import in &analysis.imports {
        let Some(target) = resolve_in_set(path, &import.source, modules) else {
            continue;
        };
        let Some(table) = tables.get(&target) else {
            continue;
        };

        match import.kind {
            ImportKind::SideEffect => {}
            ImportKind::Namespace => {
                for (name, id) in table {
                    map.entry(format!("{}.{}", import.local, name))
                        .or_insert_with(|| id.clone());
                    bare.push((name.clone(), id.clone()));
                }
            }
            ImportKind::Named | ImportKind::Default => {
                let imported = if import.kind == ImportKind::Default {
                    "default"
                } else {
                    import.imported.as_str()
                };
                let prefix = format!("{}.", imported);
                for (name, id) in table {
                    if name == imported {
                        map.entry(import.local.clone()).or_insert_with(|| id.clone());
                    } else if let Some(rest) = name.strip_prefix(&prefix) {
                        map.entry(format!("{}.{}", import.local, rest))
                            .or_insert_with(|| id.clone());
                    }
                }
            }
        }
    }

    // Bare namespace keys never shadow own definitions or named bindings.
    for (name, id) in bare {
        map.entry(name).or_insert(id);
    }

    map
}

/// Resolve a referenced path by its longest dotted prefix present in `map`.
pub fn resolve_reference<'a>(
    map: &'a ReferenceMap,
    reference: &str,
) -> Option<(&'a str, &'a CanonicalId)> {
    let mut candidate = reference;
    loop {
        if let Some((key, id)) = map.get_key_value(candidate) {
            return Some((key.as_str(), id));
        }
        match candidate.rfind('.') {
            Some(pos) => candidate = &candidate[..pos],
            None => return None,
        }
    }
}

/// Combine the analyzed module set into a dependency graph.
///
/// Fails with [`GraphError::CircularDependency`] on the first cycle found and
/// with [`GraphError::DuplicateCanonicalId`] if two definitions share an id.
pub fn build_dependency_graph(modules: &ModuleSet) -> Result<DependencyGraph, GraphError> {
    let tables = ExportTables::build(modules);
    let mut graph = DependencyGraph::new();

    for (path, analysis) in modules {
        let refs = build_reference_map(path, analysis, &tables, modules);

        for def in &analysis.definitions {
            let id = create_canonical_id(path, &def.ast_path)?;
            let mut dependencies: Vec<CanonicalId> = Vec::new();
            let mut references: IndexMap<String, CanonicalId> = IndexMap::new();

            for reference in &def.references {
                let Some((key, target)) = resolve_reference(&refs, reference) else {
                    continue;
                };
                if *target == id {
                    continue;
                }
                references
                    .entry(key.to_string())
                    .or_insert_with(|| target.clone());
                if !dependencies.contains(target) {
                    dependencies.push(target.clone());
                }
            }

            graph.add_node(DependencyGraphNode {
                id,
                definition: def.clone(),
                dependencies,
                references,
            })?;
        }
    }

    let edges: Vec<(NodeIndex, NodeIndex)> = graph
        .index
        .values()
        .flat_map(|&from| {
            let graph = &graph;
            graph.inner[from]
                .dependencies
                .iter()
                .filter_map(move |dep| graph.index.get(dep).map(|&to| (from, to)))
        })
        .collect();
    for (from, to) in edges {
        graph.inner.add_edge(from, to, ());
    }

    if let Some(chain) = graph.find_cycle() {
        tracing::warn!("Dependency cycle of length {}", chain.len() - 1);
        return Err(GraphError::CircularDependency(chain));
    }

    tracing::info!(
        "Dependency graph: {} nodes, {} edges across {} modules",
        graph.len(),
        graph.edge_count(),
        modules.len()
    );
    Ok(graph)
}
