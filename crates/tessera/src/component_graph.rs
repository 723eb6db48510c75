//! Component dependency graph
//!
//! Components live in an arena indexed by [`ComponentId`]. Ids are handed out
//! in ascending tag order, which makes every id-sorted list tag-sorted as well
//! and keeps the whole planner independent of input enumeration order.
//!
//! Edges point from a component to the components it depends on. A
//! component's dependencies are the union of what its metadata declares and
//! what the tag scanner found in its compiled output.
//!
//! All walks are explicit stack/work-list traversals guarded by a visited set,
//! so cyclic graphs always terminate and deep graphs never grow the call stack.

use anyhow::{Result, bail};
use indexmap::IndexSet;
use log::{debug, trace};
use petgraph::{
    Direction,
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    diagnostics::Diagnostics,
    types::{ComponentId, ComponentRecord, EncapsulationMode},
};

/// A component plus its resolved edges
#[derive(Debug, Clone)]
pub struct ComponentNode {
    pub id: ComponentId,
    pub record: ComponentRecord,
    /// Components referenced by the compiled output, without self
    pub component_graph: Vec<ComponentId>,
    /// Declared and scanned dependencies, sorted, without self
    pub dependencies: Vec<ComponentId>,
}

impl ComponentNode {
    pub fn tag(&self) -> &str {
        &self.record.tag
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    nodes: Vec<ComponentNode>,
    tag_to_id: FxHashMap<String, ComponentId>,
    /// Mirrors `nodes`; node index == component index
    graph: DiGraph<ComponentId, ()>,
    /// Components referenced by the root document
    root_tags: Vec<ComponentId>,
}

impl ComponentGraph {
    /// Build the graph from component records and scan results
    ///
    /// `scanned` maps a tag to the tags found in its compiled output and
    /// `root_tags` are the tags found in the root document. Scanned tags are
    /// expected to be known already; declared dependencies naming unknown
    /// components are reported and dropped. Two records sharing a tag are an
    /// error.
    pub fn build(
        mut records: Vec<ComponentRecord>,
        scanned: &FxHashMap<String, Vec<String>>,
        root_tags: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        records.sort_by(|a, b| a.tag.cmp(&b.tag));
        if let Some(pair) = records.windows(2).find(|pair| pair[0].tag == pair[1].tag) {
            bail!("Component tag \"{}\" is declared more than once", pair[0].tag);
        }

        let tag_to_id: FxHashMap<String, ComponentId> = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.tag.clone(), ComponentId::new(index as u32)))
            .collect();

        let mut graph = DiGraph::with_capacity(records.len(), 0);
        let mut nodes = Vec::with_capacity(records.len());

        for record in records {
            let id = tag_to_id[&record.tag];
            let node_idx = graph.add_node(id);
            debug_assert_eq!(node_idx.index(), id.index());

            let mut component_graph: Vec<ComponentId> = scanned
                .get(&record.tag)
                .into_iter()
                .flatten()
                .filter_map(|tag| tag_to_id.get(tag).copied())
                .filter(|dep| *dep != id)
                .collect();
            component_graph.sort();
            component_graph.dedup();

            let mut dependencies = component_graph.clone();
            for declared in &record.dependencies {
                match tag_to_id.get(declared) {
                    Some(&dep) if dep != id => dependencies.push(dep),
                    Some(_) => {}
                    None => diagnostics.unknown_dependency(&record.tag, declared),
                }
            }
            dependencies.sort();
            dependencies.dedup();

            nodes.push(ComponentNode {
                id,
                record,
                component_graph,
                dependencies,
            });
        }

        for node in &nodes {
            for dep in &node.dependencies {
                graph.add_edge(
                    NodeIndex::new(node.id.index()),
                    NodeIndex::new(dep.index()),
                    (),
                );
            }
        }

        let mut root_ids: Vec<ComponentId> = root_tags
            .iter()
            .filter_map(|tag| tag_to_id.get(tag).copied())
            .collect();
        root_ids.sort();
        root_ids.dedup();

        debug!(
            "Built component graph with {} components, {} edges and {} root tags",
            nodes.len(),
            graph.edge_count(),
            root_ids.len()
        );

        Ok(Self {
            nodes,
            tag_to_id,
            graph,
            root_tags: root_ids,
        })
    }

    /// Build a graph from declared dependencies only
    pub fn from_records(records: Vec<ComponentRecord>, diagnostics: &mut Diagnostics) -> Result<Self> {
        Self::build(records, &FxHashMap::default(), &[], diagnostics)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    pub fn nodes(&self) -> &[ComponentNode] {
        &self.nodes
    }

    pub fn node(&self, id: ComponentId) -> &ComponentNode {
        &self.nodes[id.index()]
    }

    pub fn tag(&self, id: ComponentId) -> &str {
        self.node(id).tag()
    }

    pub fn id_of(&self, tag: &str) -> Option<ComponentId> {
        self.tag_to_id.get(tag).copied()
    }

    pub fn dependencies(&self, id: ComponentId) -> &[ComponentId] {
        &self.node(id).dependencies
    }

    pub fn encapsulation(&self, id: ComponentId) -> EncapsulationMode {
        self.node(id).record.encapsulation
    }

    pub fn is_external(&self, id: ComponentId) -> bool {
        self.node(id).record.is_external
    }

    pub fn root_tags(&self) -> &[ComponentId] {
        &self.root_tags
    }

    /// Components whose dependency list contains `id`, sorted
    pub fn dependents(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut dependents: Vec<ComponentId> = self
            .graph
            .neighbors_directed(NodeIndex::new(id.index()), Direction::Incoming)
            .map(|idx| self.graph[idx])
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents
    }

    /// Tags of the given ids, in the given order
    pub fn tags_of(&self, ids: &[ComponentId]) -> Vec<String> {
        ids.iter().map(|id| self.tag(*id).to_owned()).collect()
    }

    /// Every component reachable from `start`, including `start`, in
    /// depth-first visitation order
    pub fn transitive_closure(&self, start: ComponentId) -> Result<Vec<ComponentId>> {
        self.closure_of(std::slice::from_ref(&start))
    }

    /// Every component reachable from any of `starts`, in depth-first
    /// visitation order
    ///
    /// Each component is expanded at most once. Expanding more components than
    /// the graph holds means the visited set failed, which is an internal
    /// error rather than something a caller can recover from.
    pub fn closure_of(&self, starts: &[ComponentId]) -> Result<Vec<ComponentId>> {
        let mut visited: FxHashSet<ComponentId> = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<ComponentId> = starts.iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            if order.len() > self.nodes.len() {
                bail!(
                    "Closure expansion from {:?} visited more components than the graph \
                     holds ({})",
                    self.tags_of(starts),
                    self.nodes.len()
                );
            }
            trace!("Expanding closure through '{}'", self.tag(current));
            stack.extend(
                self.dependencies(current)
                    .iter()
                    .rev()
                    .filter(|dep| !visited.contains(dep)),
            );
        }

        Ok(order)
    }

    /// Strongly connected components with more than one member
    pub fn find_cycles(&self) -> Vec<Vec<ComponentId>> {
        let mut cycles: Vec<Vec<ComponentId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut ids: Vec<ComponentId> = scc.into_iter().map(|idx| self.graph[idx]).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }
}

/// Memoized closures, passed explicitly into the grouping engine
#[derive(Debug, Clone, Default)]
pub struct ClosureCache {
    closures: FxHashMap<ComponentId, Vec<ComponentId>>,
}

impl ClosureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure of `id` in visitation order, computed on first use
    pub fn closure(&mut self, graph: &ComponentGraph, id: ComponentId) -> Result<&[ComponentId]> {
        if !self.closures.contains_key(&id) {
            let closure = graph.transitive_closure(id)?;
            self.closures.insert(id, closure);
        }
        Ok(&self.closures[&id])
    }

    /// Union of the closures of `ids`, in first-visit order
    pub fn closure_of_many(
        &mut self,
        graph: &ComponentGraph,
        ids: &[ComponentId],
    ) -> Result<IndexSet<ComponentId>> {
        let mut union = IndexSet::new();
        for &id in ids {
            union.extend(self.closure(graph, id)?.iter().copied());
        }
        Ok(union)
    }

    pub fn len(&self) -> usize {
        self.closures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closures.is_empty()
    }
}
