//! Entry grouping engine
//!
//! Components are claimed by three tiers, each one only seeing what the
//! previous tiers left over:
//!
//! 1. [`user_bundles`]: groups the user declared in the configuration
//! 2. [`root_document`]: everything the root html document needs
//! 3. [`common_deps`]: automatic grouping that factors out shared dependencies
//!
//! The result is sorted deterministically: members by tag, groups by their
//! smallest tag and then by size.

use anyhow::{Result, bail};
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::{
    component_graph::{ClosureCache, ComponentGraph},
    diagnostics::Diagnostics,
    types::ComponentId,
};

pub mod common_deps;
pub mod root_document;
pub mod user_bundles;

/// A component placed in an entry group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryComponent {
    pub id: ComponentId,
    /// Components whose dependency on this one caused the placement
    pub dependency_of: Vec<ComponentId>,
}

impl EntryComponent {
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            dependency_of: Vec::new(),
        }
    }

    pub fn dependency_of(id: ComponentId, dependents: Vec<ComponentId>) -> Self {
        Self {
            id,
            dependency_of: dependents,
        }
    }
}

/// Components that will be emitted together as one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryGroup {
    pub components: Vec<EntryComponent>,
}

impl EntryGroup {
    pub fn new(components: Vec<EntryComponent>) -> Self {
        Self { components }
    }

    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().map(|c| c.id)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.iter().any(|c| c.id == id)
    }

    pub fn smallest(&self) -> Option<ComponentId> {
        self.ids().min()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Sort members by tag and every `dependency_of` list
    pub fn sort(&mut self) {
        for component in &mut self.components {
            component.dependency_of.sort();
            component.dependency_of.dedup();
        }
        self.components.sort_by_key(|c| c.id);
    }
}

/// Order groups by smallest member, then by size
pub fn sort_groups(groups: &mut [EntryGroup]) {
    groups.sort_by(|a, b| a.smallest().cmp(&b.smallest()).then(a.len().cmp(&b.len())));
}

/// Groups under construction plus the placement of every claimed component
///
/// Placing a component twice is an internal error: it would make the
/// downstream bundler emit the same component in two bundles.
#[derive(Debug, Default)]
pub struct GroupSet {
    groups: Vec<EntryGroup>,
    placed: FxHashMap<ComponentId, usize>,
}

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_placed(&self, id: ComponentId) -> bool {
        self.placed.contains_key(&id)
    }

    /// Index of the group holding `id`
    pub fn group_containing(&self, id: ComponentId) -> Option<usize> {
        self.placed.get(&id).copied()
    }

    /// Index of the first group holding any of `ids`
    pub fn group_overlapping<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ComponentId>,
    ) -> Option<usize> {
        ids.into_iter()
            .filter_map(|id| self.group_containing(*id))
            .min()
    }

    /// Append a new group; empty groups are dropped
    pub fn push_group(&mut self, components: Vec<EntryComponent>) -> Result<()> {
        if components.is_empty() {
            return Ok(());
        }
        let index = self.groups.len();
        self.groups.push(EntryGroup::default());
        for component in components {
            self.add_to_group(index, component)?;
        }
        Ok(())
    }

    pub fn add_to_group(&mut self, index: usize, component: EntryComponent) -> Result<()> {
        if let Some(existing) = self.placed.get(&component.id) {
            bail!(
                "Component {:?} placed in entry group {index} after already being placed in \
                 entry group {existing}",
                component.id
            );
        }
        self.placed.insert(component.id, index);
        self.groups[index].components.push(component);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[EntryGroup] {
        &self.groups
    }

    /// Sorted groups, ready for the encapsulation partitioner
    pub fn into_sorted_groups(self) -> Vec<EntryGroup> {
        let mut groups: Vec<EntryGroup> = self
            .groups
            .into_iter()
            .filter(|g| !g.is_empty())
            .map(|mut g| {
                g.sort();
                g
            })
            .collect();
        sort_groups(&mut groups);
        groups
    }
}

/// Run all three tiers over the graph
///
/// Closures computed here are memoized in `cache`, which the caller owns.
pub fn plan_entry_groups(
    graph: &ComponentGraph,
    user_bundle_groups: &[Vec<String>],
    cache: &mut ClosureCache,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<EntryGroup>> {
    let mut groups = GroupSet::new();

    user_bundles::add_user_bundle_groups(graph, user_bundle_groups, &mut groups, diagnostics)?;
    debug!("{} entry groups after user bundles", groups.len());

    root_document::add_root_document_group(graph, &mut groups, cache)?;
    debug!("{} entry groups after the root document", groups.len());

    let roots: Vec<ComponentId> = graph
        .ids()
        .filter(|id| !graph.is_external(*id) && !groups.is_placed(*id))
        .collect();
    common_deps::add_common_component_groups(graph, &roots, &mut groups, cache)?;

    let groups = groups.into_sorted_groups();
    info!(
        "Planned {} entry groups for {} components",
        groups.len(),
        graph.len()
    );
    Ok(groups)
}
