//! Tier 3: automatic common-dependency factoring
//!
//! The factoring graph is the union of the roots' closures, visited in
//! depth-first order, with every already claimed component removed from both
//! the node list and the dependency lists. Each unplaced node is then handled
//! by how many graph members depend on it directly:
//!
//! - none: it is a top-level component and gets its own group
//! - one: it rides along in its single dependent's group
//! - several: everything all of those dependents depend on directly is
//!   factored out into a shared group

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use super::{EntryComponent, GroupSet};
use crate::{
    component_graph::{ClosureCache, ComponentGraph},
    types::ComponentId,
};

#[derive(Debug)]
struct FactoringNode {
    id: ComponentId,
    /// Direct dependencies that are members of the factoring graph
    dependencies: Vec<ComponentId>,
}

/// Group every component reachable from `roots` that is not placed yet
///
/// `roots` should be sorted so the result does not depend on enumeration
/// order.
pub fn add_common_component_groups(
    graph: &ComponentGraph,
    roots: &[ComponentId],
    groups: &mut GroupSet,
    cache: &mut ClosureCache,
) -> Result<()> {
    let nodes = factoring_graph(graph, roots, groups, cache)?;
    debug!(
        "Factoring {} unclaimed components from {} roots",
        nodes.len(),
        roots.len()
    );

    for node in &nodes {
        let entry = node.id;
        if groups.is_placed(entry) {
            continue;
        }

        let dependents: Vec<&FactoringNode> = nodes
            .iter()
            .filter(|n| n.dependencies.contains(&entry))
            .collect();

        match dependents.as_slice() {
            [] => {
                trace!("'{}' has no dependents", graph.tag(entry));
                groups.push_group(vec![EntryComponent::new(entry)])?;
            }
            [parent] => {
                trace!(
                    "'{}' is only used by '{}'",
                    graph.tag(entry),
                    graph.tag(parent.id)
                );
                let component = EntryComponent::dependency_of(entry, vec![parent.id]);
                match groups.group_containing(parent.id) {
                    Some(index) => groups.add_to_group(index, component)?,
                    None => groups.push_group(vec![EntryComponent::new(parent.id), component])?,
                }
            }
            _ => add_shared_group(graph, &dependents, groups)?,
        }
    }

    Ok(())
}

fn factoring_graph(
    graph: &ComponentGraph,
    roots: &[ComponentId],
    groups: &GroupSet,
    cache: &mut ClosureCache,
) -> Result<Vec<FactoringNode>> {
    let members: IndexSet<ComponentId> = cache
        .closure_of_many(graph, roots)?
        .into_iter()
        .filter(|id| !groups.is_placed(*id))
        .collect();

    Ok(members
        .iter()
        .map(|&id| FactoringNode {
            id,
            dependencies: graph
                .dependencies(id)
                .iter()
                .copied()
                .filter(|dep| members.contains(dep))
                .collect(),
        })
        .collect())
}

/// Factor out what every one of `dependents` depends on directly
fn add_shared_group(
    graph: &ComponentGraph,
    dependents: &[&FactoringNode],
    groups: &mut GroupSet,
) -> Result<()> {
    let mut commons: IndexMap<ComponentId, Vec<ComponentId>> = IndexMap::new();
    for dependent in dependents {
        for dep in &dependent.dependencies {
            if dependents.iter().all(|d| d.dependencies.contains(dep)) {
                commons.entry(*dep).or_default().push(dependent.id);
            }
        }
    }

    let existing = groups.group_overlapping(commons.keys());
    let fresh: Vec<EntryComponent> = commons
        .into_iter()
        .filter(|(id, _)| !groups.is_placed(*id))
        .map(|(id, dependency_of)| EntryComponent::dependency_of(id, dependency_of))
        .collect();

    let fresh_ids: Vec<ComponentId> = fresh.iter().map(|c| c.id).collect();
    match existing {
        Some(index) => {
            trace!(
                "Merging shared components {:?} into entry group {index}",
                graph.tags_of(&fresh_ids)
            );
            for component in fresh {
                groups.add_to_group(index, component)?;
            }
        }
        None => {
            trace!("New shared group {:?}", graph.tags_of(&fresh_ids));
            groups.push_group(fresh)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::entry_groups::tests::{graph_of, group_tags};

    fn plan(graph: &ComponentGraph, roots: &[&str]) -> Vec<Vec<String>> {
        let mut roots: Vec<ComponentId> = roots
            .iter()
            .map(|tag| graph.id_of(tag).expect("known tag"))
            .collect();
        roots.sort();
        roots.dedup();

        let mut groups = GroupSet::new();
        let mut cache = ClosureCache::new();
        add_common_component_groups(graph, &roots, &mut groups, &mut cache)
            .expect("factoring succeeds");
        group_tags(graph, &groups.into_sorted_groups())
    }

    #[test]
    fn test_circular() {
        let graph = graph_of(&[("x", &["y", "x"]), ("y", &["z", "z"]), ("z", &["x"])]);
        assert_eq!(plan(&graph, &["z", "x", "y"]), vec![vec!["x", "y", "z"]]);
    }

    #[test]
    fn test_random_orders_2() {
        let graph = graph_of(&[
            ("y", &["x", "w", "v"]),
            ("v", &[]),
            ("x", &["w", "v"]),
            ("z", &["v", "x", "w"]),
            ("w", &[]),
        ]);
        assert_eq!(
            plan(&graph, &["y", "z"]),
            vec![vec!["v", "w", "x"], vec!["y"], vec!["z"]]
        );
    }

    #[test]
    fn test_random_orders_1() {
        let graph = graph_of(&[
            ("w", &[]),
            ("y", &["w", "x", "v"]),
            ("x", &["w", "v"]),
            ("v", &[]),
            ("z", &["x", "v", "w"]),
            ("a", &[]),
        ]);
        assert_eq!(
            plan(&graph, &["z", "y", "z", "y"]),
            vec![vec!["v", "w", "x"], vec!["y"], vec!["z"]]
        );
    }

    #[test]
    fn test_common_c_d_e() {
        let graph = graph_of(&[
            ("a", &["c", "d", "e"]),
            ("b", &["c", "d", "e"]),
            ("c", &["d", "e"]),
            ("d", &[]),
            ("e", &[]),
        ]);
        assert_eq!(
            plan(&graph, &["a", "b"]),
            vec![vec!["a"], vec!["b"], vec!["c", "d", "e"]]
        );
    }

    #[test]
    fn test_common_c_d_and_b_e() {
        let graph = graph_of(&[
            ("a", &["c", "d"]),
            ("b", &["c", "d", "e"]),
            ("c", &[]),
            ("d", &[]),
            ("e", &[]),
        ]);
        assert_eq!(
            plan(&graph, &["a", "b"]),
            vec![vec!["a"], vec!["b", "e"], vec!["c", "d"]]
        );
    }

    #[test]
    fn test_common_c_d_with_dependencies_as_roots() {
        let graph = graph_of(&[("a", &["c", "d"]), ("b", &["c", "d"]), ("c", &[]), ("d", &[])]);
        let expected = vec![vec!["a"], vec!["b"], vec!["c", "d"]];
        assert_eq!(plan(&graph, &["a", "b"]), expected);
        assert_eq!(plan(&graph, &["a", "b", "c", "d"]), expected);
    }

    #[test]
    fn test_common_dependency_outside_the_roots() {
        let graph = graph_of(&[("a", &["c"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(
            plan(&graph, &["a", "b"]),
            vec![vec!["a"], vec!["b"], vec!["c"]]
        );
    }

    #[test]
    fn test_group_three_together() {
        let graph = graph_of(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(plan(&graph, &["a", "b", "c"]), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_exclude_components_not_reachable_from_roots() {
        let graph = graph_of(&[
            ("a", &["b"]),
            ("b", &[]),
            ("c", &["d", "e"]),
            ("d", &["e", "a"]),
            ("e", &["b"]),
        ]);
        assert_eq!(plan(&graph, &["a", "b"]), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_group_two_together() {
        let graph = graph_of(&[("a", &["b"]), ("b", &[])]);
        assert_eq!(plan(&graph, &["a", "b"]), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_simple_no_deps() {
        let graph = graph_of(&[("a", &[]), ("b", &[]), ("c", &[])]);
        assert_eq!(
            plan(&graph, &["a", "b", "c"]),
            vec![vec!["a"], vec!["b"], vec!["c"]]
        );
    }

    #[test]
    fn test_shared_components_record_their_dependents() {
        let graph = graph_of(&[
            ("a", &["c", "d", "e"]),
            ("b", &["c", "d", "e"]),
            ("c", &["d", "e"]),
            ("d", &[]),
            ("e", &[]),
        ]);
        let roots: Vec<ComponentId> = ["a", "b"]
            .iter()
            .map(|tag| graph.id_of(tag).expect("known tag"))
            .collect();
        let mut groups = GroupSet::new();
        let mut cache = ClosureCache::new();
        add_common_component_groups(&graph, &roots, &mut groups, &mut cache)
            .expect("factoring succeeds");

        let groups = groups.into_sorted_groups();
        let shared = groups.last().expect("shared group");
        let dependency_of: Vec<(String, Vec<String>)> = shared
            .components
            .iter()
            .map(|c| (graph.tag(c.id).to_owned(), graph.tags_of(&c.dependency_of)))
            .collect();
        assert_eq!(
            dependency_of,
            vec![
                ("c".to_owned(), vec!["a".to_owned(), "b".to_owned()]),
                ("d".to_owned(), vec!["a".to_owned(), "b".to_owned()]),
                ("e".to_owned(), vec!["a".to_owned(), "b".to_owned()]),
            ]
        );
    }

    #[test]
    fn test_claimed_components_are_walked_through_but_not_placed() {
        let graph = graph_of(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        let mut groups = GroupSet::new();
        let b = graph.id_of("b").expect("known tag");
        groups
            .push_group(vec![EntryComponent::new(b)])
            .expect("claimed group");

        let a = graph.id_of("a").expect("known tag");
        let mut cache = ClosureCache::new();
        add_common_component_groups(&graph, &[a], &mut groups, &mut cache)
            .expect("factoring succeeds");

        assert_eq!(
            group_tags(&graph, &groups.into_sorted_groups()),
            vec![vec!["a"], vec!["b"], vec!["c"]]
        );
    }
}
