//! Encapsulation partitioner
//!
//! A bundle is loaded with a single style strategy, so a group mixing
//! encapsulation modes keeps only its largest mode. The members it sheds are
//! pooled per mode across the whole build and emitted as extra groups. The
//! result is re-sorted, so overflow groups land where their smallest member
//! puts them.

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    component_graph::ComponentGraph,
    entry_groups::{EntryComponent, EntryGroup, sort_groups},
    types::{ComponentId, EncapsulationMode},
};

const MODE_COUNT: usize = EncapsulationMode::ALL.len();

/// Members of one group, bucketed by mode in [`EncapsulationMode::ALL`] order
fn bucket_by_mode(graph: &ComponentGraph, group: EntryGroup) -> [Vec<EntryComponent>; MODE_COUNT] {
    let mut buckets: [Vec<EntryComponent>; MODE_COUNT] = Default::default();
    for component in group.components {
        let mode = graph.encapsulation(component.id);
        buckets[mode as usize].push(component);
    }
    buckets
}

/// Index of the bucket a mixed group keeps
///
/// The largest bucket wins; ties go to the earlier mode.
fn kept_bucket(buckets: &[Vec<EntryComponent>]) -> usize {
    let mut kept = 0;
    for (index, bucket) in buckets.iter().enumerate() {
        if bucket.len() > buckets[kept].len() {
            kept = index;
        }
    }
    kept
}

/// Split every mixed-mode group
///
/// Groups that already hold a single mode pass through unchanged. Kept and
/// overflow groups are returned together, ordered by smallest member and then
/// by size.
pub fn partition_by_encapsulation(graph: &ComponentGraph, groups: Vec<EntryGroup>) -> Vec<EntryGroup> {
    let mut overflow: [Vec<EntryComponent>; MODE_COUNT] = Default::default();
    let mut placed: FxHashSet<ComponentId> = FxHashSet::default();
    let mut partitioned = Vec::with_capacity(groups.len());

    for group in groups {
        let buckets = bucket_by_mode(graph, group);
        if buckets.iter().all(Vec::is_empty) {
            continue;
        }

        let kept = kept_bucket(&buckets);
        for (index, bucket) in buckets.into_iter().enumerate() {
            if index == kept {
                placed.extend(bucket.iter().map(|c| c.id));
                partitioned.push(EntryGroup::new(bucket));
            } else if !bucket.is_empty() {
                debug!(
                    "Moving {:?} out of a {} group into the {} overflow group",
                    bucket.iter().map(|c| graph.tag(c.id)).collect::<Vec<_>>(),
                    EncapsulationMode::ALL[kept],
                    EncapsulationMode::ALL[index]
                );
                overflow[index].extend(bucket);
            }
        }
    }

    for pool in overflow {
        let mut components = Vec::with_capacity(pool.len());
        for component in pool {
            if placed.insert(component.id) {
                components.push(component);
            }
        }
        if components.is_empty() {
            continue;
        }
        let mut group = EntryGroup::new(components);
        group.sort();
        partitioned.push(group);
    }

    sort_groups(&mut partitioned);
    partitioned
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        diagnostics::Diagnostics,
        types::{
            ComponentRecord,
            EncapsulationMode::{None as Plain, Scoped, Shadow},
        },
    };

    fn graph_of(records: &[(&str, EncapsulationMode)]) -> ComponentGraph {
        let mut diagnostics = Diagnostics::new();
        ComponentGraph::from_records(
            records
                .iter()
                .map(|(tag, mode)| ComponentRecord::new(*tag, format!("{tag}.js")).with_encapsulation(*mode))
                .collect(),
            &mut diagnostics,
        )
        .expect("unique tags")
    }

    fn groups_of(graph: &ComponentGraph, groups: &[&[&str]]) -> Vec<EntryGroup> {
        groups
            .iter()
            .map(|tags| {
                EntryGroup::new(
                    tags.iter()
                        .map(|tag| EntryComponent::new(graph.id_of(tag).expect("known tag")))
                        .collect(),
                )
            })
            .collect()
    }

    fn partition(graph: &ComponentGraph, groups: &[&[&str]]) -> Vec<Vec<String>> {
        partition_by_encapsulation(graph, groups_of(graph, groups))
            .iter()
            .map(|g| g.ids().map(|id| graph.tag(id).to_owned()).collect())
            .collect()
    }

    #[test]
    fn test_single_mode_groups_are_unchanged() {
        let graph = graph_of(&[("a", Plain), ("b", Plain), ("c", Shadow), ("d", Shadow)]);
        assert_eq!(
            partition(&graph, &[&["a", "b"], &["c", "d"]]),
            vec![vec!["a", "b"], vec!["c", "d"]]
        );
    }

    #[test]
    fn test_largest_bucket_stays() {
        let graph = graph_of(&[("a", Plain), ("b", Shadow), ("c", Shadow), ("d", Scoped)]);
        assert_eq!(
            partition(&graph, &[&["a", "b", "c", "d"]]),
            vec![vec!["a"], vec!["b", "c"], vec!["d"]]
        );
    }

    #[test]
    fn test_ties_prefer_no_encapsulation() {
        let graph = graph_of(&[("a", Shadow), ("b", Plain), ("c", Scoped)]);
        let group = groups_of(&graph, &[&["a", "b", "c"]]).remove(0);
        assert_eq!(EncapsulationMode::ALL[kept_bucket(&bucket_by_mode(&graph, group))], Plain);
        assert_eq!(
            partition(&graph, &[&["a", "b", "c"]]),
            vec![vec!["a"], vec!["b"], vec!["c"]]
        );
    }

    #[test]
    fn test_ties_prefer_scoped_over_shadow() {
        let graph = graph_of(&[("a", Shadow), ("b", Scoped)]);
        let group = groups_of(&graph, &[&["a", "b"]]).remove(0);
        assert_eq!(EncapsulationMode::ALL[kept_bucket(&bucket_by_mode(&graph, group))], Scoped);
        assert_eq!(partition(&graph, &[&["a", "b"]]), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_overflow_is_pooled_across_groups() {
        let graph = graph_of(&[
            ("a", Plain),
            ("b", Plain),
            ("c", Shadow),
            ("d", Plain),
            ("e", Plain),
            ("f", Shadow),
        ]);
        assert_eq!(
            partition(&graph, &[&["a", "b", "c"], &["d", "e", "f"]]),
            vec![vec!["a", "b"], vec!["c", "f"], vec!["d", "e"]]
        );
    }

    #[test]
    fn test_overflow_groups_sorted_with_kept_groups() {
        let graph = graph_of(&[
            ("a", Scoped),
            ("b", Plain),
            ("d", Shadow),
            ("e", Shadow),
            ("f", Shadow),
            ("g", Shadow),
        ]);
        assert_eq!(
            partition(&graph, &[&["a", "d", "e"], &["b", "f", "g"]]),
            vec![vec!["a"], vec!["b"], vec!["d", "e"], vec!["f", "g"]]
        );
    }

    #[test]
    fn test_empty_input() {
        let graph = graph_of(&[]);
        assert!(partition(&graph, &[]).is_empty());
    }
}
