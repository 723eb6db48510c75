//! Tier 1: bundles declared by the user
//!
//! Whatever the user put in a bundle is how it goes. Larger bundles are placed
//! first, so when two bundles name the same component the larger one keeps it.

use anyhow::Result;
use cow_utils::CowUtils;
use log::debug;

use super::{EntryComponent, GroupSet};
use crate::{component_graph::ComponentGraph, diagnostics::Diagnostics};

/// Place every user-declared bundle, largest first
///
/// Unknown tags are reported and dropped from their bundle only. Tags already
/// placed by an earlier bundle are skipped.
pub fn add_user_bundle_groups(
    graph: &ComponentGraph,
    user_bundle_groups: &[Vec<String>],
    groups: &mut GroupSet,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let mut ordered: Vec<(usize, &Vec<String>)> = user_bundle_groups
        .iter()
        .enumerate()
        .filter(|(_, bundle)| !bundle.is_empty())
        .collect();
    // Stable, so equally sized bundles keep their declared order
    ordered.sort_by(|(_, a), (_, b)| b.len().cmp(&a.len()));

    for (bundle_index, bundle) in ordered {
        let mut components: Vec<EntryComponent> = Vec::with_capacity(bundle.len());

        for declared in bundle {
            let tag = declared.trim().cow_to_lowercase();
            let Some(id) = graph.id_of(&tag) else {
                diagnostics.unknown_bundle_tag(&tag, bundle_index, bundle);
                continue;
            };

            if groups.is_placed(id) || components.iter().any(|c| c.id == id) {
                debug!("Skipping '{tag}' in user bundle #{}, already placed", bundle_index + 1);
                continue;
            }
            components.push(EntryComponent::new(id));
        }

        groups.push_group(components)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::entry_groups::tests::{graph_of, group_tags};

    fn bundles(groups: &[&[&str]]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| g.iter().map(|t| (*t).to_owned()).collect())
            .collect()
    }

    fn place(graph: &ComponentGraph, declared: &[&[&str]]) -> (Vec<Vec<String>>, Diagnostics) {
        let mut groups = GroupSet::new();
        let mut diagnostics = Diagnostics::new();
        add_user_bundle_groups(graph, &bundles(declared), &mut groups, &mut diagnostics)
            .expect("placement succeeds");
        (group_tags(graph, groups.groups()), diagnostics)
    }

    #[test]
    fn test_largest_bundle_first() {
        let graph = graph_of(&[
            ("cmp-a", &[]),
            ("cmp-b", &[]),
            ("cmp-c", &[]),
            ("cmp-d", &[]),
            ("cmp-e", &[]),
        ]);
        let (groups, diagnostics) = place(&graph, &[&["cmp-a", "cmp-b"], &["cmp-c", "cmp-d", "cmp-e"]]);
        assert!(diagnostics.is_empty());
        assert_eq!(
            groups,
            vec![vec!["cmp-c", "cmp-d", "cmp-e"], vec!["cmp-a", "cmp-b"]]
        );
    }

    #[test]
    fn test_first_one_wins() {
        let graph = graph_of(&[("a", &[]), ("b", &[]), ("c", &[]), ("d", &[])]);
        let (groups, _) = place(&graph, &[&["a", "b", "c"], &["a", "b", "d"]]);
        assert_eq!(groups, vec![vec!["a", "b", "c"], vec!["d"]]);
    }

    #[test]
    fn test_fully_claimed_bundles_are_removed() {
        let graph = graph_of(&[("a", &[]), ("b", &[]), ("c", &[])]);
        let (groups, _) = place(&graph, &[&["a", "b", "c"], &["a", "b", "c"], &["b", "c"]]);
        assert_eq!(groups, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_repeated_tags_within_a_bundle() {
        let graph = graph_of(&[("a", &[]), ("b", &[]), ("c", &[])]);
        // The repeated tag makes this the largest bundle, so it is placed first
        let (groups, _) = place(&graph, &[&["a", "b", "c"], &["c", "c", "c", "c"]]);
        assert_eq!(groups, vec![vec!["c"], vec!["a", "b"]]);
    }

    #[test]
    fn test_unknown_tag_is_dropped_with_diagnostic() {
        let graph = graph_of(&[("cmp-a", &[])]);
        let (groups, diagnostics) = place(&graph, &[&["cmp-a", "cmp-zz"]]);
        assert_eq!(groups, vec![vec!["cmp-a"]]);
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().expect("one diagnostic");
        assert_eq!(diagnostic.tag.as_deref(), Some("cmp-zz"));
    }

    #[test]
    fn test_tags_are_case_insensitive() {
        let graph = graph_of(&[("cmp-a", &[])]);
        let (groups, diagnostics) = place(&graph, &[&[" CMP-A "]]);
        assert!(diagnostics.is_empty());
        assert_eq!(groups, vec![vec!["cmp-a"]]);
    }

    #[test]
    fn test_no_bundles() {
        let graph = graph_of(&[("cmp-a", &[])]);
        let (groups, diagnostics) = place(&graph, &[]);
        assert!(groups.is_empty());
        assert!(diagnostics.is_empty());
    }
}
