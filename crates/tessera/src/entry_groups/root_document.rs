//! Tier 2: the root document's group
//!
//! If the app has a root html document, every component it uses (directly or
//! through other components) is bundled together, minus anything the user
//! already placed.

use anyhow::Result;
use log::debug;

use super::{EntryComponent, GroupSet};
use crate::component_graph::{ClosureCache, ComponentGraph};

pub fn add_root_document_group(
    graph: &ComponentGraph,
    groups: &mut GroupSet,
    cache: &mut ClosureCache,
) -> Result<()> {
    let root_tags = graph.root_tags();
    if root_tags.is_empty() {
        return Ok(());
    }

    let closure = cache.closure_of_many(graph, root_tags)?;
    let mut members: Vec<_> = closure
        .into_iter()
        .filter(|id| !groups.is_placed(*id))
        .collect();
    members.sort();

    debug!(
        "Root document group: {:?}",
        graph.tags_of(&members)
    );
    groups.push_group(members.into_iter().map(EntryComponent::new).collect())
}
