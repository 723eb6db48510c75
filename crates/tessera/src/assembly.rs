//! Output assembly
//!
//! Checks the final groups against the graph and turns each one into an
//! [`EntryModule`] carrying what the bundler needs to emit it: a stable entry
//! key, the style modes to build and whether a scoped css build is required.

use std::path::PathBuf;

use anyhow::{Result, bail};
use log::debug;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    component_graph::ComponentGraph,
    entry_groups::EntryGroup,
    types::{ComponentId, ComponentRecord, EncapsulationMode},
};

/// Style mode used by components that do not name any
pub const DEFAULT_STYLE_MODE: &str = "$";

/// Prefix of every entry key
pub const ENTRY_KEY_PREFIX: &str = "entry:";

/// A component inside an [`EntryModule`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryModuleComponent {
    pub tag: String,
    /// Compiled output the bundler reads for this component
    pub source_path: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_of: Vec<String>,
}

/// One bundle to emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryModule {
    pub entry_key: String,
    pub components: Vec<EntryModuleComponent>,
    pub mode_names: Vec<String>,
    pub encapsulations: Vec<EncapsulationMode>,
    pub requires_scoped_styles: bool,
}

impl EntryModule {
    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.components.iter().map(|c| c.tag.as_str())
    }
}

/// `entry:` followed by the sorted tags joined with `.`
pub fn entry_key<'a>(tags: impl IntoIterator<Item = &'a str>) -> String {
    let mut tags: Vec<&str> = tags.into_iter().collect();
    tags.sort_unstable();
    format!("{ENTRY_KEY_PREFIX}{}", tags.join("."))
}

/// Style modes a bundle has to be built for
///
/// The default mode only survives when nothing else is named.
pub fn entry_mode_names<'a>(style_modes: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut modes: Vec<String> = style_modes.into_iter().map(str::to_owned).collect();
    modes.sort();
    modes.dedup();

    if modes.is_empty() {
        modes.push(DEFAULT_STYLE_MODE.to_owned());
    } else if modes.len() > 1 {
        modes.retain(|mode| mode != DEFAULT_STYLE_MODE);
    }
    modes
}

/// Distinct encapsulation modes of a bundle, sorted
///
/// A shadow component also needs the scoped build for browsers without
/// shadow dom support.
pub fn entry_encapsulations(
    modes: impl IntoIterator<Item = EncapsulationMode>,
) -> Vec<EncapsulationMode> {
    let mut encapsulations: Vec<EncapsulationMode> = modes.into_iter().collect();
    if encapsulations.is_empty() {
        encapsulations.push(EncapsulationMode::None);
    } else if encapsulations.contains(&EncapsulationMode::Shadow) {
        encapsulations.push(EncapsulationMode::Scoped);
    }
    encapsulations.sort();
    encapsulations.dedup();
    encapsulations
}

/// Fail unless every component is placed at most once and every authored
/// component is placed
pub fn validate_groups(graph: &ComponentGraph, groups: &[EntryGroup]) -> Result<()> {
    let mut placement: FxHashMap<ComponentId, usize> = FxHashMap::default();
    for (index, group) in groups.iter().enumerate() {
        for id in group.ids() {
            if let Some(previous) = placement.insert(id, index) {
                bail!(
                    "Component '{}' is placed in entry group {previous} and entry group {index}",
                    graph.tag(id)
                );
            }
        }
    }

    let missing: Vec<ComponentId> = graph
        .ids()
        .filter(|id| !graph.is_external(*id) && !placement.contains_key(id))
        .collect();
    if !missing.is_empty() {
        bail!(
            "Components missing from every entry group: {:?}",
            graph.tags_of(&missing)
        );
    }

    Ok(())
}

pub fn create_entry_module(graph: &ComponentGraph, group: &EntryGroup) -> EntryModule {
    let mut components: Vec<EntryModuleComponent> = group
        .components
        .iter()
        .map(|component| {
            let mut dependency_of = graph.tags_of(&component.dependency_of);
            dependency_of.sort();
            dependency_of.dedup();
            let record = &graph.node(component.id).record;
            EntryModuleComponent {
                tag: record.tag.clone(),
                source_path: record.source_path.clone(),
                dependency_of,
            }
        })
        .collect();
    components.sort_by(|a, b| a.tag.cmp(&b.tag));

    let records: Vec<&ComponentRecord> = group.ids().map(|id| &graph.node(id).record).collect();
    let mode_names = entry_mode_names(
        records
            .iter()
            .flat_map(|record| record.style_modes.iter().map(String::as_str)),
    );
    let encapsulations = entry_encapsulations(records.iter().map(|record| record.encapsulation));
    let requires_scoped_styles = encapsulations
        .iter()
        .any(|mode| mode.requires_scoped_styles());

    EntryModule {
        entry_key: entry_key(components.iter().map(|c| c.tag.as_str())),
        components,
        mode_names,
        encapsulations,
        requires_scoped_styles,
    }
}

/// Validate the final groups and build one entry module per group
pub fn assemble_entry_modules(
    graph: &ComponentGraph,
    groups: &[EntryGroup],
) -> Result<Vec<EntryModule>> {
    validate_groups(graph, groups)?;

    let entry_modules: Vec<EntryModule> = groups
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| create_entry_module(graph, group))
        .collect();
    for entry_module in &entry_modules {
        debug!(
            "{} modes={:?} scoped={}",
            entry_module.entry_key, entry_module.mode_names, entry_module.requires_scoped_styles
        );
    }
    Ok(entry_modules)
}
