//! Scan phase: turn component records and their compiled output into a
//! [`ComponentGraph`]
//!
//! Every component's source is read and scanned on the rayon pool, together
//! with the root document. Results are joined before the graph is built, so
//! later stages never see a partial graph. A component whose source cannot be
//! read is reported and left out of this build.

use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::Result;
use log::{debug, info};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    abort::AbortSignal,
    component_graph::ComponentGraph,
    diagnostics::Diagnostics,
    source_provider::SourceProvider,
    tag_scanner::NormalizedText,
    types::ComponentRecord,
};

/// Outcome of reading and scanning a single component
#[derive(Debug)]
enum ComponentScan {
    Found { tag: String, tags: Vec<String> },
    Unreadable { tag: String, path: PathBuf, error: io::Error },
}

/// Builds the component graph for one build
#[derive(Debug)]
pub struct GraphBuilder<'a> {
    provider: &'a dyn SourceProvider,
    abort: &'a AbortSignal,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(provider: &'a dyn SourceProvider, abort: &'a AbortSignal) -> Self {
        Self { provider, abort }
    }

    /// Scan every component and the optional root document, then build the graph
    ///
    /// Fails only when the build is aborted; unreadable files become diagnostics.
    pub fn build(
        &self,
        records: Vec<ComponentRecord>,
        root_document: Option<&Path>,
        diagnostics: &mut Diagnostics,
    ) -> Result<ComponentGraph> {
        let mut all_tags: Vec<&str> = records.iter().map(|r| r.tag.as_str()).collect();
        all_tags.sort_unstable();

        info!(
            "Scanning {} components{}",
            records.len(),
            if root_document.is_some() {
                " and the root document"
            } else {
                ""
            }
        );

        let (scans, root_scan) = rayon::join(
            || {
                records
                    .par_iter()
                    .map(|record| self.scan_component(record, &all_tags))
                    .collect::<Result<Vec<_>>>()
            },
            || {
                root_document
                    .map(|path| self.scan_file(path, &all_tags, None))
                    .transpose()
            },
        );
        // Any abort discards everything scanned so far
        let scans = scans?;
        let root_scan = root_scan?;
        self.abort.check()?;

        let mut scanned: FxHashMap<String, Vec<String>> = FxHashMap::default();
        let mut excluded: FxHashSet<String> = FxHashSet::default();
        for scan in scans {
            match scan {
                ComponentScan::Found { tag, tags } => {
                    debug!("Component '{tag}' references {tags:?}");
                    scanned.insert(tag, tags);
                }
                ComponentScan::Unreadable { tag, path, error } => {
                    diagnostics.unreadable_source(Some(&tag), &path, &error);
                    excluded.insert(tag);
                }
            }
        }

        let root_tags = match (root_document, root_scan) {
            (Some(path), Some(Err(error))) => {
                diagnostics.unreadable_source(None, path, &error);
                Vec::new()
            }
            (_, Some(Ok(tags))) => tags,
            _ => Vec::new(),
        };
        debug!("Root document references {root_tags:?}");

        let records: Vec<ComponentRecord> = records
            .into_iter()
            .filter(|record| !excluded.contains(&record.tag))
            .map(|mut record| {
                record.dependencies.retain(|dep| !excluded.contains(dep));
                record
            })
            .collect();

        let graph = ComponentGraph::build(records, &scanned, &root_tags, diagnostics)?;

        for cycle in graph.find_cycles() {
            debug!("Circular component references: {:?}", graph.tags_of(&cycle));
        }

        Ok(graph)
    }

    fn scan_component(&self, record: &ComponentRecord, all_tags: &[&str]) -> Result<ComponentScan> {
        Ok(
            match self.scan_file(&record.source_path, all_tags, Some(&record.tag))? {
                Ok(tags) => ComponentScan::Found {
                    tag: record.tag.clone(),
                    tags,
                },
                Err(error) => ComponentScan::Unreadable {
                    tag: record.tag.clone(),
                    path: record.source_path.clone(),
                    error,
                },
            },
        )
    }

    /// Read one file and return the known tags it references, minus `own_tag`
    ///
    /// The outer result carries aborts, the inner one read failures.
    fn scan_file(
        &self,
        path: &Path,
        all_tags: &[&str],
        own_tag: Option<&str>,
    ) -> Result<io::Result<Vec<String>>> {
        self.abort.check()?;

        let text = match self.provider.read_text(path) {
            Ok(text) => text,
            Err(error) => return Ok(Err(error)),
        };
        if text.is_empty() {
            return Ok(Ok(Vec::new()));
        }

        let normalized = NormalizedText::new(&text);
        let tags = all_tags
            .iter()
            .filter(|tag| Some(**tag) != own_tag)
            .filter(|tag| normalized.references(tag))
            .map(|tag| (*tag).to_owned())
            .collect();
        Ok(Ok(tags))
    }
}
