//! Planning pipeline
//!
//! Runs the stages in order, each one consuming the previous stage's output:
//!
//! 1. Scan component sources and the root document into a [`ComponentGraph`]
//! 2. Group components into entry groups (user bundles, root document,
//!    common-dependency factoring)
//! 3. Split groups that mix encapsulation modes
//! 4. Validate the groups and build the entry modules

use std::time::Instant;

use anyhow::Result;
use log::{debug, info};
use serde::Serialize;

use crate::{
    abort::AbortSignal,
    assembly::{EntryModule, assemble_entry_modules},
    component_graph::{ClosureCache, ComponentGraph},
    config::normalize_component_tags,
    diagnostics::Diagnostics,
    encapsulation::partition_by_encapsulation,
    entry_groups::plan_entry_groups,
    graph_builder::GraphBuilder,
    source_provider::SourceProviderRef,
    types::PlannerConfig,
};

/// Result of planning one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundlePlan {
    pub entry_modules: Vec<EntryModule>,
    pub diagnostics: Diagnostics,
}

impl BundlePlan {
    /// Tags of every entry module, in output order
    pub fn entry_tags(&self) -> Vec<Vec<String>> {
        self.entry_modules
            .iter()
            .map(|entry_module| entry_module.tags().map(str::to_owned).collect())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Plans entry modules for a build
#[derive(Debug, Clone)]
pub struct BundlePlanner {
    provider: SourceProviderRef,
    abort: AbortSignal,
}

impl BundlePlanner {
    pub fn new(provider: SourceProviderRef) -> Self {
        Self {
            provider,
            abort: AbortSignal::new(),
        }
    }

    /// Use a signal shared with the host build
    #[must_use]
    pub fn with_abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Handle the host can use to abort a running plan
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Plan the entry modules for `config`
    ///
    /// Recoverable problems are returned in [`BundlePlan::diagnostics`]. An
    /// error means the build was aborted, the component tags are invalid, or
    /// an internal invariant broke; no partial plan is returned then.
    pub fn plan(&self, mut config: PlannerConfig) -> Result<BundlePlan> {
        let start = Instant::now();
        info!(
            "Planning entry modules for {} components",
            config.known_components.len()
        );

        normalize_component_tags(&mut config.known_components)?;
        let mut diagnostics = Diagnostics::new();

        let graph = GraphBuilder::new(self.provider.as_ref(), &self.abort).build(
            config.known_components,
            config.root_document_path.as_deref(),
            &mut diagnostics,
        )?;
        debug!("Scan phase finished in {:?}", start.elapsed());

        let entry_modules = self.plan_graph(&graph, &config.user_bundle_groups, &mut diagnostics)?;

        info!(
            "Planned {} entry modules with {} diagnostics in {:?}",
            entry_modules.len(),
            diagnostics.len(),
            start.elapsed()
        );
        Ok(BundlePlan {
            entry_modules,
            diagnostics,
        })
    }

    /// Everything after the scan phase
    pub fn plan_graph(
        &self,
        graph: &ComponentGraph,
        user_bundle_groups: &[Vec<String>],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EntryModule>> {
        let mut cache = ClosureCache::new();
        let groups = plan_entry_groups(graph, user_bundle_groups, &mut cache, diagnostics)?;
        debug!(
            "Grouping computed {} closures for {} groups",
            cache.len(),
            groups.len()
        );
        self.abort.check()?;

        let groups = partition_by_encapsulation(graph, groups);
        assemble_entry_modules(graph, &groups)
    }
}
