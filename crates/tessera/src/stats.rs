//! Build stats manifest
//!
//! A JSON summary of the planned entries and bundles, written next to the
//! build output for tooling that wants to inspect how components were split.

use std::path::Path;

use anyhow::{Context, Result};
use cow_utils::CowUtils;
use serde::Serialize;

use crate::{
    assembly::{DEFAULT_STYLE_MODE, EntryModule},
    diagnostics::Diagnostics,
    orchestrator::BundlePlan,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerInfo {
    pub name: String,
    pub version: String,
}

impl Default for CompilerInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsComponent {
    pub tag: String,
    pub dependency_of: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsFile {
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBundle {
    pub components: Vec<String>,
    pub input_files: Vec<StatsFile>,
    /// Only present when the bundle ships something other than the default mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub compiler: CompilerInfo,
    pub entries: Vec<Vec<StatsComponent>>,
    pub bundles: Vec<StatsBundle>,
    pub diagnostics: Diagnostics,
}

impl BuildStats {
    /// Summarize a plan; input files are made relative to `root_dir` when given
    pub fn new(
        entry_modules: &[EntryModule],
        diagnostics: &Diagnostics,
        root_dir: Option<&Path>,
    ) -> Self {
        let mut entries: Vec<Vec<StatsComponent>> = entry_modules
            .iter()
            .map(|entry_module| {
                let mut components: Vec<StatsComponent> = entry_module
                    .components
                    .iter()
                    .map(|component| StatsComponent {
                        tag: component.tag.clone(),
                        dependency_of: component.dependency_of.clone(),
                    })
                    .collect();
                components.sort_by(|a, b| a.tag.cmp(&b.tag));
                components
            })
            .collect();
        entries.sort_by(|a, b| {
            let first = |entry: &[StatsComponent]| entry.first().map(|c| c.tag.clone());
            first(a).cmp(&first(b))
        });

        let bundles = entry_modules
            .iter()
            .map(|entry_module| {
                let mut components: Vec<String> = entry_module.tags().map(str::to_owned).collect();
                components.sort();

                let mut input_files: Vec<StatsFile> = entry_module
                    .components
                    .iter()
                    .map(|component| StatsFile {
                        file_path: display_path(&component.source_path, root_dir),
                    })
                    .collect();
                input_files.sort_by(|a, b| a.file_path.cmp(&b.file_path));

                let modes = &entry_module.mode_names;
                let modes = (modes.len() > 1
                    || modes.first().is_some_and(|mode| mode != DEFAULT_STYLE_MODE))
                .then(|| {
                    let mut modes = modes.clone();
                    modes.sort();
                    modes
                });

                StatsBundle {
                    components,
                    input_files,
                    modes,
                }
            })
            .collect();

        Self {
            compiler: CompilerInfo::default(),
            entries,
            bundles,
            diagnostics: diagnostics.clone(),
        }
    }

    /// Stats for a finished plan, or `None` when the plan reported errors
    pub fn for_plan(plan: &BundlePlan, root_dir: Option<&Path>) -> Option<Self> {
        if plan.has_errors() {
            return None;
        }
        Some(Self::new(&plan.entry_modules, &plan.diagnostics, root_dir))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize build stats")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write build stats to {}", path.display()))
    }
}

/// Forward-slash path, relative to `root_dir` when it is a prefix
fn display_path(path: &Path, root_dir: Option<&Path>) -> String {
    let relative = root_dir
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    relative
        .to_string_lossy()
        .cow_replace('\\', "/")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use insta::{assert_snapshot, with_settings};

    use super::*;
    use crate::{
        assembly::EntryModuleComponent,
        diagnostics::{Diagnostic, DiagnosticLevel},
        types::EncapsulationMode,
    };

    fn component(tag: &str, dependency_of: &[&str]) -> EntryModuleComponent {
        EntryModuleComponent {
            tag: tag.to_owned(),
            source_path: PathBuf::from(format!("/proj/build/{tag}.js")),
            dependency_of: dependency_of.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    fn sample_modules() -> Vec<EntryModule> {
        vec![
            EntryModule {
                entry_key: "entry:cmp-icon".to_owned(),
                components: vec![component("cmp-icon", &[])],
                mode_names: vec!["ios".to_owned(), "md".to_owned()],
                encapsulations: vec![EncapsulationMode::Scoped, EncapsulationMode::Shadow],
                requires_scoped_styles: true,
            },
            EntryModule {
                entry_key: "entry:app-root.cmp-card".to_owned(),
                components: vec![component("app-root", &[]), component("cmp-card", &["app-root"])],
                mode_names: vec![DEFAULT_STYLE_MODE.to_owned()],
                encapsulations: vec![EncapsulationMode::None],
                requires_scoped_styles: false,
            },
        ]
    }

    #[test]
    fn test_build_stats_json() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message: "Unknown dependency".to_owned(),
            tag: Some("cmp-card".to_owned()),
            file: None,
        });

        let stats = BuildStats::new(&sample_modules(), &diagnostics, Some(Path::new("/proj")));
        let json = stats.to_json().expect("serializes");

        with_settings!({filters => vec![(r#""version": "[^"]+""#, r#""version": "[version]""#)]}, {
            assert_snapshot!(json, @r#"
            {
              "compiler": {
                "name": "tessera",
                "version": "[version]"
              },
              "entries": [
                [
                  {
                    "tag": "app-root",
                    "dependencyOf": []
                  },
                  {
                    "tag": "cmp-card",
                    "dependencyOf": [
                      "app-root"
                    ]
                  }
                ],
                [
                  {
                    "tag": "cmp-icon",
                    "dependencyOf": []
                  }
                ]
              ],
              "bundles": [
                {
                  "components": [
                    "cmp-icon"
                  ],
                  "inputFiles": [
                    {
                      "filePath": "build/cmp-icon.js"
                    }
                  ],
                  "modes": [
                    "ios",
                    "md"
                  ]
                },
                {
                  "components": [
                    "app-root",
                    "cmp-card"
                  ],
                  "inputFiles": [
                    {
                      "filePath": "build/app-root.js"
                    },
                    {
                      "filePath": "build/cmp-card.js"
                    }
                  ]
                }
              ],
              "diagnostics": [
                {
                  "level": "warning",
                  "message": "Unknown dependency",
                  "tag": "cmp-card"
                }
              ]
            }
            "#);
        });
    }

    #[test]
    fn test_write_stats_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stats.json");
        let stats = BuildStats::new(&sample_modules(), &Diagnostics::new(), None);
        stats.write(&path).expect("stats written");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("readable"))
                .expect("valid json");
        assert_eq!(written["bundles"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            written["bundles"][1]["inputFiles"][0]["filePath"],
            "/proj/build/app-root.js"
        );
    }

    #[test]
    fn test_no_stats_for_failed_plan() {
        let mut plan = BundlePlan {
            entry_modules: sample_modules(),
            diagnostics: Diagnostics::new(),
        };
        plan.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message: "Unknown dependency".to_owned(),
            tag: Some("cmp-card".to_owned()),
            file: None,
        });
        let stats = BuildStats::for_plan(&plan, None).expect("warnings do not block stats");
        assert_eq!(stats.bundles.len(), 2);

        plan.diagnostics.unknown_bundle_tag("cmp-zz", 0, &["cmp-zz".to_owned()]);
        assert!(BuildStats::for_plan(&plan, None).is_none());
    }
}
