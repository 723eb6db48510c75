//! Project configuration loaded from `tessera.toml`
//!
//! ## Example
//!
//! ```toml
//! root-document = "src/index.html"
//!
//! [[bundles]]
//! components = ["app-home", "app-profile"]
//!
//! [[components]]
//! tag = "app-home"
//! source = "build/app-home.js"
//! encapsulation = "shadow"
//! style-modes = ["ios", "md"]
//!
//! [[components]]
//! tag = "ion-icon"
//! source = "node_modules/ionicons/ion-icon.js"
//! external = true
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cow_utils::CowUtils;
use log::debug;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::types::{ComponentRecord, EncapsulationMode, PlannerConfig};

/// Default config file name looked up by the CLI
pub const CONFIG_FILE_NAME: &str = "tessera.toml";

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Config file this was loaded from
    pub source: Option<PathBuf>,
    /// Directory relative paths are resolved against
    pub root_dir: PathBuf,
    pub root_document: Option<PathBuf>,
    pub bundles: Vec<Vec<String>>,
    pub components: Vec<ComponentRecord>,
}

/// Raw config as deserialized from TOML
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    root_document: Option<String>,
    #[serde(default)]
    bundles: Vec<RawBundle>,
    #[serde(default)]
    components: Vec<RawComponent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawBundle {
    #[serde(default)]
    components: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawComponent {
    tag: String,
    source: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    encapsulation: EncapsulationMode,
    #[serde(default)]
    style_modes: Vec<String>,
    #[serde(default)]
    external: bool,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let root_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = Self::from_toml_str(&content, &root_dir)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        debug!(
            "Loaded {} components and {} bundles from {}",
            config.components.len(),
            config.bundles.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate config text, resolving paths against `root_dir`
    pub fn from_toml_str(content: &str, root_dir: &Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content).context("Failed to parse TOML")?;
        let mut config = Self::from_raw(raw, root_dir);
        config.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawConfig, root_dir: &Path) -> Self {
        let resolve = |path: &str| {
            let path = Path::new(path);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                root_dir.join(path)
            }
        };

        Self {
            source: None,
            root_dir: root_dir.to_path_buf(),
            root_document: raw.root_document.as_deref().map(resolve),
            bundles: raw.bundles.into_iter().map(|b| b.components).collect(),
            components: raw
                .components
                .into_iter()
                .map(|c| ComponentRecord {
                    source_path: resolve(&c.source),
                    tag: c.tag,
                    dependencies: c.dependencies,
                    encapsulation: c.encapsulation,
                    style_modes: c.style_modes,
                    is_external: c.external,
                })
                .collect(),
        }
    }

    /// Lower-case every tag and reject empty or duplicate component tags
    pub fn validate(&mut self) -> Result<()> {
        normalize_component_tags(&mut self.components)?;
        for bundle in &mut self.bundles {
            for tag in bundle.iter_mut() {
                *tag = normalize_tag(tag);
            }
        }
        Ok(())
    }

    pub fn to_planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            user_bundle_groups: self.bundles.clone(),
            root_document_path: self.root_document.clone(),
            known_components: self.components.clone(),
        }
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().cow_to_lowercase().into_owned()
}

/// Lower-case component tags and declared dependencies in place
///
/// Fails on an empty tag or on two components sharing a tag.
pub fn normalize_component_tags(components: &mut [ComponentRecord]) -> Result<()> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    for component in components.iter_mut() {
        component.tag = normalize_tag(&component.tag);
        if component.tag.is_empty() {
            bail!(
                "Component with source {} has an empty tag",
                component.source_path.display()
            );
        }
        if !seen.insert(component.tag.clone()) {
            bail!("Component tag \"{}\" is declared more than once", component.tag);
        }
        for dependency in &mut component.dependencies {
            *dependency = normalize_tag(dependency);
        }
        component.dependencies.retain(|dep| !dep.is_empty());
    }
    Ok(())
}
