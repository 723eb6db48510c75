//! Shared type definitions for the tessera crate
//!
//! These types are used by every stage of the planner, from the tag scanner
//! through output assembly, and are kept here to avoid circular module
//! dependencies.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Index of a component inside a [`ComponentGraph`](crate::component_graph::ComponentGraph)
///
/// Ids are assigned in ascending tag order, so sorting ids sorts tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u32);

impl ComponentId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value of the ComponentId
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Style isolation strategy a component needs at load time
///
/// The declaration order doubles as the tie-break preference of the
/// encapsulation partitioner: the mode needing the least runtime machinery
/// comes first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum EncapsulationMode {
    /// Styles are attached globally
    #[default]
    None,
    /// Styles are rewritten with scope selectors
    #[serde(alias = "scoped-css", alias = "scoped-style")]
    Scoped,
    /// Styles live inside a shadow root
    #[serde(alias = "shadow-dom", alias = "shadow-isolated")]
    Shadow,
}

impl EncapsulationMode {
    pub const ALL: [Self; 3] = [Self::None, Self::Scoped, Self::Shadow];

    /// Whether a bundle holding this mode needs the scoped css build
    pub fn requires_scoped_styles(self) -> bool {
        matches!(self, Self::Scoped | Self::Shadow)
    }
}

impl std::fmt::Display for EncapsulationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Scoped => write!(f, "scoped"),
            Self::Shadow => write!(f, "shadow"),
        }
    }
}

/// A component known to the build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentRecord {
    /// Lower-cased tag name, unique across the build
    pub tag: String,
    /// Path of the compiled output that gets scanned for references
    pub source_path: PathBuf,
    /// Tags listed in the component's own metadata
    pub dependencies: Vec<String>,
    pub encapsulation: EncapsulationMode,
    /// Style modes shipped by the component, empty means the default mode only
    pub style_modes: Vec<String>,
    /// Pulled in from an external collection rather than authored here
    pub is_external: bool,
}

impl ComponentRecord {
    pub fn new(tag: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            tag: tag.into(),
            source_path: source_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_encapsulation(mut self, encapsulation: EncapsulationMode) -> Self {
        self.encapsulation = encapsulation;
        self
    }

    #[must_use]
    pub fn with_style_modes<I, S>(mut self, style_modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.style_modes = style_modes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }
}

/// Everything the planner needs from the build configuration
#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    /// User-declared bundles, in declaration order
    pub user_bundle_groups: Vec<Vec<String>>,
    /// Root html document whose tags are always bundled together
    pub root_document_path: Option<PathBuf>,
    pub known_components: Vec<ComponentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encapsulation_tie_break_order() {
        let mut modes = vec![
            EncapsulationMode::Shadow,
            EncapsulationMode::None,
            EncapsulationMode::Scoped,
        ];
        modes.sort();
        assert_eq!(modes, EncapsulationMode::ALL.to_vec());
    }

    #[test]
    fn test_encapsulation_requires_scoped_styles() {
        assert!(!EncapsulationMode::None.requires_scoped_styles());
        assert!(EncapsulationMode::Scoped.requires_scoped_styles());
        assert!(EncapsulationMode::Shadow.requires_scoped_styles());
    }
}
