//! Recoverable problems collected while planning a build
//!
//! Anything that only affects part of the result (an unknown tag in a user
//! bundle, a source file that cannot be read) is recorded here and returned
//! next to the entry groups. Problems that make the result unusable are
//! returned as `anyhow::Error` instead.

use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    /// Tag the diagnostic is about, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// File the diagnostic is about, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.level, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({})", file.display())?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics for a single build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::log!(
            match diagnostic.level {
                DiagnosticLevel::Warning => log::Level::Warn,
                DiagnosticLevel::Error => log::Level::Error,
            },
            "{diagnostic}"
        );
        self.entries.push(diagnostic);
    }

    /// A user bundle names a tag that no known component has
    pub fn unknown_bundle_tag(&mut self, tag: &str, bundle_index: usize, bundle: &[String]) {
        self.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: format!(
                "Component tag \"{tag}\" is defined in bundle #{} [{}] but no matching \
                 component was found within this app or its collections.",
                bundle_index + 1,
                bundle.join(", ")
            ),
            tag: Some(tag.to_owned()),
            file: None,
        });
    }

    /// A component's declared dependencies name a tag that no known component has
    pub fn unknown_dependency(&mut self, component: &str, dependency: &str) {
        self.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message: format!(
                "Component \"{component}\" declares a dependency on \"{dependency}\", \
                 which is not a known component; the dependency is ignored."
            ),
            tag: Some(component.to_owned()),
            file: None,
        });
    }

    /// A source file could not be read during the scan phase
    pub fn unreadable_source(&mut self, tag: Option<&str>, path: &Path, error: &std::io::Error) {
        let message = match tag {
            Some(tag) => format!(
                "Unable to read compiled output of component \"{tag}\": {error}. The component \
                 is excluded from this build."
            ),
            None => format!("Unable to read root document: {error}"),
        };
        self.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message,
            tag: tag.map(str::to_owned),
            file: Some(path.to_path_buf()),
        });
    }

    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
