//! Path confinement: every tool path must stay inside the project root.
//!
//! Resolution order:
//! 1. Empty input means the root itself.
//! 2. Relative input is joined onto the root; absolute input is taken as-is.
//! 3. The joined path is normalised lexically (`.` dropped, `..` pops).
//! 4. The deepest existing ancestor is canonicalised (symlinks resolved) and
//!    the not-yet-existing tail re-appended, so paths for new files work.
//! 5. The result must equal the root or be a component-wise descendant.

use std::path::{Component, Path, PathBuf};
use tether_core::ToolError;

/// Error returned when a path cannot be confined to the root.
#[derive(Debug, thiserror::Error)]
pub enum ConfinementError {
    #[error("Access denied: '{path}' resolves outside the project root {}", root.display())]
    AccessViolation { path: String, root: PathBuf },

    #[error("Failed to resolve '{path}': {source}")]
    Resolve {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfinementError> for ToolError {
    fn from(err: ConfinementError) -> Self {
        match err {
            ConfinementError::AccessViolation { path, root } => {
                ToolError::AccessViolation { path, root }
            }
            ConfinementError::Resolve { path, source } => ToolError::io(path, source),
        }
    }
}

/// Resolve `candidate` against `root` and reject anything that escapes it.
///
/// Returns the absolute, symlink-resolved path on success. The target does
/// not need to exist; only its deepest existing ancestor is resolved.
pub fn confine(candidate: &str, root: &Path) -> Result<PathBuf, ConfinementError> {
    let trimmed = candidate.trim();
    let trimmed = if trimmed.is_empty() { "." } else { trimmed };

    let root = root.canonicalize().map_err(|source| ConfinementError::Resolve {
        path: root.display().to_string(),
        source,
    })?;

    let requested = Path::new(trimmed);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let resolved = resolve_existing_prefix(&normalize(&joined), trimmed)?;

    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        tracing::warn!(path = trimmed, root = %root.display(), "Path escapes project root");
        Err(ConfinementError::AccessViolation {
            path: trimmed.to_string(),
            root,
        })
    }
}

/// Render `abs` relative to `root` with `/` separators; `.` for the root.
///
/// Paths outside the root are rendered as-is.
pub fn display_path(abs: &Path, root: &Path) -> String {
    let Ok(rel) = abs.strip_prefix(root) else {
        return abs.display().to_string();
    };
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Lexical normalisation. `..` at the filesystem root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn resolve_existing_prefix(path: &Path, original: &str) -> Result<PathBuf, ConfinementError> {
    for ancestor in path.ancestors() {
        match std::fs::symlink_metadata(ancestor) {
            Ok(_) => {
                // A dangling symlink fails here instead of being treated as a
                // missing tail that a later write would follow.
                let canonical =
                    ancestor
                        .canonicalize()
                        .map_err(|source| ConfinementError::Resolve {
                            path: original.to_string(),
                            source,
                        })?;
                let tail = path.strip_prefix(ancestor).unwrap_or(Path::new(""));
                return Ok(if tail.as_os_str().is_empty() {
                    canonical
                } else {
                    canonical.join(tail)
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(ConfinementError::Resolve {
                    path: original.to_string(),
                    source,
                });
            }
        }
    }
    Ok(path.to_path_buf())
}
