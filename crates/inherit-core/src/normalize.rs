//! Identity keys and the path normalizers that produce them.
//!
//! Every key the engine touches (primary records, reference targets, and
//! emission lookups) passes through the same [`PathNormalizer`]. Mixing
//! normalizers silently disconnects graph edges.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

// ---------------------------------------------------------------------------
// IdentityKey
// ---------------------------------------------------------------------------

/// Canonical name of a logical record, stable across batches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory portion of the key, used as the base for relative references.
    #[must_use]
    pub fn parent_dir(&self) -> &Path {
        Path::new(&self.0).parent().unwrap_or_else(|| Path::new(""))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for IdentityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdentityKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for IdentityKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// ---------------------------------------------------------------------------
// PathNormalizer
// ---------------------------------------------------------------------------

type NormalizeFn = dyn Fn(&str) -> String + Send + Sync;

/// Maps a raw location string to an [`IdentityKey`].
///
/// All variants are pure: the absolute variant captures its base directory
/// once, so later changes of the process working directory do not move keys.
#[derive(Clone)]
pub enum PathNormalizer {
    /// Lexical absolute-path resolution against `base`.
    Absolute { base: PathBuf },
    /// File name only, with any leading characters in `strip` trimmed.
    Basename { strip: String },
    /// Caller-supplied mapping.
    Custom(Arc<NormalizeFn>),
}

impl PathNormalizer {
    /// Absolute resolution against the current working directory.
    #[must_use]
    pub fn absolute() -> Self {
        Self::absolute_from(working_dir())
    }

    #[must_use]
    pub fn absolute_from(base: impl Into<PathBuf>) -> Self {
        Self::Absolute { base: base.into() }
    }

    #[must_use]
    pub fn basename(strip: impl Into<String>) -> Self {
        Self::Basename {
            strip: strip.into(),
        }
    }

    #[must_use]
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Normalize `raw` into its identity key.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> IdentityKey {
        match self {
            Self::Absolute { base } => {
                IdentityKey(resolve_lexically(base, Path::new(raw)).to_string_lossy().into_owned())
            }
            Self::Basename { strip } => {
                let name = Path::new(raw)
                    .file_name()
                    .map_or_else(|| raw.to_string(), |n| n.to_string_lossy().into_owned());
                let trimmed = name.trim_start_matches(|c: char| strip.contains(c));
                IdentityKey(trimmed.to_string())
            }
            Self::Custom(f) => IdentityKey(f(raw)),
        }
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::absolute()
    }
}

impl fmt::Debug for PathNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute { base } => f.debug_struct("Absolute").field("base", base).finish(),
            Self::Basename { strip } => f.debug_struct("Basename").field("strip", strip).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexical path helpers
// ---------------------------------------------------------------------------

/// The process working directory, or the filesystem root when it is unavailable.
pub(crate) fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "working directory unavailable, resolving against root");
        PathBuf::from(std::path::MAIN_SEPARATOR_STR)
    })
}

/// Resolve `path` against `base` and fold `.`/`..` without touching the filesystem.
///
/// Absolute paths ignore `base`.
#[must_use]
pub fn resolve_lexically(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        clean(path)
    } else {
        clean(&base.join(path))
    }
}

/// Fold `.` and `..` components. `..` at the root is dropped; leading `..` in
/// a relative path is kept.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
