//! Dependency reference extraction.
//!
//! An [`Extractor`] turns a record's content into the raw reference strings
//! it declares, in source order. The engine resolves and normalizes them.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::warn;

use crate::error::InheritError;
use crate::record::Record;

type ExtractFn<R> = dyn Fn(&R) -> Vec<String> + Send + Sync;

/// Pattern- or function-driven reference extraction, chosen at construction.
pub enum Extractor<R> {
    /// Every match of the pattern contributes its first capture group.
    Pattern(Regex),
    /// Caller-supplied extraction over the full record.
    Function(Arc<ExtractFn<R>>),
}

impl<R: Record> Extractor<R> {
    /// Compile `pattern` into a pattern extractor.
    ///
    /// # Errors
    ///
    /// Returns [`InheritError::InvalidPattern`] if the expression does not
    /// compile.
    pub fn pattern(pattern: &str) -> Result<Self, InheritError> {
        let regex = Regex::new(pattern).map_err(|source| InheritError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::from_regex(regex))
    }

    /// Wrap an already compiled expression.
    ///
    /// Only the first capture group is read. An expression without one is
    /// accepted but never yields a reference.
    #[must_use]
    pub fn from_regex(regex: Regex) -> Self {
        // captures_len counts the implicit whole-match group.
        if regex.captures_len() < 2 {
            warn!(pattern = regex.as_str(), "extraction pattern has no capture group");
        }
        Self::Pattern(regex)
    }

    #[must_use]
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Raw references declared by `record`, in order.
    #[must_use]
    pub fn extract(&self, record: &R) -> Vec<String> {
        match self {
            Self::Pattern(regex) => {
                let text = String::from_utf8_lossy(record.contents());
                regex
                    .captures_iter(&text)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .collect()
            }
            Self::Function(f) => f(record),
        }
    }
}

impl<R> Clone for Extractor<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Pattern(regex) => Self::Pattern(regex.clone()),
            Self::Function(f) => Self::Function(Arc::clone(f)),
        }
    }
}

impl<R> fmt::Debug for Extractor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}
