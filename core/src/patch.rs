//! Persists resolved identifiers back into the caller's own source.
//!
//! The export step ([`IdentifierMapping`]) and the text transform
//! ([`apply_mapping`]) are independent of when, or whether, a file gets
//! rewritten. [`persist`] glues them to the filesystem.

use crate::error::PatchError;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Ordered stale -> resolved identifier pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierMapping(BTreeMap<String, String>);

impl IdentifierMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stale_id: impl Into<String>, resolved_id: impl Into<String>) {
        self.0.insert(stale_id.into(), resolved_id.into());
    }

    pub fn get(&self, stale_id: &str) -> Option<&str> {
        self.0.get(stale_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json_pretty(&self) -> Result<String, PatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(contents: &str) -> Result<Self, PatchError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), PatchError> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|source| PatchError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_json(path: &Path) -> Result<Self, PatchError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Final target for `stale_id`, following chains such as `a -> b`,
    /// `b -> c` through to `c`. Every id that reaches a cycle ends at the
    /// lowest id on that cycle, so the cycle collapses to one literal.
    fn terminal<'a>(&'a self, stale_id: &'a str) -> Option<&'a str> {
        let mut path = vec![stale_id];
        let mut current = self.get(stale_id)?;
        loop {
            if let Some(start) = path.iter().position(|id| *id == current) {
                return path[start..].iter().min().copied();
            }
            match self.get(current) {
                Some(next) => {
                    path.push(current);
                    current = next;
                }
                None => return Some(current),
            }
        }
    }
}

impl FromIterator<(String, String)> for IdentifierMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The mapping was empty; the target was not touched.
    Skipped,
    /// Nothing in the target referenced a stale identifier.
    Unchanged,
    Patched { replacements: usize },
}

/// Replaces every `'stale'` and `"stale"` literal with the resolved id in
/// the same quote style.
///
/// Entries are composed to their final target first, so no replacement
/// produces a literal that another entry would rewrite again and the result
/// is stable under re-application.
pub fn apply_mapping(text: &str, mapping: &IdentifierMapping) -> String {
    substitute(text, mapping).0
}

fn substitute(text: &str, mapping: &IdentifierMapping) -> (String, usize) {
    let mut patched = text.to_string();
    let mut replacements = 0usize;
    for (stale, _) in mapping.iter() {
        let Some(resolved) = mapping.terminal(stale) else {
            continue;
        };
        if stale.is_empty() || resolved == stale {
            continue;
        }
        for quote in ['\'', '"'] {
            let from = format!("{quote}{stale}{quote}");
            let count = patched.matches(&from).count();
            if count > 0 {
                patched = patched.replace(&from, &format!("{quote}{resolved}{quote}"));
                replacements += count;
            }
        }
    }
    (patched, replacements)
}

/// Rewrites `path` in place with `mapping` applied.
///
/// Must only run once every resolution for the run has settled. An empty
/// mapping neither reads nor writes the target.
pub fn persist(mapping: &IdentifierMapping, path: &Path) -> Result<PatchOutcome, PatchError> {
    if mapping.is_empty() {
        return Ok(PatchOutcome::Skipped);
    }

    let io_error = |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    };
    let original = std::fs::read_to_string(path).map_err(io_error)?;
    let (patched, replacements) = substitute(&original, mapping);
    if replacements == 0 || patched == original {
        return Ok(PatchOutcome::Unchanged);
    }

    std::fs::write(path, patched).map_err(io_error)?;
    info!(
        path = %path.display(),
        replacements,
        "patched source with resolved identifiers"
    );
    Ok(PatchOutcome::Patched { replacements })
}
