//! Exact source snapshots used to decide whether a disk entry is stale.
//!
//! Validation compares full content byte for byte. Timestamps and hashes
//! are recorded for diagnostics only.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use verdict_common::{ContentHash, SourceSet};

use crate::compiler::SourceUnit;
use crate::error::SourceError;
use crate::provider::SourceProvider;

/// Raw content of every source in a [`SourceSet`] at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    sources: SourceSet,
    contents: BTreeMap<String, Vec<u8>>,
    timestamp: DateTime<Utc>,
}

impl SourceSnapshot {
    /// Reads every source in `sources` through `provider`.
    ///
    /// Fails on the first source that cannot be read.
    pub fn capture<P>(provider: &P, sources: &SourceSet) -> Result<Self, SourceError>
    where
        P: SourceProvider + ?Sized,
    {
        let mut contents = BTreeMap::new();
        for id in sources {
            contents.insert(id.clone(), provider.read(id)?);
        }
        Ok(Self {
            sources: sources.clone(),
            contents,
            timestamp: Utc::now(),
        })
    }

    /// Reassembles a snapshot from stored parts.
    ///
    /// Returns `None` unless `contents` has exactly one entry per member of
    /// `sources`.
    pub fn from_parts(
        sources: SourceSet,
        contents: BTreeMap<String, Vec<u8>>,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let matches = contents.len() == sources.len()
            && sources.iter().all(|id| contents.contains_key(id));
        matches.then_some(Self {
            sources,
            contents,
            timestamp,
        })
    }

    /// Checks this stored snapshot against the live sources.
    ///
    /// Valid only if the source sets are equal and every stored content
    /// equals what `provider` returns now. Any read failure makes the
    /// snapshot invalid.
    pub fn is_valid<P>(&self, provider: &P, requested: &SourceSet) -> bool
    where
        P: SourceProvider + ?Sized,
    {
        if &self.sources != requested {
            tracing::debug!(stored = %self.sources, %requested, "snapshot source set differs");
            return false;
        }
        for (id, stored) in &self.contents {
            match provider.read(id) {
                Ok(current) if current == *stored => {}
                Ok(_) => {
                    tracing::debug!(source = %id, "source content changed");
                    return false;
                }
                Err(e) => {
                    tracing::debug!(source = %id, error = %e, "source unreadable during validation");
                    return false;
                }
            }
        }
        true
    }

    /// The source set this snapshot covers.
    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// When the snapshot was captured.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Stored content of one source.
    pub fn content(&self, id: &str) -> Option<&[u8]> {
        self.contents.get(id).map(Vec::as_slice)
    }

    /// Diagnostic hash of one source's stored content.
    pub fn content_hash(&self, id: &str) -> Option<ContentHash> {
        self.content(id).map(ContentHash::from_bytes)
    }

    /// Iterates `(id, content)` in sorted identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.contents
            .iter()
            .map(|(id, content)| (id.as_str(), content.as_slice()))
    }

    /// Converts the snapshot into compiler input, in sorted order.
    pub fn to_units(&self) -> Vec<SourceUnit> {
        self.iter()
            .map(|(id, content)| SourceUnit {
                id: id.to_string(),
                content: content.to_vec(),
            })
            .collect()
    }
}
