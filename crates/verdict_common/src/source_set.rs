//! The set of decision-model sources compiled together into one package.

use std::fmt;

/// Characters that would break the line-oriented metadata format.
const RESERVED_CHARS: [char; 4] = [',', '=', '\n', '\r'];

/// Errors produced when building a [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceSetError {
    /// An identifier was the empty string.
    #[error("source identifier must not be empty")]
    EmptyIdentifier,

    /// An identifier contained a character reserved by the metadata format.
    #[error("source identifier '{id}' contains reserved character {ch:?}")]
    ReservedCharacter {
        /// The offending identifier.
        id: String,
        /// The reserved character found in it.
        ch: char,
    },
}

/// A sorted, deduplicated set of logical source identifiers.
///
/// The identity of a cached package is defined entirely by this set, so two
/// sets built from the same identifiers in any order compare equal and
/// iterate in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceSet(Vec<String>);

impl SourceSet {
    /// Builds a source set from identifiers in any order.
    ///
    /// Duplicates are collapsed. Identifiers must be non-empty and must not
    /// contain `,`, `=` or line breaks.
    pub fn new<I, S>(ids: I) -> Result<Self, SourceSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        for id in &ids {
            validate_identifier(id)?;
        }
        ids.sort();
        ids.dedup();
        Ok(Self(ids))
    }

    /// Builds a one-element source set.
    pub fn single(id: impl Into<String>) -> Result<Self, SourceSetError> {
        Self::new([id.into()])
    }

    /// Returns the identifiers in sorted order.
    pub fn ids(&self) -> &[String] {
        &self.0
    }

    /// Iterates over the identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns `true` if `id` is a member of the set.
    pub fn contains(&self, id: &str) -> bool {
        self.0.binary_search_by(|candidate| candidate.as_str().cmp(id)).is_ok()
    }

    /// Number of identifiers in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no identifiers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins the identifiers with `sep` in sorted order.
    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

fn validate_identifier(id: &str) -> Result<(), SourceSetError> {
    if id.is_empty() {
        return Err(SourceSetError::EmptyIdentifier);
    }
    if let Some(ch) = id.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(SourceSetError::ReservedCharacter {
            id: id.to_string(),
            ch,
        });
    }
    Ok(())
}

impl fmt::Display for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
