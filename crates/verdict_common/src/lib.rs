//! Shared foundational types used across the verdict package cache.
//!
//! This crate provides the source-set and cache-key identity types and the
//! content hash recorded alongside cached package metadata.

#![warn(missing_docs)]

pub mod hash;
pub mod key;
pub mod source_set;

pub use hash::ContentHash;
pub use key::CacheKey;
pub use source_set::{SourceSet, SourceSetError};
