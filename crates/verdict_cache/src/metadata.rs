//! The line-oriented `<key>.meta` sidecar format.
//!
//! ```text
//! timestamp=2026-10-16T09:30:00.123456789Z
//! handle=<base64>
//! files=a.dmn,b.dmn
//! hash.a.dmn=<xxh3-128 hex>
//! hash.b.dmn=<xxh3-128 hex>
//! content.a.dmn=<base64>
//! content.b.dmn=<base64>
//! ```
//!
//! `handle` repeats the contents of the `.pkg` file so a reader can tell
//! whether the two files came from the same write. `content.*` lines carry
//! the exact bytes used to validate the entry; a `hash.*` line that does not
//! match its content line marks the file as corrupt.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use verdict_common::{ContentHash, SourceSet};

use crate::compiler::PackageHandle;
use crate::disk::DiskEntry;
use crate::error::CacheError;
use crate::snapshot::SourceSnapshot;

const TIMESTAMP_KEY: &str = "timestamp";
const HANDLE_KEY: &str = "handle";
const FILES_KEY: &str = "files";
const HASH_PREFIX: &str = "hash.";
const CONTENT_PREFIX: &str = "content.";

/// Renders a handle and the snapshot it was built from as metadata text.
pub fn encode(handle: &PackageHandle, snapshot: &SourceSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{TIMESTAMP_KEY}={}\n",
        snapshot
            .timestamp()
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
    ));
    out.push_str(&format!("{HANDLE_KEY}={}\n", STANDARD.encode(handle.as_str())));
    out.push_str(&format!("{FILES_KEY}={}\n", snapshot.sources().join(",")));
    for (id, content) in snapshot.iter() {
        out.push_str(&format!(
            "{HASH_PREFIX}{id}={}\n",
            ContentHash::from_bytes(content)
        ));
    }
    for (id, content) in snapshot.iter() {
        out.push_str(&format!("{CONTENT_PREFIX}{id}={}\n", STANDARD.encode(content)));
    }
    out
}

/// Parses metadata text read from `path`.
///
/// Every listed file must have a `content.` line. A missing or empty
/// handle, extra content lines, a bad timestamp, bad base64 or a `hash.`
/// line that disagrees with its content make the entry corrupt.
pub fn decode(path: &Path, text: &str) -> Result<DiskEntry, CacheError> {
    let corrupt = |reason: String| CacheError::CorruptEntry {
        path: path.to_path_buf(),
        reason,
    };

    let mut properties: HashMap<&str, &str> = HashMap::new();
    for line in text.lines() {
        // Lines without '=' (or starting with it) are skipped.
        if let Some((k, v)) = line.split_once('=').filter(|(k, _)| !k.is_empty()) {
            properties.insert(k, v);
        }
    }

    let timestamp = properties
        .get(TIMESTAMP_KEY)
        .ok_or_else(|| corrupt("missing timestamp".to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| corrupt(format!("bad timestamp: {e}")))?
        .with_timezone(&Utc);

    let handle = properties
        .get(HANDLE_KEY)
        .ok_or_else(|| corrupt("missing handle".to_string()))?;
    let handle = STANDARD
        .decode(handle)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| corrupt("bad handle".to_string()))?;

    let files = properties
        .get(FILES_KEY)
        .ok_or_else(|| corrupt("missing files line".to_string()))?;
    let ids: Vec<&str> = if files.is_empty() {
        Vec::new()
    } else {
        files.split(',').collect()
    };
    let sources = SourceSet::new(ids).map_err(|e| corrupt(e.to_string()))?;

    let mut contents = BTreeMap::new();
    for (k, v) in &properties {
        let Some(id) = k.strip_prefix(CONTENT_PREFIX) else {
            continue;
        };
        let bytes = STANDARD
            .decode(v)
            .map_err(|e| corrupt(format!("bad content for {id}: {e}")))?;
        contents.insert(id.to_string(), bytes);
    }

    for (k, v) in &properties {
        let Some(id) = k.strip_prefix(HASH_PREFIX) else {
            continue;
        };
        let expected: ContentHash = v
            .parse()
            .map_err(|e| corrupt(format!("bad hash for {id}: {e}")))?;
        let actual = contents
            .get(id)
            .map(|c| ContentHash::from_bytes(c))
            .ok_or_else(|| corrupt(format!("hash line without content for {id}")))?;
        if expected != actual {
            return Err(corrupt(format!(
                "checksum mismatch for {id}: expected {expected}, got {actual}"
            )));
        }
    }

    let snapshot = SourceSnapshot::from_parts(sources, contents, timestamp)
        .ok_or_else(|| corrupt("content lines do not match files line".to_string()))?;
    Ok(DiskEntry {
        handle: PackageHandle::new(handle),
        snapshot,
    })
}
