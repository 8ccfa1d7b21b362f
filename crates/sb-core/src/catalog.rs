//! The media catalog: entries, ordering, and the shared store.
//!
//! An entry's externally visible ID is its 1-based position in the current
//! ordering, so IDs always form the contiguous range `[1, N]`. Sorting or
//! removing entries renumbers everything after the affected position.
//!
//! [`CatalogStore`] is shared across request handlers. Readers take a
//! [`CatalogSnapshot`] (an `Arc` of the entry vector plus the scan root) and
//! keep seeing it even if a re-scan replaces the store's contents meanwhile.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A discovered media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Duration in seconds, when probing is enabled and succeeded.
    pub duration: Option<f64>,
}

impl CatalogEntry {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            duration: None,
        }
    }
}

/// An entry paired with its positional ID, as exposed by the list API.
///
/// The ID goes over the wire as a decimal string (`"1"`, `"2"`, ...), which
/// is what existing web clients compare against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    #[serde(serialize_with = "serialize_id")]
    pub id: usize,
    pub path: String,
    pub size: u64,
    pub duration: Option<f64>,
}

fn serialize_id<S>(id: &usize, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(id)
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Field to order the catalog by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    None,
    Name,
    Size,
    Duration,
}

impl SortKey {
    /// Parse a sort key, treating anything unrecognized as [`SortKey::None`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(SortKey::None)
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(SortKey::None),
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "duration" => Ok(SortKey::Duration),
            other => Err(Error::InvalidInput(format!("Unknown sort key: {other}"))),
        }
    }
}

/// Direction of a sort. Descending is the default for every key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    /// Parse an order, treating anything unrecognized as [`SortOrder::Desc`].
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// Reorder `entries` in place.
///
/// `Name` compares paths lexicographically, `Size` compares byte counts and
/// `Duration` compares seconds with a missing duration counted as 0. With the
/// default [`SortOrder::Desc`] the largest value comes first. `None` leaves
/// the slice untouched.
pub fn sort_entries(entries: &mut [CatalogEntry], key: SortKey, order: SortOrder) {
    let compare: fn(&CatalogEntry, &CatalogEntry) -> Ordering = match key {
        SortKey::None => return,
        SortKey::Name => |a, b| a.path.cmp(&b.path),
        SortKey::Size => |a, b| a.size.cmp(&b.size),
        SortKey::Duration => {
            |a, b| a.duration.unwrap_or(0.0).total_cmp(&b.duration.unwrap_or(0.0))
        }
    };

    match order {
        SortOrder::Desc => entries.sort_by(|a, b| compare(b, a)),
        SortOrder::Asc => entries.sort_by(compare),
    }
}

/// Attach positional IDs to a sequence of entries.
pub fn number_entries(entries: &[CatalogEntry]) -> Vec<CatalogItem> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| CatalogItem {
            id: i + 1,
            path: e.path.clone(),
            size: e.size,
            duration: e.duration,
        })
        .collect()
}

/// Translate a 1-based ID into a vector index, validating the range.
pub fn index_for_id(id: usize, len: usize) -> Result<usize> {
    if id == 0 || id > len {
        return Err(Error::InvalidInput("Invalid video ID".into()));
    }
    Ok(id - 1)
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// An immutable view of the catalog at one point in time.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    /// Directory the entries were scanned from.
    pub root: PathBuf,
    /// Whether the scan descended into subdirectories.
    pub recursive: bool,
    /// Entries in their current order.
    pub entries: Arc<Vec<CatalogEntry>>,
}

impl CatalogSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its 1-based ID.
    pub fn get(&self, id: usize) -> Result<&CatalogEntry> {
        let index = index_for_id(id, self.entries.len())?;
        Ok(&self.entries[index])
    }

    pub fn items(&self) -> Vec<CatalogItem> {
        number_entries(&self.entries)
    }
}

/// Lock-guarded, shareable catalog.
///
/// Readers never block each other; writes are short-lived pointer swaps or a
/// copy-on-write of the entry vector.
#[derive(Debug)]
pub struct CatalogStore {
    inner: RwLock<CatalogSnapshot>,
}

impl CatalogStore {
    /// Create an empty store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            inner: RwLock::new(CatalogSnapshot {
                root: root.into(),
                recursive,
                entries: Arc::new(Vec::new()),
            }),
        }
    }

    /// Take a snapshot of the current catalog.
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.inner.read().clone()
    }

    /// Current scan root.
    pub fn root(&self) -> PathBuf {
        self.inner.read().root.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Replace the whole catalog with the result of a fresh scan.
    pub fn replace(&self, root: &Path, recursive: bool, entries: Vec<CatalogEntry>) {
        let mut guard = self.inner.write();
        *guard = CatalogSnapshot {
            root: root.to_path_buf(),
            recursive,
            entries: Arc::new(entries),
        };
    }

    /// Remove the entry at 1-based position `id`, shifting later IDs down.
    pub fn remove_at(&self, id: usize) -> Result<CatalogEntry> {
        let mut guard = self.inner.write();
        let index = index_for_id(id, guard.entries.len())?;
        // Clones only if a reader still holds the previous snapshot.
        Ok(Arc::make_mut(&mut guard.entries).remove(index))
    }

    /// Reorder the catalog.
    pub fn sort_by(&self, key: SortKey, order: SortOrder) {
        if key == SortKey::None {
            return;
        }
        let mut guard = self.inner.write();
        sort_entries(Arc::make_mut(&mut guard.entries).as_mut_slice(), key, order);
    }
}
