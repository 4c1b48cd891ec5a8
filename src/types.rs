/// Core identifiers shared by the schema, library, reference, and linker layers.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::lang::Lang;

/// Source of fresh library stamps.
static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// Identity of one built `Library`. Every rebuild gets a new stamp, so ids
/// minted by an older snapshot are recognised as foreign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryStamp(u64);

impl LibraryStamp {
    /// A stamp no other library in this process carries.
    pub(crate) fn fresh() -> Self {
        return Self(NEXT_STAMP.fetch_add(1, Ordering::Relaxed));
    }
}

/// Handle to an index within one library snapshot.
/// Only meaningful for the `Library` that minted it; other snapshots reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId {
    /// The library that minted this id.
    pub(crate) library: LibraryStamp,
    /// Position in that library's index list.
    pub(crate) position: usize,
}

impl IndexId {
    /// Id of the index at `position` in the library stamped `library`.
    pub(crate) const fn new(library: LibraryStamp, position: usize) -> Self {
        return Self { library, position };
    }
}

/// Handle to a node within one schema arena. The root is always `NodeId(0)`
/// and ids follow document (pre-)order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node of every schema.
    pub const ROOT: Self = Self(0);
}

/// Handle to one node of an alternate structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AltNodeId {
    /// Book owning the structure.
    pub book: IndexId,
    /// Position of the node within the structure.
    pub node: usize,
    /// Position of the structure within the index.
    pub structure: usize,
}

/// Identity of one content version: a language plus an attribution title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId {
    /// Language of the version's text.
    pub lang: Lang,
    /// Attribution, e.g. "JPS 1917".
    pub title: String,
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{} [{}]", self.title, self.lang);
    }
}
