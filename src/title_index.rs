//! Title index: every known title, normalized, mapped to what it names.
//!
//! The index is an immutable snapshot. A library rebuild produces a new
//! snapshot with a new fingerprint.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use sha2::{Digest as _, Sha256};

use crate::error::Error;
use crate::lang::{Lang, normalize_title};
use crate::types::{AltNodeId, IndexId, NodeId};

/// Similarity floor for "did you mean" suggestions.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Maximum number of suggestions offered.
const SUGGESTION_LIMIT: usize = 3;

/// What a title names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TitleTarget {
    /// A node of an alternate structure.
    Alt(AltNodeId),
    /// A schema node of one book.
    Node {
        /// The book.
        book: IndexId,
        /// The node within its schema.
        node: NodeId,
    },
    /// A collective title shared by several works.
    Term {
        /// Every work carrying the collective title, in library order.
        books: Vec<IndexId>,
        /// Term name.
        name: String,
    },
}

/// One registered title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleEntry {
    /// The title as written in its record.
    pub display: String,
    /// Language of the title.
    pub lang: Lang,
    /// What the title names.
    pub target: TitleTarget,
}

/// SHA-256 fingerprint of a title index snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotVersion(pub String);

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// Immutable map from normalized title to target.
#[derive(Debug, Clone)]
pub struct TitleIndex {
    /// Normalized title to entry.
    entries: HashMap<String, TitleEntry>,
    /// Fingerprint of this snapshot.
    version: SnapshotVersion,
}

impl TitleIndex {
    /// Look up an exact (already normalized) title.
    pub fn get(&self, normalized: &str) -> Option<&TitleEntry> {
        return self.entries.get(normalized);
    }

    /// All entries with their normalized keys, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TitleEntry)> {
        return self.entries.iter().map(|(key, entry)| return (key.as_str(), entry));
    }

    /// Number of registered titles.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// True when no titles are registered.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Longest registered title that prefixes `normalized` and ends at a
    /// word boundary. Returns the entry and the matched byte length.
    pub fn longest_prefix(&self, normalized: &str) -> Option<(&TitleEntry, usize)> {
        let mut ends: Vec<usize> = normalized
            .char_indices()
            .filter(|&(_, c)| return is_title_boundary(c))
            .map(|(i, _)| return i)
            .collect();
        ends.push(normalized.len());
        for &end in ends.iter().rev() {
            let candidate = normalized.get(..end).unwrap_or("").trim_end();
            if candidate.is_empty() {
                continue;
            }
            if let Some(entry) = self.entries.get(candidate) {
                return Some((entry, candidate.len()));
            }
        }
        return None;
    }

    /// Titles that look like `text`, best first.
    pub fn suggest(&self, text: &str) -> Vec<String> {
        let query = normalize_title(text);
        let mut scored: Vec<(f64, &str)> = self
            .entries
            .iter()
            .map(|(key, entry)| return (strsim::jaro_winkler(&query, key), entry.display.as_str()))
            .filter(|(score, _)| return *score >= SUGGESTION_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| return b.0.total_cmp(&a.0).then_with(|| return a.1.cmp(b.1)));
        let mut out: Vec<String> = Vec::new();
        for (_, display) in scored {
            if out.len() >= SUGGESTION_LIMIT {
                break;
            }
            if !out.iter().any(|s| return s == display) {
                out.push(display.to_string());
            }
        }
        return out;
    }

    /// Fingerprint of this snapshot.
    pub const fn version(&self) -> &SnapshotVersion {
        return &self.version;
    }
}

/// Collects titles, rejecting collisions, then freezes them into a `TitleIndex`.
#[derive(Debug, Clone, Default)]
pub struct TitleIndexBuilder {
    /// Normalized title to entry and a label of its owner.
    entries: BTreeMap<String, (TitleEntry, String)>,
}

impl TitleIndexBuilder {
    /// Freeze into an immutable snapshot with its fingerprint.
    pub fn build(self) -> TitleIndex {
        let mut hasher = Sha256::new();
        for (key, (entry, owner)) in &self.entries {
            hasher.update(format!("{key}\t{}\t{}\t{owner}\n", entry.display, entry.lang).as_bytes());
        }
        let version = SnapshotVersion(format!("{:x}", hasher.finalize()));
        let entries = self.entries.into_iter().map(|(key, (entry, _))| return (key, entry)).collect();
        return TitleIndex { entries, version };
    }

    /// Register a title. Registering the same title for the same target twice
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::TitleCollision` if the title already names something else.
    pub fn insert(&mut self, title: &str, lang: Lang, target: TitleTarget, owner: &str) -> Result<(), Error> {
        let key = normalize_title(title);
        if key.is_empty() {
            return Ok(());
        }
        if let Some((existing, first)) = self.entries.get(&key) {
            if existing.target == target {
                return Ok(());
            }
            return Err(Error::TitleCollision {
                first: first.clone(),
                second: owner.to_string(),
                title: title.to_string(),
            });
        }
        let entry = TitleEntry {
            display: title.to_string(),
            lang,
            target,
        };
        self.entries.insert(key, (entry, owner.to_string()));
        return Ok(());
    }

    /// Start an empty builder.
    pub fn new() -> Self {
        return Self::default();
    }
}

/// Characters a title may be followed by.
fn is_title_boundary(c: char) -> bool {
    return c.is_whitespace() || c.is_ascii_digit() || matches!(c, ',' | '.' | ':' | ';' | '(' | ')' | '[' | ']');
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::types::LibraryStamp;

    fn node(book: usize) -> TitleTarget {
        static STAMP: OnceLock<LibraryStamp> = OnceLock::new();
        return TitleTarget::Node {
            book: IndexId::new(*STAMP.get_or_init(LibraryStamp::fresh), book),
            node: NodeId::ROOT,
        };
    }

    fn sample() -> TitleIndex {
        let mut builder = TitleIndexBuilder::new();
        builder.insert("Genesis", Lang::En, node(0), "Genesis").unwrap();
        builder.insert("Gen.", Lang::En, node(0), "Genesis").unwrap();
        builder.insert("בְּרֵאשִׁית", Lang::He, node(0), "Genesis").unwrap();
        builder.insert("Rashi on Genesis", Lang::En, node(1), "Rashi on Genesis").unwrap();
        return builder.build();
    }

    #[test]
    fn longest_prefix_prefers_longer_titles() {
        let index = sample();
        let (entry, len) = index.longest_prefix("rashi on genesis 1:1").unwrap();
        assert_eq!(entry.display, "Rashi on Genesis");
        assert_eq!(len, "rashi on genesis".len());
        let (entry, _) = index.longest_prefix("genesis 1:1").unwrap();
        assert_eq!(entry.target, node(0));
    }

    #[test]
    fn prefix_must_end_at_a_boundary() {
        let index = sample();
        assert!(index.longest_prefix("genesisx 1").is_none(), "partial words do not match");
        assert!(index.longest_prefix("genesis1:1").is_some(), "digits end a title");
    }

    #[test]
    fn hebrew_titles_ignore_nikkud() {
        let index = sample();
        let (entry, _) = index.longest_prefix("בראשית א:א").unwrap();
        assert_eq!(entry.lang, Lang::He);
    }

    #[test]
    fn collisions_are_rejected() {
        let mut builder = TitleIndexBuilder::new();
        builder.insert("Bereshit", Lang::En, node(0), "Genesis").unwrap();
        builder.insert("bereshit", Lang::En, node(0), "Genesis").unwrap();
        let err = builder.insert("BERESHIT", Lang::En, node(2), "Bereshit Rabbah").unwrap_err();
        assert!(matches!(err, Error::TitleCollision { .. }), "{err}");
    }

    #[test]
    fn fingerprint_tracks_content() {
        assert_eq!(sample().version(), sample().version());
        let mut builder = TitleIndexBuilder::new();
        builder.insert("Genesis", Lang::En, node(0), "Genesis").unwrap();
        assert_ne!(builder.build().version(), sample().version());
    }

    #[test]
    fn suggests_close_titles() {
        let index = sample();
        assert_eq!(index.suggest("Genesiss").first().map(String::as_str), Some("Genesis"));
        assert!(index.suggest("Leviticus").is_empty(), "nothing close");
    }
}
