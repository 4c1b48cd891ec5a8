//! Review log persistence: citations the linker could not settle, kept for a
//! human to look at. Entries are sorted and unique on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One citation that needs a human decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewEntry {
    /// Canonical forms of the candidates, for ambiguous citations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    /// Char offset of the span in its source.
    pub offset: usize,
    /// Why the linker gave up.
    pub reason: String,
    /// File the citation was found in.
    pub source: PathBuf,
    /// The citation as written.
    pub text: String,
}

impl Ord for ReviewEntry {
    /// Compare entries by (source, offset, text) so a log reads in document order.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return (&self.source, self.offset, &self.text).cmp(&(&other.source, other.offset, &other.text));
    }
}

impl PartialOrd for ReviewEntry {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

/// The review log as a whole. Entries are sorted by (source, offset, text).
/// Constructed only via `ReviewLog::new()` or `ReviewLog::parse()`, both of
/// which enforce sorting and uniqueness.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReviewLog {
    /// The ordered list of entries.
    #[serde(default)]
    pub entries: Vec<ReviewEntry>,
}

impl ReviewLog {
    /// Replace every entry from `source` with `fresh`, keeping other files' entries.
    pub fn merge_source(&mut self, source: &Path, fresh: Vec<ReviewEntry>) {
        let mut entries: Vec<ReviewEntry> = self.entries.drain(..).filter(|e| return e.source != source).collect();
        entries.extend(fresh);
        *self = Self::new(entries);
    }

    /// Create a log from unsorted entries. Sorts and deduplicates.
    pub fn new(mut entries: Vec<ReviewEntry>) -> Self {
        entries.sort();
        entries.dedup_by(|a, b| return (*a).cmp(&*b).is_eq());
        return Self { entries };
    }

    /// Parse a log from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid TOML,
    /// or `Error::ReviewLogCorrupt` if entries are not strictly sorted.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let log: Self = toml::from_str(content)?;
        enforce_entry_ordering(&log.entries)?;
        return Ok(log);
    }

    /// Read and parse a log from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReviewLogNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures,
    /// and the errors of `parse`.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ReviewLogNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Read a log, treating a missing file as empty.
    ///
    /// # Errors
    ///
    /// Same as `read`, except for `ReviewLogNotFound`.
    pub fn read_or_default(path: &Path) -> Result<Self, Error> {
        return match Self::read(path) {
            Err(Error::ReviewLogNotFound { .. }) => Ok(Self::default()),
            other => other,
        };
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        return Ok(toml::to_string_pretty(self)?);
    }

    /// Write the log to disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let content = self.serialize()?;
        std::fs::write(path, content)?;
        return Ok(());
    }
}

/// Validate that entries are strictly sorted.
///
/// # Errors
///
/// Returns `Error::ReviewLogCorrupt` if any adjacent pair is out of order.
fn enforce_entry_ordering(entries: &[ReviewEntry]) -> Result<(), Error> {
    for (first, second) in entries.iter().zip(entries.iter().skip(1)) {
        if first >= second {
            return Err(Error::ReviewLogCorrupt {
                reason: format!(
                    "entries not sorted: {}@{} `{}` >= {}@{} `{}`",
                    first.source.display(),
                    first.offset,
                    first.text,
                    second.source.display(),
                    second.offset,
                    second.text,
                ),
            });
        }
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, offset: usize, text: &str) -> ReviewEntry {
        return ReviewEntry {
            candidates: Vec::new(),
            offset,
            reason: "unknown".to_string(),
            source: PathBuf::from(source),
            text: text.to_string(),
        };
    }

    #[test]
    fn new_sorts_and_dedups() {
        let log = ReviewLog::new(vec![entry("b.md", 0, "x"), entry("a.md", 9, "y"), entry("a.md", 2, "z"), entry("a.md", 2, "z")]);
        let order: Vec<(String, usize)> = log
            .entries
            .iter()
            .map(|e| return (e.source.display().to_string(), e.offset))
            .collect();
        assert_eq!(order, vec![("a.md".to_string(), 2), ("a.md".to_string(), 9), ("b.md".to_string(), 0)]);
    }

    #[test]
    fn dedup_keeps_one_entry_per_position() {
        let mut unresolved = entry("a.md", 2, "z");
        unresolved.reason = "no such section".to_string();
        let log = ReviewLog::new(vec![entry("a.md", 2, "z"), unresolved, entry("a.md", 2, "w")]);
        let texts: Vec<&str> = log.entries.iter().map(|e| return e.text.as_str()).collect();
        assert_eq!(texts, vec!["w", "z"]);
    }

    #[test]
    fn serialized_log_parses_back() {
        let mut ambiguous = entry("notes.md", 4, "Rashi 1:1");
        ambiguous.candidates = vec!["Rashi on Genesis 1:1".to_string(), "Rashi on Exodus 1:1".to_string()];
        let log = ReviewLog::new(vec![ambiguous, entry("notes.md", 40, "ibid. 3")]);
        let parsed = ReviewLog::parse(&log.serialize().unwrap()).unwrap();
        assert_eq!(parsed.entries, log.entries);
    }

    #[test]
    fn unsorted_file_is_corrupt() {
        let content = "\
[[entries]]
offset = 9
reason = \"r\"
source = \"a.md\"
text = \"y\"

[[entries]]
offset = 2
reason = \"r\"
source = \"a.md\"
text = \"z\"
";
        let err = ReviewLog::parse(content).unwrap_err();
        assert!(matches!(err, Error::ReviewLogCorrupt { .. }), "{err}");
    }

    #[test]
    fn merge_replaces_one_source() {
        let mut log = ReviewLog::new(vec![entry("a.md", 1, "old"), entry("b.md", 1, "keep")]);
        log.merge_source(Path::new("a.md"), vec![entry("a.md", 5, "new")]);
        let texts: Vec<&str> = log.entries.iter().map(|e| return e.text.as_str()).collect();
        assert_eq!(texts, vec!["new", "keep"]);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.toml");
        assert!(matches!(ReviewLog::read(&path), Err(Error::ReviewLogNotFound { .. })), "strict read reports absence");
        assert!(ReviewLog::read_or_default(&path).unwrap().entries.is_empty(), "lenient read is empty");
    }
}
