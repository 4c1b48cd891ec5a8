//! Record shapes of the external store and a directory loader.
//!
//! Records are JSON, one record or an array of records per file, each
//! tagged with `"kind": "index" | "term" | "version"`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::index::Dependence;
use crate::jagged::JaggedTextArray;
use crate::lang::Lang;
use crate::library::{Library, LibraryBuilder};
use crate::schema::{NodeSpec, Title};

/// One node of an alternate structure, with refs still as citation strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltNodeRecord {
    /// Subdivision citations.
    #[serde(default)]
    pub refs: Vec<String>,
    /// Node titles.
    pub titles: Vec<Title>,
    /// Citation for everything the node covers.
    pub whole_ref: String,
}

/// A named alternate structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltStructRecord {
    /// Structure name.
    pub name: String,
    /// Nodes in order.
    pub nodes: Vec<AltNodeRecord>,
}

/// Stored form of an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Alternate structures.
    #[serde(default)]
    pub alt_structs: Vec<AltStructRecord>,
    /// Titles of commented texts.
    #[serde(default)]
    pub base_text_titles: Vec<String>,
    /// Category path.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Shared term name.
    #[serde(default)]
    pub collective_title: Option<String>,
    /// Relation to base texts.
    #[serde(default)]
    pub dependence: Option<Dependence>,
    /// Explicit position within the category.
    #[serde(default)]
    pub order: Option<u32>,
    /// Root schema node.
    pub schema: NodeSpec,
    /// Canonical English title.
    pub title: String,
}

/// Any stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    /// An index.
    Index(IndexRecord),
    /// A shared term.
    Term(TermRecord),
    /// A content version.
    Version(VersionRecord),
}

/// Stored form of a term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermRecord {
    /// Lookup name.
    pub name: String,
    /// Titles.
    pub titles: Vec<Title>,
}

/// Content of a version: one jagged array for a simple text, or a map from
/// node key to content for a complex one (`"default"` for default nodes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionContent {
    /// Keyed children of a container.
    Complex(BTreeMap<String, VersionContent>),
    /// Content of a leaf.
    Simple(JaggedTextArray),
}

/// Stored form of one content version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Language of the text.
    pub language: Lang,
    /// Higher priorities win when versions are merged.
    #[serde(default)]
    pub priority: Option<u32>,
    /// The content.
    pub text: VersionContent,
    /// Index title the version belongs to.
    pub title: String,
    /// Attribution.
    pub version_title: String,
}

/// Records of one file: a single record or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    /// A list of records.
    Many(Vec<Record>),
    /// A single record.
    One(Box<Record>),
}

/// Find record files under the configured library directory, in file-name order.
/// Applies the config's include/exclude filters.
///
/// # Errors
///
/// Returns `Error::Io` if the directory cannot be walked.
pub fn discover(config: &Config) -> Result<Vec<PathBuf>, Error> {
    let root = &config.library;
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| return Error::Io(std::io::Error::from(e)))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| return ext != "json") {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
        if !config.should_load(&relative) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    return Ok(files);
}

/// Load every record under the configured library directory and build a library.
///
/// # Errors
///
/// Returns I/O and JSON errors from reading records, plus every build error
/// of `LibraryBuilder::build`.
pub fn load_dir(config: &Config) -> Result<Library, Error> {
    let mut builder = LibraryBuilder::new();
    let files = discover(config)?;
    tracing::debug!(count = files.len(), library = %config.library.display(), "loading record files");
    for path in &files {
        for record in read_records(path)? {
            builder.add_record(record)?;
        }
    }
    return builder.build();
}

/// Parse one record file.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::Json`.
pub fn read_records(path: &Path) -> Result<Vec<Record>, Error> {
    let content = std::fs::read_to_string(path)?;
    return parse_records(&content);
}

/// Parse record JSON: one record or an array.
///
/// # Errors
///
/// Returns `Error::Json` if the content is not a record or record list.
pub fn parse_records(content: &str) -> Result<Vec<Record>, Error> {
    return match serde_json::from_str::<RecordFile>(content) {
        Ok(RecordFile::Many(records)) => Ok(records),
        Ok(RecordFile::One(record)) => Ok(vec![*record]),
        // Re-parse as a single record for a precise error message.
        Err(_) => serde_json::from_str::<Record>(content).map(|r| return vec![r]).map_err(Error::Json),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_listed_records() {
        let one = r#"{"kind":"term","name":"Rashi","titles":[{"lang":"en","text":"Rashi"}]}"#;
        assert_eq!(parse_records(one).unwrap().len(), 1);
        let many = format!("[{one},{one}]");
        assert_eq!(parse_records(&many).unwrap().len(), 2);
    }

    #[test]
    fn complex_versions_are_keyed_maps() {
        let json = r#"{"kind":"version","language":"en","title":"Kuzari","version_title":"Hirschfeld",
            "text":{"Introduction":["a","b"],"default":[["c"]]}}"#;
        let records = parse_records(json).unwrap();
        let Some(Record::Version(version)) = records.first() else {
            panic!("expected a version record");
        };
        let VersionContent::Complex(map) = &version.text else {
            panic!("expected keyed content");
        };
        assert!(map.contains_key("default"), "default node key");
    }

    #[test]
    fn unknown_kind_is_a_json_error() {
        let err = parse_records(r#"{"kind":"sheet"}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)), "{err}");
    }

    #[test]
    fn discovers_json_files_in_order_with_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("b/two.json"), "[]").unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let config = Config::with_library(dir.path().to_path_buf());
        let files = discover(&config).unwrap();
        assert_eq!(files, vec![dir.path().join("a.json"), dir.path().join("b/two.json")]);

        std::fs::write(dir.path().join(crate::config::CONFIG_FILE), "library = \".\"\nexclude = [\"b/\"]\n").unwrap();
        let filtered = Config::load(dir.path()).unwrap();
        assert_eq!(discover(&filtered).unwrap(), vec![dir.path().join("./a.json")]);
    }
}
