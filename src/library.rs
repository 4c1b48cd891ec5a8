//! The library snapshot: indexes, terms, content versions, section shapes,
//! compiled address grammars, and the title index.
//!
//! A `Library` is built once by `LibraryBuilder` and is read-only after
//! that. Share it through `Arc`; a rebuild produces a new snapshot.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::address::AddressGrammar;
use crate::error::Error;
use crate::index::{AltNode, AltStructure, Index, Term};
use crate::jagged::{Element, JaggedArray, JaggedTextArray};
use crate::lang::Lang;
use crate::reference::{self, Ref};
use crate::schema::{SchemaNode, TitleGroup};
use crate::store::{AltStructRecord, IndexRecord, Record, TermRecord, VersionContent, VersionRecord};
use crate::title_index::{SnapshotVersion, TitleIndex, TitleIndexBuilder, TitleTarget};
use crate::types::{AltNodeId, IndexId, LibraryStamp, NodeId, VersionId};

/// Content of one leaf in one version.
#[derive(Debug, Clone)]
pub struct StoredVersion {
    /// Language and attribution.
    pub id: VersionId,
    /// Higher wins when merging.
    pub priority: u32,
    /// The leaf's content.
    pub text: JaggedTextArray,
}

/// Text addressed by a ref, with the versions it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// The addressed content: a segment or nested lists of segments.
    pub content: Element<String>,
    /// Language of the content.
    pub lang: Lang,
    /// Version titles that contributed at least one segment.
    pub sources: Vec<String>,
}

/// Immutable snapshot of everything reference handling needs.
#[derive(Debug)]
pub struct Library {
    /// Position of each book in library order, by `IndexId`.
    book_ranks: Vec<usize>,
    /// Canonical English title to index.
    by_title: HashMap<String, IndexId>,
    /// Compiled tail matchers per leaf and language.
    grammars: HashMap<(IndexId, NodeId, Lang), AddressGrammar>,
    /// Indexes by `IndexId`.
    indexes: Vec<Index>,
    /// Merged presence masks per leaf.
    shapes: HashMap<(IndexId, NodeId), JaggedArray<bool>>,
    /// Identity of this snapshot, carried by every `IndexId` it mints.
    stamp: LibraryStamp,
    /// Terms by name.
    terms: HashMap<String, Term>,
    /// Title lookup snapshot.
    titles: Arc<TitleIndex>,
    /// Versions per leaf, highest priority first.
    versions: HashMap<(IndexId, NodeId), Vec<StoredVersion>>,
}

impl Library {
    /// Alternate-structure node behind `id`.
    pub fn alt_node(&self, id: AltNodeId) -> Option<&AltNode> {
        return self.index(id.book).ok()?.alt_structs.get(id.structure)?.nodes.get(id.node);
    }

    /// Position of `book` in library order.
    pub fn book_rank(&self, book: IndexId) -> usize {
        if book.library != self.stamp {
            return usize::MAX;
        }
        return self.book_ranks.get(book.position).copied().unwrap_or(usize::MAX);
    }

    /// Every book, in library order.
    pub fn books_in_order(&self) -> Vec<IndexId> {
        let mut books: Vec<IndexId> = (0..self.indexes.len()).map(|i| return IndexId::new(self.stamp, i)).collect();
        books.sort_by_key(|b| return self.book_rank(*b));
        return books;
    }

    /// Compiled tail matcher for a leaf in one language.
    pub fn grammar(&self, book: IndexId, node: NodeId, lang: Lang) -> Option<&AddressGrammar> {
        return self.grammars.get(&(book, node, lang));
    }

    /// The index behind `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when `id` was minted by another snapshot.
    pub fn index(&self, id: IndexId) -> Result<&Index, Error> {
        let found = if id.library == self.stamp { self.indexes.get(id.position) } else { None };
        return found.ok_or_else(|| {
            return Error::input(
                &format!("book #{}", id.position),
                "the reference was made by another library snapshot; parse it again against this one",
            );
        });
    }

    /// Look up a book by its canonical English title.
    pub fn index_id(&self, title: &str) -> Option<IndexId> {
        return self.by_title.get(title).copied();
    }

    /// Every index with its id, in insertion order.
    pub fn indexes(&self) -> impl Iterator<Item = (IndexId, &Index)> {
        return self
            .indexes
            .iter()
            .enumerate()
            .map(|(i, index)| return (IndexId::new(self.stamp, i), index));
    }

    /// Parse a citation, guessing its language from its letters.
    ///
    /// # Errors
    ///
    /// Returns `Error::BookName` for an unknown title, `Error::Input` for a
    /// bad address, and `Error::PartialRefInput` for a container citation
    /// that cannot take an address.
    pub fn parse_ref(&self, text: &str) -> Result<Ref, Error> {
        return reference::parse::parse(self, text, Lang::detect(text));
    }

    /// Parse a citation whose address is written in `lang`.
    ///
    /// # Errors
    ///
    /// Same as `parse_ref`.
    pub fn parse_ref_in(&self, text: &str, lang: Lang) -> Result<Ref, Error> {
        return reference::parse::parse(self, text, lang);
    }

    /// Rebuild a ref from a path relative to `ancestor`; the inverse of
    /// `Ref::in_terms_of`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if the path does not fit under `ancestor`.
    pub fn ref_from_relative(&self, ancestor: &Ref, path: &[u32]) -> Result<Ref, Error> {
        return reference::range::from_relative(self, ancestor, path);
    }

    /// Number of positions under a 1-based path of a leaf: the content
    /// shape first, the declared top-level length as a fallback.
    pub fn section_length(&self, book: IndexId, node: NodeId, path: &[u32]) -> Option<u32> {
        let zero_based: Vec<usize> = path
            .iter()
            .map(|p| return usize::try_from(p.saturating_sub(1)).unwrap_or(usize::MAX))
            .collect();
        let from_shape = self.shape(book, node).map_or(0, |shape| return shape.sub_array_length(&zero_based));
        if from_shape > 0 {
            return u32::try_from(from_shape).ok();
        }
        if path.is_empty() {
            return self.index(book).ok()?.schema.node(node)?.leaf()?.lengths.first().copied();
        }
        return None;
    }

    /// Merged presence mask of a leaf, if any version has content for it.
    pub fn shape(&self, book: IndexId, node: NodeId) -> Option<&JaggedArray<bool>> {
        return self.shapes.get(&(book, node));
    }

    /// Fingerprint of the title index snapshot.
    pub fn snapshot_version(&self) -> &SnapshotVersion {
        return self.titles.version();
    }

    /// A term by name.
    pub fn term(&self, name: &str) -> Option<&Term> {
        return self.terms.get(name);
    }

    /// Content addressed by `r` in `lang`: one named version, or all
    /// versions merged with the first non-blank segment winning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` for a container ref or an unknown version title.
    pub fn text(&self, r: &Ref, lang: Lang, version: Option<&str>) -> Result<TextChunk, Error> {
        let schema = &self.index(r.book())?.schema;
        if schema.node(r.node()).and_then(SchemaNode::leaf).is_none() {
            return Err(Error::input(
                &r.label(self),
                "a container has no text of its own; cite one of its parts",
            ));
        }

        let candidates: Vec<&StoredVersion> = self
            .versions
            .get(&(r.book(), r.node()))
            .map(|all| return all.iter().filter(|v| return v.id.lang == lang).collect())
            .unwrap_or_default();

        let (array, sources) = match version {
            Some(title) => {
                let Some(found) = candidates.iter().find(|v| return v.id.title == title) else {
                    return Err(Error::input(&r.label(self), format!("no {lang} version titled `{title}`")));
                };
                (found.text.clone(), BTreeSet::from([found.id.title.clone()]))
            },
            None => {
                let arrays: Vec<&JaggedTextArray> = candidates.iter().map(|v| return &v.text).collect();
                let titles: Vec<String> = candidates.iter().map(|v| return v.id.title.clone()).collect();
                JaggedArray::merge(&arrays, &titles)
            },
        };

        let from = reference::zero_based(r.sections());
        let to = reference::zero_based(r.to_sections());
        let content = if from.is_empty() {
            Element::Nested(array.top_level().to_vec())
        } else {
            array.project(&from, &to)
        };
        return Ok(TextChunk {
            content,
            lang,
            sources: sources.into_iter().collect(),
        });
    }

    /// The title index snapshot.
    pub const fn titles(&self) -> &Arc<TitleIndex> {
        return &self.titles;
    }

    /// Versions of one leaf, highest priority first.
    pub fn versions(&self, book: IndexId, node: NodeId) -> &[StoredVersion] {
        return self.versions.get(&(book, node)).map_or(&[], Vec::as_slice);
    }
}

/// Accumulates records, then validates and freezes them into a `Library`.
#[derive(Debug, Default)]
pub struct LibraryBuilder {
    /// Index records in insertion order.
    indexes: Vec<IndexRecord>,
    /// Term records in insertion order.
    terms: Vec<TermRecord>,
    /// Version records in insertion order.
    versions: Vec<VersionRecord>,
}

impl LibraryBuilder {
    /// Add an index record.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRecord` if the title is already taken.
    pub fn add_index(&mut self, record: IndexRecord) -> Result<(), Error> {
        if self.indexes.iter().any(|i| return i.title == record.title) {
            return Err(Error::DuplicateRecord {
                key: format!("index `{}`", record.title),
            });
        }
        self.indexes.push(record);
        return Ok(());
    }

    /// Add any record.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRecord` for a repeated identity.
    pub fn add_record(&mut self, record: Record) -> Result<(), Error> {
        return match record {
            Record::Index(index) => self.add_index(index),
            Record::Term(term) => self.add_term(term),
            Record::Version(version) => self.add_version(version),
        };
    }

    /// Add a term record.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRecord` if the name is already taken.
    pub fn add_term(&mut self, record: TermRecord) -> Result<(), Error> {
        if self.terms.iter().any(|t| return t.name == record.name) {
            return Err(Error::DuplicateRecord {
                key: format!("term `{}`", record.name),
            });
        }
        self.terms.push(record);
        return Ok(());
    }

    /// Add a version record.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRecord` if the same book, language, and
    /// version title were already added.
    pub fn add_version(&mut self, record: VersionRecord) -> Result<(), Error> {
        let duplicate = self.versions.iter().any(|v| {
            return v.title == record.title && v.language == record.language && v.version_title == record.version_title;
        });
        if duplicate {
            return Err(Error::DuplicateRecord {
                key: format!("version `{}` of {} [{}]", record.version_title, record.title, record.language),
            });
        }
        self.versions.push(record);
        return Ok(());
    }

    /// Validate everything and freeze the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SchemaInvalid`, `TitleCollision`, `AltStructureInvalid`,
    /// `BookName` (a version for an unknown book), or `Pattern` errors.
    pub fn build(self) -> Result<Library, Error> {
        let stamp = LibraryStamp::fresh();
        let term_titles = build_terms(&self.terms)?;
        let mut indexes = Vec::with_capacity(self.indexes.len());
        let mut by_title = HashMap::new();
        for (i, record) in self.indexes.iter().enumerate() {
            indexes.push(Index::build(record, &term_titles)?);
            by_title.insert(record.title.clone(), IndexId::new(stamp, i));
        }

        let versions = distribute_versions(&indexes, &by_title, &self.versions)?;
        let shapes = versions
            .iter()
            .map(|(key, stored)| {
                let masks: Vec<JaggedArray<bool>> = stored.iter().map(|v| return v.text.mask()).collect();
                let refs: Vec<&JaggedArray<bool>> = masks.iter().collect();
                let (shape, _) = JaggedArray::merge(&refs, &[] as &[usize]);
                return (*key, shape);
            })
            .collect();

        let mut title_builder = TitleIndexBuilder::new();
        register_titles(&indexes, stamp, &term_titles, &mut title_builder)?;

        let mut library = Library {
            book_ranks: book_ranks(&indexes),
            by_title,
            grammars: compile_grammars(&indexes, stamp)?,
            indexes,
            shapes,
            stamp,
            terms: term_titles
                .into_iter()
                .map(|(name, titles)| return (name.clone(), Term { name, titles }))
                .collect(),
            titles: Arc::new(title_builder.clone().build()),
            versions,
        };

        attach_alt_structs(&mut library, &self.indexes, &mut title_builder)?;
        library.titles = Arc::new(title_builder.build());

        tracing::debug!(
            books = library.indexes.len(),
            titles = library.titles.len(),
            version = %library.titles.version(),
            "library built"
        );
        return Ok(library);
    }

    /// Start an empty builder.
    pub fn new() -> Self {
        return Self::default();
    }
}

/// Parse alt-structure citations, validate them, attach them to their
/// indexes, and register their titles.
///
/// # Errors
///
/// Returns `Error::AltStructureInvalid` or `Error::TitleCollision`.
fn attach_alt_structs(library: &mut Library, records: &[IndexRecord], titles: &mut TitleIndexBuilder) -> Result<(), Error> {
    for (i, record) in records.iter().enumerate() {
        let book = IndexId::new(library.stamp, i);
        let mut structures = Vec::with_capacity(record.alt_structs.len());
        for alt in &record.alt_structs {
            structures.push(resolve_alt_struct(library, book, alt)?);
        }
        if let Some(index) = library.indexes.get_mut(i) {
            index.alt_structs = structures;
        }

        let index = library.index(book)?;
        for (structure, alt) in index.alt_structs.iter().enumerate() {
            for (position, node) in alt.nodes.iter().enumerate() {
                let target = TitleTarget::Alt(AltNodeId {
                    book,
                    node: position,
                    structure,
                });
                let owner = format!("{} ({})", index.title, alt.name);
                for lang in [Lang::En, Lang::He] {
                    for prefix in index.schema.full_titles(index.schema.root(), lang) {
                        for title in node.titles.all(lang) {
                            titles.insert(&format!("{prefix}, {title}"), lang, target.clone(), &owner)?;
                        }
                    }
                }
            }
        }
    }
    return Ok(());
}

/// Rank books by category (first appearance of each category prefix), then
/// explicit order, then insertion.
fn book_ranks(indexes: &[Index]) -> Vec<usize> {
    let mut prefix_ranks: HashMap<&[String], usize> = HashMap::new();
    for index in indexes {
        for depth in 1..=index.categories.len() {
            let next = prefix_ranks.len();
            prefix_ranks.entry(index.categories.get(..depth).unwrap_or(&[])).or_insert(next);
        }
    }

    let mut keyed: Vec<(Vec<usize>, u32, usize)> = indexes
        .iter()
        .enumerate()
        .map(|(i, index)| {
            let path = (1..=index.categories.len())
                .filter_map(|depth| return index.categories.get(..depth).and_then(|p| return prefix_ranks.get(p)).copied())
                .collect();
            return (path, index.order.unwrap_or(u32::MAX), i);
        })
        .collect();
    keyed.sort();

    let mut ranks = vec![0; indexes.len()];
    for (rank, (_, _, i)) in keyed.into_iter().enumerate() {
        if let Some(slot) = ranks.get_mut(i) {
            *slot = rank;
        }
    }
    return ranks;
}

/// Term name to checked title group.
///
/// # Errors
///
/// Returns `Error::SchemaInvalid` for a bad title group.
fn build_terms(records: &[TermRecord]) -> Result<HashMap<String, TitleGroup>, Error> {
    let mut terms = HashMap::with_capacity(records.len());
    for record in records {
        let group = TitleGroup::new(record.titles.clone())
            .map_err(|reason| return Error::schema(&record.name, format!("term: {reason}")))?;
        terms.insert(record.name.clone(), group);
    }
    return Ok(terms);
}

/// One grammar per leaf and language.
///
/// # Errors
///
/// Returns `Error::Pattern` if an expression fails to compile.
fn compile_grammars(indexes: &[Index], stamp: LibraryStamp) -> Result<HashMap<(IndexId, NodeId, Lang), AddressGrammar>, Error> {
    let mut grammars = HashMap::new();
    for (i, index) in indexes.iter().enumerate() {
        for &leaf_id in index.schema.leaves() {
            let Some(leaf) = index.schema.node(leaf_id).and_then(SchemaNode::leaf) else {
                continue;
            };
            for lang in [Lang::En, Lang::He] {
                grammars.insert((IndexId::new(stamp, i), leaf_id, lang), AddressGrammar::new(&leaf.address_types, lang)?);
            }
        }
    }
    return Ok(grammars);
}

/// Split version records into per-leaf content, highest priority first.
///
/// # Errors
///
/// Returns `Error::BookName` for an unknown book and `Error::SchemaInvalid`
/// when the content does not follow the schema.
fn distribute_versions(
    indexes: &[Index],
    by_title: &HashMap<String, IndexId>,
    records: &[VersionRecord],
) -> Result<HashMap<(IndexId, NodeId), Vec<StoredVersion>>, Error> {
    let mut versions: HashMap<(IndexId, NodeId), Vec<StoredVersion>> = HashMap::new();
    for record in records {
        let Some(&book) = by_title.get(&record.title) else {
            return Err(Error::BookName {
                suggestions: Vec::new(),
                text: record.title.clone(),
            });
        };
        let Some(index) = indexes.get(book.position) else {
            continue;
        };
        let mut leaves = Vec::new();
        collect_leaf_content(index, index.schema.root(), &record.text, &mut leaves)?;
        for (node, mut text) in leaves {
            text.trim_trailing_blanks();
            versions.entry((book, node)).or_default().push(StoredVersion {
                id: VersionId {
                    lang: record.language,
                    title: record.version_title.clone(),
                },
                priority: record.priority.unwrap_or(0),
                text,
            });
        }
    }
    for stored in versions.values_mut() {
        stored.sort_by(|a, b| return b.priority.cmp(&a.priority));
    }
    return Ok(versions);
}

/// Walk keyed version content alongside the schema.
///
/// # Errors
///
/// Returns `Error::SchemaInvalid` when keys or nesting disagree with the schema.
fn collect_leaf_content(
    index: &Index,
    node: NodeId,
    content: &VersionContent,
    out: &mut Vec<(NodeId, JaggedTextArray)>,
) -> Result<(), Error> {
    let Some(schema_node) = index.schema.node(node) else {
        return Err(Error::schema(&index.title, "version content reached a node outside the schema"));
    };
    let is_leaf = schema_node.leaf().is_some();
    match content {
        VersionContent::Simple(array) if is_leaf => out.push((node, array.clone())),
        VersionContent::Simple(_) => {
            return Err(Error::schema(&index.title, format!("node `{}` needs keyed content", schema_node.key)));
        },
        VersionContent::Complex(map) if !is_leaf => {
            for (key, child_content) in map {
                let Some(child) = index.schema.child_by_key(node, key) else {
                    return Err(Error::schema(&index.title, format!("version content names unknown node `{key}`")));
                };
                collect_leaf_content(index, child, child_content, out)?;
            }
        },
        VersionContent::Complex(_) => {
            return Err(Error::schema(&index.title, format!("leaf `{}` takes a plain array", schema_node.key)));
        },
    }
    return Ok(());
}

/// Register node titles and collective titles.
///
/// # Errors
///
/// Returns `Error::TitleCollision`.
fn register_titles(
    indexes: &[Index],
    stamp: LibraryStamp,
    terms: &HashMap<String, TitleGroup>,
    builder: &mut TitleIndexBuilder,
) -> Result<(), Error> {
    for (i, index) in indexes.iter().enumerate() {
        for node in index.schema.node_ids() {
            if index.schema.node(node).is_none_or(|n| return n.default) {
                continue;
            }
            let target = TitleTarget::Node {
                book: IndexId::new(stamp, i),
                node,
            };
            for lang in [Lang::En, Lang::He] {
                for title in index.schema.full_titles(node, lang) {
                    builder.insert(&title, lang, target.clone(), &index.title)?;
                }
            }
        }
    }

    let mut names: Vec<&String> = terms.keys().collect();
    names.sort();
    for name in names {
        let books: Vec<IndexId> = indexes
            .iter()
            .enumerate()
            .filter(|(_, index)| return index.collective_title.as_deref() == Some(name.as_str()))
            .map(|(i, _)| return IndexId::new(stamp, i))
            .collect();
        if books.is_empty() {
            continue;
        }
        let Some(group) = terms.get(name) else {
            continue;
        };
        let target = TitleTarget::Term {
            books,
            name: name.clone(),
        };
        for lang in [Lang::En, Lang::He] {
            for title in group.all(lang) {
                builder.insert(title, lang, target.clone(), &format!("term {name}"))?;
            }
        }
    }

    let unknown: HashSet<&str> = indexes
        .iter()
        .filter_map(|index| return index.collective_title.as_deref())
        .filter(|name| return !terms.contains_key(*name))
        .collect();
    if let Some(name) = unknown.into_iter().next() {
        return Err(Error::schema(name, "collective title names an unknown term"));
    }
    return Ok(());
}

/// Parse and validate one alternate structure of `book`.
///
/// # Errors
///
/// Returns `Error::AltStructureInvalid`.
fn resolve_alt_struct(library: &Library, book: IndexId, record: &AltStructRecord) -> Result<AltStructure, Error> {
    let book_title = library.index(book)?.title.clone();
    let invalid = |reason: String| {
        return Error::AltStructureInvalid {
            book: book_title.clone(),
            reason,
            structure: record.name.clone(),
        };
    };
    let parse_in_book = |text: &str| -> Result<Ref, Error> {
        let r = library.parse_ref(text).map_err(|e| return invalid(format!("`{text}`: {e}")))?;
        if r.book() != book {
            return Err(invalid(format!("`{text}` is outside {book_title}")));
        }
        return Ok(r);
    };

    let mut nodes = Vec::with_capacity(record.nodes.len());
    for node in &record.nodes {
        let whole_ref = parse_in_book(&node.whole_ref)?;
        let refs = node.refs.iter().map(|r| return parse_in_book(r)).collect::<Result<Vec<_>, _>>()?;
        let titles = TitleGroup::new(node.titles.clone()).map_err(&invalid)?;
        nodes.push(AltNode { refs, titles, whole_ref });
    }

    reference::range::validate_alt_nodes(library, &nodes).map_err(invalid)?;
    return Ok(AltStructure {
        name: record.name.clone(),
        nodes,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::parse_records;

    const RUTH: &str = r#"{"kind":"index","title":"Ruth","categories":["Tanakh","Writings"],
        "schema":{"key":"Ruth","titles":[{"lang":"en","text":"Ruth","primary":true},{"lang":"he","text":"רות","primary":true}],
        "address_types":["Integer","Integer"],"section_names":["Chapter","Verse"],"lengths":[4]}}"#;

    fn builder(records: &[&str]) -> Result<LibraryBuilder, Error> {
        let mut builder = LibraryBuilder::new();
        for json in records {
            for record in parse_records(json)? {
                builder.add_record(record)?;
            }
        }
        return Ok(builder);
    }

    fn ruth_with_alt_nodes(nodes: &str) -> String {
        return RUTH.replacen(
            r#""categories""#,
            &format!(r#""alt_structs":[{{"name":"Reading","nodes":[{nodes}]}}],"categories""#),
            1,
        );
    }

    fn ruth_with_alt(refs: &str) -> String {
        return ruth_with_alt_nodes(&format!(
            r#"{{"titles":[{{"lang":"en","text":"Part","primary":true}}],"whole_ref":"Ruth 1:1-2:23","refs":[{refs}]}}"#
        ));
    }

    fn alt_node(title: &str, whole_ref: &str) -> String {
        return format!(r#"{{"titles":[{{"lang":"en","text":"{title}","primary":true}}],"whole_ref":"{whole_ref}"}}"#);
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let err = builder(&[RUTH, RUTH]).unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord { .. }), "{err}");
    }

    #[test]
    fn version_of_unknown_book_fails_to_build() {
        let version = r#"{"kind":"version","title":"Esther","language":"en","version_title":"V","text":[["a"]]}"#;
        let err = builder(&[RUTH, version]).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::BookName { .. }), "{err}");
    }

    #[test]
    fn shared_title_between_books_collides() {
        let other = RUTH.replace(r#""title":"Ruth""#, r#""title":"Megillat Ruth""#).replace(
            r#""key":"Ruth","titles":[{"lang":"en","text":"Ruth","primary":true}"#,
            r#""key":"Megillat Ruth","titles":[{"lang":"en","text":"Megillat Ruth","primary":true},{"lang":"en","text":"Ruth"}"#,
        );
        let err = builder(&[RUTH, &other]).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::TitleCollision { .. }), "{err}");
    }

    #[test]
    fn alt_structure_must_tile_its_whole_ref() {
        let good = ruth_with_alt(r#""Ruth 1:1-22","Ruth 2:1-23""#);
        let lib = builder(&[&good]).unwrap().build().unwrap();
        let part = lib.parse_ref("Ruth, Part 2").unwrap();
        assert_eq!(part.normal(&lib).unwrap(), "Ruth 2:1-23");

        let short = ruth_with_alt(r#""Ruth 1:1-22","Ruth 2:1-20""#);
        let err = builder(&[&short]).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::AltStructureInvalid { .. }), "{err}");
    }

    #[test]
    fn alt_nodes_must_follow_each_other() {
        let ordered = ruth_with_alt_nodes(&format!("{},{}", alt_node("First", "Ruth 1:1-2:5"), alt_node("Second", "Ruth 2:6-3:1")));
        let lib = builder(&[&ordered]).unwrap().build().unwrap();
        assert_eq!(lib.parse_ref("Ruth, Second").unwrap().normal(&lib).unwrap(), "Ruth 2:6-3:1");

        let overlapping = ruth_with_alt_nodes(&format!("{},{}", alt_node("First", "Ruth 1:1-2:5"), alt_node("Second", "Ruth 2:3-3:1")));
        let err = builder(&[&overlapping]).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::AltStructureInvalid { .. }), "{err}");

        let reversed = ruth_with_alt_nodes(&format!("{},{}", alt_node("First", "Ruth 2:1-3:1"), alt_node("Second", "Ruth 1:1-22")));
        let err = builder(&[&reversed]).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::AltStructureInvalid { .. }), "{err}");
    }

    #[test]
    fn refs_are_tied_to_their_snapshot() {
        let first = builder(&[RUTH]).unwrap().build().unwrap();
        let second = builder(&[RUTH]).unwrap().build().unwrap();
        let r = first.parse_ref("Ruth 1:1").unwrap();
        assert_eq!(r.normal(&first).unwrap(), "Ruth 1:1");

        assert!(matches!(second.index(r.book()), Err(Error::Input { .. })), "foreign id resolved");
        assert!(matches!(r.normal(&second), Err(Error::Input { .. })), "foreign ref rendered");
        assert!(matches!(second.text(&r, Lang::En, None), Err(Error::Input { .. })), "foreign ref read");
        assert_eq!(second.book_rank(r.book()), usize::MAX);
        assert_eq!(second.section_length(r.book(), r.node(), &[]), None);
    }

    #[test]
    fn versions_merge_by_priority() {
        let low = r#"{"kind":"version","title":"Ruth","language":"en","version_title":"Low","text":[["low 1:1","low 1:2"]]}"#;
        let high = r#"{"kind":"version","title":"Ruth","language":"en","version_title":"High","priority":5,"text":[["","high 1:2"]]}"#;
        let lib = builder(&[RUTH, low, high]).unwrap().build().unwrap();
        let chunk = lib.text(&lib.parse_ref("Ruth 1").unwrap(), Lang::En, None).unwrap();
        assert_eq!(
            chunk.content,
            Element::Nested(vec![Element::Leaf("low 1:1".to_string()), Element::Leaf("high 1:2".to_string())])
        );
        assert_eq!(chunk.sources, vec!["High".to_string(), "Low".to_string()]);
        let book = lib.index_id("Ruth").unwrap();
        let order: Vec<&str> = lib.versions(book, NodeId::ROOT).iter().map(|v| return v.id.title.as_str()).collect();
        assert_eq!(order, vec!["High", "Low"]);
    }
}
