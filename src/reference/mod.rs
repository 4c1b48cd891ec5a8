//! `Ref`: a structured, comparable address of a position or range in one text.
//!
//! A `Ref` names a book, a schema node, and 1-based `sections` /
//! `to_sections` paths of equal length. It caches its `OrderKey`, so
//! comparison and containment need no library access. Derived refs are new
//! values; a `Ref` never changes.

pub mod format;
pub mod navigate;
pub mod parse;
pub mod pattern;
pub mod range;

use std::cmp::Ordering;

use crate::error::Error;
use crate::lang::Lang;
use crate::library::Library;
use crate::schema::SchemaNode;
use crate::types::{IndexId, NodeId};

pub use pattern::RefPattern;

/// Total order over refs: library book order, then leaf order, then the
/// start path (padded with 0) ascending, then the end (padded with
/// `u32::MAX`) descending, then node pre-order so containers come first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderKey {
    /// Position of the book in library order.
    book_rank: usize,
    /// End path, padded with `u32::MAX` to the end leaf's depth.
    end: Vec<u32>,
    /// Ordinal of the last leaf covered.
    end_leaf: usize,
    /// Node pre-order id.
    node: NodeId,
    /// Start path, padded with 0 to the start leaf's depth.
    start: Vec<u32>,
    /// Ordinal of the first leaf covered.
    start_leaf: usize,
}

impl OrderKey {
    /// Last position covered.
    fn end_point(&self) -> (usize, &[u32]) {
        return (self.end_leaf, &self.end);
    }

    /// First position covered.
    fn start_point(&self) -> (usize, &[u32]) {
        return (self.start_leaf, &self.start);
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        return self
            .book_rank
            .cmp(&other.book_rank)
            .then_with(|| return self.start_point().cmp(&other.start_point()))
            .then_with(|| return other.end_point().cmp(&self.end_point()))
            .then_with(|| return self.node.cmp(&other.node));
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

/// A position or range in one text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    /// The book.
    book: IndexId,
    /// Leaf depth of `node`, 0 for containers.
    depth: usize,
    /// The schema node addressed.
    node: NodeId,
    /// Cached order key.
    order: OrderKey,
    /// 1-based start path.
    sections: Vec<u32>,
    /// 1-based end path, same length as `sections`.
    to_sections: Vec<u32>,
}

impl Ord for Ref {
    fn cmp(&self, other: &Self) -> Ordering {
        return self
            .order
            .cmp(&other.order)
            .then_with(|| return self.sections.cmp(&other.sections))
            .then_with(|| return self.to_sections.cmp(&other.to_sections));
    }
}

impl PartialOrd for Ref {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ref {
    /// Every segment-level ref inside this one, in order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when a section length is unknown.
    pub fn all_segment_refs(&self, lib: &Library) -> Result<Vec<Self>, Error> {
        return range::all_segment_refs(lib, self);
    }

    /// The book.
    pub const fn book(&self) -> IndexId {
        return self.book;
    }

    /// Validate and construct. Returns the reason on failure so callers can
    /// attach the citation text.
    pub(crate) fn build(
        lib: &Library,
        book: IndexId,
        node: NodeId,
        sections: Vec<u32>,
        to_sections: Vec<u32>,
    ) -> Result<Self, String> {
        let schema = &lib.index(book).map_err(|err| return err.to_string())?.schema;
        let Some(schema_node) = schema.node(node) else {
            return Err(format!("`{}` has no node #{}", schema.primary_path_title(NodeId::ROOT, Lang::En), node.0));
        };
        let depth = schema_node.depth();
        if sections.len() != to_sections.len() {
            return Err("start and end of the range have different lengths".to_string());
        }
        match schema_node.leaf() {
            None if !sections.is_empty() => {
                return Err(format!(
                    "`{}` is made of named parts and takes no address",
                    schema.primary_path_title(node, Lang::En)
                ));
            },
            None => {},
            Some(leaf) => {
                if sections.len() > depth {
                    return Err(format!("at most {depth} address levels are allowed here"));
                }
                if sections.iter().chain(&to_sections).any(|s| return *s == 0) {
                    return Err("addresses start at 1".to_string());
                }
                if to_sections < sections {
                    return Err("the range ends before it starts".to_string());
                }
                if let Some(&declared) = leaf.lengths.first()
                    && declared > 0
                    && to_sections.first().is_some_and(|top| return *top > declared)
                {
                    let name = leaf.section_names.first().map_or("section", String::as_str);
                    return Err(format!("there are only {declared} {}s", name.to_lowercase()));
                }
            },
        }

        let (start_leaf, end_leaf) = schema.leaf_order_span(node);
        let leaf_depth = |ordinal: usize| {
            return schema
                .leaves()
                .get(ordinal)
                .and_then(|leaf| return schema.node(*leaf))
                .map_or(0, SchemaNode::depth);
        };
        let order = OrderKey {
            book_rank: lib.book_rank(book),
            end: padded(&to_sections, leaf_depth(end_leaf), u32::MAX),
            end_leaf,
            node,
            start: padded(&sections, leaf_depth(start_leaf), 0),
            start_leaf,
        };
        return Ok(Self {
            book,
            depth,
            node,
            order,
            sections,
            to_sections,
        });
    }

    /// True when `other` lies entirely inside this ref. Equal spans are
    /// broken by node order, so a container contains its only leaf but not
    /// the other way round. False across books.
    pub fn contains(&self, other: &Self) -> bool {
        if self.book != other.book {
            return false;
        }
        let starts_before = self.order.start_point() <= other.order.start_point();
        let ends_after = other.order.end_point() <= self.order.end_point();
        if !(starts_before && ends_after) {
            return false;
        }
        let same_span = self.order.start_point() == other.order.start_point() && self.order.end_point() == other.order.end_point();
        return !same_span || self.node <= other.node;
    }

    /// Drop the deepest `level` address levels; ranges at higher levels are kept.
    pub fn context_ref(&self, level: usize) -> Self {
        let target = self.depth.saturating_sub(level);
        if self.sections.len() <= target {
            return self.clone();
        }
        return self.derive(prefix(&self.sections, target), prefix(&self.to_sections, target));
    }

    /// Leaf depth of the addressed node, 0 for containers.
    pub const fn depth(&self) -> usize {
        return self.depth;
    }

    /// Same node and paths with new sections; the order key is rebuilt
    /// from the cached one.
    fn derive(&self, sections: Vec<u32>, to_sections: Vec<u32>) -> Self {
        let order = OrderKey {
            end: padded(&to_sections, self.order.end.len(), u32::MAX),
            start: padded(&sections, self.order.start.len(), 0),
            ..self.order.clone()
        };
        return Self {
            order,
            sections,
            to_sections,
            ..self.clone()
        };
    }

    /// The last position as a point ref.
    pub fn ending_ref(&self) -> Self {
        return self.derive(self.to_sections.clone(), self.to_sections.clone());
    }

    /// First section with content at or after this ref's start.
    pub fn first_available_section_ref(&self, lib: &Library) -> Option<Self> {
        return navigate::first_available_section_ref(lib, self);
    }

    /// Canonical Hebrew form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when `lib` is not the snapshot that made this ref.
    pub fn he_normal(&self, lib: &Library) -> Result<String, Error> {
        return format::normal(lib, self, Lang::He);
    }

    /// This ref's start relative to `ancestor`: point levels of the
    /// ancestor are dropped, its first range level becomes an offset, and
    /// deeper levels stay absolute.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if `ancestor` does not contain this ref.
    pub fn in_terms_of(&self, lib: &Library, ancestor: &Self) -> Result<Vec<u32>, Error> {
        return range::in_terms_of(lib, self, ancestor);
    }

    /// True when no version has content anywhere in this ref.
    pub fn is_empty(&self, lib: &Library) -> bool {
        return navigate::is_empty(lib, self);
    }

    /// Canonical English form for error messages; the raw paths when `lib`
    /// cannot render this ref.
    pub(crate) fn label(&self, lib: &Library) -> String {
        return self
            .normal(lib)
            .unwrap_or_else(|_| return format!("{:?}-{:?}", self.sections, self.to_sections));
    }

    /// True when start and end differ.
    pub fn is_range(&self) -> bool {
        return self.sections != self.to_sections;
    }

    /// True when the ref addresses whole sections (one level above segments).
    pub const fn is_section_level(&self) -> bool {
        return self.depth > 0 && self.sections.len().saturating_add(1) == self.depth;
    }

    /// True when the ref addresses segments.
    pub const fn is_segment_level(&self) -> bool {
        return self.depth > 0 && self.sections.len() == self.depth;
    }

    /// True when the range crosses a section boundary.
    pub fn is_spanning(&self) -> bool {
        return self.is_range() && self.range_index().saturating_add(1) < self.depth;
    }

    /// Validate and construct a ref from parts.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when the parts break a ref invariant.
    pub fn new(lib: &Library, book: IndexId, node: NodeId, sections: Vec<u32>, to_sections: Vec<u32>) -> Result<Self, Error> {
        let label = format!("{} {sections:?}-{to_sections:?}", lib.index(book)?.schema.primary_path_title(node, Lang::En));
        return Self::build(lib, book, node, sections, to_sections).map_err(|reason| return Error::input(&label, reason));
    }

    /// Next section with content, crossing into following parts of the same book.
    pub fn next_section_ref(&self, lib: &Library) -> Option<Self> {
        return navigate::next_section_ref(lib, self);
    }

    /// The segment right after this ref's end, within the same node.
    pub fn next_segment_ref(&self, lib: &Library) -> Option<Self> {
        return navigate::next_segment_ref(lib, self);
    }

    /// The schema node addressed.
    pub const fn node(&self) -> NodeId {
        return self.node;
    }

    /// Canonical English form, e.g. `Genesis 1:29-2:3`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when `lib` is not the snapshot that made this ref.
    pub fn normal(&self, lib: &Library) -> Result<String, Error> {
        return format::normal(lib, self, Lang::En);
    }

    /// The cached order key.
    pub const fn order_id(&self) -> &OrderKey {
        return &self.order;
    }

    /// True when the two refs share at least one position. False across books.
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.book != other.book {
            return false;
        }
        let disjoint =
            self.order.end_point() < other.order.start_point() || other.order.end_point() < self.order.start_point();
        return !disjoint;
    }

    /// Extend to segment level: the start padded with 1s, the end padded
    /// with the last position of each level.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when a needed section length is unknown.
    pub fn padded_ref(&self, lib: &Library) -> Result<Self, Error> {
        return range::padded_ref(lib, self);
    }

    /// Anchored regular expression matching this ref's canonical form and
    /// every more specific ref inside it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when a range cannot be expanded.
    pub fn pattern(&self, lib: &Library, as_list: bool) -> Result<RefPattern, Error> {
        return pattern::regex(lib, self, as_list);
    }

    /// True when this ref ends before `other` starts. Across books, follows
    /// library book order.
    pub fn precedes(&self, other: &Self) -> bool {
        if self.book != other.book {
            return self.order.book_rank < other.order.book_rank;
        }
        return self.order.end_point() < other.order.start_point();
    }

    /// Previous section with content, crossing into earlier parts of the same book.
    pub fn prev_section_ref(&self, lib: &Library) -> Option<Self> {
        return navigate::prev_section_ref(lib, self);
    }

    /// Number of levels covered by the range, 0 for a point.
    pub fn range_depth(&self) -> usize {
        if !self.is_range() {
            return 0;
        }
        return self.depth.saturating_sub(self.range_index());
    }

    /// First level where start and end differ; the path length for a point.
    pub fn range_index(&self) -> usize {
        return self
            .sections
            .iter()
            .zip(&self.to_sections)
            .position(|(a, b)| return a != b)
            .unwrap_or(self.sections.len());
    }

    /// Every ref at this ref's own level inside the range, in order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when a section length is unknown.
    pub fn range_list(&self, lib: &Library) -> Result<Vec<Self>, Error> {
        return range::range_list(lib, self);
    }

    /// The section holding this ref's start; deeper ranges collapse into
    /// their section, shallower refs are padded with 1s.
    pub fn section_ref(&self) -> Self {
        if self.depth == 0 {
            return self.clone();
        }
        let level = self.depth.saturating_sub(1);
        if self.sections.len() >= level {
            return self.context_ref(1);
        }
        let mut sections = self.sections.clone();
        sections.resize(level, 1);
        return self.derive(sections.clone(), sections);
    }

    /// 1-based start path.
    pub fn sections(&self) -> &[u32] {
        return &self.sections;
    }

    /// Split a range crossing sections into a partial first section, every
    /// fully covered section, and a partial last section.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when a section length is unknown.
    pub fn split_spanning_ref(&self, lib: &Library) -> Result<Vec<Self>, Error> {
        return range::split_spanning_ref(lib, self);
    }

    /// The first position as a point ref.
    pub fn starting_ref(&self) -> Self {
        return self.derive(self.sections.clone(), self.sections.clone());
    }

    /// One level deeper: `Genesis 1` with 3 gives `Genesis 1:3`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` for ranges, segment-level refs, and positions
    /// out of range.
    pub fn subref(&self, lib: &Library, position: u32) -> Result<Self, Error> {
        let label = self.normal(lib)?;
        if self.is_range() {
            return Err(Error::input(&label, "a range has no single sub-position"));
        }
        if self.sections.len() >= self.depth {
            return Err(Error::input(&label, "already at the deepest level"));
        }
        let mut sections = self.sections.clone();
        sections.push(position);
        return Self::build(lib, self.book, self.node, sections.clone(), sections).map_err(|reason| return Error::input(&label, reason));
    }

    /// Range from this ref's start to `other`'s end.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when the refs address different nodes or
    /// levels, or `other` ends before this starts.
    pub fn to(&self, lib: &Library, other: &Self) -> Result<Self, Error> {
        let label = format!("{}-{}", self.normal(lib)?, other.normal(lib)?);
        if self.book != other.book || self.node != other.node {
            return Err(Error::input(&label, "both ends must be in the same part of the same book"));
        }
        return Self::build(lib, self.book, self.node, self.sections.clone(), other.to_sections.clone())
            .map_err(|reason| return Error::input(&label, reason));
    }

    /// 1-based end path.
    pub fn to_sections(&self) -> &[u32] {
        return &self.to_sections;
    }

    /// The top-level section holding this ref's start.
    pub fn top_section_ref(&self) -> Self {
        if self.depth == 0 {
            return self.clone();
        }
        let top = vec![self.sections.first().copied().unwrap_or(1)];
        return self.derive(top.clone(), top);
    }

    /// URL form, e.g. `Genesis.1.29-2.3`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` when `lib` is not the snapshot that made this ref.
    pub fn url(&self, lib: &Library) -> Result<String, Error> {
        return format::url(lib, self);
    }
}

/// `path` extended to `len` with `fill`.
fn padded(path: &[u32], len: usize, fill: u32) -> Vec<u32> {
    let mut out = path.to_vec();
    if out.len() < len {
        out.resize(len, fill);
    }
    return out;
}

/// First `len` components of `path`.
fn prefix(path: &[u32], len: usize) -> Vec<u32> {
    return path.get(..len).unwrap_or(path).to_vec();
}

/// 1-based path to 0-based indices.
pub(crate) fn zero_based(path: &[u32]) -> Vec<usize> {
    return path
        .iter()
        .map(|p| return usize::try_from(p.saturating_sub(1)).unwrap_or(usize::MAX))
        .collect();
}
