//! Schema trees: the structural outline of one text.
//!
//! A schema is an arena of nodes in document order. Containers hold named
//! parts; leaves hold the numbered address space (chapter, verse, ...).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::address::AddressType;
use crate::error::Error;
use crate::lang::{Lang, normalize_title};
use crate::types::NodeId;

/// One title in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// Language of the title.
    pub lang: Lang,
    /// True for the canonical title of its language.
    #[serde(default)]
    pub primary: bool,
    /// The title itself.
    pub text: String,
}

/// Titles of one node or term, with exactly one primary per language present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleGroup {
    /// All titles, primaries included.
    titles: Vec<Title>,
}

impl TitleGroup {
    /// Every title in the given language, primary first.
    pub fn all(&self, lang: Lang) -> Vec<&str> {
        let mut out: Vec<&str> = self.primary(lang).into_iter().collect();
        for title in &self.titles {
            if title.lang == lang && !title.primary {
                out.push(title.text.as_str());
            }
        }
        return out;
    }

    /// True when no titles are present.
    pub const fn is_empty(&self) -> bool {
        return self.titles.is_empty();
    }

    /// Check and complete a raw list: a language without a marked primary
    /// gets its first title promoted.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if a language has more than one
    /// primary or a title is blank.
    pub fn new(mut titles: Vec<Title>) -> Result<Self, String> {
        for lang in [Lang::En, Lang::He] {
            let primaries = titles.iter().filter(|t| return t.lang == lang && t.primary).count();
            if primaries > 1 {
                return Err(format!("more than one primary {lang} title"));
            }
            if primaries == 0
                && let Some(first) = titles.iter_mut().find(|t| return t.lang == lang)
            {
                first.primary = true;
            }
        }
        if titles.iter().any(|t| return t.text.trim().is_empty()) {
            return Err("blank title".to_string());
        }
        return Ok(Self { titles });
    }

    /// The primary title in `lang`, if the group has one.
    pub fn primary(&self, lang: Lang) -> Option<&str> {
        return self
            .titles
            .iter()
            .find(|t| return t.lang == lang && t.primary)
            .map(|t| return t.text.as_str());
    }

    /// Primary title in `lang`, falling back to English.
    pub fn primary_or_en(&self, lang: Lang) -> Option<&str> {
        return self.primary(lang).or_else(|| return self.primary(Lang::En));
    }
}

/// Separator list used when a node declares none.
fn default_separators() -> Vec<String> {
    return vec![", ".to_string()];
}

/// Record form of a schema node, as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Address type per depth. Leaves only.
    #[serde(default)]
    pub address_types: Vec<AddressType>,
    /// True when this node is addressed without naming it.
    #[serde(default)]
    pub default: bool,
    /// Optional explicit depth; must agree with `address_types`.
    #[serde(default)]
    pub depth: Option<usize>,
    /// Stable identifier among siblings.
    pub key: String,
    /// Declared lengths: `[sections, segments, ...]`. Only the first bounds parsing.
    #[serde(default)]
    pub lengths: Vec<u32>,
    /// Children. A node with children is a container.
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    /// Name per depth ("Chapter", "Verse"). Leaves only.
    #[serde(default)]
    pub section_names: Vec<String>,
    /// Term whose titles this node borrows.
    #[serde(default)]
    pub shared_title: Option<String>,
    /// Ways to join this node's title to its parent's.
    #[serde(default = "default_separators")]
    pub title_separators: Vec<String>,
    /// Own titles.
    #[serde(default)]
    pub titles: Vec<Title>,
}

/// Address space of a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSpec {
    /// Address type per depth.
    pub address_types: Vec<AddressType>,
    /// Declared lengths.
    pub lengths: Vec<u32>,
    /// Name per depth.
    pub section_names: Vec<String>,
}

impl LeafSpec {
    /// Number of addressable levels.
    pub const fn depth(&self) -> usize {
        return self.address_types.len();
    }
}

/// Structural role of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Named parts, in order.
    Container {
        /// Child nodes in document order.
        children: Vec<NodeId>,
    },
    /// Numbered content.
    Leaf(LeafSpec),
}

/// One node of the arena.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Addressed without naming it.
    pub default: bool,
    /// Stable identifier among siblings.
    pub key: String,
    /// Container or leaf.
    pub kind: NodeKind,
    /// Parent, `None` for the root.
    pub parent: Option<NodeId>,
    /// Ways to join this node's title to its parent's.
    pub title_separators: Vec<String>,
    /// Titles, already resolved from a shared term if one was named.
    pub titles: TitleGroup,
}

impl SchemaNode {
    /// Leaf depth, 0 for containers.
    pub const fn depth(&self) -> usize {
        return match &self.kind {
            NodeKind::Container { .. } => 0,
            NodeKind::Leaf(leaf) => leaf.depth(),
        };
    }

    /// The leaf spec, if this is a leaf.
    pub const fn leaf(&self) -> Option<&LeafSpec> {
        return match &self.kind {
            NodeKind::Container { .. } => None,
            NodeKind::Leaf(leaf) => Some(leaf),
        };
    }
}

/// Arena of one text's nodes. `NodeId(0)` is the root; ids are pre-order.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Leaf ordinal span `(first, last)` for every node.
    leaf_spans: Vec<(usize, usize)>,
    /// Leaf ids in document order.
    leaves: Vec<NodeId>,
    /// Nodes in pre-order.
    nodes: Vec<SchemaNode>,
}

impl Schema {
    /// Ancestors of `id`, root first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.node(id).and_then(|node| return node.parent);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.node(parent).and_then(|node| return node.parent);
        }
        chain.reverse();
        return chain;
    }

    /// Build and validate an arena from its record form.
    ///
    /// `terms` maps term names to their titles for `shared_title` lookups.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaInvalid` when a structural rule is broken.
    pub fn build(book: &str, spec: &NodeSpec, terms: &HashMap<String, TitleGroup>) -> Result<Self, Error> {
        if spec.default {
            return Err(Error::schema(book, "the root cannot be a default node"));
        }
        let mut schema = Self {
            leaf_spans: Vec::new(),
            leaves: Vec::new(),
            nodes: Vec::new(),
        };
        schema.push_node(book, spec, None, terms)?;
        schema.index_leaves();
        if schema.node(NodeId::ROOT).and_then(|root| return root.titles.primary(Lang::En)).is_none() {
            return Err(Error::schema(book, "the root needs an English title"));
        }
        return Ok(schema);
    }

    /// Child of `parent` with the given key.
    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        return self
            .children(parent)
            .iter()
            .copied()
            .find(|c| return self.node(*c).is_some_and(|child| return child.key == key));
    }

    /// Children of `id`, empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        return match self.node(id).map(|node| return &node.kind) {
            Some(NodeKind::Container { children }) => children,
            Some(NodeKind::Leaf(_)) | None => &[],
        };
    }

    /// Every title variant of `id` in `lang`: each combination of ancestor
    /// and own titles, joined with each declared separator.
    pub fn full_titles(&self, id: NodeId, lang: Lang) -> Vec<String> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let own = node.titles.all(lang);
        let Some(parent) = node.parent else {
            return own.into_iter().map(str::to_string).collect();
        };
        let prefixes = self.full_titles(parent, lang);
        if node.default || own.is_empty() {
            return prefixes;
        }

        let mut out = Vec::new();
        for prefix in &prefixes {
            for separator in &node.title_separators {
                for title in &own {
                    out.push(format!("{prefix}{separator}{title}"));
                }
            }
        }
        return out;
    }

    /// Position of a leaf among all leaves, `None` for containers.
    pub fn leaf_ordinal(&self, id: NodeId) -> Option<usize> {
        return self.leaves.iter().position(|leaf| return *leaf == id);
    }

    /// First and last leaf ordinals under `id` (inclusive).
    pub fn leaf_order_span(&self, id: NodeId) -> (usize, usize) {
        return self.leaf_spans.get(id.0).copied().unwrap_or_default();
    }

    /// Leaves in document order.
    pub fn leaves(&self) -> &[NodeId] {
        return &self.leaves;
    }

    /// Number of nodes in the arena.
    pub const fn len(&self) -> usize {
        return self.nodes.len();
    }

    /// Always false: a schema has at least its root.
    pub const fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    /// The node behind `id`, `None` for an id from another arena.
    pub fn node(&self, id: NodeId) -> Option<&SchemaNode> {
        return self.nodes.get(id.0);
    }

    /// Node ids in pre-order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        return (0..self.nodes.len()).map(NodeId);
    }

    /// Canonical title path of `id` in `lang` (English per node where the
    /// language has no title).
    pub fn primary_path_title(&self, id: NodeId, lang: Lang) -> String {
        let mut out = String::new();
        for step in self.ancestors(id).into_iter().chain(std::iter::once(id)) {
            let Some(node) = self.node(step) else {
                continue;
            };
            let Some(title) = node.titles.primary_or_en(lang) else {
                continue;
            };
            if node.parent.is_some() {
                out.push_str(node.title_separators.first().map_or(", ", String::as_str));
            }
            out.push_str(title);
        }
        return out;
    }

    /// Follow default children from `id` down to a leaf. A leaf resolves to itself.
    pub fn resolve_default_child(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = id;
        loop {
            match &self.node(cursor)?.kind {
                NodeKind::Leaf(_) => return Some(cursor),
                NodeKind::Container { children } => {
                    cursor = children.iter().copied().find(|c| return self.node(*c).is_some_and(|child| return child.default))?;
                },
            }
        }
    }

    /// The root node id.
    pub const fn root(&self) -> NodeId {
        return NodeId::ROOT;
    }

    // ── Construction ────────────────────────────────────────────────

    /// Record leaf order and per-node leaf spans after all nodes are pushed.
    fn index_leaves(&mut self) {
        self.leaves = (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| return self.node(*id).is_some_and(|node| return node.leaf().is_some()))
            .collect();
        let mut spans = vec![(0_usize, 0_usize); self.nodes.len()];
        for (position, node) in self.nodes.iter().enumerate().rev() {
            let id = NodeId(position);
            let span = match &node.kind {
                NodeKind::Leaf(_) => {
                    let ordinal = self.leaf_ordinal(id).unwrap_or_default();
                    (ordinal, ordinal)
                },
                NodeKind::Container { children } => {
                    let first = children.first().and_then(|c| return spans.get(c.0)).map_or(0, |s| return s.0);
                    let last = children.last().and_then(|c| return spans.get(c.0)).map_or(0, |s| return s.1);
                    (first, last)
                },
            };
            if let Some(slot) = spans.get_mut(id.0) {
                *slot = span;
            }
        }
        self.leaf_spans = spans;
    }

    /// Validate `spec`, append it and its subtree in pre-order, return its id.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaInvalid` when a structural rule is broken.
    fn push_node(
        &mut self,
        book: &str,
        spec: &NodeSpec,
        parent: Option<NodeId>,
        terms: &HashMap<String, TitleGroup>,
    ) -> Result<NodeId, Error> {
        let titles = resolve_titles(book, spec, terms)?;
        validate_titles(book, spec, &titles)?;
        if spec.title_separators.is_empty() {
            return Err(Error::schema(book, format!("node `{}` declares no title separators", spec.key)));
        }

        let id = NodeId(self.nodes.len());
        let kind = if spec.nodes.is_empty() {
            NodeKind::Leaf(leaf_spec(book, spec)?)
        } else {
            NodeKind::Container { children: Vec::new() }
        };
        self.nodes.push(SchemaNode {
            default: spec.default,
            key: spec.key.clone(),
            kind,
            parent,
            title_separators: spec.title_separators.clone(),
            titles,
        });

        if spec.nodes.is_empty() {
            return Ok(id);
        }
        validate_siblings(book, spec)?;
        let mut children = Vec::with_capacity(spec.nodes.len());
        for child in &spec.nodes {
            children.push(self.push_node(book, child, Some(id), terms)?);
        }
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.kind = NodeKind::Container { children };
        }
        return Ok(id);
    }
}

/// Turn a leaf record into a checked `LeafSpec`.
///
/// # Errors
///
/// Returns `Error::SchemaInvalid` when depth, names, and address types disagree.
fn leaf_spec(book: &str, spec: &NodeSpec) -> Result<LeafSpec, Error> {
    let depth = spec.address_types.len();
    if depth == 0 {
        return Err(Error::schema(book, format!("leaf `{}` declares no address types", spec.key)));
    }
    if spec.section_names.len() != depth {
        return Err(Error::schema(
            book,
            format!("leaf `{}` has {} section names for depth {depth}", spec.key, spec.section_names.len()),
        ));
    }
    if let Some(declared) = spec.depth
        && declared != depth
    {
        return Err(Error::schema(book, format!("leaf `{}` declares depth {declared} but has {depth} levels", spec.key)));
    }
    if spec.lengths.len() > depth {
        return Err(Error::schema(book, format!("leaf `{}` declares more lengths than levels", spec.key)));
    }
    return Ok(LeafSpec {
        address_types: spec.address_types.clone(),
        lengths: spec.lengths.clone(),
        section_names: spec.section_names.clone(),
    });
}

/// Own titles, or the named term's titles.
///
/// # Errors
///
/// Returns `Error::SchemaInvalid` for an unknown term or a bad title group.
fn resolve_titles(book: &str, spec: &NodeSpec, terms: &HashMap<String, TitleGroup>) -> Result<TitleGroup, Error> {
    if let Some(term) = &spec.shared_title {
        let Some(group) = terms.get(term) else {
            return Err(Error::schema(book, format!("node `{}` names unknown term `{term}`", spec.key)));
        };
        return Ok(group.clone());
    }
    return TitleGroup::new(spec.titles.clone())
        .map_err(|reason| return Error::schema(book, format!("node `{}`: {reason}", spec.key)));
}

/// Default nodes carry no titles; every other node needs an English one.
///
/// # Errors
///
/// Returns `Error::SchemaInvalid` when the rule is broken.
fn validate_titles(book: &str, spec: &NodeSpec, titles: &TitleGroup) -> Result<(), Error> {
    if spec.default && !titles.is_empty() {
        return Err(Error::schema(book, format!("default node `{}` must not carry titles", spec.key)));
    }
    if !spec.default && titles.primary(Lang::En).is_none() {
        return Err(Error::schema(book, format!("node `{}` needs an English title", spec.key)));
    }
    return Ok(());
}

/// Sibling keys and titles are unique; at most one default child.
///
/// # Errors
///
/// Returns `Error::SchemaInvalid` on the first violation.
fn validate_siblings(book: &str, spec: &NodeSpec) -> Result<(), Error> {
    let defaults = spec.nodes.iter().filter(|n| return n.default).count();
    if defaults > 1 {
        return Err(Error::schema(book, format!("node `{}` has {defaults} default children", spec.key)));
    }

    let mut keys = HashSet::new();
    let mut titles = HashSet::new();
    for child in &spec.nodes {
        if !keys.insert(child.key.as_str()) {
            return Err(Error::schema(book, format!("duplicate sibling key `{}`", child.key)));
        }
        for title in &child.titles {
            if !titles.insert((title.lang, normalize_title(&title.text))) {
                return Err(Error::schema(book, format!("duplicate sibling title `{}`", title.text)));
            }
        }
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(lang: Lang, text: &str) -> Title {
        return Title {
            lang,
            primary: false,
            text: text.to_string(),
        };
    }

    fn leaf(key: &str, en: &str, depth: usize) -> NodeSpec {
        return NodeSpec {
            address_types: vec![AddressType::Integer; depth],
            key: key.to_string(),
            section_names: vec!["Section".to_string(); depth],
            title_separators: default_separators(),
            titles: vec![title(Lang::En, en)],
            ..NodeSpec::default()
        };
    }

    fn kuzari() -> NodeSpec {
        let mut default = leaf("default", "unused", 2);
        default.default = true;
        default.titles.clear();
        return NodeSpec {
            key: "Kuzari".to_string(),
            nodes: vec![leaf("Introduction", "Introduction", 1), default],
            title_separators: default_separators(),
            titles: vec![title(Lang::En, "Kuzari"), title(Lang::He, "כוזרי")],
            ..NodeSpec::default()
        };
    }

    #[test]
    fn builds_preorder_arena_with_leaf_spans() {
        let schema = Schema::build("Kuzari", &kuzari(), &HashMap::new()).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.leaves(), &[NodeId(1), NodeId(2)]);
        assert_eq!(schema.leaf_order_span(NodeId::ROOT), (0, 1));
        assert_eq!(schema.leaf_order_span(NodeId(2)), (1, 1));
        assert_eq!(schema.ancestors(NodeId(2)), vec![NodeId::ROOT]);
    }

    #[test]
    fn default_child_is_followed_to_a_leaf() {
        let schema = Schema::build("Kuzari", &kuzari(), &HashMap::new()).unwrap();
        assert_eq!(schema.resolve_default_child(NodeId::ROOT), Some(NodeId(2)));
        assert_eq!(schema.resolve_default_child(NodeId(1)), Some(NodeId(1)));
    }

    #[test]
    fn full_titles_combine_ancestors_and_separators() {
        let mut spec = kuzari();
        if let Some(intro) = spec.nodes.first_mut() {
            intro.title_separators = vec![", ".to_string(), " ".to_string()];
            intro.titles.push(title(Lang::En, "Intro"));
        }
        let schema = Schema::build("Kuzari", &spec, &HashMap::new()).unwrap();
        let titles = schema.full_titles(NodeId(1), Lang::En);
        assert_eq!(titles.len(), 4);
        assert!(titles.contains(&"Kuzari, Introduction".to_string()), "{titles:?}");
        assert!(titles.contains(&"Kuzari Intro".to_string()), "{titles:?}");
        assert_eq!(schema.primary_path_title(NodeId(1), Lang::He), "כוזרי, Introduction");
        assert_eq!(schema.full_titles(NodeId(2), Lang::En), vec!["Kuzari".to_string()]);
    }

    #[test]
    fn rejects_two_default_children() {
        let mut spec = kuzari();
        if let Some(intro) = spec.nodes.first_mut() {
            intro.default = true;
            intro.titles.clear();
        }
        let err = Schema::build("Kuzari", &spec, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("default children"), "{err}");
    }

    #[test]
    fn rejects_titled_default_node() {
        let mut spec = kuzari();
        if let Some(default) = spec.nodes.get_mut(1) {
            default.titles.push(title(Lang::En, "Main"));
        }
        assert!(Schema::build("Kuzari", &spec, &HashMap::new()).is_err(), "default nodes carry no titles");
    }

    #[test]
    fn rejects_inconsistent_depth() {
        let mut spec = leaf("Genesis", "Genesis", 2);
        spec.section_names.pop();
        let err = Schema::build("Genesis", &spec, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("section names"), "{err}");
    }

    #[test]
    fn rejects_duplicate_sibling_titles() {
        let mut spec = kuzari();
        spec.nodes.insert(0, leaf("Preface", "introduction", 1));
        assert!(Schema::build("Kuzari", &spec, &HashMap::new()).is_err(), "sibling titles must be unique");
    }

    #[test]
    fn shared_titles_come_from_terms() {
        let mut spec = leaf("Bereshit", "unused", 1);
        spec.titles.clear();
        spec.shared_title = Some("Bereshit".to_string());
        let terms = HashMap::from([(
            "Bereshit".to_string(),
            TitleGroup::new(vec![title(Lang::En, "Bereshit"), title(Lang::He, "בראשית")]).unwrap(),
        )]);
        let schema = Schema::build("Bereshit", &spec, &terms).unwrap();
        assert_eq!(schema.node(NodeId::ROOT).unwrap().titles.primary(Lang::He), Some("בראשית"));
    }

    #[test]
    fn ids_outside_the_arena_find_nothing() {
        let schema = Schema::build("Kuzari", &kuzari(), &HashMap::new()).unwrap();
        let foreign = NodeId(schema.len());
        assert!(schema.node(foreign).is_none(), "node");
        assert!(schema.children(foreign).is_empty(), "children");
        assert!(schema.full_titles(foreign, Lang::En).is_empty(), "titles");
        assert_eq!(schema.resolve_default_child(foreign), None);
    }

    #[test]
    fn first_title_becomes_primary() {
        let group = TitleGroup::new(vec![title(Lang::En, "Genesis"), title(Lang::En, "Gen.")]).unwrap();
        assert_eq!(group.primary(Lang::En), Some("Genesis"));
        assert_eq!(group.all(Lang::En), vec!["Genesis", "Gen."]);
        assert_eq!(group.primary_or_en(Lang::He), Some("Genesis"));
    }
}
