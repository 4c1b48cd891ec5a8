//! Section-to-section navigation over content shapes.
//!
//! Sections without content in any version are skipped. Moving past the
//! first or last section of a leaf continues in the neighbouring leaf of
//! the same book.

use crate::library::Library;
use crate::reference::{Ref, zero_based};
use crate::schema::SchemaNode;
use crate::types::{IndexId, NodeId};

/// First section with content at or after `r`'s start; for containers, the
/// first one in any of their leaves.
pub(crate) fn first_available_section_ref(lib: &Library, r: &Ref) -> Option<Ref> {
    let schema = &lib.index(r.book()).ok()?.schema;
    if r.depth() == 0 {
        let (first, last) = schema.leaf_order_span(r.node());
        return schema
            .leaves()
            .iter()
            .skip(first)
            .take(last.saturating_sub(first).saturating_add(1))
            .find_map(|leaf| return first_section(lib, r.book(), *leaf));
    }

    let level = r.depth().saturating_sub(1);
    let from: Vec<u32> = r.sections().iter().take(level).copied().collect();
    if let Some(path) = sections_with_content(lib, r.book(), r.node()).into_iter().find(|path| return *path >= from) {
        return section(lib, r.book(), r.node(), path);
    }
    return following_leaves(lib, r.book(), r.node())
        .into_iter()
        .find_map(|leaf| return first_section(lib, r.book(), leaf));
}

/// First section of a leaf that holds content.
fn first_section(lib: &Library, book: IndexId, leaf: NodeId) -> Option<Ref> {
    let path = sections_with_content(lib, book, leaf).into_iter().next()?;
    return section(lib, book, leaf, path);
}

/// Leaves after `node` in document order.
fn following_leaves(lib: &Library, book: IndexId, node: NodeId) -> Vec<NodeId> {
    let Ok(index) = lib.index(book) else {
        return Vec::new();
    };
    let schema = &index.schema;
    let Some(ordinal) = schema.leaf_ordinal(node) else {
        return Vec::new();
    };
    return schema.leaves().iter().skip(ordinal.saturating_add(1)).copied().collect();
}

/// Last section of a leaf that holds content.
fn last_section(lib: &Library, book: IndexId, leaf: NodeId) -> Option<Ref> {
    let path = sections_with_content(lib, book, leaf).pop()?;
    return section(lib, book, leaf, path);
}

/// True when no version has content anywhere in `r`.
pub(crate) fn is_empty(lib: &Library, r: &Ref) -> bool {
    if r.depth() == 0 {
        let Ok(index) = lib.index(r.book()) else {
            return true;
        };
        let schema = &index.schema;
        let (first, last) = schema.leaf_order_span(r.node());
        return schema
            .leaves()
            .iter()
            .skip(first)
            .take(last.saturating_sub(first).saturating_add(1))
            .all(|leaf| return lib.shape(r.book(), *leaf).is_none_or(|shape| return shape.is_blank()));
    }
    let Some(shape) = lib.shape(r.book(), r.node()) else {
        return true;
    };
    if r.sections().is_empty() {
        return shape.is_blank();
    }
    return shape.project(&zero_based(r.sections()), &zero_based(r.to_sections())).is_blank();
}

/// Next section with content after `r`'s end.
pub(crate) fn next_section_ref(lib: &Library, r: &Ref) -> Option<Ref> {
    if r.depth() == 0 {
        return None;
    }
    let current = section_path(r, r.to_sections());
    if let Some(path) = sections_with_content(lib, r.book(), r.node()).into_iter().find(|path| return *path > current) {
        return section(lib, r.book(), r.node(), path);
    }
    return following_leaves(lib, r.book(), r.node())
        .into_iter()
        .find_map(|leaf| return first_section(lib, r.book(), leaf));
}

/// The segment right after `r`'s end within the same leaf, carrying into
/// the next section when the current one is exhausted.
pub(crate) fn next_segment_ref(lib: &Library, r: &Ref) -> Option<Ref> {
    let depth = r.depth();
    if depth == 0 {
        return None;
    }
    let mut path = r.to_sections().to_vec();
    while path.len() < depth {
        let last = lib.section_length(r.book(), r.node(), &path)?;
        path.push(last);
    }
    for level in (0..depth).rev() {
        let (Some(parent), Some(&current)) = (path.get(..level), path.get(level)) else {
            continue;
        };
        let limit = lib.section_length(r.book(), r.node(), parent)?;
        if current < limit {
            path.truncate(level);
            path.push(current.saturating_add(1));
            path.resize(depth, 1);
            return Ref::build(lib, r.book(), r.node(), path.clone(), path).ok();
        }
    }
    return None;
}

/// Previous section with content before `r`'s start.
pub(crate) fn prev_section_ref(lib: &Library, r: &Ref) -> Option<Ref> {
    if r.depth() == 0 {
        return None;
    }
    let current = section_path(r, r.sections());
    if let Some(path) = sections_with_content(lib, r.book(), r.node()).into_iter().rev().find(|path| return *path < current) {
        return section(lib, r.book(), r.node(), path);
    }
    let schema = &lib.index(r.book()).ok()?.schema;
    let ordinal = schema.leaf_ordinal(r.node())?;
    return schema
        .leaves()
        .iter()
        .take(ordinal)
        .rev()
        .find_map(|leaf| return last_section(lib, r.book(), *leaf));
}

/// A section-level ref for a 1-based section path.
fn section(lib: &Library, book: IndexId, node: NodeId, path: Vec<u32>) -> Option<Ref> {
    return Ref::build(lib, book, node, path.clone(), path).ok();
}

/// The section holding `position`, padded with 1s when shallower.
fn section_path(r: &Ref, position: &[u32]) -> Vec<u32> {
    let level = r.depth().saturating_sub(1);
    let mut path: Vec<u32> = position.iter().take(level).copied().collect();
    path.resize(level, 1);
    return path;
}

/// 1-based section paths of a leaf that hold content, in order. A leaf of
/// depth 1 is a single section with the empty path.
fn sections_with_content(lib: &Library, book: IndexId, node: NodeId) -> Vec<Vec<u32>> {
    let Some(shape) = lib.shape(book, node) else {
        return Vec::new();
    };
    let level = lib
        .index(book)
        .ok()
        .and_then(|index| return index.schema.node(node))
        .map_or(0, SchemaNode::depth)
        .saturating_sub(1);
    if level == 0 {
        return if shape.is_blank() { Vec::new() } else { vec![Vec::new()] };
    }
    return shape
        .non_blank_paths(level)
        .into_iter()
        .map(|path| {
            return path
                .into_iter()
                .map(|i| return u32::try_from(i.saturating_add(1)).unwrap_or(u32::MAX))
                .collect();
        })
        .collect();
}
