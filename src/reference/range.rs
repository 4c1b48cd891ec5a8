//! Range operations that need section lengths, and alt-structure checks.
//!
//! Lengths come from the merged content shape of a leaf, with the declared
//! top-level length as a fallback. Operations that cannot learn a length
//! they need fail instead of guessing.

use crate::error::Error;
use crate::index::AltNode;
use crate::library::Library;
use crate::reference::Ref;

/// Every segment-level ref inside `r`. Sections without content contribute
/// nothing.
pub(crate) fn all_segment_refs(lib: &Library, r: &Ref) -> Result<Vec<Ref>, Error> {
    let mut out = Vec::new();
    if r.depth() == 0 {
        let schema = &lib.index(r.book())?.schema;
        let (first, last) = schema.leaf_order_span(r.node());
        for leaf in schema.leaves().iter().skip(first).take(last.saturating_sub(first).saturating_add(1)) {
            let whole = Ref::new(lib, r.book(), *leaf, Vec::new(), Vec::new())?;
            expand(lib, &whole, whole.depth(), false, &mut out)?;
        }
        return Ok(out);
    }
    for item in range_list(lib, r)? {
        expand(lib, &item, r.depth(), false, &mut out)?;
    }
    return Ok(out);
}

/// Compare neighbours: `a` must end before `b` starts, and where lengths
/// are known `b` must start right after `a`.
fn check_adjacent(lib: &Library, a: &Ref, b: &Ref) -> Result<(), String> {
    if !a.precedes(b) {
        return Err(format!("`{}` does not end before `{}` starts", a.label(lib), b.label(lib)));
    }
    if let Some(next) = a.next_segment_ref(lib)
        && next.sections() != start_path(b).as_slice()
    {
        return Err(format!("`{}` and `{}` leave a gap", a.label(lib), b.label(lib)));
    }
    return Ok(());
}

/// Push the refs at `target` length inside `piece`. Whole sections are
/// expanded through their lengths; unknown lengths fail when `strict`,
/// otherwise contribute nothing.
fn expand(lib: &Library, piece: &Ref, target: usize, strict: bool, out: &mut Vec<Ref>) -> Result<(), Error> {
    let len = piece.sections().len();
    if len < target && !piece.is_range() {
        let count = match lib.section_length(piece.book(), piece.node(), piece.sections()) {
            Some(count) => count,
            None if strict => return Err(unknown_length(lib, piece, piece.sections())),
            None => return Ok(()),
        };
        for position in 1..=count {
            let mut path = piece.sections().to_vec();
            path.push(position);
            let child = Ref::new(lib, piece.book(), piece.node(), path.clone(), path)?;
            expand(lib, &child, target, strict, out)?;
        }
        return Ok(());
    }
    if len < target {
        for item in range_list(lib, piece)? {
            expand(lib, &item, target, strict, out)?;
        }
        return Ok(());
    }

    let head = piece.sections().get(..len.saturating_sub(1)).unwrap_or(&[]);
    let (Some(&first), Some(&last)) = (piece.sections().last(), piece.to_sections().last()) else {
        out.push(piece.clone());
        return Ok(());
    };
    for position in first..=last {
        let mut path = head.to_vec();
        path.push(position);
        out.push(Ref::new(lib, piece.book(), piece.node(), path.clone(), path)?);
    }
    return Ok(());
}

/// Inverse of `in_terms_of`.
pub(crate) fn from_relative(lib: &Library, ancestor: &Ref, path: &[u32]) -> Result<Ref, Error> {
    let base = ancestor.sections();
    let mut sections = if ancestor.is_range() {
        let range_index = ancestor.range_index();
        let mut out = base.get(..range_index).unwrap_or(base).to_vec();
        for (offset, &position) in path.iter().enumerate() {
            let level = range_index.saturating_add(offset);
            let start = base.get(level).copied().unwrap_or(1);
            out.push(position.saturating_add(start).saturating_sub(1));
            if position != 1 || base.len() <= level.saturating_add(1) {
                out.extend(path.get(offset.saturating_add(1)..).unwrap_or(&[]));
                break;
            }
        }
        out
    } else {
        base.iter().chain(path).copied().collect()
    };
    sections.truncate(ancestor.depth());

    let found = Ref::new(lib, ancestor.book(), ancestor.node(), sections.clone(), sections)?;
    if !ancestor.contains(&found) {
        return Err(Error::input(
            &found.label(lib),
            format!("{path:?} falls outside {}", ancestor.label(lib)),
        ));
    }
    return Ok(found);
}

/// `r`'s start expressed relative to `ancestor`.
pub(crate) fn in_terms_of(lib: &Library, r: &Ref, ancestor: &Ref) -> Result<Vec<u32>, Error> {
    if r.node() != ancestor.node() || !ancestor.contains(r) {
        return Err(Error::input(&r.label(lib), format!("not inside {}", ancestor.label(lib))));
    }
    let base = ancestor.sections();
    let own = r.sections();
    if !ancestor.is_range() {
        return Ok(own.get(base.len()..).unwrap_or(&[]).to_vec());
    }

    let mut out = Vec::new();
    for level in ancestor.range_index()..r.depth() {
        let (Some(&position), Some(&start)) = (own.get(level), base.get(level)) else {
            break;
        };
        out.push(position.saturating_add(1).saturating_sub(start));
        if position != start || base.len() <= level.saturating_add(1) {
            out.extend(own.get(level.saturating_add(1)..).unwrap_or(&[]));
            break;
        }
    }
    return Ok(out);
}

/// Extend `r` to segment level.
pub(crate) fn padded_ref(lib: &Library, r: &Ref) -> Result<Ref, Error> {
    let depth = r.depth();
    if depth == 0 {
        return Err(Error::input(&r.label(lib), "a container has no positions to pad"));
    }
    if r.is_segment_level() {
        return Ok(r.clone());
    }
    let mut start = r.sections().to_vec();
    start.resize(depth, 1);
    let mut end = r.to_sections().to_vec();
    while end.len() < depth {
        let Some(last) = lib.section_length(r.book(), r.node(), &end) else {
            return Err(unknown_length(lib, r, &end));
        };
        end.push(last);
    }
    return Ref::new(lib, r.book(), r.node(), start, end);
}

/// Every ref at `r`'s own level inside the range.
pub(crate) fn range_list(lib: &Library, r: &Ref) -> Result<Vec<Ref>, Error> {
    if !r.is_range() {
        return Ok(vec![r.clone()]);
    }
    let target = r.sections().len();
    let mut out = Vec::new();
    for piece in split_spanning_ref(lib, r)? {
        expand(lib, &piece, target, true, &mut out)?;
    }
    return Ok(out);
}

/// Split at the first level where start and end differ. The first and
/// last pieces keep their partial paths; sections in between are whole.
pub(crate) fn split_spanning_ref(lib: &Library, r: &Ref) -> Result<Vec<Ref>, Error> {
    if !r.is_spanning() {
        return Ok(vec![r.clone()]);
    }
    let level = r.range_index();
    let start = r.sections();
    let end = r.to_sections();
    let shared = start.get(..level).unwrap_or(&[]);
    let (Some(&first), Some(&last)) = (start.get(level), end.get(level)) else {
        return Ok(vec![r.clone()]);
    };
    let deeper = start.len().saturating_sub(level).saturating_sub(1);

    let mut pieces = Vec::new();
    for position in first..=last {
        let mut head = shared.to_vec();
        head.push(position);
        let partial_start = position == first && start.get(level.saturating_add(1)..).is_some_and(|rest| return rest.iter().any(|p| return *p != 1));
        let partial_end = position == last && deeper > 0;
        if !partial_start && !partial_end {
            pieces.push(Ref::new(lib, r.book(), r.node(), head.clone(), head)?);
            continue;
        }

        let mut piece_start = head.clone();
        if position == first {
            piece_start.extend(start.get(level.saturating_add(1)..).unwrap_or(&[]));
        } else {
            piece_start.resize(head.len().saturating_add(deeper), 1);
        }
        let mut piece_end = head.clone();
        if position == last {
            piece_end.extend(end.get(level.saturating_add(1)..).unwrap_or(&[]));
        } else {
            while piece_end.len() < start.len() {
                let Some(len) = lib.section_length(r.book(), r.node(), &piece_end) else {
                    return Err(unknown_length(lib, r, &piece_end));
                };
                piece_end.push(len);
            }
        }
        let piece = Ref::new(lib, r.book(), r.node(), piece_start, piece_end)?;
        pieces.extend(split_spanning_ref(lib, &piece)?);
    }
    return Ok(pieces);
}

/// Start path padded with 1s to segment level.
fn start_path(r: &Ref) -> Vec<u32> {
    let mut path = r.sections().to_vec();
    if path.len() < r.depth() {
        path.resize(r.depth(), 1);
    }
    return path;
}

/// Error for a length that neither content nor the schema declares.
fn unknown_length(lib: &Library, r: &Ref, path: &[u32]) -> Error {
    return Error::input(
        &r.label(lib),
        format!("the length of section {path:?} is unknown; no version has content there"),
    );
}

/// Alt-structure nodes must follow each other without overlap or gaps, and
/// each node's subdivisions must tile it.
pub(crate) fn validate_alt_nodes(lib: &Library, nodes: &[AltNode]) -> Result<(), String> {
    for pair in nodes.windows(2) {
        if let [a, b] = pair {
            check_adjacent(lib, &a.whole_ref, &b.whole_ref)?;
        }
    }
    for node in nodes {
        let (Some(first), Some(last)) = (node.refs.first(), node.refs.last()) else {
            continue;
        };
        let whole = &node.whole_ref;
        if start_path(first) != start_path(whole) || last.ending_ref() != whole.ending_ref() {
            return Err(format!("the subdivisions of `{}` do not cover it exactly", whole.label(lib)));
        }
        for pair in node.refs.windows(2) {
            if let [a, b] = pair {
                check_adjacent(lib, a, b)?;
            }
        }
    }
    return Ok(());
}
