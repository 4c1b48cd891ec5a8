//! Turn scanned spans into resolutions.
//!
//! A title naming one work resolves directly. A collective title names
//! several works; the context ref narrows them in tiers (the same work,
//! then commentaries on the context's book, then works sharing a base text
//! with it), and the address tail removes works where it does not fit.

use crate::index::Index;
use crate::lang::{Lang, normalize_title};
use crate::library::Library;
use crate::linker::{PartKind, RawRef, Resolution};
use crate::reference::Ref;
use crate::reference::parse::parse_relative;
use crate::title_index::TitleTarget;
use crate::types::{IndexId, NodeId};

/// Resolve one span. `previous` is the last unambiguous citation of the batch.
pub(crate) fn resolve(lib: &Library, raw: &RawRef, context: Option<&Ref>, previous: Option<&Ref>) -> Resolution {
    let tail = raw
        .parts
        .iter()
        .find(|part| return matches!(part.kind, PartKind::Numbered | PartKind::Range))
        .map(|part| return part.text.as_str());

    if raw.parts.iter().any(|part| return part.kind == PartKind::Ibid) {
        return resolve_ibid(lib, previous, tail);
    }
    let Some(title) = raw.parts.iter().find(|part| return part.kind == PartKind::Title) else {
        return Resolution::Unresolved("no title in span".to_string());
    };
    let Some(entry) = lib.titles().get(&normalize_title(&title.text)) else {
        return Resolution::Unresolved(format!("`{}` is not a known title", title.text));
    };

    let candidates: Vec<(IndexId, NodeId)> = match &entry.target {
        TitleTarget::Alt(_) => {
            return match lib.parse_ref(&raw.text) {
                Ok(found) => Resolution::Resolved(found),
                Err(err) => Resolution::Unresolved(err.to_string()),
            };
        },
        TitleTarget::Node { book, node } => vec![(*book, *node)],
        TitleTarget::Term { books, .. } => narrow(lib, books, context).into_iter().map(|b| return (b, NodeId::ROOT)).collect(),
    };

    let mut survivors = Vec::new();
    let mut last_error = None;
    for (book, node) in candidates {
        let Ok(index) = lib.index(book) else {
            continue;
        };
        let citation = format!("{} {}", index.schema.primary_path_title(node, Lang::En), tail.unwrap_or(""));
        match lib.parse_ref_in(citation.trim(), tail.map_or(Lang::En, Lang::detect)) {
            Ok(found) => survivors.push(found),
            Err(err) => last_error = Some(err.to_string()),
        }
    }
    if survivors.len() > 1 {
        return Resolution::Ambiguous(survivors);
    }
    return match survivors.pop() {
        Some(found) => Resolution::Resolved(found),
        None => Resolution::Unresolved(last_error.unwrap_or_else(|| return "no candidate work".to_string())),
    };
}

/// Narrow the works behind a collective title by context. Falls back to
/// every work when no tier matches.
fn narrow(lib: &Library, books: &[IndexId], context: Option<&Ref>) -> Vec<IndexId> {
    let Some(context) = context else {
        return books.to_vec();
    };
    let Ok(context_index) = lib.index(context.book()) else {
        return books.to_vec();
    };
    let tiers: [&dyn Fn(IndexId, &Index) -> bool; 3] = [
        &|book, _| return book == context.book(),
        &|_, index| return index.is_commentary_on(&context_index.title),
        &|_, index| {
            return index
                .base_text_titles
                .iter()
                .any(|base| return context_index.base_text_titles.contains(base));
        },
    ];
    for tier in tiers {
        let matched: Vec<IndexId> = books.iter().copied().filter(|b| return lib.index(*b).is_ok_and(|index| return tier(*b, index))).collect();
        if !matched.is_empty() {
            return matched;
        }
    }
    return books.to_vec();
}

/// Ibid: the previous citation itself, or with its deepest components replaced.
fn resolve_ibid(lib: &Library, previous: Option<&Ref>, tail: Option<&str>) -> Resolution {
    let Some(previous) = previous else {
        return Resolution::Unresolved("ibid with no earlier citation in this batch".to_string());
    };
    let Some(tail) = tail else {
        return Resolution::Resolved(previous.clone());
    };
    return match parse_relative(lib, previous, tail) {
        Ok(found) => Resolution::Resolved(found),
        Err(err) => Resolution::Unresolved(err.to_string()),
    };
}
