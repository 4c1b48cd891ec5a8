//! Citation text to `Ref`.
//!
//! Title first (longest known title ending at a word boundary), then the
//! address tail through the leaf's compiled grammar. URL forms
//! (`Genesis.1.1`, `Rashi_on_Genesis.1.1.1`) are folded to plain citations
//! before anything else.
//!
//! The end of a range replaces the deepest components of its start and is
//! never deeper than the start: `Genesis 1:3-2:5` and `Genesis 1-2` read,
//! but `Genesis 1-2:3` is rejected as an input error.

use crate::address::AddressGrammar;
use crate::error::Error;
use crate::lang::{Lang, Normalized};
use crate::library::Library;
use crate::reference::Ref;
use crate::title_index::TitleTarget;
use crate::types::{AltNodeId, IndexId, NodeId};

/// Characters that split a range.
const RANGE_DASHES: [char; 4] = ['-', '\u{2013}', '\u{2014}', '\u{05BE}'];

/// Parse a citation, reading its address in `lang` first and the other
/// language second.
///
/// # Errors
///
/// Returns `Error::BookName` for an unknown title, `Error::Input` for a bad
/// address, and `Error::PartialRefInput` for a container that takes no address.
pub(crate) fn parse(lib: &Library, text: &str, lang: Lang) -> Result<Ref, Error> {
    let cleaned = clean(text);
    if cleaned.is_empty() {
        return Err(Error::input(text, "empty citation"));
    }

    let normalized = Normalized::new(&cleaned);
    let Some((entry, matched)) = lib.titles().longest_prefix(&normalized.text) else {
        let guess = cleaned
            .split(|c: char| return c.is_ascii_digit())
            .next()
            .unwrap_or(&cleaned)
            .trim();
        return Err(Error::BookName {
            suggestions: lib.titles().suggest(guess),
            text: text.to_string(),
        });
    };
    let split = normalized.source_range(0..matched).end;
    let tail = cleaned.get(split..).unwrap_or("").trim();
    tracing::trace!(title = %entry.display, tail, "matched title");

    return match &entry.target {
        TitleTarget::Alt(id) => resolve_alt(lib, *id, tail, text),
        TitleTarget::Node { book, node } => resolve_node(lib, *book, *node, tail, text, lang),
        TitleTarget::Term { books, name } => match books.as_slice() {
            [only] => resolve_node(lib, *only, NodeId::ROOT, tail, text, lang),
            _ => Err(Error::input(
                text,
                format!("`{name}` is the collective title of {} works; name one of them", books.len()),
            )),
        },
    };
}

/// Read `left` with one grammar from level 0, then the end of a range.
fn read_with(grammar: &AddressGrammar, lang: Lang, left: &str, right: Option<&str>) -> Result<(Vec<u32>, Vec<u32>), String> {
    let Some(parts) = grammar.components(0, left) else {
        return Err(format!("cannot read `{left}` as an address"));
    };
    let (sections, mut to_sections) = read_components(grammar, lang, 0, &parts)?;
    if let Some(right) = right {
        read_end(grammar, lang, right, &mut to_sections)?;
    }
    return Ok((sections, to_sections));
}

/// Replace the trailing components of `to_sections` with the end of a
/// range, read from the deepest level where it fits exactly. An end with
/// more components than the start fits nowhere and is rejected.
fn read_end(grammar: &AddressGrammar, lang: Lang, right: &str, to_sections: &mut Vec<u32>) -> Result<(), String> {
    let Some((level, parts)) = fit_deepest(grammar, right, to_sections.len()) else {
        return Err(format!("cannot read `{right}` as the end of the range"));
    };
    let (_, end) = read_components(grammar, lang, level, &parts)?;
    to_sections.truncate(level);
    to_sections.extend(end);
    return Ok(());
}

/// Deepest starting level at which `text` fills the levels down to `depth` exactly.
fn fit_deepest<'t>(grammar: &AddressGrammar, text: &'t str, depth: usize) -> Option<(usize, Vec<&'t str>)> {
    return (0..depth).rev().find_map(|level| {
        return grammar
            .components(level, text)
            .filter(|parts| return level.saturating_add(parts.len()) == depth)
            .map(|parts| return (level, parts));
    });
}

/// Resolve a tail relative to `base`: k components replace the deepest k
/// components of `base`. An empty `base` path reads the tail from the top.
///
/// # Errors
///
/// Returns `Error::Input` if the tail does not fit `base`'s address space.
pub(crate) fn parse_relative(lib: &Library, base: &Ref, tail: &str) -> Result<Ref, Error> {
    let lang = Lang::detect(tail);
    let depth = base.sections().len();
    if depth == 0 {
        return resolve_node(lib, base.book(), base.node(), tail, tail, lang);
    }
    let (left, right) = split_range(tail);
    let mut last_reason = format!("cannot read `{tail}` against {}", base.normal(lib)?);
    for candidate in [lang, other(lang)] {
        let Some(grammar) = lib.grammar(base.book(), base.node(), candidate) else {
            continue;
        };
        let Some((level, parts)) = fit_deepest(grammar, left, depth) else {
            continue;
        };
        let read = read_components(grammar, candidate, level, &parts).and_then(|(start, end)| {
            let prefix = base.sections().get(..level).unwrap_or(&[]);
            let sections: Vec<u32> = prefix.iter().chain(&start).copied().collect();
            let mut to_sections: Vec<u32> = prefix.iter().chain(&end).copied().collect();
            if let Some(right) = right {
                read_end(grammar, candidate, right, &mut to_sections)?;
            }
            return Ok((sections, to_sections));
        });
        match read {
            Ok((sections, to_sections)) => {
                return Ref::build(lib, base.book(), base.node(), sections, to_sections)
                    .map_err(|reason| return Error::input(tail, reason));
            },
            Err(reason) => last_reason = reason,
        }
    }
    return Err(Error::input(tail, last_reason));
}

/// Positions of components starting at `level`: `(start, end)` paths where
/// only the last component may widen into a span (`Shabbat 2` is `2a-2b`).
fn read_components(grammar: &AddressGrammar, lang: Lang, level: usize, parts: &[&str]) -> Result<(Vec<u32>, Vec<u32>), String> {
    let mut start = Vec::with_capacity(parts.len());
    let mut end = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let Some(kind) = grammar.types().get(level.saturating_add(i)) else {
            return Err("too many address levels".to_string());
        };
        let (first, last) = kind.parse_span(part, lang).map_err(reason_of)?;
        start.push(first);
        end.push(if i.saturating_add(1) == parts.len() { last } else { first });
    }
    return Ok((start, end));
}

/// Strip the `Error::Input` wrapper, keeping the reason.
fn reason_of(err: Error) -> String {
    return match err {
        Error::Input { reason, .. } => reason,
        other => other.to_string(),
    };
}

/// Trim, fold URL form, and collapse whitespace.
fn clean(text: &str) -> String {
    let trimmed = text.trim();
    let looks_like_url = !trimmed.contains(char::is_whitespace) && (trimmed.contains('_') || url_split(trimmed).is_some());
    let folded = if looks_like_url { from_url(trimmed) } else { trimmed.to_string() };
    return folded.split_whitespace().collect::<Vec<_>>().join(" ");
}

/// `Rashi_on_Genesis.1.2.3` to `Rashi on Genesis 1:2:3`.
fn from_url(url: &str) -> String {
    let Some(split) = url_split(url) else {
        return url.replace('_', " ");
    };
    let title = url.get(..split).unwrap_or(url).replace('_', " ");
    let address = url.get(split.saturating_add(1)..).unwrap_or("").replace('.', ":");
    return format!("{title} {address}");
}

/// Alt-structure title: the whole node, or its nth subdivision.
fn resolve_alt(lib: &Library, id: AltNodeId, tail: &str, raw: &str) -> Result<Ref, Error> {
    let Some(node) = lib.alt_node(id) else {
        return Err(Error::input(raw, "unknown alternate structure node"));
    };
    if tail.is_empty() {
        return Ok(node.whole_ref.clone());
    }
    let position = tail
        .parse::<usize>()
        .ok()
        .or_else(|| return crate::hebrew::decode(tail).and_then(|n| return usize::try_from(n).ok()))
        .ok_or_else(|| return Error::input(raw, format!("`{tail}` is not a subdivision number")))?;
    return position
        .checked_sub(1)
        .and_then(|i| return node.refs.get(i))
        .cloned()
        .ok_or_else(|| return Error::input(raw, format!("there are only {} subdivisions", node.refs.len())));
}

/// A node title followed by an address tail (possibly empty).
fn resolve_node(lib: &Library, book: IndexId, node: NodeId, tail: &str, raw: &str, lang: Lang) -> Result<Ref, Error> {
    let schema = &lib.index(book)?.schema;
    if tail.is_empty() {
        return Ref::build(lib, book, node, Vec::new(), Vec::new()).map_err(|reason| return Error::input(raw, reason));
    }
    let Some(leaf) = schema.resolve_default_child(node) else {
        return Err(Error::PartialRefInput {
            matched: schema.primary_path_title(node, Lang::En),
            reason: "it is made of named parts and has no default part to take an address".to_string(),
            text: raw.to_string(),
        });
    };

    let (left, right) = split_range(tail);
    let mut last_reason = format!("cannot read `{tail}` as an address");
    for candidate in [lang, other(lang)] {
        let Some(grammar) = lib.grammar(book, leaf, candidate) else {
            continue;
        };
        match read_with(grammar, candidate, left, right) {
            Ok((sections, to_sections)) => {
                return Ref::build(lib, book, leaf, sections, to_sections).map_err(|reason| return Error::input(raw, reason));
            },
            Err(reason) => last_reason = reason,
        }
    }
    return Err(Error::input(raw, last_reason));
}

/// The other language.
const fn other(lang: Lang) -> Lang {
    return match lang {
        Lang::En => Lang::He,
        Lang::He => Lang::En,
    };
}

/// Split a tail at its first range dash.
fn split_range(tail: &str) -> (&str, Option<&str>) {
    return match tail.split_once(RANGE_DASHES) {
        Some((left, right)) => (left.trim(), Some(right.trim())),
        None => (tail, None),
    };
}

/// Byte offset of the dot that starts a URL address: the first `.` followed by a digit.
fn url_split(url: &str) -> Option<usize> {
    return url
        .char_indices()
        .zip(url.chars().skip(1))
        .find(|((_, c), next)| return *c == '.' && next.is_ascii_digit())
        .map(|((i, _), _)| return i);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_form_becomes_a_citation() {
        assert_eq!(clean("Rashi_on_Genesis.1.2.3"), "Rashi on Genesis 1:2:3");
        assert_eq!(clean("Genesis.1.29-2.3"), "Genesis 1:29-2:3");
        assert_eq!(clean("Shabbat.2a.5"), "Shabbat 2a:5");
        assert_eq!(clean("Pesach_Haggadah"), "Pesach Haggadah");
    }

    #[test]
    fn plain_citations_only_collapse_whitespace() {
        assert_eq!(clean("  Genesis   1.1 "), "Genesis 1.1");
        assert_eq!(clean("Gen."), "Gen.");
    }

    #[test]
    fn ranges_split_on_any_dash() {
        assert_eq!(split_range("1:1-5"), ("1:1", Some("5")));
        assert_eq!(split_range("1:1 \u{2013} 2:3"), ("1:1", Some("2:3")));
        assert_eq!(split_range("א׳:א׳\u{05BE}ב׳"), ("א׳:א׳", Some("ב׳")));
        assert_eq!(split_range("3"), ("3", None));
    }
}
