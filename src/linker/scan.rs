//! Candidate citation spans in prose.
//!
//! Matching runs on the normalized text of each markup-free run, so titles
//! match regardless of case and Hebrew points. Spans are mapped back to the
//! original input before they leave this module.

use std::ops::Range;

use regex::{Captures, Regex, RegexBuilder};

use crate::error::Error;
use crate::lang::{Lang, Normalized};
use crate::library::Library;
use crate::linker::markup::{self, Run};
use crate::linker::{PartKind, RawRef, RefPart};

/// Compiled size ceiling for the title alternations.
const REGEX_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// English address tail: `1`, `1:2`, `2a`, `1:2-3:4`.
const EN_TAIL: &str = r"\d+[a-d]?(?:\s*[:.]\s*\d+[a-d]?)*(?:\s*[-\x{2013}\x{2014}]\s*\d+[a-d]?(?:\s*[:.]\s*\d+[a-d]?)*)?";

/// Hebrew address tail: gematria or digits, `ע״א` sides, comma or colon separators.
const HE_TAIL: &str = r#"(?:\d+|[\x{05D0}-\x{05EA}]+(?:[\x{05F3}\x{05F4}'"][\x{05D0}-\x{05EA}]*)*)(?:(?:\s*[:.,]\s*|\s+)(?:\d+|[\x{05D0}-\x{05EA}]+(?:[\x{05F3}\x{05F4}'"][\x{05D0}-\x{05EA}]*)*))*(?:\s*[-\x{2013}\x{2014}]\s*(?:\d+|[\x{05D0}-\x{05EA}]+(?:[\x{05F3}\x{05F4}'"][\x{05D0}-\x{05EA}]*)*)(?:(?:\s*[:.,]\s*|\s+)(?:\d+|[\x{05D0}-\x{05EA}]+(?:[\x{05F3}\x{05F4}'"][\x{05D0}-\x{05EA}]*)*))*)?"#;

/// Pattern that never matches, for a language with no titles.
const NEVER: &str = r"[^\s\S]";

/// Compiled matchers for one library snapshot.
#[derive(Debug, Clone)]
pub struct Scanner {
    /// English titles with tails, and `ibid.`.
    english: Regex,
    /// Parenthesized groups.
    groups: Regex,
    /// Hebrew title with a tail, anchored at the end of a group piece.
    hebrew: Regex,
    /// Hebrew ibid filling a whole group piece.
    hebrew_ibid: Regex,
}

impl Scanner {
    /// Compile matchers over every title of `lib`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if an expression exceeds the size limit.
    pub fn new(lib: &Library) -> Result<Self, Error> {
        let english_titles = title_alternation(lib, Lang::En);
        let hebrew_titles = title_alternation(lib, Lang::He);
        let english = format!(
            r"\b(?:(?P<title>{english_titles})\s+(?P<tail>{EN_TAIL})\b|(?P<ibid>ibid\b\.?)(?:,?\s+(?P<itail>{EN_TAIL})\b)?)"
        );
        let hebrew = format!(r"(?:^|[\s,;:])(?P<title>{hebrew_titles})(?:\s*,\s*|\s+)(?P<tail>{HE_TAIL})\s*$");
        let hebrew_ibid = format!(r"^\s*(?P<ibid>\x{{05E9}}\x{{05DD}})(?:(?:\s*,\s*|\s+)(?P<itail>{HE_TAIL}))?\s*$");
        return Ok(Self {
            english: compile(&english)?,
            groups: compile(r"\(([^()]*)\)")?,
            hebrew: compile(&hebrew)?,
            hebrew_ibid: compile(&hebrew_ibid)?,
        });
    }

    /// Candidate spans of `input` in order of appearance.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedMarkup` if the markup cannot be followed.
    pub fn scan(&self, input: &str) -> Result<Vec<RawRef>, Error> {
        let mut found = Vec::new();
        for run in markup::text_runs(input)? {
            let normalized = Normalized::new(run.text);
            for captures in self.english.captures_iter(&normalized.text) {
                if let Some(raw) = raw_ref(&run, &normalized, &captures) {
                    found.push(raw);
                }
            }
            for group in self.groups.captures_iter(&normalized.text) {
                let Some(inner) = group.get(1) else {
                    continue;
                };
                self.scan_group(&run, &normalized, inner.start(), inner.as_str(), &mut found);
            }
        }
        found.sort_by_key(|raw| return raw.byte_span.start);
        found.dedup_by(|later, earlier| return later.byte_span.start < earlier.byte_span.end);
        tracing::trace!(spans = found.len(), "scanned");
        return Ok(found);
    }

    /// Hebrew citations inside one parenthesized group, `;`-separated.
    fn scan_group(&self, run: &Run<'_>, normalized: &Normalized, offset: usize, inner: &str, out: &mut Vec<RawRef>) {
        let mut piece_start = offset;
        for piece in inner.split(';') {
            for regex in [&self.hebrew, &self.hebrew_ibid] {
                let Some(captures) = regex.captures(piece) else {
                    continue;
                };
                let shifted = ShiftedCaptures {
                    captures: &captures,
                    offset: piece_start,
                };
                if let Some(raw) = shifted.raw_ref(run, normalized) {
                    out.push(raw);
                }
                break;
            }
            piece_start = piece_start.saturating_add(piece.len()).saturating_add(1);
        }
    }
}

/// Captures of a sub-slice, with their offset into the normalized run.
struct ShiftedCaptures<'c, 'h> {
    /// Captures within the sub-slice.
    captures: &'c Captures<'h>,
    /// Byte offset of the sub-slice in the normalized run.
    offset: usize,
}

impl ShiftedCaptures<'_, '_> {
    /// Byte range of a named group in the normalized run.
    fn range(&self, name: &str) -> Option<Range<usize>> {
        let found = self.captures.name(name)?;
        return Some(found.start().saturating_add(self.offset)..found.end().saturating_add(self.offset));
    }

    /// Assemble the parts into a `RawRef`.
    fn raw_ref(&self, run: &Run<'_>, normalized: &Normalized) -> Option<RawRef> {
        let mut parts = Vec::new();
        if let Some(title) = self.range("title") {
            parts.push(part(run, normalized, title, PartKind::Title));
        }
        if let Some(ibid) = self.range("ibid") {
            parts.push(part(run, normalized, ibid, PartKind::Ibid));
        }
        for name in ["tail", "itail"] {
            if let Some(tail) = self.range(name) {
                let text = normalized.text.get(tail.clone()).unwrap_or("");
                let kind = if text.contains(['-', '\u{2013}', '\u{2014}']) { PartKind::Range } else { PartKind::Numbered };
                parts.push(part(run, normalized, tail, kind));
            }
        }
        let first = parts.first()?;
        let last = parts.last()?;
        let byte_span = first.byte_span.start..last.byte_span.end;
        let char_span = first.char_span.start..last.char_span.end;
        let text = run
            .text
            .get(byte_span.start.saturating_sub(run.byte_start)..byte_span.end.saturating_sub(run.byte_start))
            .unwrap_or("")
            .to_string();
        return Some(RawRef {
            byte_span,
            char_span,
            parts,
            text,
        });
    }
}

/// Build a `RawRef` from captures over the whole normalized run.
fn raw_ref(run: &Run<'_>, normalized: &Normalized, captures: &Captures<'_>) -> Option<RawRef> {
    return ShiftedCaptures { captures, offset: 0 }.raw_ref(run, normalized);
}

/// Compile with the raised size limit.
fn compile(pattern: &str) -> Result<Regex, Error> {
    return Ok(RegexBuilder::new(pattern).size_limit(REGEX_SIZE_LIMIT).build()?);
}

/// One part, with spans mapped back to the original input.
fn part(run: &Run<'_>, normalized: &Normalized, range: Range<usize>, kind: PartKind) -> RefPart {
    let source = normalized.source_range(range);
    let text = run.text.get(source.clone()).unwrap_or("");
    let char_start = run
        .char_start
        .saturating_add(run.text.get(..source.start).map_or(0, |s| return s.chars().count()));
    let char_end = char_start.saturating_add(text.chars().count());
    return RefPart {
        byte_span: source.start.saturating_add(run.byte_start)..source.end.saturating_add(run.byte_start),
        char_span: char_start..char_end,
        kind,
        text: text.to_string(),
    };
}

/// Normalized titles of one language, longest first, escaped and joined.
fn title_alternation(lib: &Library, lang: Lang) -> String {
    let mut titles: Vec<&str> = lib
        .titles()
        .iter()
        .filter(|(_, entry)| return entry.lang == lang)
        .map(|(key, _)| return key)
        .collect();
    if titles.is_empty() {
        return NEVER.to_string();
    }
    titles.sort_by(|a, b| return b.len().cmp(&a.len()).then_with(|| return a.cmp(b)));
    return titles.iter().map(|t| return regex::escape(t)).collect::<Vec<_>>().join("|");
}
