//! CLI commands for textref: parse, split, text, link, check, review, info.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;

use textref::config::Config;
use textref::jagged::Element;
use textref::review::{ReviewEntry, ReviewLog};
use textref::{Error, Lang, Library, LinkItem, Linker, Ref, RefPattern, Resolution, ResolvedRef, store};

use crate::info as info_report;

/// One linked citation, as printed and logged.
#[derive(Debug, Serialize)]
struct Outcome {
    /// Canonical forms: the one ref, or every candidate.
    candidates: Vec<String>,
    /// Char offset one past the span, in the document.
    char_end: usize,
    /// Char offset of the span in the document.
    char_start: usize,
    /// Why the citation did not resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    /// How it resolved.
    status: Status,
    /// The citation as written.
    text: String,
}

/// Structure and canonical forms of one parsed citation.
#[derive(Debug, Serialize)]
struct RefSummary {
    /// Canonical Hebrew form.
    he_normal: String,
    /// Citation covers more than one position.
    is_range: bool,
    /// Points to a whole section.
    is_section_level: bool,
    /// Points to individual segments.
    is_segment_level: bool,
    /// Range crosses a section boundary.
    is_spanning: bool,
    /// Canonical English form.
    normal: String,
    /// Expression matching this citation and everything inside it, when
    /// the section lengths it needs are known.
    regex: Option<String>,
    /// 1-based start path.
    sections: Vec<u32>,
    /// 1-based end path.
    to_sections: Vec<u32>,
    /// URL form.
    url: String,
}

/// Link outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    /// Several works fit.
    Ambiguous,
    /// Exactly one ref fits.
    Resolved,
    /// Nothing fits.
    Unresolved,
}

impl Outcome {
    /// Flatten a linker result, shifting offsets by the paragraph start.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if a ref cannot be rendered against `lib`.
    fn new(lib: &Library, found: &ResolvedRef, offset: usize) -> Result<Self, Error> {
        let (status, candidates, reason) = match &found.resolution {
            Resolution::Ambiguous(refs) => (
                Status::Ambiguous,
                refs.iter().map(|r| return r.normal(lib)).collect::<Result<Vec<_>, _>>()?,
                Some(format!("{} works fit", refs.len())),
            ),
            Resolution::Resolved(r) => (Status::Resolved, vec![r.normal(lib)?], None),
            Resolution::Unresolved(reason) => (Status::Unresolved, Vec::new(), Some(reason.clone())),
        };
        return Ok(Self {
            candidates,
            char_end: found.raw.char_span.end.saturating_add(offset),
            char_start: found.raw.char_span.start.saturating_add(offset),
            reason,
            status,
            text: found.raw.text.clone(),
        });
    }

    /// The review log form of an ambiguous or unresolved outcome.
    fn review_entry(&self, source: &Path) -> ReviewEntry {
        return ReviewEntry {
            candidates: if self.status == Status::Ambiguous { self.candidates.clone() } else { Vec::new() },
            offset: self.char_start,
            reason: self.reason.clone().unwrap_or_default(),
            source: source.to_path_buf(),
            text: self.text.clone(),
        };
    }
}

impl RefSummary {
    /// Summarize `r`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if `r` cannot be rendered against `lib`.
    fn new(lib: &Library, r: &Ref) -> Result<Self, Error> {
        let regex = r.pattern(lib, false).ok().map(|pattern| {
            return match pattern {
                RefPattern::Single(single) => single,
                RefPattern::List(list) => list.join("|"),
            };
        });
        return Ok(Self {
            he_normal: r.he_normal(lib)?,
            is_range: r.is_range(),
            is_section_level: r.is_section_level(),
            is_segment_level: r.is_segment_level(),
            is_spanning: r.is_spanning(),
            normal: r.normal(lib)?,
            regex,
            sections: r.sections().to_vec(),
            to_sections: r.to_sections().to_vec(),
            url: r.url(lib)?,
        });
    }
}

/// Link documents, print what needs review, and record it in the review log.
///
/// # Errors
///
/// Returns errors from loading the library, reading documents, or writing
/// the review log.
pub fn check(config: &Config, files: &[PathBuf]) -> Result<ExitCode, Error> {
    let linker = Linker::new(load_library(config)?)?;
    let mut log = ReviewLog::read_or_default(&config.review_log)?;
    let mut broken_count = 0_u32;
    let mut flagged_count = 0_usize;
    let mut resolved_count = 0_usize;

    for file in files {
        let content = std::fs::read_to_string(file)?;
        let found = match link_document(&linker, &content, None) {
            Ok(found) => found,
            Err(Error::MalformedMarkup { offset, reason }) => {
                broken_count = broken_count.saturating_add(1);
                println!("BROKEN      {}:{offset} ({reason})", file.display());
                continue;
            },
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for outcome in &found {
            if outcome.status == Status::Resolved {
                resolved_count = resolved_count.saturating_add(1);
                continue;
            }
            flagged_count = flagged_count.saturating_add(1);
            print_outcome(Some(file), outcome);
            entries.push(outcome.review_entry(file));
        }
        log.merge_source(file, entries);
    }
    log.write(&config.review_log)?;

    // Exit code priority: broken (2) > needs review (1) > clean (0).
    if broken_count > 0 {
        println!();
        println!("{broken_count} broken, {flagged_count} need review");
        return Ok(ExitCode::from(2));
    } else if flagged_count > 0 {
        println!();
        println!("{flagged_count} need review, {resolved_count} resolved");
        println!("Logged to {}", config.review_log.display());
        return Ok(ExitCode::from(1));
    } else {
        println!("All {resolved_count} citations resolved");
        return Ok(ExitCode::SUCCESS);
    }
}

/// Output the reference document and library summary.
pub fn info(root: &Path, config: &Config, json: bool) {
    info_report::run(root, config, json);
}

/// Find and resolve the citations of one document.
///
/// # Errors
///
/// Returns errors from loading the library, reading the document, parsing
/// the context citation, or following the document's markup.
pub fn link(config: &Config, file: &Path, context: Option<&str>, json: bool) -> Result<ExitCode, Error> {
    let library = load_library(config)?;
    let context = context.map(|c| return library.parse_ref(c)).transpose()?;
    let linker = Linker::new(Arc::clone(&library))?;
    let content = std::fs::read_to_string(file)?;
    let found = link_document(&linker, &content, context.as_ref())?;

    if json {
        // serde_json::to_string_pretty won't fail on this structure.
        println!("{}", serde_json::to_string_pretty(&found).unwrap_or_default());
    } else {
        for outcome in &found {
            print_outcome(None, outcome);
        }
    }
    return Ok(ExitCode::SUCCESS);
}

/// Parse one citation and print its canonical forms and structure.
///
/// # Errors
///
/// Returns the parse error for a citation that does not resolve.
pub fn parse(config: &Config, citation: &str, json: bool) -> Result<ExitCode, Error> {
    let library = load_library(config)?;
    let r = library.parse_ref(citation)?;
    let summary = RefSummary::new(&library, &r)?;

    if json {
        // serde_json::to_string_pretty won't fail on this structure.
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
        return Ok(ExitCode::SUCCESS);
    }

    let shown = if config.default_language == Lang::He { &summary.he_normal } else { &summary.normal };
    println!("{shown}");
    println!();
    println!("English:    {}", summary.normal);
    println!("Hebrew:     {}", summary.he_normal);
    println!("URL:        {}", summary.url);
    println!("Sections:   {:?} to {:?}", summary.sections, summary.to_sections);
    let level = if summary.is_segment_level {
        "segment"
    } else if summary.is_section_level {
        "section"
    } else {
        "higher"
    };
    println!("Level:      {level}");
    if summary.is_range {
        let spanning = if summary.is_spanning { ", spanning sections" } else { "" };
        println!("Range:      yes{spanning}");
    }
    if let Some(regex) = &summary.regex {
        println!("Regex:      {regex}");
    }
    return Ok(ExitCode::SUCCESS);
}

/// Show the review log.
///
/// # Errors
///
/// Returns `Error::ReviewLogNotFound` when no check has written one yet, or
/// the parse errors of a corrupt log.
pub fn review(config: &Config, json: bool) -> Result<ExitCode, Error> {
    let log = ReviewLog::read(&config.review_log)?;
    if json {
        // serde_json::to_string_pretty won't fail on this structure.
        println!("{}", serde_json::to_string_pretty(&log.entries).unwrap_or_default());
        return Ok(ExitCode::SUCCESS);
    }
    if log.entries.is_empty() {
        println!("Nothing to review");
        return Ok(ExitCode::SUCCESS);
    }
    for entry in &log.entries {
        println!("{}:{}  {}  ({})", entry.source.display(), entry.offset, entry.text, entry.reason);
        for candidate in &entry.candidates {
            println!("    - {candidate}");
        }
    }
    println!();
    println!("{} entries", log.entries.len());
    return Ok(ExitCode::SUCCESS);
}

/// Split a citation into section-sized pieces, or into single positions.
///
/// # Errors
///
/// Returns parse errors, or `Error::Input` when section lengths are unknown.
pub fn split(config: &Config, citation: &str, segments: bool) -> Result<ExitCode, Error> {
    let library = load_library(config)?;
    let r = library.parse_ref(citation)?;
    let pieces = if segments { r.range_list(&library)? } else { r.split_spanning_ref(&library)? };
    for piece in &pieces {
        println!("{}", piece.normal(&library)?);
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print the text a citation addresses.
///
/// # Errors
///
/// Returns parse errors, or `Error::Input` for a container citation or an
/// unknown version title.
pub fn text(config: &Config, citation: &str, lang: Option<Lang>, version: Option<&str>, json: bool) -> Result<ExitCode, Error> {
    let library = load_library(config)?;
    let r = library.parse_ref(citation)?;
    let chunk = library.text(&r, lang.unwrap_or(config.default_language), version)?;

    if json {
        // serde_json::to_string_pretty won't fail on this structure.
        println!("{}", serde_json::to_string_pretty(&chunk).unwrap_or_default());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", r.normal(&library)?);
    if !chunk.sources.is_empty() {
        println!("({})", chunk.sources.join(", "));
    }
    println!();
    print_element(&chunk.content);
    return Ok(ExitCode::SUCCESS);
}

/// Link a document paragraph by paragraph, sharing ibid state across paragraphs.
///
/// # Errors
///
/// Returns `Error::MalformedMarkup` for the first paragraph whose markup
/// cannot be followed.
fn link_document(linker: &Linker, content: &str, context: Option<&Ref>) -> Result<Vec<Outcome>, Error> {
    let blocks = paragraphs(content);
    let items: Vec<LinkItem> = blocks
        .iter()
        .map(|(_, text)| {
            return LinkItem {
                context: context.cloned(),
                text: (*text).to_string(),
            };
        })
        .collect();
    let linked = linker.link_batch(&items)?;

    let mut out = Vec::new();
    for ((offset, _), found) in blocks.iter().zip(&linked) {
        for f in found {
            out.push(Outcome::new(linker.library(), f, *offset)?);
        }
    }
    return Ok(out);
}

/// Load and freeze the configured library.
///
/// # Errors
///
/// Returns every load and build error of `store::load_dir`.
fn load_library(config: &Config) -> Result<Arc<Library>, Error> {
    return Ok(Arc::new(store::load_dir(config)?));
}

/// Blank-line separated paragraphs with their char offsets.
fn paragraphs(content: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut chars = 0_usize;
    for block in content.split("\n\n") {
        if !block.trim().is_empty() {
            out.push((chars, block));
        }
        chars = chars.saturating_add(block.chars().count()).saturating_add(2);
    }
    return out;
}

/// Print content one segment per line, with a blank line between sections.
fn print_element(element: &Element<String>) {
    match element {
        Element::Leaf(segment) => println!("{segment}"),
        Element::Nested(items) => {
            let sections = items.iter().any(|item| return matches!(item, Element::Nested(_)));
            for item in items {
                print_element(item);
                if sections {
                    println!();
                }
            }
        },
    }
}

/// One outcome line, prefixed with its file when there is one.
fn print_outcome(file: Option<&Path>, outcome: &Outcome) {
    let label = match outcome.status {
        Status::Ambiguous => "AMBIGUOUS ",
        Status::Resolved => "RESOLVED  ",
        Status::Unresolved => "UNRESOLVED",
    };
    let place = file.map_or_else(
        || return format!("{}-{}", outcome.char_start, outcome.char_end),
        |f| return format!("{}:{}", f.display(), outcome.char_start),
    );
    let detail = match outcome.status {
        Status::Resolved => outcome.candidates.join(""),
        Status::Ambiguous => outcome.candidates.join(" | "),
        Status::Unresolved => outcome.reason.clone().unwrap_or_default(),
    };
    println!("{label}  {place}  {} -> {detail}", outcome.text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_keep_document_offsets() {
        let blocks = paragraphs("see Genesis 1:1\n\nibid. 3\n\n\n\nשם");
        let offsets: Vec<usize> = blocks.iter().map(|(o, _)| return *o).collect();
        assert_eq!(offsets, vec![0, 17, 28]);
        assert_eq!(blocks.last().map(|(_, t)| return *t), Some("שם"));
    }
}
