//! Citation linker: find citations in running prose and resolve them.
//!
//! A span moves through `CandidateTitleFound`, `PartsCollected`, and ends
//! `Resolved`, `Ambiguous`, or `Failed`. The linker holds one library
//! snapshot for its whole life, so every span of a batch resolves against
//! the same titles.

pub mod markup;
pub mod resolve;
pub mod scan;

use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::Error;
use crate::library::Library;
use crate::reference::Ref;
use scan::Scanner;

/// One item of a batch: the prose and the ref it belongs to, if any.
#[derive(Debug, Clone)]
pub struct LinkItem {
    /// The ref whose text this is; narrows collective titles.
    pub context: Option<Ref>,
    /// Prose, possibly with markup.
    pub text: String,
}

/// Scans prose against one library snapshot.
#[derive(Debug, Clone)]
pub struct Linker {
    /// The snapshot every resolution uses.
    library: Arc<Library>,
    /// Title and tail matchers compiled for `library`.
    scanner: Scanner,
}

/// Role of one piece of a scanned span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PartKind {
    /// `ibid.` or `שם`.
    Ibid,
    /// An address without a range.
    Numbered,
    /// An address with a range.
    Range,
    /// A known title.
    Title,
}

/// A scanned span before resolution. Offsets are into the original input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRef {
    /// Byte offsets.
    pub byte_span: Range<usize>,
    /// Char offsets.
    pub char_span: Range<usize>,
    /// Title, ibid, and address parts in order.
    pub parts: Vec<RefPart>,
    /// The span as written.
    pub text: String,
}

/// One classified piece of a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefPart {
    /// Byte offsets into the original input.
    pub byte_span: Range<usize>,
    /// Char offsets into the original input.
    pub char_span: Range<usize>,
    /// What the piece is.
    pub kind: PartKind,
    /// The piece as written.
    pub text: String,
}

/// Outcome for one span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Several works fit; every survivor is listed.
    Ambiguous(Vec<Ref>),
    /// Exactly one ref fits.
    Resolved(Ref),
    /// Nothing fits, with the reason.
    Unresolved(String),
}

/// A scanned span with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    /// The span.
    pub raw: RawRef,
    /// What it resolved to.
    pub resolution: Resolution,
}

/// Per-span states, reported through tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanState {
    /// Resolution found several works.
    Ambiguous,
    /// The scanner matched a title or ibid.
    CandidateTitleFound,
    /// Resolution found nothing.
    Failed,
    /// Title and address parts are classified.
    PartsCollected,
    /// Resolution found one ref.
    Resolved,
}

impl Linker {
    /// Link independent batches in parallel. Each batch keeps its own ibid
    /// state; nothing carries across batches.
    pub fn bulk_link(&self, batches: &[Vec<LinkItem>]) -> Vec<Result<Vec<Vec<ResolvedRef>>, Error>> {
        return batches.par_iter().map(|batch| return self.link_batch(batch)).collect();
    }

    /// The snapshot this linker resolves against.
    pub const fn library(&self) -> &Arc<Library> {
        return &self.library;
    }

    /// Link one piece of prose with fresh ibid state.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedMarkup` if the markup cannot be followed.
    pub fn link(&self, text: &str, context: Option<&Ref>) -> Result<Vec<ResolvedRef>, Error> {
        let mut previous = None;
        return self.link_one(text, context, &mut previous);
    }

    /// Link items in order. An ibid refers to the last unambiguous
    /// citation of any earlier item in the batch.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedMarkup` for the first item whose markup
    /// cannot be followed.
    pub fn link_batch(&self, items: &[LinkItem]) -> Result<Vec<Vec<ResolvedRef>>, Error> {
        let mut previous = None;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.link_one(&item.text, item.context.as_ref(), &mut previous)?);
        }
        return Ok(out);
    }

    /// Scan and resolve one text, updating the batch's ibid anchor.
    fn link_one(&self, text: &str, context: Option<&Ref>, previous: &mut Option<Ref>) -> Result<Vec<ResolvedRef>, Error> {
        let spans = self.scanner.scan(text)?;
        let mut out = Vec::with_capacity(spans.len());
        for raw in spans {
            tracing::trace!(state = ?SpanState::CandidateTitleFound, span = %raw.text, "span");
            tracing::trace!(state = ?SpanState::PartsCollected, parts = raw.parts.len(), "span");
            let resolution = resolve::resolve(&self.library, &raw, context, previous.as_ref());
            let state = match &resolution {
                Resolution::Ambiguous(_) => SpanState::Ambiguous,
                Resolution::Resolved(found) => {
                    *previous = Some(found.clone());
                    SpanState::Resolved
                },
                Resolution::Unresolved(_) => SpanState::Failed,
            };
            tracing::trace!(state = ?state, span = %raw.text, "span");
            out.push(ResolvedRef { raw, resolution });
        }
        return Ok(out);
    }

    /// Compile a linker for one library snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if the title matchers cannot be compiled.
    pub fn new(library: Arc<Library>) -> Result<Self, Error> {
        let scanner = Scanner::new(&library)?;
        return Ok(Self { library, scanner });
    }
}
