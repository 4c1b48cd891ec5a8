use std::path::Path;

use serde::Serialize;

use textref::config::{CONFIG_FILE, Config};
use textref::review::ReviewLog;
use textref::{Lang, Library, store};

/// Output the textref reference document and a summary of the loaded library.
pub fn run(root: &Path, config: &Config, json: bool) {
    let state = gather_state(root, config);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

/// One book of the loaded library.
#[derive(Serialize)]
struct BookSummary {
    /// Names of alternate structures.
    alt_structs: Vec<String>,
    /// Category path.
    categories: Vec<String>,
    /// Primary Hebrew title, English when there is none.
    he_title: String,
    /// Number of leaf nodes.
    leaves: usize,
    /// Canonical English title.
    title: String,
    /// Number of stored versions across leaves.
    versions: usize,
}

/// Everything the report shows.
struct CurrentState {
    /// Books in library order, or why the library failed to load.
    books: Result<Vec<BookSummary>, String>,
    /// True when `.textref.toml` exists.
    config_found: bool,
    /// Library directory.
    library: String,
    /// Entries in the review log, if it exists and parses.
    review_entries: Option<usize>,
    /// Title index fingerprint.
    snapshot: Option<String>,
    /// Number of registered titles.
    titles: usize,
}

/// Load what can be loaded; a broken library is reported, not fatal.
fn gather_state(root: &Path, config: &Config) -> CurrentState {
    let config_found = root.join(CONFIG_FILE).exists();
    let review_entries = ReviewLog::read(&config.review_log).ok().map(|log| return log.entries.len());
    let library = store::load_dir(config);

    let (books, snapshot, titles) = match &library {
        Ok(lib) => (
            Ok(summarize(lib)),
            Some(lib.snapshot_version().to_string()),
            lib.titles().len(),
        ),
        Err(err) => (Err(err.to_string()), None, 0),
    };

    return CurrentState {
        books,
        config_found,
        library: config.library.display().to_string(),
        review_entries,
        snapshot,
        titles,
    };
}

/// Per-book summaries in library order.
fn summarize(lib: &Library) -> Vec<BookSummary> {
    return lib
        .books_in_order()
        .into_iter()
        .filter_map(|book| {
            let index = lib.index(book).ok()?;
            let versions = index
                .schema
                .leaves()
                .iter()
                .map(|leaf| return lib.versions(book, *leaf).len())
                .sum();
            return Some(BookSummary {
                alt_structs: index.alt_structs.iter().map(|alt| return alt.name.clone()).collect(),
                categories: index.categories.clone(),
                he_title: index.primary_title(Lang::He).to_string(),
                leaves: index.schema.leaves().len(),
                title: index.title.clone(),
                versions,
            });
        })
        .collect();
}

// ── Markdown output ───────────────────────────────────────────────────

/// Human-readable report.
fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

/// Usage and configuration reference.
fn print_markdown_header(version: &str) {
    print!(
        "\
# textref {version}

Structural addressing and citation linking for a library of interlinked texts.

## Citation Syntax

    Genesis 1:1                        chapter and verse
    Genesis 1:29-2:3                   range; the right side inherits omitted levels
    Genesis.1.29-2.3                   URL form
    Shabbat 2a:5                       Talmud daf, side, and line
    בראשית א׳:א׳                       Hebrew titles and numerals
    Genesis, Bereshit 2                alternate structure node and subdivision

## Commands

    textref parse <citation>           Canonical forms and structure of a citation
    textref split <citation>           Split a spanning range into sections
    textref text <citation>            Print the text a citation addresses
    textref link <file>                Find and resolve citations in a document
    textref check <files>...           Link documents, log what needs review (exit 0/1/2)
    textref review                     Show the review log
    textref info                       This document

## Configuration (.textref.toml)

    library = \"library\"                  # directory of JSON records
    include = [\"tanakh/\"]                # only load these record paths
    exclude = [\"tanakh/drafts/\"]         # skip these record paths
    default_language = \"en\"              # output language
    review_log = \".textref-review.toml\"  # where `check` writes unresolved citations

## Current State

"
    );
}

/// Config, library, and review log state.
fn print_markdown_state(state: &CurrentState) {
    if state.config_found {
        println!("Config:     {CONFIG_FILE} (found)");
    } else {
        println!("Config:     {CONFIG_FILE} (not found)");
    }
    println!("Library:    {}", state.library);

    match state.review_entries {
        Some(n) => println!("Review log: {n} entries"),
        None => println!("Review log: (not found)"),
    }

    match &state.books {
        Err(reason) => println!("Books:      failed to load: {reason}"),
        Ok(books) if books.is_empty() => println!("Books:      (none)"),
        Ok(books) => {
            println!("Titles:     {}", state.titles);
            if let Some(snapshot) = &state.snapshot {
                println!("Snapshot:   {snapshot}");
            }
            println!();
            println!("| Book | Hebrew | Categories | Leaves | Versions |");
            println!("|------|--------|------------|--------|----------|");
            for book in books {
                println!(
                    "| {} | {} | {} | {} | {} |",
                    book.title,
                    book.he_title,
                    book.categories.join(" / "),
                    book.leaves,
                    book.versions
                );
            }
        },
    }
}

/// Exit code table.
fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success / every citation resolved |
| 1    | Ambiguous or unresolved citations found |
| 2    | Malformed documents found |
| 3    | Runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

/// Top-level JSON document.
#[derive(Serialize)]
struct InfoJson<'a> {
    /// Library summary.
    current_state: StateJson<'a>,
    /// Exit code table.
    exit_codes: Vec<ExitCodeInfo>,
    /// Crate version.
    version: String,
}

/// One exit code.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// The code.
    code: u8,
    /// What it means.
    meaning: String,
}

/// JSON form of `CurrentState`.
#[derive(Serialize)]
struct StateJson<'a> {
    /// Books in library order.
    books: &'a [BookSummary],
    /// True when `.textref.toml` exists.
    config_found: bool,
    /// Why the library failed to load.
    error: Option<&'a str>,
    /// Library directory.
    library: &'a str,
    /// Review log size.
    review_entries: Option<usize>,
    /// Title index fingerprint.
    snapshot: Option<&'a str>,
    /// Registered titles.
    titles: usize,
}

/// Machine-readable report.
fn print_json(state: &CurrentState) {
    let (books, error) = match &state.books {
        Ok(books) => (books.as_slice(), None),
        Err(reason) => (&[] as &[BookSummary], Some(reason.as_str())),
    };
    let info = InfoJson {
        current_state: StateJson {
            books,
            config_found: state.config_found,
            error,
            library: &state.library,
            review_entries: state.review_entries,
            snapshot: state.snapshot.as_deref(),
            titles: state.titles,
        },
        exit_codes: vec![
            ExitCodeInfo {
                code: 0,
                meaning: "Success / every citation resolved".to_string(),
            },
            ExitCodeInfo {
                code: 1,
                meaning: "Ambiguous or unresolved citations found".to_string(),
            },
            ExitCodeInfo {
                code: 2,
                meaning: "Malformed documents found".to_string(),
            },
            ExitCodeInfo {
                code: 3,
                meaning: "Runtime error".to_string(),
            },
        ],
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
