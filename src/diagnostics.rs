use std::fmt::Write as _;

use textref::Error;

/// ANSI bold, used for headings on stderr.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::BookName { suggestions, text } => render_book_name(text, suggestions),
        Error::Input { reason, text } => render_input(text, reason),
        Error::PartialRefInput { matched, reason, text } => render_partial_ref(text, matched, reason),
        Error::MalformedMarkup { offset, reason } => render_malformed_markup(*offset, reason),
        Error::TitleCollision { first, second, title } => render_title_collision(title, first, second),
        _ => render_generic(e),
    };
}

/// Diagnostics for the load and file errors.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::AltStructureInvalid { book, reason, structure } => format!(
            "\
# Error: Alternate Structure Invalid

Structure `{structure}` of `{book}` does not line up with its primary structure: {reason}

## Fix

Alternate nodes must be in order, leave no gaps, and their subdivisions must
tile the node's whole ref.
"
        ),

        Error::ConfigNotFound { path } => format!(
            "\
# Error: Config Not Found

`{}` does not exist.

## Fix

Check the `--config` path, or drop it to use `.textref.toml` in the working directory.
",
            path.display()
        ),

        Error::DuplicateRecord { key } => format!(
            "\
# Error: Duplicate Record

{key} appears more than once in the library.
"
        ),

        Error::ReviewLogCorrupt { reason } => format!(
            "\
# Error: Review Log Corrupt

{reason}

## Fix

Regenerate the review log:

    textref check <files>
"
        ),

        Error::ReviewLogNotFound { path } => format!(
            "\
# Error: Review Log Not Found

`{}` does not exist.

## Fix

Run `textref check` over your documents to produce it:

    textref check notes.md
",
            path.display()
        ),

        Error::SchemaInvalid { book, reason } => format!(
            "\
# Error: Schema Invalid

The schema of `{book}` is invalid: {reason}
"
        ),

        Error::Io(err) => format!(
            "\
# Error: I/O

{err}
"
        ),
        Error::Json(err) => format!(
            "\
# Error: Invalid Record JSON

{err}
"
        ),
        Error::TomlDe(err) => format!(
            "\
# Error: Invalid TOML

{err}
"
        ),
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

/// Unknown title, with the closest known titles.
fn render_book_name(text: &str, suggestions: &[String]) -> String {
    let mut out = format!(
        "\
# Error: Unknown Title

No known title starts `{text}`.
"
    );
    if let Some(best) = suggestions.first() {
        let _ = write!(out, "\n## Did you mean `{best}`?\n");
    }
    if suggestions.len() > 1 {
        out.push_str("\n## Similar titles\n\n");
        for suggestion in suggestions {
            let _ = writeln!(out, "- `{suggestion}`");
        }
    }
    return out;
}

/// Known title, unreadable address.
fn render_input(text: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Reference

`{text}`: {reason}
"
    );
}

/// Malformed markup in linked text.
fn render_malformed_markup(offset: usize, reason: &str) -> String {
    return format!(
        "\
# Error: Malformed Markup

At char {offset}: {reason}

## Fix

Close every tag in the order it was opened, or escape a literal `<` as `&lt;`.
"
    );
}

/// A container cited with an address it cannot take.
fn render_partial_ref(text: &str, matched: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Partial Reference

`{text}` names `{matched}`, but {reason}.

## Fix

Name one of its parts:

    textref parse \"{matched}, <part> ...\"
"
    );
}

/// Two owners claim one title.
fn render_title_collision(title: &str, first: &str, second: &str) -> String {
    return format!(
        "\
# Error: Title Collision

`{title}` is claimed by both {first} and {second}.

## Fix

Give one of them a different title, or share it deliberately through a term.
"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_title_offers_the_best_suggestion() {
        let md = render_error(&Error::BookName {
            suggestions: vec!["Genesis".to_string(), "Exodus".to_string()],
            text: "Genesys 1:1".to_string(),
        });
        assert!(md.starts_with("# Error: Unknown Title"), "{md}");
        assert!(md.contains("## Did you mean `Genesis`?"), "{md}");
        assert!(md.contains("- `Exodus`"), "{md}");
    }

    #[test]
    fn partial_ref_shows_matched_node() {
        let md = render_error(&Error::PartialRefInput {
            matched: "Pesach Haggadah".to_string(),
            reason: "it has no default part".to_string(),
            text: "Pesach Haggadah 3".to_string(),
        });
        assert!(md.contains("`Pesach Haggadah 3` names `Pesach Haggadah`"), "{md}");
        assert!(md.contains("## Fix"), "{md}");
    }
}
