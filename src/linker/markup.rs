//! Split marked-up input into plain-text runs. Citations never cross a tag.

use crate::error::Error;

/// Elements that never take a closing tag.
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Plain text between two tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run<'a> {
    /// Byte offset of the run in the input.
    pub byte_start: usize,
    /// Char offset of the run in the input.
    pub char_start: usize,
    /// The run's text.
    pub text: &'a str,
}

/// Tracks the char offset of increasing byte positions.
struct CharCursor<'a> {
    /// Last byte position asked for.
    byte: usize,
    /// Char offset of `byte`.
    chars: usize,
    /// The input.
    input: &'a str,
}

impl CharCursor<'_> {
    /// Char offset of byte position `byte`, which never moves backwards.
    fn at(&mut self, byte: usize) -> usize {
        let skipped = self.input.get(self.byte..byte).map_or(0, |s| return s.chars().count());
        self.chars = self.chars.saturating_add(skipped);
        self.byte = byte;
        return self.chars;
    }
}

/// Element name at the start of a tag body.
fn element_name(body: &str) -> String {
    return body
        .chars()
        .take_while(|c| return c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase();
}

/// True when `<` at this position opens a tag rather than standing as text.
fn opens_tag(rest: &str) -> bool {
    return rest
        .chars()
        .nth(1)
        .is_some_and(|c| return c.is_ascii_alphabetic() || c == '/' || c == '!');
}

/// Plain-text runs of `input` in order, skipping tags and comments.
///
/// # Errors
///
/// Returns `Error::MalformedMarkup` for an unterminated tag or comment, a
/// closing tag that does not match the open one, or an element left open.
pub fn text_runs(input: &str) -> Result<Vec<Run<'_>>, Error> {
    let mut cursor = CharCursor { byte: 0, chars: 0, input };
    let mut open: Vec<(String, usize)> = Vec::new();
    let mut runs = Vec::new();
    let mut run_start = 0;
    let mut position = 0;

    while let Some(found) = input.get(position..).and_then(|rest| return rest.find('<')) {
        let tag_start = position.saturating_add(found);
        let rest = input.get(tag_start..).unwrap_or("");
        if !opens_tag(rest) {
            position = tag_start.saturating_add(1);
            continue;
        }

        if tag_start > run_start {
            runs.push(Run {
                byte_start: run_start,
                char_start: cursor.at(run_start),
                text: input.get(run_start..tag_start).unwrap_or(""),
            });
        }
        let tag_offset = cursor.at(tag_start);
        let (terminator, body_start) = if rest.starts_with("<!--") { ("-->", 4) } else { (">", 1) };
        let Some(body_len) = rest.get(body_start..).and_then(|body| return body.find(terminator)) else {
            return Err(Error::MalformedMarkup {
                offset: tag_offset,
                reason: "tag is never closed with `>`".to_string(),
            });
        };
        let body = rest.get(body_start..body_start.saturating_add(body_len)).unwrap_or("");
        position = tag_start.saturating_add(body_start).saturating_add(body_len).saturating_add(terminator.len());
        run_start = position;

        if body_start == 4 || body.starts_with('!') || body.starts_with('?') {
            continue;
        }
        if let Some(closing) = body.strip_prefix('/') {
            let name = element_name(closing.trim_start());
            match open.pop() {
                Some((expected, _)) if expected == name => {},
                Some((expected, _)) => {
                    return Err(Error::MalformedMarkup {
                        offset: tag_offset,
                        reason: format!("`</{name}>` closes `<{expected}>`"),
                    });
                },
                None => {
                    return Err(Error::MalformedMarkup {
                        offset: tag_offset,
                        reason: format!("`</{name}>` has no opening tag"),
                    });
                },
            }
            continue;
        }
        let name = element_name(body);
        if !body.trim_end().ends_with('/') && !VOID_ELEMENTS.contains(&name.as_str()) {
            open.push((name, tag_offset));
        }
    }

    if let Some((name, offset)) = open.pop() {
        return Err(Error::MalformedMarkup {
            offset,
            reason: format!("`<{name}>` is never closed"),
        });
    }
    if input.len() > run_start {
        runs.push(Run {
            byte_start: run_start,
            char_start: cursor.at(run_start),
            text: input.get(run_start..).unwrap_or(""),
        });
    }
    return Ok(runs);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        return text_runs(input).unwrap().into_iter().map(|r| return r.text).collect();
    }

    #[test]
    fn plain_text_is_one_run() {
        assert_eq!(texts("Genesis 1:1"), vec!["Genesis 1:1"]);
        assert!(text_runs("").unwrap().is_empty(), "no runs in empty input");
    }

    #[test]
    fn tags_split_runs() {
        assert_eq!(texts("see <b>Genesis</b> 1:1"), vec!["see ", "Genesis", " 1:1"]);
        assert_eq!(texts("a<br>b<img src=\"x\"/>c"), vec!["a", "b", "c"]);
        assert_eq!(texts("a<!-- <b> -->b"), vec!["a", "b"]);
    }

    #[test]
    fn less_than_in_prose_is_text() {
        assert_eq!(texts("1 < 2 and 3<4"), vec!["1 < 2 and 3<4"]);
    }

    #[test]
    fn offsets_count_chars() {
        let runs = text_runs("<i>בראשית</i> א").unwrap();
        let last = runs.last().unwrap();
        assert_eq!(last.text, " א");
        assert_eq!(last.char_start, "<i>בראשית</i>".chars().count());
        assert_eq!(last.byte_start, "<i>בראשית</i>".len());
    }

    #[test]
    fn malformed_markup_is_rejected() {
        for bad in ["<b>open", "<b>x</i>", "x</b>", "text <b"] {
            let err = text_runs(bad).unwrap_err();
            assert!(matches!(err, Error::MalformedMarkup { .. }), "{bad}: {err}");
        }
    }
}
