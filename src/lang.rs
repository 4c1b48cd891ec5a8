/// Language tags and the text normalization shared by title lookup and scanning.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

use crate::error::Error;

/// The two languages citations are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// English, Latin script, Arabic numerals.
    En,
    /// Hebrew, gematria numerals, right-to-left.
    He,
}

impl Lang {
    /// Two-letter code used in records and config.
    pub const fn code(self) -> &'static str {
        return match self {
            Self::En => "en",
            Self::He => "he",
        };
    }

    /// Guess the language of a citation: any Hebrew letter makes it Hebrew.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_hebrew_letter) {
            return Self::He;
        }
        return Self::En;
    }

    /// Writing direction of running text in this language.
    pub const fn direction(self) -> Direction {
        return match self {
            Self::En => Direction::Ltr,
            Self::He => Direction::Rtl,
        };
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.code());
    }
}

impl FromStr for Lang {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "he" | "hebrew" => Ok(Self::He),
            other => Err(Error::input(other, "unknown language code (expected `en` or `he`)")),
        };
    }
}

/// Text direction metadata carried by an index per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left to right.
    Ltr,
    /// Right to left.
    Rtl,
}

/// True for the 27 Hebrew letter code points, finals included.
pub const fn is_hebrew_letter(c: char) -> bool {
    return matches!(c, '\u{05D0}'..='\u{05EA}');
}

/// Hebrew points and cantillation marks, plus any other combining mark.
fn is_ignorable_mark(c: char) -> bool {
    return matches!(c, '\u{0591}'..='\u{05BD}' | '\u{05BF}' | '\u{05C1}' | '\u{05C2}' | '\u{05C4}' | '\u{05C5}' | '\u{05C7}')
        || is_combining_mark(c);
}

/// Normalize one character into `out`: decompose, drop marks, lowercase.
/// Returns how many chars were pushed.
fn push_normalized_char(c: char, out: &mut String) -> usize {
    let mut pushed = 0_usize;
    for decomposed in std::iter::once(c).nfd() {
        if is_ignorable_mark(decomposed) {
            continue;
        }
        if decomposed == '\u{05BE}' {
            // Maqaf joins words like a hyphen.
            out.push(' ');
            pushed = pushed.saturating_add(1);
            continue;
        }
        for lowered in decomposed.to_lowercase() {
            out.push(lowered);
            pushed = pushed.saturating_add(1);
        }
    }
    return pushed;
}

/// Normalized lookup key for a title: case-folded, nikkud and cantillation
/// stripped, whitespace collapsed.
pub fn normalize_title(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        push_normalized_char(c, &mut folded);
    }
    return folded.split_whitespace().collect::<Vec<_>>().join(" ");
}

/// Normalized text paired with a map back into the source.
///
/// `origins[i]` is the byte offset in the source of the character that
/// produced the normalized byte at offset `i`. Whitespace is not collapsed,
/// so spans found in the normalized text map back one-to-one.
pub struct Normalized {
    /// The folded text.
    pub text: String,
    /// Source byte offset for every byte of `text`, plus one trailing entry for the end.
    origins: Vec<usize>,
}

impl Normalized {
    /// Fold `source` the same way titles are folded, remembering where each byte came from.
    pub fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut origins = Vec::with_capacity(source.len().saturating_add(1));
        for (offset, c) in source.char_indices() {
            let before = text.len();
            push_normalized_char(c, &mut text);
            for _ in before..text.len() {
                origins.push(offset);
            }
        }
        origins.push(source.len());
        return Self { text, origins };
    }

    /// Map a byte range of the normalized text back to a byte range of the source.
    pub fn source_range(&self, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
        let start = self.origins.get(range.start).copied().unwrap_or_default();
        let end = self.origins.get(range.end).copied().unwrap_or(start);
        return start..end.max(start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hebrew_by_letters() {
        assert_eq!(Lang::detect("בראשית א:א"), Lang::He);
        assert_eq!(Lang::detect("Genesis 1:1"), Lang::En);
    }

    #[test]
    fn strips_nikkud_and_cantillation() {
        assert_eq!(normalize_title("בְּרֵאשִׁ֖ית"), "בראשית");
    }

    #[test]
    fn folds_case_and_whitespace() {
        assert_eq!(normalize_title("  Rashi   on GENESIS "), "rashi on genesis");
    }

    #[test]
    fn normalized_offsets_map_back_to_source() {
        let source = "ראה בְּרֵאשִׁית א";
        let normalized = Normalized::new(source);
        let start = normalized.text.find("בראשית").unwrap();
        let end = start + "בראשית".len();
        let range = normalized.source_range(start..end);
        let letters: String = source[range.clone()].chars().filter(|c| is_hebrew_letter(*c)).collect();
        assert_eq!(letters, "בראשית");
        assert_eq!(source[range.end..].trim(), "א");
    }

    #[test]
    fn parses_language_codes() {
        assert_eq!("he".parse::<Lang>().unwrap(), Lang::He);
        assert!("fr".parse::<Lang>().is_err(), "unknown codes are rejected");
    }
}
