//! Address types: how one depth level of a reference is written and read.
//!
//! Every level of a leaf node declares an [`AddressType`]. Positions are
//! always 1-based integers internally; the address type decides what the
//! position looks like on the page (`3`, `2a`, `ג׳`, `XIV`, ...).

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::hebrew;
use crate::lang::Lang;

/// English folio with optional side.
const EN_FOLIO: &str = r"\d+[a-dA-D]?";
/// English integer.
const EN_INTEGER: &str = r"\d+";
/// English roman numeral.
const EN_ROMAN: &str = r"[mdclxviMDCLXVI]+";
/// English daf with optional side.
const EN_TALMUD: &str = r"\d+[abAB]?";
/// English year.
const EN_YEAR: &str = r"\d{1,5}";

/// Hebrew numeral with optional geresh/gershayim, or plain digits.
const HE_NUMERAL: &str = r#"(?:\d+|[\x{05D0}-\x{05EA}]+(?:[\x{05F3}\x{05F4}'"][\x{05D0}-\x{05EA}]*)*)"#;
/// Hebrew folio with a side letter (א..ד).
const HE_FOLIO: &str = r#"(?:\d+|[\x{05D0}-\x{05EA}]+(?:[\x{05F3}\x{05F4}'"][\x{05D0}-\x{05EA}]*)*)(?:\s+[\x{05D0}-\x{05D3}])?"#;
/// Hebrew daf with `ע״א`, `עמוד א`, or `.`/`:` side markers.
const HE_TALMUD: &str = r#"(?:\d+|[\x{05D0}-\x{05EA}]+(?:[\x{05F3}\x{05F4}'"][\x{05D0}-\x{05EA}]*)*)(?:\s*\x{05E2}[\x{05F4}"'][\x{05D0}\x{05D1}]|\s+\x{05E2}\x{05DE}\x{05D5}\x{05D3}\s+[\x{05D0}\x{05D1}]|[.:])?"#;

/// Separator between address components: `:`, `.`, `,` or plain whitespace.
const COMPONENT_SEPARATOR: &str = r"\s*[:.,]\s*|\s+";

/// Latin side letters for folios.
const FOLIO_SIDES_EN: [char; 4] = ['a', 'b', 'c', 'd'];
/// Hebrew side letters for folios.
const FOLIO_SIDES_HE: [char; 4] = ['א', 'ב', 'ג', 'ד'];

/// Roman numeral table, largest first.
const ROMAN_TABLE: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Closed set of address semantics. Adding a notation means adding a variant
/// plus its arms in `format`, `parse_parts`, and `regex_fragment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    /// Manuscript folio with four sides (`12a`..`12d`).
    Folio,
    /// Plain counting number.
    #[serde(alias = "Perek", alias = "Mishnah", alias = "Siman", alias = "Aliyah", alias = "Volume")]
    Integer,
    /// Roman numerals in English, gematria in Hebrew.
    Roman,
    /// Talmud daf and amud: position 3 is `2a`, position 4 is `2b`.
    Talmud,
    /// Calendar year, written with thousands in Hebrew (`ה׳תש״ע`).
    Year,
}

impl AddressType {
    /// Every address type, for listings.
    pub const ALL: [Self; 5] = [Self::Folio, Self::Integer, Self::Roman, Self::Talmud, Self::Year];

    /// Render a 1-based position.
    pub fn format(self, position: u32, lang: Lang) -> String {
        return match (self, lang) {
            (Self::Folio, Lang::En) => {
                let (folio, side) = split_units(position, 4);
                let letter = FOLIO_SIDES_EN.get(side).copied().unwrap_or('a');
                format!("{folio}{letter}")
            },
            (Self::Folio, Lang::He) => {
                let (folio, side) = split_units(position, 4);
                let letter = FOLIO_SIDES_HE.get(side).copied().unwrap_or('א');
                format!("{} {letter}", hebrew::encode(folio, false))
            },
            (Self::Integer | Self::Year, Lang::En) => position.to_string(),
            (Self::Integer | Self::Roman | Self::Year, Lang::He) => hebrew::encode(position, true),
            (Self::Roman, Lang::En) => to_roman(position),
            (Self::Talmud, Lang::En) => {
                let (daf, side) = split_units(position, 2);
                let letter = if side == 0 { 'a' } else { 'b' };
                format!("{daf}{letter}")
            },
            (Self::Talmud, Lang::He) => {
                let (daf, side) = split_units(position, 2);
                let letter = if side == 0 { 'א' } else { 'ב' };
                format!("{} ע{}{letter}", hebrew::encode(daf, false), hebrew::GERSHAYIM)
            },
        };
    }

    /// Display name, matching the record spelling.
    pub const fn name(self) -> &'static str {
        return match self {
            Self::Folio => "Folio",
            Self::Integer => "Integer",
            Self::Roman => "Roman",
            Self::Talmud => "Talmud",
            Self::Year => "Year",
        };
    }

    /// Read one token as a 1-based position. A daf or folio without a side
    /// reads as its first side.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if the token is not valid in this notation.
    pub fn parse(self, token: &str, lang: Lang) -> Result<u32, Error> {
        let (start, _) = self.parse_span(token, lang)?;
        return Ok(start);
    }

    /// Split a token into its number and, for sided notations, the side index.
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if the token is not valid in this notation.
    fn parse_parts(self, token: &str, lang: Lang) -> Result<(u32, Option<usize>), Error> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::input(token, "empty address"));
        }
        let ascii = token.is_ascii();

        return match self {
            Self::Folio if ascii => parse_sided_latin(token, &FOLIO_SIDES_EN),
            Self::Folio => parse_folio_hebrew(token),
            Self::Integer | Self::Year => parse_number(token, lang),
            Self::Roman if ascii && token.chars().all(|c| return c.is_ascii_alphabetic()) => {
                from_roman(token)
                    .map(|n| return (n, None))
                    .ok_or_else(|| return Error::input(token, "not a roman numeral"))
            },
            Self::Roman => parse_number(token, Lang::He),
            Self::Talmud if ascii => parse_sided_latin(token, &['a', 'b']),
            Self::Talmud => parse_talmud_hebrew(token),
        };
    }

    /// Read one token as an inclusive span of positions. Sided notations
    /// written without a side cover every side (`2` → `2a-2b`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if the token is not valid in this notation.
    pub fn parse_span(self, token: &str, lang: Lang) -> Result<(u32, u32), Error> {
        let (number, side) = self.parse_parts(token, lang)?;
        if number == 0 {
            return Err(Error::input(token, "addresses start at 1"));
        }
        let sides: u32 = match self {
            Self::Folio => 4,
            Self::Talmud => 2,
            Self::Integer | Self::Roman | Self::Year => return Ok((number, number)),
        };
        let first = number
            .checked_sub(1)
            .and_then(|n| return n.checked_mul(sides))
            .and_then(|n| return n.checked_add(1))
            .ok_or_else(|| return Error::input(token, "address out of range"))?;
        return match side {
            Some(index) => {
                let offset = u32::try_from(index).unwrap_or(0);
                Ok((first.saturating_add(offset), first.saturating_add(offset)))
            },
            None => Ok((first, first.saturating_add(sides.saturating_sub(1)))),
        };
    }

    /// Regex fragment (no capture groups) matching one token of this type.
    pub const fn regex_fragment(self, lang: Lang) -> &'static str {
        return match (self, lang) {
            (Self::Folio, Lang::En) => EN_FOLIO,
            (Self::Folio, Lang::He) => HE_FOLIO,
            (Self::Integer, Lang::En) => EN_INTEGER,
            (Self::Integer | Self::Roman | Self::Year, Lang::He) => HE_NUMERAL,
            (Self::Roman, Lang::En) => EN_ROMAN,
            (Self::Talmud, Lang::En) => EN_TALMUD,
            (Self::Talmud, Lang::He) => HE_TALMUD,
            (Self::Year, Lang::En) => EN_YEAR,
        };
    }
}

/// Compiled matchers for the address tails of one leaf in one language.
///
/// `suffixes[level]` matches components for `level..depth`, where each
/// deeper component is optional. Ranges use the deepest level that fits.
#[derive(Debug, Clone)]
pub struct AddressGrammar {
    /// One anchored matcher per starting level.
    suffixes: Vec<Regex>,
    /// Address type per level.
    types: Vec<AddressType>,
}

impl AddressGrammar {
    /// Capture the components of `text` starting at `level`.
    pub fn components<'t>(&self, level: usize, text: &'t str) -> Option<Vec<&'t str>> {
        let captures = self.suffixes.get(level)?.captures(text)?;
        let parts = (0..self.types.len().saturating_sub(level))
            .map_while(|i| return captures.name(&format!("c{i}")).map(|m| return m.as_str()))
            .collect();
        return Some(parts);
    }

    /// Compile matchers for a leaf with the given address types.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a generated expression fails to compile.
    pub fn new(types: &[AddressType], lang: Lang) -> Result<Self, Error> {
        let mut suffixes = Vec::with_capacity(types.len());
        for level in 0..types.len() {
            let mut pattern = String::new();
            let tail = types.get(level..).unwrap_or(&[]);
            for (i, kind) in tail.iter().rev().enumerate() {
                let group = tail.len().saturating_sub(i).saturating_sub(1);
                let fragment = kind.regex_fragment(lang);
                pattern = if group == 0 {
                    format!("(?P<c0>{fragment}){pattern}")
                } else {
                    format!("(?:(?:{COMPONENT_SEPARATOR})(?P<c{group}>{fragment}){pattern})?")
                };
            }
            let anchored = format!(r"^\s*{pattern}\s*$");
            suffixes.push(RegexBuilder::new(&anchored).case_insensitive(true).build()?);
        }
        return Ok(Self {
            suffixes,
            types: types.to_vec(),
        });
    }

    /// Address type per level.
    pub fn types(&self) -> &[AddressType] {
        return &self.types;
    }
}

/// Split a 1-based position into a 1-based unit number and a 0-based side.
fn split_units(position: u32, sides: u32) -> (u32, usize) {
    let zero_based = position.saturating_sub(1);
    let unit = (zero_based / sides).saturating_add(1);
    let side = usize::try_from(zero_based % sides).unwrap_or(0);
    return (unit, side);
}

/// Digits anywhere, gematria in Hebrew.
///
/// # Errors
///
/// Returns `Error::Input` when the token is neither.
fn parse_number(token: &str, lang: Lang) -> Result<(u32, Option<usize>), Error> {
    if token.chars().all(|c| return c.is_ascii_digit()) {
        return token
            .parse::<u32>()
            .map(|n| return (n, None))
            .map_err(|_err| return Error::input(token, "number out of range"));
    }
    if lang == Lang::He {
        return hebrew::decode(token)
            .map(|n| return (n, None))
            .ok_or_else(|| return Error::input(token, "not a Hebrew numeral"));
    }
    return Err(Error::input(token, "expected a number"));
}

/// `12`, `12a`, `12B`.
///
/// # Errors
///
/// Returns `Error::Input` for anything else.
fn parse_sided_latin(token: &str, sides: &[char]) -> Result<(u32, Option<usize>), Error> {
    let lowered = token.to_ascii_lowercase();
    let (digits, side) = match lowered.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => {
            let Some(index) = sides.iter().position(|s| return *s == c) else {
                return Err(Error::input(token, format!("side `{c}` is not valid here")));
            };
            (lowered.get(..i).unwrap_or(""), Some(index))
        },
        _ => (lowered.as_str(), None),
    };
    let number = digits
        .parse::<u32>()
        .map_err(|_err| return Error::input(token, "expected a number before the side"))?;
    return Ok((number, side));
}

/// `ב.`, `ב:`, `ב ע״א`, `ב עמוד ב`, or a bare daf.
///
/// # Errors
///
/// Returns `Error::Input` for anything else.
fn parse_talmud_hebrew(token: &str) -> Result<(u32, Option<usize>), Error> {
    let side_of = |c: char| -> Option<usize> {
        return match c {
            'א' => Some(0),
            'ב' => Some(1),
            _ => None,
        };
    };

    let (number, side) = if let Some(rest) = token.strip_suffix('.') {
        (rest, Some(0))
    } else if let Some(rest) = token.strip_suffix(':') {
        (rest, Some(1))
    } else if let Some((rest, letter)) = token.rsplit_once("עמוד") {
        let side = letter.trim().chars().next().and_then(side_of);
        (rest, side)
    } else if let Some((rest, marker)) = token.rsplit_once('ע')
        && !rest.trim().is_empty()
        && let Some((punct, letter)) = two_chars(marker)
        && hebrew::is_numeral_punctuation(punct)
    {
        (rest, side_of(letter))
    } else {
        (token, None)
    };

    let (value, _) = parse_number(number.trim(), Lang::He)?;
    return Ok((value, side));
}

/// The two chars of a two-char string.
fn two_chars(text: &str) -> Option<(char, char)> {
    let mut chars = text.chars();
    let pair = (chars.next()?, chars.next()?);
    if chars.next().is_some() {
        return None;
    }
    return Some(pair);
}

/// `יב ג` or a bare folio number.
///
/// # Errors
///
/// Returns `Error::Input` for anything else.
fn parse_folio_hebrew(token: &str) -> Result<(u32, Option<usize>), Error> {
    if let Some((number, letter)) = token.rsplit_once(char::is_whitespace) {
        let side = letter
            .trim()
            .chars()
            .next()
            .and_then(|c| return FOLIO_SIDES_HE.iter().position(|s| return *s == c));
        if side.is_some() {
            let (value, _) = parse_number(number.trim(), Lang::He)?;
            return Ok((value, side));
        }
    }
    let (value, _) = parse_number(token, Lang::He)?;
    return Ok((value, None));
}

/// Canonical upper-case roman numeral.
fn to_roman(n: u32) -> String {
    let mut out = String::new();
    let mut rest = n;
    for &(value, symbol) in &ROMAN_TABLE {
        while rest >= value {
            out.push_str(symbol);
            rest = rest.saturating_sub(value);
        }
    }
    return out;
}

/// Parse a roman numeral, accepting only canonical spellings.
fn from_roman(token: &str) -> Option<u32> {
    let upper = token.to_ascii_uppercase();
    let mut rest = upper.as_str();
    let mut total = 0_u32;
    for &(value, symbol) in &ROMAN_TABLE {
        while let Some(stripped) = rest.strip_prefix(symbol) {
            total = total.checked_add(value)?;
            rest = stripped;
        }
    }
    if !rest.is_empty() || total == 0 || to_roman(total) != upper {
        return None;
    }
    return Some(total);
}
