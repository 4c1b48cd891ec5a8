//! Hebrew numerals (gematria) for formatting and parsing address tokens.

/// Geresh, marks a single-letter numeral or a thousands group.
pub const GERESH: char = '\u{05F3}';

/// Gershayim, placed before the last letter of a multi-letter numeral.
pub const GERSHAYIM: char = '\u{05F4}';

/// Letter values from largest to smallest, used when encoding.
const ENCODE_TABLE: [(u32, char); 22] = [
    (400, 'ת'),
    (300, 'ש'),
    (200, 'ר'),
    (100, 'ק'),
    (90, 'צ'),
    (80, 'פ'),
    (70, 'ע'),
    (60, 'ס'),
    (50, 'נ'),
    (40, 'מ'),
    (30, 'ל'),
    (20, 'כ'),
    (10, 'י'),
    (9, 'ט'),
    (8, 'ח'),
    (7, 'ז'),
    (6, 'ו'),
    (5, 'ה'),
    (4, 'ד'),
    (3, 'ג'),
    (2, 'ב'),
    (1, 'א'),
];

/// Numeric value of a Hebrew letter; final forms count as their regular forms.
pub const fn letter_value(c: char) -> Option<u32> {
    return match c {
        'א' => Some(1),
        'ב' => Some(2),
        'ג' => Some(3),
        'ד' => Some(4),
        'ה' => Some(5),
        'ו' => Some(6),
        'ז' => Some(7),
        'ח' => Some(8),
        'ט' => Some(9),
        'י' => Some(10),
        'כ' | 'ך' => Some(20),
        'ל' => Some(30),
        'מ' | 'ם' => Some(40),
        'נ' | 'ן' => Some(50),
        'ס' => Some(60),
        'ע' => Some(70),
        'פ' | 'ף' => Some(80),
        'צ' | 'ץ' => Some(90),
        'ק' => Some(100),
        'ר' => Some(200),
        'ש' => Some(300),
        'ת' => Some(400),
        _ => None,
    };
}

/// True for geresh, gershayim, and their ASCII stand-ins.
pub const fn is_numeral_punctuation(c: char) -> bool {
    return matches!(c, GERESH | GERSHAYIM | '\'' | '"');
}

/// Encode 1..=999 without punctuation.
fn encode_below_thousand(n: u32) -> String {
    let mut out = String::new();
    let mut rest = n;

    // 15 and 16 avoid spelling divine names.
    let tail_special = match rest % 100 {
        15 => Some("טו"),
        16 => Some("טז"),
        _ => None,
    };
    if let Some(special) = tail_special {
        rest = rest.saturating_sub(rest % 100);
        for &(value, letter) in &ENCODE_TABLE {
            while rest >= value && value >= 100 {
                out.push(letter);
                rest = rest.saturating_sub(value);
            }
        }
        out.push_str(special);
        return out;
    }

    for &(value, letter) in &ENCODE_TABLE {
        while rest >= value {
            out.push(letter);
            rest = rest.saturating_sub(value);
        }
    }
    return out;
}

/// Add geresh or gershayim to a bare letter group.
fn punctuate(bare: &str) -> String {
    let count = bare.chars().count();
    if count == 0 {
        return String::new();
    }
    if count == 1 {
        return format!("{bare}{GERESH}");
    }
    let mut out = String::with_capacity(bare.len().saturating_add(2));
    for (i, c) in bare.chars().enumerate() {
        if i.saturating_add(1) == count {
            out.push(GERSHAYIM);
        }
        out.push(c);
    }
    return out;
}

/// Encode a positive number as a Hebrew numeral.
///
/// Thousands are written as a letter followed by a geresh (`ה׳תשע` for 5770).
/// With `punctuated`, the remainder gets a geresh (single letter) or a
/// gershayim before its last letter (`כ״ט`).
pub fn encode(n: u32, punctuated: bool) -> String {
    let thousands = n / 1000;
    let remainder = n % 1000;
    let mut out = String::new();

    if thousands > 0 {
        out.push_str(&encode_below_thousand(thousands));
        out.push(GERESH);
    }

    let body = encode_below_thousand(remainder);
    if punctuated {
        out.push_str(&punctuate(&body));
    } else {
        out.push_str(&body);
    }
    return out;
}

/// Sum the letter values of a group, rejecting anything that is not a letter.
fn sum_letters(group: &str) -> Option<u32> {
    let mut total = 0_u32;
    for c in group.chars() {
        if is_numeral_punctuation(c) {
            continue;
        }
        total = total.checked_add(letter_value(c)?)?;
    }
    return Some(total);
}

/// Decode a Hebrew numeral, with or without geresh/gershayim.
///
/// A geresh followed by further letters marks the preceding group as
/// thousands. Returns `None` for empty input or any non-numeral character.
pub fn decode(token: &str) -> Option<u32> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let thousands_split = token
        .char_indices()
        .find(|&(i, c)| return i > 0 && matches!(c, GERESH | '\''))
        .map(|(i, c)| return (i, c.len_utf8()))
        .filter(|&(i, width)| {
            let after = token.get(i.saturating_add(width)..).unwrap_or("");
            return after.chars().any(|c| return letter_value(c).is_some());
        });

    let value = match thousands_split {
        Some((i, width)) => {
            let high = sum_letters(token.get(..i)?)?;
            let low = sum_letters(token.get(i.saturating_add(width)..)?)?;
            high.checked_mul(1000)?.checked_add(low)?
        },
        None => sum_letters(token)?,
    };

    if value == 0 {
        return None;
    }
    return Some(value);
}

#[cfg(test)]
mod tests {
    use super::{decode, encode};

    #[test]
    fn encodes_simple_numbers() {
        assert_eq!(encode(1, true), "א׳");
        assert_eq!(encode(29, true), "כ״ט");
        assert_eq!(encode(31, false), "לא");
        assert_eq!(encode(150, true), "ק״נ");
    }

    #[test]
    fn avoids_divine_names() {
        assert_eq!(encode(15, false), "טו");
        assert_eq!(encode(16, true), "ט״ז");
        assert_eq!(encode(115, false), "קטו");
    }

    #[test]
    fn encodes_large_hundreds() {
        assert_eq!(encode(613, false), "תריג");
        assert_eq!(encode(900, false), "תתק");
    }

    #[test]
    fn encodes_years_with_thousands() {
        assert_eq!(encode(5770, true), "ה׳תש״ע");
    }

    #[test]
    fn decodes_with_and_without_punctuation() {
        assert_eq!(decode("כ״ט"), Some(29));
        assert_eq!(decode("כט"), Some(29));
        assert_eq!(decode("כ\"ט"), Some(29));
        assert_eq!(decode("א׳"), Some(1));
        assert_eq!(decode("טז"), Some(16));
        assert_eq!(decode("ך"), Some(20));
    }

    #[test]
    fn decodes_thousands() {
        assert_eq!(decode("ה׳תש״ע"), Some(5770));
    }

    #[test]
    fn rejects_non_numerals() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("abc"), None);
        assert_eq!(decode("א1"), None);
    }

    #[test]
    fn round_trips_common_range() {
        for n in 1..=999 {
            assert_eq!(decode(&encode(n, true)), Some(n), "punctuated {n}");
            assert_eq!(decode(&encode(n, false)), Some(n), "bare {n}");
        }
    }
}
