//! Numeric-aware ordering for item IDs and iteration slugs.
//!
//! IDs are split on `.` and `-`, and each piece further into digit and
//! non-digit runs. Digit runs compare by value, everything else lexically, so
//! `1.2 < 1.10 < 2.1` and `1.1-T2 < 1.1-T10`.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Num(&'a str),
    Text(&'a str),
}

fn tokens(id: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    for segment in id.split(['.', '-']) {
        let mut start = 0;
        let mut in_digits = None;
        for (i, c) in segment.char_indices() {
            let digit = c.is_ascii_digit();
            match in_digits {
                Some(prev) if prev != digit => {
                    out.push(token(&segment[start..i], prev));
                    start = i;
                }
                _ => {}
            }
            in_digits = Some(digit);
        }
        if let Some(digit) = in_digits {
            out.push(token(&segment[start..], digit));
        }
    }
    out
}

fn token(s: &str, digit: bool) -> Token<'_> {
    if digit {
        Token::Num(s)
    } else {
        Token::Text(s)
    }
}

// Digit runs may exceed u64; compare by significant length, then lexically.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_sig = a.trim_start_matches('0');
    let b_sig = b.trim_start_matches('0');
    a_sig
        .len()
        .cmp(&b_sig.len())
        .then_with(|| a_sig.cmp(b_sig))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Total order over IDs; numbers sort before text at the same position.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    let ta = tokens(a);
    let tb = tokens(b);
    for (x, y) in ta.iter().zip(tb.iter()) {
        let ord = match (x, y) {
            (Token::Num(x), Token::Num(y)) => compare_digits(x, y),
            (Token::Text(x), Token::Text(y)) => x.cmp(y),
            (Token::Num(_), Token::Text(_)) => Ordering::Less,
            (Token::Text(_), Token::Num(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ta.len().cmp(&tb.len()).then_with(|| a.cmp(b))
}

/// Sort IDs in place with [`compare_ids`].
pub fn sort_ids<S: AsRef<str>>(ids: &mut [S]) {
    ids.sort_by(|a, b| compare_ids(a.as_ref(), b.as_ref()));
}
