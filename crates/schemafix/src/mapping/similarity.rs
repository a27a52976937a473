//! Pure name-similarity scoring for fuzzy column matching.
//!
//! Two views of a name pair are combined:
//!
//! - **token**: word-level overlap, where an abbreviation such as `cust` earns
//!   partial credit against `customer`;
//! - **character**: the mean of Jaro-Winkler and normalized Levenshtein over the
//!   names with separators removed.
//!
//! With token evidence the score is the stronger view. Without it the character
//! view only counts at typo level ([`CHAR_ONLY_MIN`]), so `status` does not
//! land on `state`.
//!
//! Both views operate on [`normalize_name`] output, so `Cust_ID` and `cust id`
//! score identically.

use rapidfuzz::distance::{jaro_winkler, levenshtein};

use crate::schema::normalize_name;

/// Shortest token that may count as an abbreviation of a longer one.
const MIN_PREFIX_LEN: usize = 3;

/// Lowest character score accepted when no token is shared.
pub const CHAR_ONLY_MIN: f64 = 0.85;

/// Similarity of two raw column names in [0, 1].
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let tokens = token_score(&a, &b);
    let chars = char_score(&a, &b);
    if tokens > 0.0 {
        tokens.max(chars)
    } else if chars >= CHAR_ONLY_MIN {
        chars
    } else {
        0.0
    }
}

/// Word-overlap score of two normalized names.
///
/// Each token of the shorter name is paired with its best unused counterpart in
/// the longer one. The matched credit is averaged over both token counts, so
/// `name` vs `customer name` scores 0.75 rather than 1.0.
pub fn token_score(a: &str, b: &str) -> f64 {
    let a_tokens: Vec<&str> = a.split(' ').collect();
    let b_tokens: Vec<&str> = b.split(' ').collect();
    let (short, long) = if a_tokens.len() <= b_tokens.len() {
        (&a_tokens, &b_tokens)
    } else {
        (&b_tokens, &a_tokens)
    };

    let mut used = vec![false; long.len()];
    let mut credit = 0.0;

    for token in short.iter() {
        let best = long
            .iter()
            .enumerate()
            .filter(|(i, _)| !used[*i])
            .map(|(i, other)| (i, token_credit(token, other)))
            .fold(None, |best: Option<(usize, f64)>, (i, c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ if c > 0.0 => Some((i, c)),
                _ => best,
            });

        if let Some((i, c)) = best {
            used[i] = true;
            credit += c;
        }
    }

    (credit / a_tokens.len() as f64 + credit / b_tokens.len() as f64) / 2.0
}

/// Credit for one token pair: 1.0 when equal, partial when one abbreviates the other.
fn token_credit(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.len() >= MIN_PREFIX_LEN && long.starts_with(short) {
        0.5 + 0.5 * short.len() as f64 / long.len() as f64
    } else {
        0.0
    }
}

/// Character-level score of two normalized names, separators removed.
pub fn char_score(a: &str, b: &str) -> f64 {
    let a: String = a.chars().filter(|c| *c != ' ').collect();
    let b: String = b.chars().filter(|c| *c != ' ').collect();

    let jw = jaro_winkler::similarity(a.chars(), b.chars());
    let lev = levenshtein::normalized_similarity(a.chars(), b.chars());
    (jw + lev) / 2.0
}
