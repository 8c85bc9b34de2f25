//! Name similarity scoring.

/// Affix score: `name` -> `full_name`, `created` -> `created_at`.
const AFFIX_SCORE: f64 = 0.8;

/// Shortest name that may score as an affix of another.
const MIN_AFFIX_LEN: usize = 3;

/// Computes the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Normalized edit similarity in `[0.0, 1.0]`; 1.0 means identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

/// Similarity of two column names, case-insensitive.
///
/// The larger of the edit similarity and an affix score: when one name
/// starts or ends the other, the pair scores at least 0.8.
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let edit = similarity(&a, &b);
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let affix = short.chars().count() >= MIN_AFFIX_LEN
        && short != long
        && (long.starts_with(short.as_str()) || long.ends_with(short.as_str()));
    if affix {
        edit.max(AFFIX_SCORE)
    } else {
        edit
    }
}
