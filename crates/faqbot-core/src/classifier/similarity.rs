use std::collections::HashMap;

/// Dice coefficient over character bigrams, whitespace ignored.
///
/// Symmetric, 1.0 for identical inputs, 0.0 when either side has fewer than
/// two characters (and they differ). Repeated bigrams are counted as a
/// multiset so "aaaa" vs "aa" does not score 1.0.
pub fn compare(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut first: HashMap<(char, char), usize> = HashMap::new();
    for w in a.windows(2) {
        *first.entry((w[0], w[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for w in b.windows(2) {
        if let Some(count) = first.get_mut(&(w[0], w[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2.0 * intersection as f64) / ((a.len() - 1) + (b.len() - 1)) as f64
}
