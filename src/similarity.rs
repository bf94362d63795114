//! Text similarity scoring.

/// Levenshtein edit distance between two strings, counted over Unicode
/// scalar values rather than bytes.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let mut a: Vec<char> = a.chars().collect();
    let mut b: Vec<char> = b.chars().collect();
    // Keep the row allocation on the shorter side.
    if b.len() > a.len() {
        std::mem::swap(&mut a, &mut b);
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let insertion = curr[j] + 1;
            let deletion = prev[j + 1] + 1;
            curr[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized similarity score in `[0.0, 1.0]`.
///
/// Defined as `(max_len - distance) / max_len` where `max_len` is the longer
/// string's character count. Identical strings score `1.0`; two empty strings
/// are identical by definition.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    (max_len - distance) as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", ""), 0);
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        // 'é' is two bytes but one scalar value
        assert_eq!(levenshtein("café", "cafe"), 1);
        assert_eq!(levenshtein("日本語", "日本"), 1);
    }

    #[test]
    fn test_similarity_identical() {
        assert_eq!(similarity("hello world", "hello world"), 1.0);
    }

    #[test]
    fn test_similarity_both_empty() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_similarity_one_empty() {
        assert_eq!(similarity("", "abc"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = "the quick brown fox";
        let b = "the quick brown fix";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn test_similarity_normalization() {
        // distance 1 over max_len 10
        assert!((similarity("aaaaaaaaaa", "aaaaaaaaab") - 0.9).abs() < 1e-9);
        // completely different, same length
        assert_eq!(similarity("aaaa", "bbbb"), 0.0);
    }

    #[test]
    fn test_similarity_threshold_band() {
        // One edit in a 100-char string stays well above 0.85
        let base = "a".repeat(100);
        let mut edited = base.clone();
        edited.replace_range(0..1, "b");
        assert!(similarity(&base, &edited) > 0.85);

        // 20 edits in a 100-char string falls below 0.85
        let heavily = format!("{}{}", "b".repeat(20), "a".repeat(80));
        assert!(similarity(&base, &heavily) < 0.85);
    }

    #[test]
    fn test_similarity_bounded() {
        for (a, b) in [
            ("", "x"),
            ("short", "a much longer string entirely"),
            ("αβγ", "xyz"),
        ] {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
