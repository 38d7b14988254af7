//! Edit-distance helpers for fuzzy track matching.
//!
//! Titles coming back from the completion service or the similarity
//! service rarely match library entries byte for byte ("Song (Remastered)"
//! vs "Song"), so matching goes through a normalized similarity ratio.

/// Calculate the Levenshtein (edit) distance between two strings.
/// Returns the minimum number of single-character edits (insertions,
/// deletions, or substitutions) required to change one string into the other.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Two rows instead of the full matrix
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };

            curr_row[j + 1] = (prev_row[j + 1] + 1) // deletion
                .min(curr_row[j] + 1) // insertion
                .min(prev_row[j] + cost); // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Lowercase and trim, the canonical form used for every identity comparison.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Similarity ratio in `[0.0, 1.0]` between two strings after normalization.
///
/// `1.0` means identical, `0.0` means nothing in common. Two empty strings
/// are considered identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f64 / max_len as f64
}

/// Whether both title and artist are strictly above the threshold.
pub fn is_fuzzy_match(
    title_a: &str,
    artist_a: &str,
    title_b: &str,
    artist_b: &str,
    threshold: f64,
) -> bool {
    similarity_ratio(title_a, title_b) > threshold && similarity_ratio(artist_a, artist_b) > threshold
}
