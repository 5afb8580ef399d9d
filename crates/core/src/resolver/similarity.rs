//! Title comparison helpers.

/// Lowercases, drops punctuation and collapses whitespace, so
/// "Spider-Man: No Way Home" and "spider man no way home" compare equal.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c == '\'' {
                '\0'
            } else {
                ' '
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity of two titles in 0.0..=1.0, one minus the normalized
/// Levenshtein distance of their normalized forms.
pub fn title_similarity(a: &str, b: &str) -> f32 {
    let a = normalize_title(a);
    let b = normalize_title(b);
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f32 / longest as f32
}

/// Calculate Levenshtein edit distance between two strings.
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

    // Two rolling rows instead of the full matrix.
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0usize; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("Spider-Man: No Way Home"),
            "spider man no way home"
        );
        assert_eq!(normalize_title("Ocean's  Eleven"), "oceans eleven");
        assert_eq!(normalize_title("  WALL·E "), "wall e");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_similarity() {
        assert_eq!(title_similarity("The Matrix", "the matrix"), 1.0);
        assert!(title_similarity("The Matrix", "The Matrx") > 0.85);
        assert!(title_similarity("The Matrix", "Heat") < 0.5);
    }
}
