//! File name safety filter.

/// Characters that may not appear in a generated file name.
pub const ILLEGAL_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Name used when filtering leaves nothing.
pub const FALLBACK_NAME: &str = "unnamed_file";

/// Makes `name` safe to use as a file name.
///
/// Illegal characters become `_`, leading and trailing dots and spaces are
/// stripped, and an empty result becomes [`FALLBACK_NAME`].
pub fn safe_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|ch| if ILLEGAL_CHARS.contains(&ch) { '_' } else { ch })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_illegal_characters() {
        assert_eq!(safe_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_strips_dots_and_spaces() {
        assert_eq!(safe_filename(" ..movie.. "), "movie");
        assert_eq!(safe_filename("my movie.final"), "my movie.final");
    }

    #[test]
    fn test_empty_becomes_fallback() {
        assert_eq!(safe_filename(""), FALLBACK_NAME);
        assert_eq!(safe_filename(" . . "), FALLBACK_NAME);
    }

    #[test]
    fn test_output_never_contains_illegal_characters() {
        for input in ["::", "a/b", "<>|", "...x?..."] {
            let out = safe_filename(input);
            assert!(!out.is_empty());
            assert!(!out.chars().any(|c| ILLEGAL_CHARS.contains(&c)), "{}", out);
            assert!(!out.starts_with(['.', ' ']) && !out.ends_with(['.', ' ']));
        }
    }
}
