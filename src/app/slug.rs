/// Lowercase ASCII slug: alphanumerics kept, runs of whitespace, `-` and `_`
/// collapse to a single `-`, everything else is dropped.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Accepts the characters a slug path segment may contain.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello,  World!"), "hello-world");
        assert_eq!(slugify("  Rust -- and_Axum  "), "rust-and-axum");
        assert_eq!(slugify("Who's there?"), "whos-there");
    }

    #[test]
    fn slugify_drops_non_ascii() {
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn valid_slug_characters() {
        assert!(is_valid_slug("test-post-1"));
        assert!(is_valid_slug("snake_case"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("a/b"));
    }
}
