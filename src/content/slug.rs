/// Derives a URL slug from a title: lowercase, every run of characters
/// outside [a-z0-9] collapsed to a single hyphen, leading and trailing
/// hyphens trimmed. May return an empty string.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Whether `slug` is already in canonical form (and non-empty).
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug) == slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_titles() {
        assert_eq!(slugify("About Us"), "about-us");
        assert_eq!(slugify("The Old Mill, 1897"), "the-old-mill-1897");
        assert_eq!(slugify("home"), "home");
    }

    #[test]
    fn test_collapses_runs_and_trims() {
        assert_eq!(slugify("  --Hello---World!!  "), "hello-world");
        assert_eq!(slugify("a     b"), "a-b");
        assert_eq!(slugify("-leading and trailing-"), "leading-and-trailing");
    }

    #[test]
    fn test_non_ascii_dropped() {
        assert_eq!(slugify("Café Stories"), "caf-stories");
        assert_eq!(slugify("日本"), "");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_idempotent() {
        for title in [
            "About Us",
            "  --Hello---World!!  ",
            "Café Stories",
            "already-a-slug",
            "UPPER case 123",
            "",
        ] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once, "not idempotent for {title:?}");
        }
    }

    #[test]
    fn test_output_shape() {
        // output matches ^[a-z0-9]+(-[a-z0-9]+)*$ or is empty
        for title in ["About Us", "x", "A--B", "9 Lives!", "トマト paste"] {
            let slug = slugify(title);
            if slug.is_empty() {
                continue;
            }
            assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            assert!(!slug.contains("--"));
            assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
    }

    #[test]
    fn test_valid_slug_check() {
        assert!(is_valid_slug("about-us"));
        assert!(is_valid_slug("page2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("About-Us"));
        assert!(!is_valid_slug("-about"));
        assert!(!is_valid_slug("a_b"));
    }
}
