//! Slug derivation helpers.
//!
//! Slugs are the natural keys the store resolves posts by, so the rules here
//! must stay stable across crawls: the same source title always produces the
//! same slug.

use deunicode::deunicode;

/// Lowercase, transliterate to ASCII, and join alphanumeric runs with `-`.
///
/// Apostrophes are stripped rather than treated as separators, so
/// `Don't Look Up` becomes `dont-look-up`, not `don-t-look-up`.
pub fn slugify(input: &str) -> String {
    let lower = deunicode(&format_slug(input).to_lowercase());
    lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Strip apostrophe variants from a slug source.
///
/// Source pages mix typographic apostrophes, plain quotes, and the
/// double-encoded `â€™` mojibake; all of them are dropped rather than
/// transliterated so every spelling lands on the same slug.
pub fn format_slug(raw: &str) -> String {
    raw.replace("â€™", "").replace('’', "").replace('\'', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_joins_alphanumeric_runs() {
        assert_eq!(slugify("The Last of Us"), "the-last-of-us");
        assert_eq!(slugify("Spider-Man: No Way Home"), "spider-man-no-way-home");
    }

    #[test]
    fn slugify_transliterates_accents() {
        assert_eq!(slugify("Amélie"), "amelie");
    }

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("  A --- B  "), "a-b");
    }

    #[test]
    fn apostrophe_variants_share_one_slug() {
        assert_eq!(slugify("Don’t Look Up"), "dont-look-up");
        assert_eq!(slugify("Don't Look Up"), "dont-look-up");
        assert_eq!(slugify("Donâ€™t Look Up"), "dont-look-up");
    }
}
