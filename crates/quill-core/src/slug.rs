//! Slug derivation shared by posts and tags.

/// Derive a URL slug from a title or tag name.
///
/// Lowercases the input, collapses every run of non-alphanumeric characters
/// into a single hyphen and trims hyphens from both ends. Distinct inputs may
/// produce the same slug; slugs are not unique.
pub fn slugify(source: &str) -> String {
    slug::slugify(source)
}
