//! Person-name normalization used for population-database matching.
//!
//! Names arrive from two directions with different hygiene: will text
//! extractions carry honorifics and punctuation ("Mr. Tom O'Doe,"),
//! while database records are comparatively clean. Both sides are
//! folded through [`clean_name`] before comparison so that lookups key
//! on the same canonical form.

use unicode_normalization::UnicodeNormalization;

/// Canonicalizes a person name for matching.
///
/// Applies NFKD decomposition (so "José" and "Jose\u{301}" compare
/// equal), then strips every character that is not alphanumeric,
/// whitespace, an underscore, or a period. Case and interior spacing
/// are preserved.
#[must_use]
pub fn clean_name(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '.')
        .collect()
}

/// True when two names canonicalize to the same form.
#[must_use]
pub fn same_person(a: &str, b: &str) -> bool {
    clean_name(a) == clean_name(b)
}
