//! Group slug rules.
//!
//! Slugs are the public handle of a group (`/group/{slug}/`). They may be
//! supplied explicitly by the administrator or derived from the group title
//! with the `slug` crate, which transliterates non-ASCII text.

use slug::slugify;

use super::error::DomainError;

pub const MAX_SLUG_LEN: usize = 50;

/// Derive a slug from a human-readable title.
pub fn derive_slug(title: &str) -> Result<String, DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::blank("title"));
    }

    let mut candidate = slugify(title);
    candidate.truncate(MAX_SLUG_LEN);
    let candidate = candidate.trim_end_matches('-').to_string();

    if candidate.is_empty() {
        return Err(DomainError::InvalidSlug {
            value: title.to_string(),
        });
    }

    Ok(candidate)
}

/// Accept an explicit slug made of ASCII letters, digits, `-` and `_`.
///
/// Case is preserved; `Left-group` and `left-group` are distinct slugs.
pub fn validate_slug(value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::blank("slug"));
    }
    if trimmed.len() > MAX_SLUG_LEN {
        return Err(DomainError::too_long("slug", MAX_SLUG_LEN));
    }
    let valid = trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(DomainError::InvalidSlug {
            value: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
