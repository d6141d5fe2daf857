//! # Slugs
//!
//! URL-safe identifiers for public restaurant pages and upload file names.
//! Non-ASCII letters are transliterated with `deunicode`.

use deunicode::deunicode_char;

/// Slug used when a name has no usable characters.
pub const FALLBACK_SLUG: &str = "restaurant";

/// Lowercase ASCII slug: letters transliterated, `&` spelled out,
/// everything else collapsed to a single `-`.
///
/// Returns an empty string when nothing survives; callers pick a fallback.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            push_folded(&mut slug, &mut pending_dash, c);
        } else if c == '&' {
            pending_dash = true;
            push_all(&mut slug, &mut pending_dash, "and");
            pending_dash = true;
        } else if c.is_ascii() {
            pending_dash = true;
        } else {
            push_all(&mut slug, &mut pending_dash, deunicode_char(c).unwrap_or(" "));
        }
    }

    slug
}

/// Slug for a restaurant name, never empty.
#[must_use]
pub fn restaurant_slug(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Pick the first free variant of `base`: `base`, `base-2`, `base-3`, ...
#[must_use]
pub fn unique_slug(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n = n.saturating_add(1);
    }
}

fn push_folded(slug: &mut String, pending_dash: &mut bool, c: char) {
    if *pending_dash && !slug.is_empty() {
        slug.push('-');
    }
    *pending_dash = false;
    slug.push(c.to_ascii_lowercase());
}

// Transliterations may carry spaces or punctuation; those become dashes.
fn push_all(slug: &mut String, pending_dash: &mut bool, text: &str) {
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            push_folded(slug, pending_dash, c);
        } else {
            *pending_dash = true;
        }
    }
}
