//! # Pagination & Search
//!
//! Offset pagination for the admin tables.

use serde::Serialize;

/// Rows per page on the admin user, restaurant and QR code tables.
pub const ADMIN_PAGE_SIZE: usize = 20;

/// Rows per page on the admin scan log.
pub const SCAN_PAGE_SIZE: usize = 50;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    /// Out-of-range page numbers (absent, zero, negative) become page 1.
    #[must_use]
    pub fn new(page: Option<i64>, per_page: usize) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        Self {
            page: usize::try_from(page).unwrap_or(1),
            per_page: per_page.max(1),
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Cut one page out of an already filtered and sorted list.
    #[must_use]
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.per_page)
            .collect();
        Page {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
            total_pages: total_pages(total, self.per_page),
        }
    }
}

/// One page of results plus the counts the tables need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }

    /// Same counts, items replaced by rows loaded for this page only.
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// `max(1, ceil(total / per_page))`, in integers.
#[must_use]
pub fn total_pages(total: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    total.div_ceil(per_page).max(1)
}

/// Normalized search term: trimmed, lowercased, `None` when blank.
#[must_use]
pub fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive substring match against any field.
///
/// `term` must come from [`search_term`].
#[must_use]
pub fn matches_any<'a>(term: &str, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(PageRequest::new(None, 20).page, 1);
        assert_eq!(PageRequest::new(Some(0), 20).page, 1);
        assert_eq!(PageRequest::new(Some(-3), 20).page, 1);
        assert_eq!(PageRequest::new(Some(4), 20).page, 4);
    }

    #[test]
    fn total_pages_never_zero() {
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(101, 50), 3);
    }

    #[test]
    fn slice_cuts_requested_page() {
        let items: Vec<u32> = (0..45).collect();
        let page = PageRequest::new(Some(3), 20).slice(items);
        assert_eq!(page.items, vec![40, 41, 42, 43, 44]);
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn slice_past_end_is_empty() {
        let page = PageRequest::new(Some(9), 20).slice(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn search_is_case_insensitive() {
        let term = search_term(Some("  MaQuis ")).unwrap();
        assert!(matches_any(&term, [Some("Le Maquis d'Abidjan"), None]));
        assert!(!matches_any(&term, [Some("Chez Ali"), None]));
        assert_eq!(search_term(Some("   ")), None);
    }
}
