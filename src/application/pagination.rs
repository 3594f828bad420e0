//! Page-number pagination for feeds.
//!
//! Requests never fail on a bad page number: anything that is missing,
//! non-numeric or below one resolves to the first page, and anything past the
//! end resolves to the last page. An empty listing is a single empty page.

use std::num::NonZeroU32;

pub const DEFAULT_PAGE_SIZE: NonZeroU32 = match NonZeroU32::new(10) {
    Some(size) => size,
    None => panic!("default page size must be non-zero"),
};

/// Query-string parameter carrying the requested page number.
pub const PAGE_PARAM: &str = "page";

/// The resolved position of one page inside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    number: u64,
    page_size: NonZeroU32,
    total_items: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestedPage {
    First,
    Number(u64),
    Last,
}

impl RequestedPage {
    fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Self::First;
        };

        match raw.parse::<i64>() {
            Ok(value) if value >= 1 => Self::Number(value as u64),
            Ok(_) => Self::First,
            Err(_) if raw.bytes().all(|b| b.is_ascii_digit()) => Self::Last,
            Err(_) => Self::First,
        }
    }
}

impl PageWindow {
    /// Resolve the requested page against a listing of `total_items`.
    pub fn resolve(total_items: u64, page_size: NonZeroU32, requested: Option<&str>) -> Self {
        let total_pages = total_pages(total_items, page_size);
        let number = match RequestedPage::parse(requested) {
            RequestedPage::First => 1,
            RequestedPage::Number(number) => number.min(total_pages),
            RequestedPage::Last => total_pages,
        };

        Self {
            number,
            page_size,
            total_items,
        }
    }

    /// One-based index of this page.
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.get()
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    /// `ceil(total_items / page_size)`, never less than one.
    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_items, self.page_size)
    }

    /// Number of items preceding this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1) * u64::from(self.page_size.get())
    }

    /// Number of items on this page.
    pub fn len(&self) -> u32 {
        let remaining = self.total_items.saturating_sub(self.offset());
        remaining.min(u64::from(self.page_size.get())) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_first(&self) -> bool {
        self.number == 1
    }

    pub fn is_last(&self) -> bool {
        self.number == self.total_pages()
    }

    pub fn previous_number(&self) -> Option<u64> {
        (!self.is_first()).then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        (!self.is_last()).then(|| self.number + 1)
    }

    /// One-based index of the first item on this page (zero when empty).
    pub fn start_index(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.offset() + 1
        }
    }

    /// One-based index of the last item on this page (zero when empty).
    pub fn end_index(&self) -> u64 {
        self.offset() + u64::from(self.len())
    }
}

fn total_pages(total_items: u64, page_size: NonZeroU32) -> u64 {
    total_items.div_ceil(u64::from(page_size.get())).max(1)
}

/// A page of items along with its position in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }
}

/// Slice an in-memory, already ordered sequence into one page.
pub fn paginate<T>(items: Vec<T>, page_size: NonZeroU32, requested: Option<&str>) -> Page<T> {
    let window = PageWindow::resolve(items.len() as u64, page_size, requested);
    let items = items
        .into_iter()
        .skip(window.offset() as usize)
        .take(window.len() as usize)
        .collect();
    Page { items, window }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap()
    }

    #[test]
    fn thirteen_items_split_into_ten_and_three() {
        let items: Vec<u32> = (1..=13).collect();

        let first = paginate(items.clone(), DEFAULT_PAGE_SIZE, None);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.window.total_pages(), 2);
        assert!(!first.window.is_last());
        assert_eq!(first.window.next_number(), Some(2));

        let second = paginate(items, DEFAULT_PAGE_SIZE, Some("2"));
        assert_eq!(second.items, vec![11, 12, 13]);
        assert!(second.window.is_last());
        assert_eq!(second.window.start_index(), 11);
        assert_eq!(second.window.end_index(), 13);
    }

    #[test]
    fn missing_or_garbage_page_resolves_to_first() {
        for raw in [None, Some(""), Some("abc"), Some("1.5"), Some("  ")] {
            let window = PageWindow::resolve(25, size(10), raw);
            assert_eq!(window.number(), 1, "input {raw:?}");
        }
    }

    #[test]
    fn non_positive_page_resolves_to_first() {
        for raw in ["0", "-1", "-9999999999999"] {
            assert_eq!(PageWindow::resolve(25, size(10), Some(raw)).number(), 1);
        }
    }

    #[test]
    fn page_past_the_end_matches_last_page() {
        let items: Vec<u32> = (0..25).collect();
        let last = paginate(items.clone(), size(10), Some("3"));
        for raw in ["4", "500", "99999999999999999999999"] {
            let page = paginate(items.clone(), size(10), Some(raw));
            assert_eq!(page.items, last.items, "input {raw}");
            assert_eq!(page.window.number(), 3);
        }
    }

    #[test]
    fn empty_listing_is_single_empty_page() {
        let page = paginate(Vec::<u8>::new(), size(10), Some("7"));
        assert!(page.items.is_empty());
        assert_eq!(page.window.number(), 1);
        assert_eq!(page.window.total_pages(), 1);
        assert!(page.window.is_last());
        assert!(page.window.is_first());
        assert_eq!(page.window.start_index(), 0);
        assert_eq!(page.window.end_index(), 0);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_page() {
        let window = PageWindow::resolve(20, size(10), Some("3"));
        assert_eq!(window.total_pages(), 2);
        assert_eq!(window.number(), 2);
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn offsets_follow_page_number() {
        let window = PageWindow::resolve(95, size(10), Some("4"));
        assert_eq!(window.offset(), 30);
        assert_eq!(window.len(), 10);
        assert_eq!(window.previous_number(), Some(3));
    }
}
