//! Page slicing for feeds.
//!
//! The requested page comes straight from the `page` query parameter and is
//! never trusted: junk falls back to the first page, out-of-range numbers clamp
//! to the nearest valid page. Callers never see an error.

use serde::Serialize;

/// Posts per page on every feed
pub const PAGE_SIZE: usize = 10;

/// Offset/limit of one page within a collection of `count` items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// Number of pages for `count` items; an empty collection still has one page
    pub fn num_pages(&self, count: usize) -> usize {
        count.div_ceil(self.per_page).max(1)
    }

    /// Resolve a raw page parameter against a collection size
    pub fn window(&self, count: usize, raw_page: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match raw_page.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n < 1 => 1,
            Some(Ok(n)) => (n as u64).min(num_pages as u64) as usize,
            _ => 1,
        };

        let offset = (number - 1) * self.per_page;
        let limit = self.per_page.min(count.saturating_sub(offset));

        PageWindow {
            number,
            num_pages,
            count,
            offset,
            limit,
        }
    }

    /// Slice an in-memory ordered collection
    pub fn paginate<T>(&self, items: Vec<T>, raw_page: Option<&str>) -> Page<T> {
        let window = self.window(items.len(), raw_page);
        let object_list = items
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect();
        Page::new(window, object_list)
    }
}

/// One page of an ordered collection plus navigation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
    /// 1-based index of the first item on this page, 0 when empty
    pub start_index: usize,
    pub end_index: usize,
}

impl<T> Page<T> {
    /// Wrap items already fetched for `window`
    pub fn new(window: PageWindow, object_list: Vec<T>) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        let start_index = if window.count == 0 {
            0
        } else {
            window.offset + 1
        };
        let end_index = window.offset + object_list.len();

        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(window.number + 1),
            previous_page_number: has_previous.then_some(window.number - 1),
            start_index,
            end_index,
        }
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    /// Convert the items while keeping the navigation metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
            start_index: self.start_index,
            end_index: self.end_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thirteen() -> Vec<u32> {
        (1..=13).collect()
    }

    #[test]
    fn thirteen_items_split_ten_and_three() {
        let paginator = Paginator::default();

        let first = paginator.paginate(thirteen(), Some("1"));
        assert_eq!(first.len(), 10);
        assert_eq!(first.object_list[0], 1);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert_eq!(first.num_pages, 2);

        let second = paginator.paginate(thirteen(), Some("2"));
        assert_eq!(second.object_list, vec![11, 12, 13]);
        assert!(!second.has_next);
        assert!(second.has_previous);
        assert_eq!(second.previous_page_number, Some(1));
        assert_eq!((second.start_index, second.end_index), (11, 13));
    }

    #[test]
    fn past_the_end_clamps_to_last_page() {
        let page = Paginator::default().paginate(thirteen(), Some("3"));
        assert_eq!(page.number, 2);
        assert_eq!(page.object_list, vec![11, 12, 13]);

        let page = Paginator::default().paginate(thirteen(), Some("9999999999999"));
        assert_eq!(page.number, 2);
    }

    #[test]
    fn junk_and_missing_pages_fall_back_to_first() {
        let paginator = Paginator::default();
        for raw in [None, Some(""), Some("abc"), Some("1.5"), Some("0"), Some("-4")] {
            let page = paginator.paginate(thirteen(), raw);
            assert_eq!(page.number, 1, "raw page {:?}", raw);
            assert_eq!(page.len(), 10);
        }
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let page = Paginator::default().paginate(Vec::<u32>::new(), Some("5"));
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.is_empty());
        assert!(!page.has_next);
        assert_eq!((page.start_index, page.end_index), (0, 0));
    }

    #[test]
    fn window_matches_database_slicing() {
        let window = Paginator::new(10).window(13, Some("2"));
        assert_eq!(window.offset, 10);
        assert_eq!(window.limit, 3);

        let window = Paginator::new(10).window(20, Some("2"));
        assert_eq!((window.offset, window.limit), (10, 10));
    }
}
