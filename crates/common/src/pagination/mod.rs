//! Page-number pagination shared by every list endpoint

use crate::errors::{AppError, Result};
use serde::Serialize;

/// A validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, page_size: u64) -> Result<Self> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::field("page", "Page numbers start at 1"));
        }
        Ok(Self {
            page,
            page_size: page_size.max(1),
        })
    }

    /// Zero-based index as used by the paginator
    pub fn index(&self) -> u64 {
        self.page - 1
    }

    /// Pages past the end are an error; an empty first page is not.
    pub fn check_in_range(&self, total: u64) -> Result<()> {
        let past_end = match self.index().checked_mul(self.page_size) {
            Some(offset) => offset >= total,
            None => true,
        };
        if self.page > 1 && past_end {
            return Err(AppError::NotFound {
                resource_type: "page".to_string(),
                id: self.page.to_string(),
            });
        }
        Ok(())
    }
}

/// One page of results plus what is needed to link neighbours
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page
            .checked_mul(self.page_size)
            .is_some_and(|seen| seen < self.total)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_first_page() {
        let req = PageRequest::new(None, 10).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.index(), 0);
    }

    #[test]
    fn test_page_zero_is_rejected() {
        assert!(matches!(
            PageRequest::new(Some(0), 10),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let req = PageRequest::new(Some(3), 10).unwrap();
        assert!(req.check_in_range(25).is_ok());
        assert!(req.check_in_range(20).is_err());

        // An empty collection still has a first page
        let first = PageRequest::new(Some(1), 10).unwrap();
        assert!(first.check_in_range(0).is_ok());
    }

    #[test]
    fn test_huge_page_is_past_the_end() {
        let req = PageRequest::new(Some(u64::MAX), 10).unwrap();
        assert!(matches!(
            req.check_in_range(25),
            Err(AppError::NotFound { .. })
        ));

        let page = Page::new(Vec::<i32>::new(), 25, req);
        assert!(!page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn test_neighbours() {
        let req = PageRequest::new(Some(2), 10).unwrap();
        let page = Page::new(vec![1, 2, 3], 23, req);
        assert!(page.has_next());
        assert!(page.has_previous());

        let last = Page::new(vec![1, 2, 3], 23, PageRequest::new(Some(3), 10).unwrap());
        assert!(!last.has_next());

        let doubled = last.map(|x| x * 2);
        assert_eq!(doubled.items, vec![2, 4, 6]);
    }
}
