//! Offset pagination helpers.

use thiserror::Error;

use tipcat_api_types::PaginationMeta;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page number must be at least 1, got {0}")]
    InvalidPageNumber(i64),
    #[error("page size must be between 1 and {max}, got {size}")]
    InvalidPageSize { size: i64, max: u32 },
}

/// A validated page request: 1-based page number and a bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    number: u32,
    size: u32,
}

impl PageWindow {
    pub fn new(number: i64, size: i64, max_size: u32) -> Result<Self, PaginationError> {
        let number = u32::try_from(number)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(PaginationError::InvalidPageNumber(number))?;
        let size = u32::try_from(size)
            .ok()
            .filter(|s| (1..=max_size).contains(s))
            .ok_or(PaginationError::InvalidPageSize {
                size,
                max: max_size,
            })?;
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Rows before this page: `(number - 1) * size`.
    pub fn skip(&self) -> usize {
        (self.number as usize - 1).saturating_mul(self.size as usize)
    }

    /// Cut this page out of a fully ordered result. Pages past the end are empty.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.skip())
            .take(self.size as usize)
            .collect()
    }

    pub fn meta(&self, total_items: u64) -> PaginationMeta {
        PaginationMeta::new(total_items, self.number, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_page_numbers() {
        assert_eq!(
            PageWindow::new(0, 10, 100),
            Err(PaginationError::InvalidPageNumber(0))
        );
        assert_eq!(
            PageWindow::new(-3, 10, 100),
            Err(PaginationError::InvalidPageNumber(-3))
        );
    }

    #[test]
    fn rejects_out_of_bounds_sizes() {
        assert!(PageWindow::new(1, 0, 100).is_err());
        assert!(PageWindow::new(1, 101, 100).is_err());
        assert!(PageWindow::new(1, 100, 100).is_ok());
    }

    #[test]
    fn slices_requested_page() {
        let window = PageWindow::new(2, 3, 100).unwrap();
        assert_eq!(window.skip(), 3);
        assert_eq!(window.slice((0..8).collect()), vec![3, 4, 5]);
    }

    #[test]
    fn page_past_end_is_empty() {
        let window = PageWindow::new(9, 5, 100).unwrap();
        assert!(window.slice((0..8).collect::<Vec<_>>()).is_empty());
        let meta = window.meta(8);
        assert_eq!(meta.total_items, 8);
        assert_eq!(meta.total_pages, 2);
        assert_eq!(meta.page_number, 9);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let window = PageWindow::new(i64::from(u32::MAX), 100, 100).unwrap();
        assert!(window.slice(vec![1, 2, 3]).is_empty());
    }
}
