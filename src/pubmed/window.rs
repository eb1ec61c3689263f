//! Partitioning of a requested result range into fetch windows

use std::fmt;

/// Largest number of records fetched in one EFetch request
pub const MAX_WINDOW_SIZE: usize = 10_000;

/// Half-open index range `[start, end)` into a server-side result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Consecutive windows covering `[0, total)` in ascending order
///
/// Every window holds at most `size` indices; only the last one may be shorter.
/// The windows depend on `total` alone, never on how many results the service
/// actually has.
#[derive(Debug, Clone)]
pub struct Windows {
    next_start: usize,
    total: usize,
    size: usize,
}

impl Windows {
    /// Windows of [`MAX_WINDOW_SIZE`] covering `[0, total)`
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_history_client::pubmed::{Window, Windows};
    ///
    /// let windows: Vec<Window> = Windows::new(25_000).collect();
    /// assert_eq!(
    ///     windows,
    ///     vec![
    ///         Window { start: 0, end: 10_000 },
    ///         Window { start: 10_000, end: 20_000 },
    ///         Window { start: 20_000, end: 25_000 },
    ///     ]
    /// );
    /// ```
    pub fn new(total: usize) -> Self {
        Self::with_size(total, MAX_WINDOW_SIZE)
    }

    /// Windows of at most `size` indices; a size of zero is treated as one
    pub fn with_size(total: usize, size: usize) -> Self {
        Self {
            next_start: 0,
            total,
            size: size.max(1),
        }
    }
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next_start >= self.total {
            return None;
        }

        let start = self.next_start;
        let end = start.saturating_add(self.size).min(self.total);
        self.next_start = end;
        Some(Window { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total.saturating_sub(self.next_start);
        let count = remaining.div_ceil(self.size);
        (count, Some(count))
    }
}

impl ExactSizeIterator for Windows {}
