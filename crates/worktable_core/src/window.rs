use std::ops::Range;

/// Prefix-sum layout of the visible rows' heights. `origins` holds the y
/// offset of each row plus one trailing entry for the total height, so it is
/// strictly increasing (heights are clamped to >= 1).
///
/// Rebuilt whenever the flattened row sequence changes; a layout and a
/// window derived from it must never outlive the sequence they were built
/// from.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    origins: Vec<f32>,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self { origins: vec![0.0] }
    }
}

/// The contiguous run of rows to materialize, plus spacer heights standing
/// in for everything scrolled out of view.
#[derive(Debug, Clone, PartialEq)]
pub struct RowWindow {
    pub range: Range<usize>,
    pub leading: f32,
    pub trailing: f32,
}

impl RowLayout {
    pub fn uniform(count: usize, row_height: f32) -> Self {
        Self::from_heights(std::iter::repeat_n(row_height, count))
    }

    pub fn from_heights(heights: impl IntoIterator<Item = f32>) -> Self {
        let mut origins = vec![0.0];
        let mut total = 0.0;
        for height in heights {
            let height = if height.is_finite() && height > 1.0 {
                height
            } else {
                1.0
            };
            total += height;
            origins.push(total);
        }
        Self { origins }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.origins.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn total_height(&self) -> f32 {
        *self.origins.last().unwrap_or(&0.0)
    }

    /// Y offset of row `ix`; `total_height()` for `ix >= len()`.
    pub fn origin(&self, ix: usize) -> f32 {
        let ix = ix.min(self.len());
        self.origins[ix]
    }

    pub fn height(&self, ix: usize) -> f32 {
        if ix >= self.len() {
            return 0.0;
        }
        self.origins[ix + 1] - self.origins[ix]
    }

    /// Index of the row containing `y`; `len()` when `y` is at or past the
    /// end of the content.
    pub fn index_at(&self, y: f32) -> usize {
        let count = self.len();
        if count == 0 || !y.is_finite() {
            return 0;
        }
        let y = y.max(0.0);
        if y >= self.total_height() {
            return count;
        }

        let mut lo = 0usize;
        let mut hi = count;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.origins[mid + 1] <= y {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Rows to materialize for a scroll offset and viewport height, widened
    /// by `overscan` rows on each side. Always satisfies
    /// `0 <= start <= end <= len()`, and the two spacers plus the heights of
    /// the materialized rows sum to `total_height()`.
    pub fn window(&self, scroll_y: f32, viewport_height: f32, overscan: usize) -> RowWindow {
        let count = self.len();
        if count == 0 {
            return RowWindow {
                range: 0..0,
                leading: 0.0,
                trailing: 0.0,
            };
        }

        let scroll_y = if scroll_y.is_finite() {
            scroll_y.max(0.0)
        } else {
            0.0
        };
        let viewport_height = if viewport_height.is_finite() {
            viewport_height.max(0.0)
        } else {
            0.0
        };

        let first = self.index_at(scroll_y);
        let last = self.index_at(scroll_y + viewport_height);
        let start = first.saturating_sub(overscan);
        let end = (last + 1).saturating_add(overscan).min(count);
        let start = start.min(end);

        RowWindow {
            range: start..end,
            leading: self.origin(start),
            trailing: self.total_height() - self.origin(end),
        }
    }
}

impl RowWindow {
    /// Clamp a possibly stale window to a shrunken row count. Rendering from
    /// a range that references removed rows is a correctness bug, so callers
    /// must clamp (or rebuild) whenever the count changes under them.
    pub fn clamp_to(&self, count: usize) -> Range<usize> {
        let start = self.range.start.min(count);
        let end = self.range.end.min(count);
        start..end.max(start)
    }
}
