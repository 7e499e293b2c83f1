//! Pure pagination math over the thread count.

/// A window into the thread listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Computes the window for `current_page` (1-based, already clamped to >= 1
/// by the caller). An empty board yields zero pages; a page beyond the last
/// simply produces an empty window rather than an error, so this never
/// clamps against `total_pages`.
pub fn page_window(current_page: u64, per_page: u64, total_items: u64) -> PageWindow {
    let per_page = per_page.max(1);
    PageWindow {
        offset: current_page.saturating_sub(1).saturating_mul(per_page),
        limit: per_page,
        total_pages: total_items.div_ceil(per_page),
    }
}
