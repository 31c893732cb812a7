use super::filter::Predicate;
use crate::models::contributions::Contribution;
use crate::models::reports::ContributionPage;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Filter, sort, and slice the detailed contribution list. Items and
/// `total_count` come from the same filtered pass; counting with one query and
/// listing with another is exactly the drift this function exists to prevent.
///
/// Sort is timestamp descending with id descending as tiebreaker, so rows that
/// collide at second granularity still order deterministically. A page number
/// past the last page yields an empty item set with the counts intact; 0 clamps
/// to 1.
pub fn page(
    rows: &[Contribution],
    pred: &Predicate,
    page_number: u32,
    page_size: u32,
) -> ContributionPage {
    let mut matched: Vec<&Contribution> = rows.iter().filter(|c| pred.matches(c)).collect();
    matched.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.id.cmp(&a.id))
    });

    let page_size = page_size.max(1);
    let total_count = matched.len() as u64;
    let total_pages = ((total_count + u64::from(page_size) - 1) / u64::from(page_size)).max(1) as u32;
    let requested = page_number.max(1);

    let start = (requested - 1) as usize * page_size as usize;
    let items = matched
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect();

    ContributionPage {
        items,
        total_count,
        total_pages,
        // the echoed page number is clamped into [1, total_pages] even though a
        // request past the end still answers with an empty item set
        page: requested.min(total_pages),
    }
}
