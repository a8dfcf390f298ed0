//! Ordering rules for result rows
//!
//! This module provides the comparators the result store uses for its two
//! sort columns: last-modified time and match count.

use std::cmp::Ordering;
use std::time::SystemTime;

/// The fields a row is ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKey<'a> {
    pub path: &'a str,
    pub count: usize,
    pub modified: SystemTime,
}

/// Flip an ordering for descending reads
#[must_use]
pub fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending { ordering } else { ordering.reverse() }
}

/// Date column: last-modified first, ties broken by match count in the same
/// direction, then by path so repeated reads are stable
#[must_use]
pub fn compare_by_date(a: &RankKey<'_>, b: &RankKey<'_>, ascending: bool) -> Ordering {
    directed(
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.count.cmp(&b.count)),
        ascending,
    )
    .then_with(|| a.path.cmp(b.path))
}

/// Ordering of rows inside one match-count bucket
#[must_use]
pub fn compare_within_bucket(a: &RankKey<'_>, b: &RankKey<'_>, ascending: bool) -> Ordering {
    directed(a.modified.cmp(&b.modified), ascending).then_with(|| a.path.cmp(b.path))
}
