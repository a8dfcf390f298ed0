//! Frequency-indexed result store
//!
//! Maps each path to the number of keyword queries that returned it, and keeps
//! an auxiliary index from match count to the paths currently at that count so
//! relevance-ordered reads walk buckets instead of sorting every row.
//!
//! A single mutex guards the whole structure. Write volume is bounded by
//! keyword count times the per-keyword cap, so contention stays low.

use super::sorting::{RankKey, compare_by_date, compare_within_bucket};
use super::types::{FileItem, SortColumn, SortOrder, path_extension};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::SystemTime;

/// Display format of the last-modified column
const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: usize,
    similarity: Option<u32>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    buckets: HashMap<usize, HashSet<String>>,
    counts: BTreeSet<usize>,
}

impl Inner {
    fn remove_from_bucket(&mut self, count: usize, path: &str) {
        let emptied = match self.buckets.get_mut(&count) {
            Some(bucket) => {
                bucket.remove(path);
                bucket.is_empty()
            }
            None => false,
        };
        if emptied {
            self.buckets.remove(&count);
            self.counts.remove(&count);
        }
    }

    fn insert_into_bucket(&mut self, count: usize, path: String) {
        self.buckets.entry(count).or_default().insert(path);
        self.counts.insert(count);
    }

    fn rank_key<'a>(&self, path: &'a str) -> Option<RankKey<'a>> {
        self.entries.get(path).map(|entry| RankKey {
            path,
            count: entry.count,
            modified: entry.modified,
        })
    }

    /// All paths in read order, before filtering and slicing
    fn ordered_paths(&self, order: SortOrder) -> Vec<&str> {
        match order.column {
            SortColumn::Date => {
                let mut keys: Vec<RankKey<'_>> = self
                    .entries
                    .iter()
                    .map(|(path, entry)| RankKey {
                        path: path.as_str(),
                        count: entry.count,
                        modified: entry.modified,
                    })
                    .collect();
                keys.sort_by(|a, b| compare_by_date(a, b, order.ascending));
                keys.into_iter().map(|key| key.path).collect()
            }
            SortColumn::Relevance => {
                let mut counts: Vec<usize> = self.counts.iter().copied().collect();
                if !order.ascending {
                    counts.reverse();
                }

                let mut ordered = Vec::with_capacity(self.entries.len());
                for count in counts {
                    let Some(bucket) = self.buckets.get(&count) else {
                        continue;
                    };
                    let mut keys: Vec<RankKey<'_>> = bucket
                        .iter()
                        .filter_map(|path| self.rank_key(path.as_str()))
                        .collect();
                    keys.sort_by(|a, b| compare_within_bucket(a, b, order.ascending));
                    ordered.extend(keys.into_iter().map(|key| key.path));
                }
                ordered
            }
        }
    }
}

/// Thread-safe path → match-count table with a count-ordered index
#[derive(Debug, Default)]
pub struct FrequencyStore {
    inner: Mutex<Inner>,
}

impl FrequencyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one keyword match for `path`
    ///
    /// New paths start at a count of one; known paths move to the next
    /// bucket. The last-modified time is always overwritten. A positive
    /// `similarity` (0.0-1.0) is stored as a 0-100 score.
    pub fn increment(&self, path: &str, modified: SystemTime, similarity: f64) {
        let owned = path.to_owned();
        let score = (similarity > 0.0).then(|| (similarity * 100.0).round() as u32);

        let mut inner = self.inner.lock();
        let old_count = inner.entries.get(path).map_or(0, |entry| entry.count);
        let new_count = old_count + 1;

        if old_count > 0 {
            inner.remove_from_bucket(old_count, path);
        }
        inner.insert_into_bucket(new_count, owned.clone());

        let entry = inner.entries.entry(owned).or_insert(Entry {
            count: 0,
            similarity: None,
            modified,
        });
        entry.count = new_count;
        entry.modified = modified;
        if score.is_some() {
            entry.similarity = score;
        }
    }

    /// Read one page of rows
    ///
    /// Rows are ordered by `order`, then restricted to `extensions` (when not
    /// empty), then `start_index` rows are skipped and at most `page_size`
    /// returned. A `page_size` of zero returns everything that remains.
    /// `total_keywords` normalises the relevance column.
    #[must_use]
    pub fn read(
        &self,
        start_index: usize,
        total_keywords: usize,
        extensions: &BTreeSet<String>,
        order: SortOrder,
        page_size: usize,
    ) -> Vec<FileItem> {
        let inner = self.inner.lock();
        let limit = if page_size == 0 { usize::MAX } else { page_size };

        inner
            .ordered_paths(order)
            .into_iter()
            .filter(|path| extensions.is_empty() || extensions.contains(&path_extension(path)))
            .skip(start_index)
            .take(limit)
            .filter_map(|path| {
                inner
                    .entries
                    .get(path)
                    .map(|entry| to_file_item(path, entry, total_keywords))
            })
            .collect()
    }

    /// Drop every row and index entry
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.buckets.clear();
        inner.counts.clear();
    }

    /// Number of distinct paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    #[must_use]
    pub fn match_count(&self, path: &str) -> Option<usize> {
        self.inner.lock().entries.get(path).map(|entry| entry.count)
    }

    /// Distinct match counts currently present, ascending
    #[must_use]
    pub fn counts(&self) -> Vec<usize> {
        self.inner.lock().counts.iter().copied().collect()
    }

    /// Verify that every path sits in exactly the bucket of its count and that
    /// the count index lists exactly the non-empty buckets
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let inner = self.inner.lock();

        let bucketed: usize = inner.buckets.values().map(HashSet::len).sum();
        if bucketed != inner.entries.len() {
            return false;
        }
        let in_own_bucket = inner.entries.iter().all(|(path, entry)| {
            inner
                .buckets
                .get(&entry.count)
                .is_some_and(|bucket| bucket.contains(path))
        });
        let index_matches = inner.counts.len() == inner.buckets.len()
            && inner
                .buckets
                .iter()
                .all(|(count, bucket)| !bucket.is_empty() && inner.counts.contains(count));

        in_own_bucket && index_matches
    }
}

fn to_file_item(path: &str, entry: &Entry, total_keywords: usize) -> FileItem {
    let relevance = if total_keywords == 0 {
        0
    } else {
        (entry.count as f64 / total_keywords as f64 * 100.0).round() as u32
    };
    FileItem {
        path: path.to_owned(),
        relevance,
        similarity: entry.similarity,
        updated: format_date(entry.modified),
    }
}

/// Format a timestamp for the last-modified column, in local time
#[must_use]
pub fn format_date(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn paths(items: &[FileItem]) -> Vec<&str> {
        items.iter().map(|item| item.path.as_str()).collect()
    }

    fn no_filter() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_new_path_starts_at_one() {
        let store = FrequencyStore::new();
        store.increment("/a.pdf", at(1), 0.0);

        assert_eq!(store.match_count("/a.pdf"), Some(1));
        assert_eq!(store.counts(), vec![1]);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_increment_moves_between_buckets_and_prunes() {
        let store = FrequencyStore::new();
        store.increment("/a.pdf", at(1), 0.0);
        store.increment("/a.pdf", at(2), 0.0);

        assert_eq!(store.match_count("/a.pdf"), Some(2));
        // Bucket 1 emptied, so its count is gone from the index
        assert_eq!(store.counts(), vec![2]);
        assert!(store.is_consistent());

        store.increment("/b.txt", at(3), 0.0);
        assert_eq!(store.counts(), vec![1, 2]);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_invariants_hold_for_random_sequences() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let store = FrequencyStore::new();
        let mut expected: HashMap<String, usize> = HashMap::new();

        for step in 0..2000u64 {
            let path = format!("/files/{}.txt", rng.random_range(0..150));
            store.increment(&path, at(step), 0.0);
            *expected.entry(path).or_default() += 1;

            assert!(store.is_consistent(), "inconsistent after step {step}");
            assert_eq!(store.len(), expected.len());
        }

        for (path, count) in &expected {
            assert_eq!(store.match_count(path), Some(*count));
        }
    }

    #[test]
    fn test_last_writer_wins_for_date() {
        let store = FrequencyStore::new();
        store.increment("/a.pdf", at(50), 0.0);
        store.increment("/a.pdf", at(10), 0.0);

        let rows = store.read(0, 2, &no_filter(), SortOrder::default(), 0);
        assert_eq!(rows[0].updated, format_date(at(10)));
    }

    #[test]
    fn test_similarity_is_scaled_and_kept() {
        let store = FrequencyStore::new();
        store.increment("/a.pdf", at(1), 0.876);
        store.increment("/a.pdf", at(2), 0.0);
        store.increment("/b.pdf", at(1), 0.0);

        let rows = store.read(0, 2, &no_filter(), SortOrder::default(), 0);
        assert_eq!(rows[0].path, "/a.pdf");
        assert_eq!(rows[0].similarity, Some(88));
        assert_eq!(rows[1].similarity, None);
    }

    #[test]
    fn test_relevance_read_descending_and_ascending() {
        let store = FrequencyStore::new();
        for _ in 0..3 {
            store.increment("/three.md", at(1), 0.0);
        }
        store.increment("/one.md", at(1), 0.0);
        store.increment("/two.md", at(1), 0.0);
        store.increment("/two.md", at(1), 0.0);

        let desc = store.read(0, 3, &no_filter(), SortOrder::new(SortColumn::Relevance, false), 0);
        assert_eq!(paths(&desc), vec!["/three.md", "/two.md", "/one.md"]);
        assert!(desc.windows(2).all(|w| w[0].relevance >= w[1].relevance));

        let asc = store.read(0, 3, &no_filter(), SortOrder::new(SortColumn::Relevance, true), 0);
        assert_eq!(paths(&asc), vec!["/one.md", "/two.md", "/three.md"]);
        assert!(asc.windows(2).all(|w| w[0].relevance <= w[1].relevance));
    }

    #[test]
    fn test_bucket_members_ordered_by_date() {
        let store = FrequencyStore::new();
        store.increment("/old.md", at(1), 0.0);
        store.increment("/new.md", at(9), 0.0);
        store.increment("/mid.md", at(5), 0.0);

        let desc = store.read(0, 1, &no_filter(), SortOrder::new(SortColumn::Relevance, false), 0);
        assert_eq!(paths(&desc), vec!["/new.md", "/mid.md", "/old.md"]);

        let asc = store.read(0, 1, &no_filter(), SortOrder::new(SortColumn::Relevance, true), 0);
        assert_eq!(paths(&asc), vec!["/old.md", "/mid.md", "/new.md"]);
    }

    #[test]
    fn test_date_read_breaks_ties_by_count() {
        let store = FrequencyStore::new();
        store.increment("/late.md", at(9), 0.0);
        store.increment("/tie-low.md", at(5), 0.0);
        store.increment("/tie-high.md", at(5), 0.0);
        store.increment("/tie-high.md", at(5), 0.0);

        let desc = store.read(0, 2, &no_filter(), SortOrder::new(SortColumn::Date, false), 0);
        assert_eq!(paths(&desc), vec!["/late.md", "/tie-high.md", "/tie-low.md"]);

        let asc = store.read(0, 2, &no_filter(), SortOrder::new(SortColumn::Date, true), 0);
        assert_eq!(paths(&asc), vec!["/tie-low.md", "/tie-high.md", "/late.md"]);
    }

    #[test]
    fn test_extension_filter_applies_before_slicing() {
        let store = FrequencyStore::new();
        store.increment("/a.pdf", at(4), 0.0);
        store.increment("/b.txt", at(3), 0.0);
        store.increment("/c.PDF", at(2), 0.0);
        store.increment("/d.txt", at(1), 0.0);

        let pdf: BTreeSet<String> = ["pdf".to_string()].into();
        let rows = store.read(1, 1, &pdf, SortOrder::default(), 5);

        // Skipping one row of the filtered list, not of the raw list
        assert_eq!(paths(&rows), vec!["/c.PDF"]);
        assert!(
            store
                .read(0, 1, &pdf, SortOrder::default(), 0)
                .iter()
                .all(|row| path_extension(&row.path) == "pdf")
        );
    }

    #[test]
    fn test_pagination_slices() {
        let store = FrequencyStore::new();
        for i in 0..7 {
            store.increment(&format!("/f{i}.txt"), at(i), 0.0);
        }

        assert_eq!(store.read(0, 1, &no_filter(), SortOrder::default(), 3).len(), 3);
        assert_eq!(store.read(6, 1, &no_filter(), SortOrder::default(), 3).len(), 1);
        assert!(store.read(7, 1, &no_filter(), SortOrder::default(), 3).is_empty());
        assert_eq!(store.read(2, 1, &no_filter(), SortOrder::default(), 0).len(), 5);
    }

    #[test]
    fn test_relevance_percentage_rounding_and_zero_total() {
        let store = FrequencyStore::new();
        store.increment("/a.txt", at(1), 0.0);
        store.increment("/a.txt", at(1), 0.0);

        let rows = store.read(0, 3, &no_filter(), SortOrder::default(), 0);
        assert_eq!(rows[0].relevance, 67);

        let rows = store.read(0, 0, &no_filter(), SortOrder::default(), 0);
        assert_eq!(rows[0].relevance, 0);
    }

    #[test]
    fn test_clear_empties_everything() {
        let store = FrequencyStore::new();
        store.increment("/a.txt", at(1), 0.5);
        store.increment("/b.txt", at(1), 0.0);
        store.clear();

        assert!(store.is_empty());
        assert!(store.counts().is_empty());
        assert!(store.is_consistent());
        assert!(store.read(0, 2, &no_filter(), SortOrder::default(), 0).is_empty());
    }

    #[test]
    fn test_concurrent_increments() {
        let store = std::sync::Arc::new(FrequencyStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.increment(&format!("/shared/{i}.txt"), at(i), 0.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Worker thread panicked");
        }

        assert_eq!(store.len(), 100);
        assert_eq!(store.counts(), vec![8]);
        assert!(store.is_consistent());
    }
}
