//! Enumeration Index - insertion-ordered commitment identifiers for audit paging

use openproof_core::CommitmentId;
use serde::{Deserialize, Serialize};

/// Take up to `limit` items starting at `offset`; empty past the end
pub(crate) fn page_slice<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    if offset >= items.len() {
        return Vec::new();
    }
    let end = offset.saturating_add(limit).min(items.len());
    items[offset..end].to_vec()
}

/// Append-only list of commitment ids, one per successful commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationIndex {
    ids: Vec<CommitmentId>,
}

impl EnumerationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, id: CommitmentId) {
        self.ids.push(id);
    }

    /// Up to `limit` ids starting at `offset`, in creation order
    pub fn page(&self, offset: usize, limit: usize) -> Vec<CommitmentId> {
        page_slice(&self.ids, offset, limit)
    }

    pub fn total_count(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommitmentId> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn index_of(n: usize) -> EnumerationIndex {
        let mut index = EnumerationIndex::new();
        for i in 0..n {
            index.push(CommitmentId::from_bytes([i as u8; 32]));
        }
        index
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let index = index_of(3);
        assert!(index.page(3, 10).is_empty());
        assert!(index.page(usize::MAX, usize::MAX).is_empty());
        assert!(EnumerationIndex::new().page(0, 10).is_empty());
    }

    #[test]
    fn test_page_is_clamped_to_tail() {
        let index = index_of(5);
        let page = index.page(3, 10);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0], CommitmentId::from_bytes([3; 32]));
        assert_eq!(page[1], CommitmentId::from_bytes([4; 32]));
        assert!(index.page(1, 0).is_empty());
    }

    proptest! {
        #[test]
        fn property_page_never_exceeds_limit(
            n in 0usize..40,
            offset in 0usize..50,
            limit in 0usize..50,
        ) {
            let index = index_of(n);
            let page = index.page(offset, limit);
            prop_assert!(page.len() <= limit);
            if offset >= n {
                prop_assert!(page.is_empty());
            } else {
                prop_assert_eq!(page.len(), limit.min(n - offset));
            }
        }

        #[test]
        fn property_split_pages_reassemble(n in 0usize..40, split in 0usize..40) {
            let index = index_of(n);
            let split = split.min(n);
            let mut joined = index.page(0, split);
            joined.extend(index.page(split, n - split));
            let full: Vec<CommitmentId> = index.iter().copied().collect();
            prop_assert_eq!(joined, full);
        }
    }
}
