//! The ordered table of expected pieces.

use std::collections::HashMap;

use super::ChunkHash;

/// One expected piece.
#[derive(Debug, Clone)]
pub(crate) struct ChunkEntry {
    pub(crate) digest: ChunkHash,
    pub(crate) applied: bool,
}

/// Result of looking a digest up in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// First unapplied piece with this digest.
    Found(usize),
    /// Every piece with this digest has been applied; holds the first of them.
    AlreadyApplied(usize),
    /// No piece has this digest.
    Unknown,
}

/// Ordered expected digests with an index from digest to piece numbers.
///
/// Table order is fixed at construction. The index only speeds up lookups;
/// it resolves the same piece a left-to-right scan would.
#[derive(Debug)]
pub(crate) struct ChunkTable {
    entries: Vec<ChunkEntry>,
    by_digest: HashMap<ChunkHash, Vec<usize>>,
}

impl ChunkTable {
    pub(crate) fn new(digests: Vec<ChunkHash>) -> Self {
        let mut by_digest: HashMap<ChunkHash, Vec<usize>> = HashMap::with_capacity(digests.len());
        for (i, digest) in digests.iter().enumerate() {
            by_digest.entry(*digest).or_default().push(i);
        }
        let entries = digests
            .into_iter()
            .map(|digest| ChunkEntry {
                digest,
                applied: false,
            })
            .collect();
        Self { entries, by_digest }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn lookup(&self, digest: &ChunkHash) -> Lookup {
        let Some(indices) = self.by_digest.get(digest) else {
            return Lookup::Unknown;
        };
        match indices.iter().find(|&&i| !self.entries[i].applied) {
            Some(&i) => Lookup::Found(i),
            None => Lookup::AlreadyApplied(indices[0]),
        }
    }

    pub(crate) fn is_applied(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.applied)
    }

    pub(crate) fn mark_applied(&mut self, index: usize) {
        self.entries[index].applied = true;
    }

    /// Returns the first unapplied index at or after `start`, or `len()`.
    pub(crate) fn first_gap_from(&self, start: usize) -> usize {
        self.entries
            .iter()
            .skip(start)
            .position(|e| !e.applied)
            .map_or(self.entries.len(), |offset| start + offset)
    }

    #[cfg(test)]
    pub(crate) fn entry(&self, index: usize) -> &ChunkEntry {
        &self.entries[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(byte: u8) -> ChunkHash {
        ChunkHash::from_slice(&[byte; 20]).unwrap()
    }

    #[test]
    fn test_lookup_found_and_unknown() {
        let table = ChunkTable::new(vec![digest(1), digest(2), digest(3)]);
        assert_eq!(table.lookup(&digest(2)), Lookup::Found(1));
        assert_eq!(table.lookup(&digest(9)), Lookup::Unknown);
    }

    #[test]
    fn test_lookup_already_applied() {
        let mut table = ChunkTable::new(vec![digest(1), digest(2)]);
        table.mark_applied(0);
        assert_eq!(table.lookup(&digest(1)), Lookup::AlreadyApplied(0));
        assert!(table.entry(0).applied);
        assert!(!table.entry(1).applied);
    }

    #[test]
    fn test_lookup_duplicate_digests_left_to_right() {
        let mut table = ChunkTable::new(vec![digest(5), digest(1), digest(5)]);
        assert_eq!(table.lookup(&digest(5)), Lookup::Found(0));
        table.mark_applied(0);
        assert_eq!(table.lookup(&digest(5)), Lookup::Found(2));
        table.mark_applied(2);
        assert_eq!(table.lookup(&digest(5)), Lookup::AlreadyApplied(0));
    }

    #[test]
    fn test_first_gap_from() {
        let mut table = ChunkTable::new(vec![digest(1), digest(2), digest(3), digest(4)]);
        assert_eq!(table.first_gap_from(0), 0);

        table.mark_applied(0);
        table.mark_applied(1);
        table.mark_applied(3);
        assert_eq!(table.first_gap_from(0), 2);
        assert_eq!(table.first_gap_from(3), 4);
        assert!(table.is_applied(3));
        assert!(!table.is_applied(10));
    }
}
