//! Piece progress tracking.
//!
//! [`Progress`] records which piece indices have been verified and written to
//! the backing file. The reassembler hands out snapshots; only the apply path
//! sets bits.

use bitvec::prelude::*;

/// Set of applied piece indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    bits: BitVec<u64, Lsb0>,
}

impl Progress {
    /// Creates a tracker for `piece_count` pieces, none applied.
    pub fn new(piece_count: usize) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; piece_count],
        }
    }

    pub(crate) fn set(&mut self, index: usize) {
        self.bits.set(index, true);
    }

    /// Number of pieces tracked.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if no pieces are tracked.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns true if piece `index` has been applied.
    ///
    /// Out-of-range indices report false.
    pub fn is_set(&self, index: usize) -> bool {
        self.bits.get(index).is_some_and(|bit| *bit)
    }

    /// Number of applied pieces.
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Returns true once every piece has been applied.
    pub fn is_complete(&self) -> bool {
        self.bits.all()
    }

    /// Indices of pieces still missing, in ascending order.
    pub fn missing(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_zeros()
    }

    /// Packs the set into bytes, piece 0 in the high bit of the first byte.
    ///
    /// This is the bitfield layout BitTorrent peers exchange; trailing bits
    /// of the last byte are zero.
    pub fn to_bitfield_bytes(&self) -> Vec<u8> {
        let mut packed = bitvec![u8, Msb0; 0; self.bits.len()];
        for index in self.bits.iter_ones() {
            packed.set(index, true);
        }
        packed.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty_of_bits() {
        let progress = Progress::new(10);
        assert_eq!(progress.len(), 10);
        assert_eq!(progress.count(), 0);
        assert!(!progress.is_complete());
        assert_eq!(progress.missing().count(), 10);
    }

    #[test]
    fn test_set_and_query() {
        let mut progress = Progress::new(4);
        progress.set(1);
        progress.set(3);

        assert!(progress.is_set(1));
        assert!(!progress.is_set(0));
        assert!(!progress.is_set(99));
        assert_eq!(progress.count(), 2);
        assert_eq!(progress.missing().collect::<Vec<_>>(), vec![0, 2]);

        progress.set(0);
        progress.set(2);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_bitfield_bytes() {
        let mut progress = Progress::new(10);
        progress.set(0);
        progress.set(7);
        progress.set(9);
        assert_eq!(progress.to_bitfield_bytes(), vec![0b1000_0001, 0b0100_0000]);
    }

    #[test]
    fn test_zero_pieces_is_complete() {
        let progress = Progress::new(0);
        assert!(progress.is_empty());
        assert!(progress.is_complete());
        assert!(progress.to_bitfield_bytes().is_empty());
    }
}
