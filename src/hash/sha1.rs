//! SHA-1 piece hashing, the digest BitTorrent piece lists use.

use sha1::{Digest, Sha1};

use crate::chunk::ChunkHash;

/// A hasher that computes SHA-1 piece digests.
#[derive(Debug, Clone, Default)]
pub struct Sha1Hasher {
    state: Sha1,
}

impl Sha1Hasher {
    /// Digest length in bytes.
    pub const DIGEST_LEN: usize = 20;

    /// Creates a new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the hasher with more data.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Finalizes and returns the hash.
    pub fn finalize(&self) -> ChunkHash {
        let mut bytes = [0u8; Self::DIGEST_LEN];
        bytes.copy_from_slice(&self.state.clone().finalize());
        ChunkHash::from_array(bytes)
    }

    /// Resets the hasher to its initial state.
    pub fn reset(&mut self) {
        Digest::reset(&mut self.state);
    }

    /// Convenience method to hash data in one shot.
    pub fn hash(data: &[u8]) -> ChunkHash {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let hash = Sha1Hasher::hash(b"abc");
        assert_eq!(hash.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_incremental_and_reset() {
        let mut hasher = Sha1Hasher::new();
        hasher.update(b"junk");
        hasher.reset();
        hasher.update(b"a");
        hasher.update(b"bc");
        assert_eq!(hasher.finalize(), Sha1Hasher::hash(b"abc"));
    }
}
