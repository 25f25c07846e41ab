//! Digest primitives for piece verification.
//!
//! - [`HashAlgorithm`] - Which digest the expected piece list was built with
//! - [`PieceHasher`] - Incremental hasher for the selected algorithm
//! - [`digest_pieces`] - Compute the ordered digest list of a byte source
//!
//! BLAKE3 is available with the `hash-blake3` feature (default) and SHA-1 with
//! the `hash-sha1` feature.

#[cfg(feature = "hash-blake3")]
mod blake3;
#[cfg(feature = "hash-sha1")]
mod sha1;

use std::io::{self, Read};

#[cfg(feature = "hash-blake3")]
pub use self::blake3::Blake3Hasher;
#[cfg(feature = "hash-sha1")]
pub use self::sha1::Sha1Hasher;

use crate::buffer::Buffer;
use crate::chunk::ChunkHash;
use crate::error::ReassemblyError;

#[cfg(not(any(feature = "hash-blake3", feature = "hash-sha1")))]
compile_error!("enable at least one of the `hash-blake3` or `hash-sha1` features");

/// Digest algorithm used to identify pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HashAlgorithm {
    /// BLAKE3, 32-byte digests.
    #[cfg(feature = "hash-blake3")]
    Blake3,
    /// SHA-1, 20-byte digests.
    #[cfg(feature = "hash-sha1")]
    Sha1,
}

impl HashAlgorithm {
    /// Length of the digests this algorithm produces.
    pub const fn digest_len(&self) -> usize {
        match self {
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => Blake3Hasher::DIGEST_LEN,
            #[cfg(feature = "hash-sha1")]
            HashAlgorithm::Sha1 => Sha1Hasher::DIGEST_LEN,
        }
    }

    /// Hashes `data` in one shot.
    pub fn digest(&self, data: &[u8]) -> ChunkHash {
        match self {
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => Blake3Hasher::hash(data),
            #[cfg(feature = "hash-sha1")]
            HashAlgorithm::Sha1 => Sha1Hasher::hash(data),
        }
    }
}

impl Default for HashAlgorithm {
    #[cfg(feature = "hash-blake3")]
    fn default() -> Self {
        HashAlgorithm::Blake3
    }

    #[cfg(not(feature = "hash-blake3"))]
    fn default() -> Self {
        HashAlgorithm::Sha1
    }
}

/// Incremental hasher for a [`HashAlgorithm`].
#[derive(Debug, Clone)]
pub enum PieceHasher {
    /// BLAKE3 state.
    #[cfg(feature = "hash-blake3")]
    Blake3(Blake3Hasher),
    /// SHA-1 state.
    #[cfg(feature = "hash-sha1")]
    Sha1(Sha1Hasher),
}

impl PieceHasher {
    /// Creates a fresh hasher for `algorithm`.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => PieceHasher::Blake3(Blake3Hasher::new()),
            #[cfg(feature = "hash-sha1")]
            HashAlgorithm::Sha1 => PieceHasher::Sha1(Sha1Hasher::new()),
        }
    }

    /// Updates the hasher with more data.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            #[cfg(feature = "hash-blake3")]
            PieceHasher::Blake3(h) => h.update(data),
            #[cfg(feature = "hash-sha1")]
            PieceHasher::Sha1(h) => h.update(data),
        }
    }

    /// Returns the digest of everything fed so far.
    pub fn finalize(&self) -> ChunkHash {
        match self {
            #[cfg(feature = "hash-blake3")]
            PieceHasher::Blake3(h) => h.finalize(),
            #[cfg(feature = "hash-sha1")]
            PieceHasher::Sha1(h) => h.finalize(),
        }
    }

    /// Resets the hasher to its initial state.
    pub fn reset(&mut self) {
        match self {
            #[cfg(feature = "hash-blake3")]
            PieceHasher::Blake3(h) => h.reset(),
            #[cfg(feature = "hash-sha1")]
            PieceHasher::Sha1(h) => h.reset(),
        }
    }
}

/// Computes the ordered digest list of everything `reader` yields.
///
/// Every piece is `chunk_size` bytes except possibly the last. An empty
/// source produces an empty list.
pub fn digest_pieces<R: Read>(
    mut reader: R,
    chunk_size: usize,
    algorithm: HashAlgorithm,
) -> Result<Vec<ChunkHash>, ReassemblyError> {
    if chunk_size == 0 {
        return Err(ReassemblyError::InvalidConfig {
            message: "chunk size must be non-zero",
        });
    }

    let mut digests = Vec::new();
    let mut hasher = PieceHasher::new(algorithm);
    let mut buffer = Buffer::take();
    let mut in_piece = 0usize;

    loop {
        let want = (chunk_size - in_piece).min(buffer.len());
        let n = match reader.read(&mut buffer.as_mut_slice()[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(buffer.filled(n));
        in_piece += n;
        if in_piece == chunk_size {
            digests.push(hasher.finalize());
            hasher.reset();
            in_piece = 0;
        }
    }

    if in_piece > 0 {
        digests.push(hasher.finalize());
    }
    Ok(digests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_incremental() {
        let algo = HashAlgorithm::default();
        let mut hasher = PieceHasher::new(algo);
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), algo.digest(b"hello world"));
        assert_eq!(hasher.finalize().len(), algo.digest_len());
    }

    #[test]
    fn test_digest_pieces_short_tail() {
        let algo = HashAlgorithm::default();
        let data = b"AAAABBBBCC";
        let digests = digest_pieces(&data[..], 4, algo).unwrap();

        assert_eq!(
            digests,
            vec![
                algo.digest(b"AAAA"),
                algo.digest(b"BBBB"),
                algo.digest(b"CC")
            ]
        );
    }

    #[test]
    fn test_digest_pieces_exact_multiple() {
        let algo = HashAlgorithm::default();
        let digests = digest_pieces(&b"AAAABBBB"[..], 4, algo).unwrap();
        assert_eq!(digests.len(), 2);
    }

    #[test]
    fn test_digest_pieces_large_chunk_size() {
        // Pieces larger than the read window are hashed across several reads
        let algo = HashAlgorithm::default();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let chunk_size = 150_000;
        let digests = digest_pieces(&data[..], chunk_size, algo).unwrap();

        assert_eq!(digests.len(), 2);
        assert_eq!(digests[0], algo.digest(&data[..chunk_size]));
        assert_eq!(digests[1], algo.digest(&data[chunk_size..]));
    }

    #[test]
    fn test_digest_pieces_empty_and_invalid() {
        let algo = HashAlgorithm::default();
        assert!(digest_pieces(&b""[..], 4, algo).unwrap().is_empty());
        assert!(digest_pieces(&b"abc"[..], 0, algo).is_err());
    }
}
