//! Chunk digest type.

use std::fmt;

use crate::error::ReassemblyError;

/// A digest identifying the expected content of one piece.
///
/// Stored inline in a 32-byte array together with its real length, so a
/// SHA-1 digest (20 bytes) and a BLAKE3 digest (32 bytes) share one type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkHash {
    bytes: [u8; ChunkHash::MAX_SIZE],
    len: u8,
}

impl ChunkHash {
    /// The largest digest this type can hold, in bytes.
    pub const MAX_SIZE: usize = 32;

    /// Creates a chunk hash from a 32-byte array.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self {
            bytes,
            len: Self::MAX_SIZE as u8,
        }
    }

    /// Creates a chunk hash from an array of at most 32 bytes.
    pub const fn from_array<const N: usize>(digest: [u8; N]) -> Self {
        const { assert!(N > 0 && N <= ChunkHash::MAX_SIZE) };
        let mut bytes = [0u8; Self::MAX_SIZE];
        let mut i = 0;
        while i < N {
            bytes[i] = digest[i];
            i += 1;
        }
        Self {
            bytes,
            len: N as u8,
        }
    }

    /// Creates a chunk hash from a slice.
    ///
    /// Returns `None` if the slice is empty or longer than [`ChunkHash::MAX_SIZE`].
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.is_empty() || slice.len() > Self::MAX_SIZE {
            return None;
        }
        let mut bytes = [0u8; Self::MAX_SIZE];
        bytes[..slice.len()].copy_from_slice(slice);
        Some(Self {
            bytes,
            len: slice.len() as u8,
        })
    }

    /// Returns the digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Returns the digest length in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true for a zero-length digest. No constructor produces one.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut result = String::with_capacity(self.len() * 2);
        for byte in self.as_bytes() {
            result.push(HEX[(byte >> 4) as usize] as char);
            result.push(HEX[(byte & 0xf) as usize] as char);
        }
        result
    }

    /// Creates a hash from a hex string.
    ///
    /// Returns `None` if the string is not valid hex, has odd length, or
    /// encodes more than [`ChunkHash::MAX_SIZE`] bytes.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        if hex_str.is_empty() || hex_str.len() % 2 != 0 || hex_str.len() > Self::MAX_SIZE * 2 {
            return None;
        }
        let mut bytes = [0u8; Self::MAX_SIZE];
        let len = hex_str.len() / 2;
        for (i, byte) in bytes.iter_mut().take(len).enumerate() {
            let byte_str = hex_str.get(i * 2..i * 2 + 2)?;
            *byte = u8::from_str_radix(byte_str, 16).ok()?;
        }
        Some(Self {
            bytes,
            len: len as u8,
        })
    }
}

/// Splits a concatenated digest list into individual hashes.
///
/// This is the layout of a BitTorrent `pieces` field: `digest_len`-byte
/// digests laid end to end in piece order.
pub fn split_concatenated(
    concatenated: &[u8],
    digest_len: usize,
) -> Result<Vec<ChunkHash>, ReassemblyError> {
    if digest_len == 0 || digest_len > ChunkHash::MAX_SIZE {
        return Err(ReassemblyError::InvalidDigest {
            message: "digest length must be between 1 and 32 bytes",
        });
    }
    if concatenated.len() % digest_len != 0 {
        return Err(ReassemblyError::InvalidDigest {
            message: "digest list length is not a multiple of the digest length",
        });
    }
    concatenated
        .chunks_exact(digest_len)
        .map(|raw| {
            ChunkHash::from_slice(raw).ok_or(ReassemblyError::InvalidDigest {
                message: "malformed digest",
            })
        })
        .collect()
}

impl AsRef<[u8]> for ChunkHash {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkHash({})", self)
    }
}
