#![no_main]

use libfuzzer_sys::fuzz_target;
use chunkstitch::{digest_pieces, HashAlgorithm, ReassemblyConfig, Reassembler};

fuzz_target!(|input: &[u8]| {
    // First two bytes pick the piece size and the write size
    let [size_byte, split_byte, data @ ..] = input else {
        return;
    };
    let chunk_size = (*size_byte as usize % 64) + 1;
    let split = (*split_byte as usize % 97) + 1;

    let digests = digest_pieces(data, chunk_size, HashAlgorithm::default()).unwrap();
    let config = ReassemblyConfig::new(chunk_size, data.len() as u64).unwrap();
    let reassembler = Reassembler::new(digests, config, Vec::new()).unwrap();

    for part in data.chunks(split) {
        assert_eq!(reassembler.ingest(part).unwrap(), part.len());
    }
    reassembler.flush_pending().unwrap();

    assert_eq!(reassembler.pending_len(), 0);
    assert!(reassembler.status().is_complete());
    assert_eq!(reassembler.cleanup().unwrap(), data);
});
