#![no_main]

use libfuzzer_sys::fuzz_target;
use chunkstitch::{digest_pieces, HashAlgorithm, ReassemblyConfig, Reassembler};

fuzz_target!(|input: &[u8]| {
    // First byte picks the piece size, the rest is the file
    let Some((&size_byte, data)) = input.split_first() else {
        return;
    };
    let chunk_size = (size_byte as usize % 64) + 1;

    let digests = digest_pieces(data, chunk_size, HashAlgorithm::default()).unwrap();
    let config = ReassemblyConfig::new(chunk_size, data.len() as u64).unwrap();
    let reassembler = Reassembler::new(digests, config.clone(), Vec::new()).unwrap();

    // Derive an application order from the data itself
    let count = config.piece_count();
    let mut order: Vec<usize> = (0..count).collect();
    for i in (1..count).rev() {
        let j = data[i * 7 % data.len()] as usize % (i + 1);
        order.swap(i, j);
    }

    let mut last_flushed = 0;
    for index in order {
        let range = config.piece_range(index);
        let piece = &data[range.start as usize..range.end as usize];
        assert_eq!(reassembler.apply(piece).unwrap(), piece.len());

        // Flushing only ever moves forward
        let status = reassembler.status();
        assert!(status.flushed_pieces >= last_flushed);
        last_flushed = status.flushed_pieces;

        // Second delivery is a no-op
        assert_eq!(reassembler.apply(piece).unwrap(), 0);
    }

    assert!(reassembler.status().is_complete());
    assert!(reassembler.progress().is_complete());
    assert_eq!(reassembler.cleanup().unwrap(), data);
});
