//! Benchmarks for chunkstitch.
//!
//! Run with:
//!     cargo bench

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chunkstitch::{ChunkHash, HashAlgorithm, ReassemblyConfig, Reassembler, digest_pieces};

const CHUNK_SIZE: usize = 16 * 1024;

fn test_data(size: usize) -> Vec<u8> {
    // Deterministic pseudo-random data
    (0..size).map(|i| (i * 7 + 13) as u8).collect()
}

fn digests_of(data: &[u8], chunk_size: usize) -> Vec<ChunkHash> {
    digest_pieces(data, chunk_size, HashAlgorithm::default()).unwrap()
}

fn reassembler(data: &[u8], chunk_size: usize) -> Reassembler<Vec<u8>> {
    let config = ReassemblyConfig::new(chunk_size, data.len() as u64).unwrap();
    Reassembler::new(digests_of(data, chunk_size), config, Vec::with_capacity(data.len()))
        .unwrap()
}

/// Piece indices in an order that keeps the flush cursor stalled until the end.
fn reversed(count: usize) -> Vec<usize> {
    (0..count).rev().collect()
}

/// Interleaves the two halves: 0, n/2, 1, n/2+1, ...
fn interleaved(count: usize) -> Vec<usize> {
    let half = count.div_ceil(2);
    (0..half)
        .flat_map(|i| [i, i + half])
        .filter(|&i| i < count)
        .collect()
}

fn apply_in_order(data: &[u8], r: &Reassembler<Vec<u8>>, order: &[usize]) {
    for &index in order {
        let range = r.config().piece_range(index);
        r.apply(&data[range.start as usize..range.end as usize])
            .unwrap();
    }
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");

    for size in [1024 * 1024, 8 * 1024 * 1024] {
        let data = test_data(size);
        let count = size.div_ceil(CHUNK_SIZE);
        group.throughput(Throughput::Bytes(size as u64));

        // Every piece flushes straight through
        group.bench_function(format!("sequential_{}mb", size / (1024 * 1024)), |b| {
            let order: Vec<usize> = (0..count).collect();
            b.iter_batched(
                || reassembler(&data, CHUNK_SIZE),
                |r| {
                    apply_in_order(&data, &r, &order);
                    black_box(r.cleanup().unwrap().len())
                },
                BatchSize::LargeInput,
            );
        });

        // Nothing flushes until piece 0, then one large read-back
        group.bench_function(format!("reversed_{}mb", size / (1024 * 1024)), |b| {
            let order = reversed(count);
            b.iter_batched(
                || reassembler(&data, CHUNK_SIZE),
                |r| {
                    apply_in_order(&data, &r, &order);
                    black_box(r.cleanup().unwrap().len())
                },
                BatchSize::LargeInput,
            );
        });

        // Short runs flushed repeatedly
        group.bench_function(format!("interleaved_{}mb", size / (1024 * 1024)), |b| {
            let order = interleaved(count);
            b.iter_batched(
                || reassembler(&data, CHUNK_SIZE),
                |r| {
                    apply_in_order(&data, &r, &order);
                    black_box(r.cleanup().unwrap().len())
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_sizes");
    let size = 4 * 1024 * 1024;
    let data = test_data(size);
    group.throughput(Throughput::Bytes(size as u64));

    for chunk_size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        let order = interleaved(size.div_ceil(chunk_size));
        group.bench_function(format!("{}kb", chunk_size / 1024), |b| {
            b.iter_batched(
                || reassembler(&data, chunk_size),
                |r| {
                    apply_in_order(&data, &r, &order);
                    black_box(r.cleanup().unwrap().len())
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");
    let size = 4 * 1024 * 1024;
    let data = test_data(size);
    group.throughput(Throughput::Bytes(size as u64));

    #[cfg(feature = "hash-blake3")]
    group.bench_function("blake3", |b| {
        b.iter(|| black_box(digest_pieces(black_box(&data[..]), CHUNK_SIZE, HashAlgorithm::Blake3)))
    });

    #[cfg(feature = "hash-sha1")]
    group.bench_function("sha1", |b| {
        b.iter(|| black_box(digest_pieces(black_box(&data[..]), CHUNK_SIZE, HashAlgorithm::Sha1)))
    });

    group.finish();
}

fn bench_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming");
    let size = 4 * 1024 * 1024;
    let data = test_data(size);
    group.throughput(Throughput::Bytes(size as u64));

    group.bench_function("ingest_reader", |b| {
        b.iter_batched(
            || reassembler(&data, CHUNK_SIZE),
            |r| {
                r.ingest_reader(std::io::Cursor::new(black_box(&data))).unwrap();
                black_box(r.cleanup().unwrap().len())
            },
            BatchSize::LargeInput,
        );
    });

    // Unaligned writes exercise the accumulation buffer
    group.bench_function("ingest_unaligned", |b| {
        b.iter_batched(
            || reassembler(&data, CHUNK_SIZE),
            |r| {
                for part in data.chunks(CHUNK_SIZE / 3 + 1) {
                    r.ingest(part).unwrap();
                }
                r.flush_pending().unwrap();
                black_box(r.cleanup().unwrap().len())
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_apply, bench_chunk_sizes, bench_hashing, bench_streaming);
criterion_main!(benches);
