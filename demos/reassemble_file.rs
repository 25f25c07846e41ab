//! Splits a file into pieces, delivers them in shuffled order from several
//! threads, and streams the reassembled bytes to an output file.
//!
//! Run with:
//!     RUST_LOG=chunkstitch=debug cargo run --example reassemble_file -- <input> <output> [chunk_size]

use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chunkstitch::{HashAlgorithm, ReassemblyConfig, Reassembler, digest_pieces};
use tracing_subscriber::EnvFilter;

const WORKERS: usize = 4;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        eprintln!("usage: reassemble_file <input> <output> [chunk_size]");
        std::process::exit(2);
    };
    let input = PathBuf::from(input);
    let chunk_size: usize = match args.next() {
        Some(arg) => arg.parse()?,
        None => 256 * 1024,
    };

    let mut data = Vec::new();
    File::open(&input)?.read_to_end(&mut data)?;

    // Expected digest list, as a metadata file would carry it
    let algo = HashAlgorithm::default();
    let digests = digest_pieces(&data[..], chunk_size, algo)?;

    let config = ReassemblyConfig::new(chunk_size, data.len() as u64)?.with_hash_algorithm(algo);
    let sink = BufWriter::new(File::create(&output)?);
    let reassembler = Reassembler::new(digests, config, sink)?;
    let mut completion = reassembler
        .take_completion()
        .ok_or("completion already taken")?;

    let count = reassembler.config().piece_count();
    let order = shuffled(count, data.len() as u64);
    println!(
        "{}: {} bytes, {} pieces of {} bytes",
        input.display(),
        data.len(),
        count,
        chunk_size
    );

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let order = &order;
            let data = &data;
            let reassembler = &reassembler;
            scope.spawn(move || {
                for &index in order.iter().skip(worker).step_by(WORKERS) {
                    let range = reassembler.config().piece_range(index);
                    if let Err(e) = reassembler.apply(&data[range.start as usize..range.end as usize]) {
                        eprintln!("piece {index}: {e}");
                    }
                }
            });
        }
    });

    let Some(backing) = completion.wait_timeout(Duration::from_secs(30))? else {
        let progress = reassembler.progress();
        eprintln!("timed out, missing pieces: {:?}", progress.missing().collect::<Vec<_>>());
        std::process::exit(1);
    };

    let status = reassembler.status();
    println!(
        "done: {} pieces applied, {} bytes flushed, staged at {}",
        status.pieces_applied,
        status.bytes_flushed,
        backing.path().display()
    );
    drop(backing);

    let mut sink = reassembler.cleanup()?;
    std::io::Write::flush(&mut sink)?;
    println!("wrote {}", output);
    Ok(())
}

/// Deterministic Fisher-Yates shuffle seeded from the file size.
fn shuffled(count: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..count).collect();
    let mut state = seed | 1;
    for i in (1..count).rev() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let j = (state >> 33) as usize % (i + 1);
        order.swap(i, j);
    }
    order
}
