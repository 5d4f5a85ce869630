mod cache;
mod trace;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use cache::{Cache, CacheGeometry};
use trace::TraceFile;

/// Set-associative cache simulator: replays a valgrind memory trace and
/// reports hit, miss and eviction totals.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Number of set index bits
    #[arg(short = 's')]
    set_index_bits: u32,

    /// Associativity (number of lines per set)
    #[arg(short = 'E')]
    associativity: usize,

    /// Number of block offset bits
    #[arg(short = 'b')]
    block_offset_bits: u32,

    /// Trace file to replay
    #[arg(short = 't')]
    trace_file: PathBuf,

    /// Echo each access and its outcome to stderr
    #[arg(short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let geometry = CacheGeometry::new(args.set_index_bits, args.block_offset_bits, args.associativity)?;
    let trace = TraceFile::load(&args.trace_file)?;
    if args.verbose {
        eprintln!("Replaying {} ({} records)", trace.name, trace.entries.len());
    }
    let mut cache = Cache::new(geometry);
    let stats = cache.run_trace(&trace.entries, args.verbose);
    println!("{stats}");
    Ok(())
}
