//! MLTree module of the amptools pipeline
//!
//! Prepares per-target FASTA input [optionally dereplicated per unit
//! with usearch], aligns it with clustalo and infers a
//! maximum-likelihood tree with IQ-TREE 2, honoring an existing
//! checkpoint through the redo/undo/stop policy.

use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use amp_mltree::{cli::Args, core::mltree_target};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap();

    mltree_target(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
