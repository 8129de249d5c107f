//! Relative-abundance module of the amptools pipeline
//!
//! Aggregates haplotype sizes per taxonomic rank for each sample,
//! normalizes them to percentages over the union of rank names, and
//! renders the result as a TSV table plus stacked bar charts [static
//! PNG and interactive plotly HTML].

use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use amp_abund::{cli::Args, core::relative_abundance};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap();

    relative_abundance(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
