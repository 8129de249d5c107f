//! UMAP module of the amptools pipeline
//!
//! Subsets haplotypes per target taxon and delegates the nonlinear
//! embedding to the external `usum` binary; builds distance indexes
//! and renders scatter plots from them.

use clap::Parser;
use log::{error, info, Level};
use simple_logger::init_with_level;

use amp_umap::cli::{Args, SubArgs};
use amp_umap::{core, plot};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap();

    let rs = match args.command {
        SubArgs::Target { args: target } => core::umap_target(target),
        SubArgs::Embed { args: embed } => core::embed(embed, args.threads),
        SubArgs::Plot { args: plot } => plot::plot_umap(plot),
        SubArgs::Facet { args: facet } => plot::plot_facets(facet),
    };

    rs.unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
