//! UMAP module of the amptools pipeline
//!
//! Subsets haplotypes per target taxon and delegates the nonlinear
//! embedding to the external `usum` binary. The `embed` subcommand
//! additionally builds the full distance index: re-numbered FASTA,
//! clustalo alignment, usearch pairwise distances mirrored into a
//! dense symmetric matrix, and an index TSV joining sequence ids to
//! unit/source/target labels and embedding coordinates. The `plot`
//! and `facet` subcommands render scatter PNGs from that index.

pub mod cli;
pub mod core;
pub mod dist;
pub mod index;
pub mod plot;

use anyhow::Result;
use cli::{Args, SubArgs};

pub fn lib_amp_umap(args: Vec<String>) -> Result<()> {
    let args = Args::from(args);

    match args.command {
        SubArgs::Target { args: target } => core::umap_target(target),
        SubArgs::Embed { args: embed } => core::embed(embed, args.threads),
        SubArgs::Plot { args: plot } => plot::plot_umap(plot),
        SubArgs::Facet { args: facet } => plot::plot_facets(facet),
    }
}
