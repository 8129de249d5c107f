//! Relative-abundance module of the amptools pipeline
//!
//! Aggregates haplotype sizes per taxonomic rank for each sample,
//! normalizes them to percentages over the union of rank names, and
//! renders the result as a TSV table plus stacked bar charts [static
//! PNG and interactive plotly HTML].

pub mod cli;
pub mod core;
pub mod plot;

use anyhow::Result;
use cli::Args;

pub fn lib_amp_abund(args: Vec<String>) -> Result<()> {
    let args = Args::from(args);
    core::relative_abundance(args)
}
