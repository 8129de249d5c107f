//! MLTree module of the amptools pipeline
//!
//! Prepares per-target FASTA input [optionally dereplicated per unit
//! with usearch], aligns it with clustalo and infers a
//! maximum-likelihood tree with IQ-TREE 2, honoring an existing
//! checkpoint through the redo/undo/stop policy.

pub mod cli;
pub mod core;

use anyhow::Result;
use cli::Args;

pub fn lib_amp_mltree(args: Vec<String>) -> Result<()> {
    let args = Args::from(args);
    core::mltree_target(args)
}
