use clap::{ArgAction, Parser};
use config::ArgCheck;
use std::path::PathBuf;

use crate::core::RedoMode;

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(
        short = 's',
        long = "samples",
        required = true,
        value_name = "DIR",
        help = "Path to samples directory [one subdirectory per sample]"
    )]
    pub samples: PathBuf,

    #[arg(
        short = 'n',
        long = "target",
        required = true,
        value_name = "NAME",
        help = "Target taxon name to subset haplotypes by"
    )]
    pub target: String,

    #[arg(
        short = 'r',
        long = "target-rank",
        required = true,
        value_name = "RANK",
        help = "Rank the target name belongs to"
    )]
    pub target_rank: String,

    #[arg(
        short = 'u',
        long = "units-rank",
        value_name = "RANK",
        default_value = config::DEFAULT_UNITS_RANK,
        help = "Rank whose names define the tree units"
    )]
    pub units_rank: String,

    #[arg(
        short = 'D',
        long = "derep",
        action = ArgAction::SetTrue,
        help = "Dereplicate each unit with usearch before alignment"
    )]
    pub derep: bool,

    #[arg(
        short = 'm',
        long = "model",
        required = false,
        value_name = "MODEL",
        help = "Substitution model for IQ-TREE 2 [default: TEST]"
    )]
    pub model: Option<String>,

    #[arg(
        short = 'b',
        long = "bootstrap",
        required = false,
        value_name = "N",
        help = "Number of nonparametric bootstrap replicates"
    )]
    pub bootstrap: Option<u32>,

    #[arg(
        long = "iqtree-threads",
        required = false,
        value_name = "N",
        help = "Threads for IQ-TREE 2 [default: AUTO]"
    )]
    pub iqtree_threads: Option<usize>,

    #[arg(
        long = "redo-mode",
        required = false,
        value_name = "MODE",
        help = "Checkpoint answer to use without prompting [redo, redo-tree, undo, stop]"
    )]
    pub redo_mode: Option<RedoMode>,

    #[arg(
        short = 'o',
        long = "save-dir",
        value_name = "DIR",
        default_value = ".",
        help = "Directory the per-target output folder is created in"
    )]
    pub save_dir: PathBuf,

    #[arg(
        short = 'i',
        long = "sample-ids",
        required = false,
        value_name = "IDS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Subset of sample IDs to use [default: all samples]"
    )]
    pub sample_ids: Vec<String>,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}

impl ArgCheck for Args {
    fn get_samples(&self) -> &PathBuf {
        &self.samples
    }

    fn get_sample_ids(&self) -> &Vec<String> {
        &self.sample_ids
    }
}
