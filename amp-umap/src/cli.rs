use clap::{Parser, Subcommand};
use config::ArgCheck;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubArgs,

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

#[derive(Debug, Subcommand)]
pub enum SubArgs {
    #[command(name = "target", about = "Embed all units of one target taxon with usum")]
    Target {
        #[command(flatten)]
        args: TargetArgs,
    },
    #[command(name = "embed", about = "Build the distance index for a FASTA file")]
    Embed {
        #[command(flatten)]
        args: EmbedArgs,
    },
    #[command(name = "plot", about = "Scatter plot of an index TSV colored by unit")]
    Plot {
        #[command(flatten)]
        args: PlotArgs,
    },
    #[command(name = "facet", about = "One scatter plot per value of an index column")]
    Facet {
        #[command(flatten)]
        args: FacetArgs,
    },
}

#[derive(Debug, Parser)]
pub struct TargetArgs {
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
        help = "Rank whose names define the embedding units"
    )]
    pub units_rank: String,

    #[arg(
        short = 'N',
        long = "neighbors",
        value_name = "N",
        default_value_t = config::DEFAULT_NEIGHBORS,
        help = "UMAP number of neighbors"
    )]
    pub neighbors: usize,

    #[arg(
        short = 'd',
        long = "min-dist",
        value_name = "DIST",
        default_value_t = config::DEFAULT_MIN_DIST,
        help = "UMAP minimum distance"
    )]
    pub min_dist: f64,

    #[arg(
        short = 'o',
        long = "save-dir",
        value_name = "DIR",
        default_value = ".",
        help = "Directory the usum output folder is created in"
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
}

impl ArgCheck for TargetArgs {
    fn get_samples(&self) -> &PathBuf {
        &self.samples
    }

    fn get_sample_ids(&self) -> &Vec<String> {
        &self.sample_ids
    }
}

#[derive(Debug, Parser)]
pub struct EmbedArgs {
    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "FASTA file with `{unit}_{sample}_{hap}` headers"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'o',
        long = "save-dir",
        value_name = "DIR",
        default_value = "umap",
        help = "Output directory for index, distance and embedding files"
    )]
    pub save_dir: PathBuf,

    #[arg(
        short = 'm',
        long = "target-map",
        required = false,
        value_name = "PATH",
        help = "TSV mapping unit names to target labels [default: unit name]"
    )]
    pub target_map: Option<PathBuf>,

    #[arg(
        long = "source-tags",
        required = false,
        value_name = "TAGS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Substrings marking a sequence's source site [fallback: reference]"
    )]
    pub source_tags: Vec<String>,

    #[arg(
        short = 'N',
        long = "neighbors",
        value_name = "N",
        default_value_t = config::DEFAULT_NEIGHBORS,
        help = "UMAP number of neighbors"
    )]
    pub neighbors: usize,

    #[arg(
        short = 'd',
        long = "min-dist",
        value_name = "DIST",
        default_value_t = config::DEFAULT_MIN_DIST,
        help = "UMAP minimum distance"
    )]
    pub min_dist: f64,
}

#[derive(Debug, Parser)]
pub struct PlotArgs {
    #[arg(
        short = 'x',
        long = "index",
        required = true,
        value_name = "PATH",
        help = "Index TSV produced by the embed subcommand"
    )]
    pub index: PathBuf,

    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "DIR",
        default_value = ".",
        help = "Output directory for the scatter PNG"
    )]
    pub outdir: PathBuf,

    #[arg(
        short = 'c',
        long = "min-unit-count",
        value_name = "N",
        default_value_t = config::MIN_UNIT_COUNT,
        help = "Drop units with fewer members than this"
    )]
    pub min_unit_count: usize,

    #[arg(
        long = "width",
        value_name = "PX",
        default_value_t = config::PLOT_WIDTH,
        help = "Plot width in pixels"
    )]
    pub width: u32,

    #[arg(
        long = "height",
        value_name = "PX",
        default_value_t = config::PLOT_HEIGHT,
        help = "Plot height in pixels"
    )]
    pub height: u32,
}

#[derive(Debug, Parser)]
pub struct FacetArgs {
    #[arg(
        short = 'x',
        long = "index",
        required = true,
        value_name = "PATH",
        help = "Index TSV produced by the embed subcommand"
    )]
    pub index: PathBuf,

    #[arg(
        short = 'c',
        long = "column",
        value_name = "COLUMN",
        default_value = "target",
        help = "Index column to facet by [unit, target or source]"
    )]
    pub column: String,

    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "DIR",
        default_value = ".",
        help = "Output directory for the per-value PNGs"
    )]
    pub outdir: PathBuf,

    #[arg(
        long = "width",
        value_name = "PX",
        default_value_t = config::PLOT_WIDTH,
        help = "Plot width in pixels"
    )]
    pub width: u32,

    #[arg(
        long = "height",
        value_name = "PX",
        default_value_t = config::PLOT_HEIGHT,
        help = "Plot height in pixels"
    )]
    pub height: u32,
}
