use clap::Parser;
use config::ArgCheck;
use std::path::PathBuf;

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
        short = 'r',
        long = "rank",
        required = true,
        value_name = "RANK",
        help = "Taxonomic rank to aggregate abundances at"
    )]
    pub rank: String,

    #[arg(
        short = 'i',
        long = "sample-ids",
        required = false,
        value_name = "IDS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Subset of sample IDs to plot [default: all samples]"
    )]
    pub sample_ids: Vec<String>,

    #[arg(
        short = 'o',
        long = "outdir",
        required = false,
        value_name = "DIR",
        default_value = "abund",
        help = "Output directory for table and charts"
    )]
    pub outdir: PathBuf,

    #[arg(
        short = 'n',
        long = "name",
        required = false,
        value_name = "NAME",
        help = "Base name for the chart files [default: {rank}_bar_chart]"
    )]
    pub name: Option<String>,

    #[arg(
        long = "width",
        value_name = "PX",
        default_value_t = config::PLOT_WIDTH,
        help = "Chart width in pixels"
    )]
    pub width: u32,

    #[arg(
        long = "height",
        value_name = "PX",
        default_value_t = config::PLOT_HEIGHT,
        help = "Chart height in pixels"
    )]
    pub height: u32,

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

    /// chart base name, defaulting to `{rank}_bar_chart`
    pub fn chart_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_bar_chart", self.rank))
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
