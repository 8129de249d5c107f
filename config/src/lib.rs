//! Shared configuration for the amptools pipeline
//!
//! Universal constants, the progress bar factory, CLI argument
//! validation and the external-tool runner used by every amp-* crate.

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric defaults
pub const MIN_THREADS: usize = 1;
pub const DEFAULT_NEIGHBORS: usize = 15;
pub const DEFAULT_MIN_DIST: f64 = 0.1;
pub const MAX_DIST: f64 = 1.0;
pub const TERM_DIST: f64 = 1.0;
pub const UMAP_SEED: u64 = 1;
pub const MIN_UNIT_COUNT: usize = 1;
pub const PLOT_WIDTH: u32 = 800;
pub const PLOT_HEIGHT: u32 = 800;

// sample bundle layout
pub const HAP_FASTA: &str = "haplotypes.fa";
pub const RANK_TABLE: &str = "ranks.tsv";
pub const DEFAULT_UNITS_RANK: &str = "species";

// artifact names
pub const MLTREE_FA: &str = "mltree.fa";
pub const MLTREE_ALN: &str = "mltree.aln";
pub const INDEX_FA: &str = "input.fa";
pub const INDEX_ALN: &str = "input.aln";
pub const DIST_TABBED: &str = "distance.txt";
pub const DIST_MATRIX: &str = "matrix.tsv";
pub const INDEX_TSV: &str = "index.tsv";
pub const UMAP_COORDS: &str = "umap.tsv";
pub const UMAP_PNG: &str = "umap.png";
pub const UMAP_HTML: &str = "umap.html";
pub const CKP_SUFFIX: &str = "ckp.gz";
pub const REFERENCE_SOURCE: &str = "reference";

// external executables
pub const USUM: &str = "usum";
pub const USEARCH: &str = "usearch";
pub const CLUSTALO: &str = "clustalo";
pub const IQTREE2: &str = "iqtree2";

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write any collection of lines to a file
pub fn write_collection(data: &Vec<String>, fname: &Path) {
    log::info!("Rows in {}: {:?}. Writing...", fname.display(), data.len());
    let f = match File::create(fname) {
        Ok(f) => f,
        Err(e) => panic!("Error creating file: {}", e),
    };
    let mut writer = BufWriter::new(f);

    for line in data.iter() {
        writeln!(writer, "{}", line).unwrap_or_else(|e| {
            panic!("Error writing to file: {}", e);
        });
    }
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        validate_dir(self.get_samples())?;

        if self.get_sample_ids().is_empty() {
            log::warn!("No sample ID list provided. Using all samples...");
        }

        Ok(())
    }

    fn get_samples(&self) -> &PathBuf;
    fn get_sample_ids(&self) -> &Vec<String>;
}

/// validate that a path is a non-empty file with one of the given extensions
pub fn validate(arg: &PathBuf, extensions: &[&str]) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    let name = arg.to_string_lossy();
    if !extensions.iter().any(|ext| name.ends_with(ext)) {
        return Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is not one of {:?}",
            arg, extensions
        )));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

/// validate that a path is an existing directory
pub fn validate_dir(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a directory",
            arg
        )));
    }

    Ok(())
}

/// create a directory if it does not exist
pub fn create_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        log::info!("Creating directory: {}", dir.display());
        std::fs::create_dir_all(dir)?;
    }

    Ok(())
}

/// remove a directory and its contents if it exists
pub fn remove_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.is_dir() {
        log::info!("Removing directory: {}", dir.display());
        std::fs::remove_dir_all(dir)?;
    }

    Ok(())
}

/// clustalo argv: full alignment plus distance-matrix and guide-tree dumps
pub fn align_args(seq_file: &Path, aln_file: &Path) -> Vec<String> {
    vec![
        "-i".to_string(),
        seq_file.display().to_string(),
        "-o".to_string(),
        aln_file.display().to_string(),
        format!("--distmat-out={}.mat", aln_file.display()),
        format!("--guidetree-out={}.dnd", aln_file.display()),
        "--full".to_string(),
        "--force".to_string(),
    ]
}

/// align a FASTA file with clustalo
pub fn align_fasta(seq_file: &Path, aln_file: &Path) -> anyhow::Result<()> {
    run_tool(CLUSTALO, &align_args(seq_file, aln_file))?;
    log::info!("Aligned fasta file to: {}", aln_file.display());

    Ok(())
}

/// run an external tool, failing on a non-zero exit status
pub fn run_tool(program: &str, args: &[String]) -> anyhow::Result<Output> {
    log::info!("Running command: {} {}", program, args.join(" "));

    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| anyhow::anyhow!("ERROR: Failed to execute {}: {}", program, e))?;

    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ERROR: {} exited with {}: {}", program, output.status, err);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_missing_file() {
        let path = PathBuf::from("does/not/exist.fa");
        assert!(validate(&path, &[".fa"]).is_err());
    }

    #[test]
    fn test_validate_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validate_ext.txt");
        std::fs::write(&path, "x").unwrap();

        assert!(validate(&path, &[".fa", ".fasta"]).is_err());
        assert!(validate(&path, &[".txt"]).is_ok());
    }

    #[test]
    fn test_align_args_shape() {
        let seq = PathBuf::from("in.fa");
        let aln = PathBuf::from("in.aln");

        assert_eq!(
            align_args(&seq, &aln),
            vec![
                "-i",
                "in.fa",
                "-o",
                "in.aln",
                "--distmat-out=in.aln.mat",
                "--guidetree-out=in.aln.dnd",
                "--full",
                "--force"
            ]
        );
    }

    #[test]
    fn test_run_tool_missing_binary() {
        let rs = run_tool("definitely-not-a-real-binary", &[]);
        assert!(rs.is_err());
    }
}
