use anyhow::Result;
use log::info;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use amp_pack::{load_bundle, units_to_fasta};
use config::{
    align_fasta, create_dir, run_tool, ArgCheck, CKP_SUFFIX, IQTREE2, MLTREE_ALN, MLTREE_FA,
    USEARCH,
};

use crate::cli::Args;

/// How to resume when an IQ-TREE checkpoint already exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RedoMode {
    Redo,
    RedoTree,
    Undo,
    Stop,
}

impl RedoMode {
    /// flag appended to the IQ-TREE command line
    pub fn as_flag(&self) -> Option<&'static str> {
        match self {
            RedoMode::Redo => Some("-redo"),
            RedoMode::RedoTree => Some("--redo-tree"),
            RedoMode::Undo => Some("--undo"),
            RedoMode::Stop => None,
        }
    }
}

impl FromStr for RedoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-redo" | "redo" => Ok(RedoMode::Redo),
            "--redo-tree" | "redo-tree" => Ok(RedoMode::RedoTree),
            "--undo" | "undo" => Ok(RedoMode::Undo),
            "stop" | "Stop" | "STOP" => Ok(RedoMode::Stop),
            other => Err(format!("Invalid redo mode: {}", other)),
        }
    }
}

/// checkpoint path IQ-TREE leaves behind on a finished run
pub fn ckp_path(save_dir: &Path, prefix: &str) -> PathBuf {
    save_dir
        .join(prefix)
        .join(format!("{}.{}", prefix, CKP_SUFFIX))
}

/// resolve the checkpoint policy, prompting when no preset is given
pub fn check_overwrite(
    save_dir: &Path,
    prefix: &str,
    preset: Option<RedoMode>,
) -> Result<Option<RedoMode>> {
    let ckp = ckp_path(save_dir, prefix);
    if !ckp.exists() {
        return Ok(None);
    }

    log::warn!(
        "MLTree checkpoint ({}) indicates that a previous run already finished. \
         Use `-redo` to overwrite all output files, `--redo-tree` to restore \
         ModelFinder and only redo tree search, `--undo` to continue the \
         previous run when changing options, or `stop` to abort.",
        ckp.display()
    );

    if let Some(mode) = preset {
        info!("Using preset redo mode: {:?}", mode);
        return Ok(Some(mode));
    }

    let stdin = std::io::stdin();
    prompt_redo_mode(&mut stdin.lock())
}

/// prompt until a valid redo answer arrives; a closed stdin aborts
fn prompt_redo_mode<R: BufRead>(input: &mut R) -> Result<Option<RedoMode>> {
    loop {
        print!("(-redo/--redo-tree/--undo/stop): ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            anyhow::bail!(
                "ERROR: No checkpoint answer on stdin. \
                 Pass --redo-mode to run non-interactively."
            );
        }

        match RedoMode::from_str(answer.trim()) {
            Ok(mode) => return Ok(Some(mode)),
            Err(_) => println!("> Invalid input."),
        }
    }
}

/// usearch argv for per-unit dereplication
pub fn derep_args(seq_file: &Path, uniq_file: &Path, relabel: &str, threads: usize) -> Vec<String> {
    vec![
        "-fastx_uniques".to_string(),
        seq_file.display().to_string(),
        "-threads".to_string(),
        threads.to_string(),
        "-relabel".to_string(),
        format!("{}_", relabel),
        "-fastaout".to_string(),
        uniq_file.display().to_string(),
    ]
}

/// concatenate unit FASTA text into the tree input, dereplicating on request
pub fn write_mltree_fasta(
    units2fasta: &hashbrown::HashMap<String, String>,
    scratch: &Path,
    derep: bool,
    threads: usize,
) -> Result<PathBuf> {
    let mut units: Vec<&String> = units2fasta.keys().collect();
    units.sort();

    let mut fasta = String::new();
    if derep {
        for unit in units {
            let seq_file = scratch.join(format!("{}.fa", unit));
            let uniq_file = scratch.join(format!("{}_uniq.fa", unit));

            std::fs::write(&seq_file, &units2fasta[unit])?;
            run_tool(USEARCH, &derep_args(&seq_file, &uniq_file, unit, threads))?;

            fasta.push_str(&std::fs::read_to_string(&uniq_file)?);
        }
    } else {
        for unit in units {
            fasta.push_str(&units2fasta[unit]);
        }
    }

    let mltree_fa = scratch.join(MLTREE_FA);
    std::fs::write(&mltree_fa, fasta)?;
    info!("Written MLTree fasta file to: {}", mltree_fa.display());

    Ok(mltree_fa)
}

/// IQ-TREE 2 argv: model test by default, AUTO threads when unset
pub fn iqtree2_args(
    seq_path: &Path,
    prefix: &Path,
    model: Option<&str>,
    bootstrap: Option<u32>,
    threads: Option<usize>,
    checkpoint: Option<RedoMode>,
) -> Vec<String> {
    let mut args = vec![
        "-m".to_string(),
        model.unwrap_or("TEST").to_string(),
        "-s".to_string(),
        seq_path.display().to_string(),
    ];

    if let Some(b) = bootstrap {
        args.push("-b".to_string());
        args.push(b.to_string());
    }

    args.push("--prefix".to_string());
    args.push(prefix.display().to_string());
    args.push("-nt".to_string());
    args.push(
        threads
            .map(|t| t.to_string())
            .unwrap_or_else(|| "AUTO".to_string()),
    );

    if let Some(flag) = checkpoint.and_then(|c| c.as_flag()) {
        args.push(flag.to_string());
    }

    args
}

/// driver: per-target maximum-likelihood tree with IQ-TREE 2
pub fn mltree_target(args: Args) -> Result<()> {
    info!("Building MLTree for {}...", args.target);
    args.check().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let checkpoint = check_overwrite(&args.save_dir, &args.target, args.redo_mode)?;
    if checkpoint == Some(RedoMode::Stop) {
        info!("Stopping analysis.");
        return Ok(());
    }

    let bundle = load_bundle(&args.samples, &args.sample_ids)?;
    let sample_ids = bundle.resolve_sample_ids(&args.sample_ids)?;
    let units2fasta = units_to_fasta(
        &bundle,
        &args.target,
        &args.target_rank,
        &args.units_rank,
        &sample_ids,
    )?;

    let scratch = tempfile::tempdir()?;
    let mltree_fa = write_mltree_fasta(&units2fasta, scratch.path(), args.derep, args.threads)?;
    let mltree_aln = scratch.path().join(MLTREE_ALN);

    align_fasta(&mltree_fa, &mltree_aln)?;

    let save_subdir = args.save_dir.join(&args.target);
    create_dir(&save_subdir)?;

    let prefix = save_subdir.join(&args.target);
    run_tool(
        IQTREE2,
        &iqtree2_args(
            &mltree_aln,
            &prefix,
            args.model.as_deref(),
            args.bootstrap,
            args.iqtree_threads,
            checkpoint,
        ),
    )?;

    info!("MLTree saved to: {}", save_subdir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redo_mode_parsing() {
        assert_eq!(RedoMode::from_str("-redo").unwrap(), RedoMode::Redo);
        assert_eq!(RedoMode::from_str("redo-tree").unwrap(), RedoMode::RedoTree);
        assert_eq!(RedoMode::from_str("--undo").unwrap(), RedoMode::Undo);
        assert_eq!(RedoMode::from_str("STOP").unwrap(), RedoMode::Stop);
        assert!(RedoMode::from_str("again").is_err());
    }

    #[test]
    fn test_redo_mode_flags() {
        assert_eq!(RedoMode::Redo.as_flag(), Some("-redo"));
        assert_eq!(RedoMode::Stop.as_flag(), None);
    }

    #[test]
    fn test_ckp_path_shape() {
        let path = ckp_path(Path::new("save"), "SpA");
        assert_eq!(path, PathBuf::from("save/SpA/SpA.ckp.gz"));
    }

    #[test]
    fn test_check_overwrite_without_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let rs = check_overwrite(dir.path(), "SpA", None).unwrap();
        assert_eq!(rs, None);
    }

    #[test]
    fn test_check_overwrite_preset() {
        let dir = tempfile::tempdir().unwrap();
        let subdir = dir.path().join("SpA");
        std::fs::create_dir_all(&subdir).unwrap();
        std::fs::write(subdir.join("SpA.ckp.gz"), "x").unwrap();

        let rs = check_overwrite(dir.path(), "SpA", Some(RedoMode::Undo)).unwrap();
        assert_eq!(rs, Some(RedoMode::Undo));
    }

    #[test]
    fn test_prompt_redo_mode_closed_input_aborts() {
        let mut input = std::io::Cursor::new("");
        let rs = prompt_redo_mode(&mut input);

        assert!(rs.is_err());
        assert!(rs.unwrap_err().to_string().contains("--redo-mode"));
    }

    #[test]
    fn test_prompt_redo_mode_retries_until_valid() {
        let mut input = std::io::Cursor::new("again\n--undo\n");
        let rs = prompt_redo_mode(&mut input).unwrap();

        assert_eq!(rs, Some(RedoMode::Undo));
    }

    #[test]
    fn test_derep_args_shape() {
        let args = derep_args(
            Path::new("tmp/SpA.fa"),
            Path::new("tmp/SpA_uniq.fa"),
            "SpA",
            12,
        );

        assert_eq!(
            args,
            vec![
                "-fastx_uniques",
                "tmp/SpA.fa",
                "-threads",
                "12",
                "-relabel",
                "SpA_",
                "-fastaout",
                "tmp/SpA_uniq.fa"
            ]
        );
    }

    #[test]
    fn test_iqtree2_args_defaults() {
        let args = iqtree2_args(
            Path::new("tmp/mltree.aln"),
            Path::new("save/SpA/SpA"),
            None,
            None,
            None,
            None,
        );

        assert_eq!(
            args,
            vec![
                "-m",
                "TEST",
                "-s",
                "tmp/mltree.aln",
                "--prefix",
                "save/SpA/SpA",
                "-nt",
                "AUTO"
            ]
        );
    }

    #[test]
    fn test_iqtree2_args_full() {
        let args = iqtree2_args(
            Path::new("tmp/mltree.aln"),
            Path::new("save/SpA/SpA"),
            Some("GTR+G"),
            Some(1000),
            Some(8),
            Some(RedoMode::RedoTree),
        );

        assert_eq!(
            args,
            vec![
                "-m",
                "GTR+G",
                "-s",
                "tmp/mltree.aln",
                "-b",
                "1000",
                "--prefix",
                "save/SpA/SpA",
                "-nt",
                "8",
                "--redo-tree"
            ]
        );
    }

    #[test]
    fn test_write_mltree_fasta_concatenates() {
        let dir = tempfile::tempdir().unwrap();

        let mut units = hashbrown::HashMap::new();
        units.insert("SpB".to_string(), ">SpB_S1_Z1\nTT\n".to_string());
        units.insert("SpA".to_string(), ">SpA_S1_Z1\nAA\n".to_string());

        let path = write_mltree_fasta(&units, dir.path(), false, 1).unwrap();
        let fasta = std::fs::read_to_string(&path).unwrap();

        // sorted by unit name
        assert_eq!(fasta, ">SpA_S1_Z1\nAA\n>SpB_S1_Z1\nTT\n");
    }
}
