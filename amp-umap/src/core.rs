use anyhow::Result;
use log::info;

use std::path::{Path, PathBuf};

use amp_pack::{load_bundle, reader, units_to_fasta};
use config::{
    create_dir, run_tool, validate, write_collection, ArgCheck, DIST_MATRIX, DIST_TABBED,
    INDEX_ALN, INDEX_FA, INDEX_TSV, MAX_DIST, TERM_DIST, UMAP_COORDS, UMAP_SEED, USUM,
};

use crate::cli::{EmbedArgs, TargetArgs};
use crate::dist::{calc_dist, DistMatrix};
use crate::index::{fasta_to_index, join_coords, parse_coords, parse_target_map, write_index};

/// usum argv: input FASTA files plus embedding parameters
pub fn usum_args(
    fasta_paths: &[PathBuf],
    output: &Path,
    neighbors: usize,
    min_dist: f64,
) -> Vec<String> {
    let mut args: Vec<String> = fasta_paths
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    args.extend([
        "--neighbors".to_string(),
        neighbors.to_string(),
        "--umap-min-dist".to_string(),
        min_dist.to_string(),
        "--maxdist".to_string(),
        MAX_DIST.to_string(),
        "--termdist".to_string(),
        TERM_DIST.to_string(),
        "--output".to_string(),
        output.display().to_string(),
        "-f".to_string(),
        "--seed".to_string(),
        UMAP_SEED.to_string(),
    ]);

    args
}

/// write one FASTA file per unit into `dir`, sorted for determinism
pub fn write_unit_fastas(
    units2fasta: &hashbrown::HashMap<String, String>,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut units: Vec<&String> = units2fasta.keys().collect();
    units.sort();

    let mut paths = Vec::with_capacity(units.len());
    for unit in units {
        let path = dir.join(format!("{}.fa", unit));
        std::fs::write(&path, &units2fasta[unit])?;
        paths.push(path);
    }

    info!(
        "Written fasta files to: {}",
        paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );

    Ok(paths)
}

/// driver: subset haplotypes for one target and embed them with usum
pub fn umap_target(args: TargetArgs) -> Result<()> {
    info!("Plotting UMAP for {}...", args.target);
    args.check().map_err(|e| anyhow::anyhow!(e.to_string()))?;

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
    let fasta_paths = write_unit_fastas(&units2fasta, scratch.path())?;

    let save_path = args.save_dir.join(&args.target);
    run_tool(
        USUM,
        &usum_args(&fasta_paths, &save_path, args.neighbors, args.min_dist),
    )?;

    info!("UMAP saved to: {}", save_path.display());

    Ok(())
}

/// driver: distance-index pipeline for an arbitrary FASTA file
///
/// Re-numbers the records, aligns them, derives the pairwise distance
/// list and its dense symmetric matrix, embeds with usum, and joins
/// labels plus coordinates into `index.tsv`. The dense matrix is an
/// output artifact: downstream precomputed-metric analyses read
/// `matrix.tsv` with rows and columns ordered by the integer ids of
/// `input.fa`.
pub fn embed(args: EmbedArgs, threads: usize) -> Result<()> {
    validate(&args.fasta, &[".fa", ".fasta", ".fa.gz", ".fasta.gz"])
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    create_dir(&args.save_dir)?;

    let target_map = match &args.target_map {
        Some(path) => parse_target_map(&reader(path)?)?,
        None => hashbrown::HashMap::new(),
    };

    let contents = reader(&args.fasta)?;
    let (fasta, mut records) = fasta_to_index(&contents, &target_map, &args.source_tags)?;

    let index_fa = args.save_dir.join(INDEX_FA);
    let index_aln = args.save_dir.join(INDEX_ALN);
    let dist_file = args.save_dir.join(DIST_TABBED);

    std::fs::write(&index_fa, &fasta)?;

    calc_dist(
        &index_fa,
        &index_aln,
        &dist_file,
        MAX_DIST,
        TERM_DIST,
        threads,
    )?;

    let matrix = DistMatrix::from_tabbed(&reader(&dist_file)?)?;
    if matrix.len() != records.len() {
        anyhow::bail!(
            "ERROR: Distance matrix covers {} records, index has {}",
            matrix.len(),
            records.len()
        );
    }
    write_collection(&matrix.to_tsv(), &args.save_dir.join(DIST_MATRIX));

    let embed_dir = args.save_dir.join("embedding");
    run_tool(
        USUM,
        &usum_args(
            &[index_fa.clone()],
            &embed_dir,
            args.neighbors,
            args.min_dist,
        ),
    )?;

    let coords = parse_coords(&reader(&embed_dir.join(UMAP_COORDS))?)?;
    join_coords(&mut records, &coords)?;

    let index_path = args.save_dir.join(INDEX_TSV);
    write_index(&records, &index_path);
    info!("Saved index TSV to: {}", index_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usum_args_shape() {
        let fastas = vec![PathBuf::from("tmp/SpA.fa"), PathBuf::from("tmp/SpB.fa")];
        let args = usum_args(&fastas, &PathBuf::from("out/Target"), 15, 0.1);

        assert_eq!(
            args,
            vec![
                "tmp/SpA.fa",
                "tmp/SpB.fa",
                "--neighbors",
                "15",
                "--umap-min-dist",
                "0.1",
                "--maxdist",
                "1",
                "--termdist",
                "1",
                "--output",
                "out/Target",
                "-f",
                "--seed",
                "1"
            ]
        );
    }

    #[test]
    fn test_embed_rejects_bad_fasta_path() {
        let dir = tempfile::tempdir().unwrap();

        let args = crate::cli::EmbedArgs {
            fasta: dir.path().join("missing.fa"),
            save_dir: dir.path().join("out"),
            target_map: None,
            source_tags: vec![],
            neighbors: 15,
            min_dist: 0.1,
        };

        assert!(embed(args, 1).is_err());
        // nothing validated, nothing created
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_write_unit_fastas_sorted() {
        let dir = tempfile::tempdir().unwrap();

        let mut units = hashbrown::HashMap::new();
        units.insert("SpB".to_string(), ">SpB_S1_Z1\nTT\n".to_string());
        units.insert("SpA".to_string(), ">SpA_S1_Z1\nAA\n".to_string());

        let paths = write_unit_fastas(&units, dir.path()).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("SpA.fa"));
        assert!(paths[1].ends_with("SpB.fa"));
        assert_eq!(
            std::fs::read_to_string(&paths[0]).unwrap(),
            ">SpA_S1_Z1\nAA\n"
        );
    }
}
