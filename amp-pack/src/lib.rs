//! Sample bundle loading for the amptools pipeline
//!
//! This crate owns the on-disk project layout: one directory per
//! sample holding a haplotype FASTA (USEARCH `;size=` annotations,
//! gzip accepted) and a tab-separated rank table. Samples are read
//! and parsed in parallel; the rest of the workspace only sees the
//! `SampleBundle` view defined in [`record`].

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use hashbrown::HashMap;
use memchr::memchr_iter;
use rayon::prelude::*;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use config::{get_progress_bar, HAP_FASTA, RANK_TABLE};

pub mod record;
pub use record::{Haplotype, Sample, SampleBundle};

const FA_NEEDLE: u8 = b'>';

/// read a whole file into a string, transparently decoding gzip
pub fn reader<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<String> {
    let mut file =
        File::open(&path).with_context(|| format!("ERROR: Cannot open file {:?}", path))?;

    let mut contents = String::new();
    if path.as_ref().to_string_lossy().ends_with(".gz") {
        let mut decoder = MultiGzDecoder::new(file);
        decoder
            .read_to_string(&mut contents)
            .with_context(|| format!("ERROR: Cannot decompress {:?}", path))?;
    } else {
        file.read_to_string(&mut contents)
            .with_context(|| format!("ERROR: Cannot read {:?}", path))?;
    }

    Ok(contents)
}

/// split a FASTA header into id and `;size=` annotation [default 1]
fn parse_header(header: &str) -> (String, u64) {
    let header = header.trim();
    let id = header
        .split([';', ' ', '\t'])
        .next()
        .unwrap_or(header)
        .to_string();

    let size = header
        .split(';')
        .find_map(|field| field.strip_prefix("size="))
        .and_then(|n| n.trim().parse::<u64>().ok())
        .unwrap_or(1);

    (id, size)
}

/// parse FASTA text into haplotypes, joining multi-line sequences
pub fn parse_fasta(contents: &str) -> Result<Vec<Haplotype>> {
    let bytes = contents.as_bytes();
    let starts: Vec<usize> = memchr_iter(FA_NEEDLE, bytes)
        .filter(|&pos| pos == 0 || bytes[pos - 1] == b'\n')
        .collect();

    if starts.is_empty() {
        anyhow::bail!("ERROR: No FASTA records found");
    }

    let mut haps = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(bytes.len());
        let chunk = &contents[start..end];

        let mut lines = chunk.lines();
        let header = lines
            .next()
            .and_then(|l| l.strip_prefix('>'))
            .ok_or_else(|| anyhow::anyhow!("ERROR: Malformed FASTA record: {}", chunk))?;

        let (id, size) = parse_header(header);
        let seq: String = lines.map(|l| l.trim()).collect();

        if seq.is_empty() {
            anyhow::bail!("ERROR: Empty sequence for record {}", id);
        }

        haps.push(Haplotype { id, size, seq });
    }

    Ok(haps)
}

/// parse a rank table: `hap<TAB>rank1<TAB>rank2...` header plus one row per hap
pub fn parse_rank_table(contents: &str) -> Result<(Vec<String>, HashMap<String, Vec<String>>)> {
    let mut lines = contents.lines().filter(|l| !l.starts_with('#'));

    let header = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("ERROR: Empty rank table"))?;
    let mut fields = header.split('\t');

    match fields.next() {
        Some("hap") => (),
        other => anyhow::bail!(
            "ERROR: Rank table header must start with 'hap', got {:?}",
            other
        ),
    }

    let ranks: Vec<String> = fields.map(|f| f.to_string()).collect();
    if ranks.is_empty() {
        anyhow::bail!("ERROR: Rank table header has no rank columns");
    }

    let mut hap2rank = HashMap::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let hap = fields
            .next()
            .ok_or_else(|| anyhow::anyhow!("ERROR: Cannot parse hap id from: {}", line))?
            .to_string();

        let names: Vec<String> = fields.map(|f| f.to_string()).collect();
        if names.len() != ranks.len() {
            anyhow::bail!(
                "ERROR: Row for {} has {} rank columns, expected {}",
                hap,
                names.len(),
                ranks.len()
            );
        }

        hap2rank.insert(hap, names);
    }

    Ok((ranks, hap2rank))
}

/// load one sample directory [haplotypes.fa + ranks.tsv]
pub fn load_sample(dir: &Path, id: &str) -> Result<Sample> {
    let fasta_path = resolve_fasta(dir);
    let rank_path = dir.join(RANK_TABLE);

    let haps = parse_fasta(&reader(&fasta_path)?)
        .with_context(|| format!("ERROR: Cannot parse {:?}", fasta_path))?;
    let (ranks, hap2rank) = parse_rank_table(&reader(&rank_path)?)
        .with_context(|| format!("ERROR: Cannot parse {:?}", rank_path))?;

    for hap in haps.iter() {
        if !hap2rank.contains_key(&hap.id) {
            anyhow::bail!("ERROR: Haplotype {} of sample {} has no rank row", hap.id, id);
        }
    }

    let haps: HashMap<String, Haplotype> = haps.into_iter().map(|h| (h.id.clone(), h)).collect();

    Ok(Sample {
        id: id.to_string(),
        haps,
        ranks,
        hap2rank,
    })
}

fn resolve_fasta(dir: &Path) -> PathBuf {
    let gz = dir.join(format!("{}.gz", HAP_FASTA));
    if gz.is_file() {
        gz
    } else {
        dir.join(HAP_FASTA)
    }
}

/// load every sample subdirectory of `dir` in parallel
pub fn load_bundle(dir: &Path, requested: &[String]) -> Result<SampleBundle> {
    let mut sample_dirs: Vec<(String, PathBuf)> = std::fs::read_dir(dir)
        .with_context(|| format!("ERROR: Cannot read samples directory {:?}", dir))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| (entry.file_name().to_string_lossy().to_string(), entry.path()))
        .collect();
    sample_dirs.sort();

    if !requested.is_empty() {
        for id in requested {
            if !sample_dirs.iter().any(|(name, _)| name == id) {
                anyhow::bail!("ERROR: Requested sample {} not found in {:?}", id, dir);
            }
        }
        sample_dirs.retain(|(name, _)| requested.contains(name));
    }

    if sample_dirs.is_empty() {
        anyhow::bail!("ERROR: No sample directories found in {:?}", dir);
    }

    let pb = get_progress_bar(sample_dirs.len() as u64, "Loading samples...");
    let samples: Vec<Sample> = sample_dirs
        .par_iter()
        .map(|(id, path)| {
            let sample = load_sample(path, id);
            pb.inc(1);
            sample
        })
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();

    log::info!("Loaded {} samples from {:?}", samples.len(), dir);

    Ok(SampleBundle::new(samples))
}

/// group per-target haplotypes into unit-keyed FASTA text
///
/// Haplotypes whose `target_rank` name differs from `target_name` are
/// skipped; the rest are grouped by their `units_rank` name with headers
/// `>{unit}_{sample}_{hap}`.
pub fn units_to_fasta(
    bundle: &SampleBundle,
    target_name: &str,
    target_rank: &str,
    units_rank: &str,
    sample_ids: &[String],
) -> Result<HashMap<String, String>> {
    let mut units2fasta: HashMap<String, String> = HashMap::new();

    for sample_id in sample_ids {
        let sample = bundle
            .get(sample_id)
            .ok_or_else(|| anyhow::anyhow!("ERROR: Sample {} not in bundle", sample_id))?;

        if sample.rank_index(target_rank).is_none() {
            anyhow::bail!("ERROR: Sample {} has no rank {}", sample_id, target_rank);
        }
        if sample.rank_index(units_rank).is_none() {
            anyhow::bail!("ERROR: Sample {} has no rank {}", sample_id, units_rank);
        }

        for hap in sample.sorted_haps() {
            match sample.rank_name(hap, target_rank) {
                Some(name) if name == target_name => (),
                _ => continue,
            }

            let unit = sample
                .rank_name(hap, units_rank)
                .ok_or_else(|| anyhow::anyhow!("ERROR: No {} name for {}", units_rank, hap))?
                .to_string();
            let seq = sample
                .hap_seq(hap)
                .ok_or_else(|| anyhow::anyhow!("ERROR: No sequence for {}", hap))?;

            let entry = units2fasta.entry(unit.clone()).or_default();
            entry.push_str(&format!(">{}_{}_{}\n{}\n", unit, sample_id, hap, seq));
        }
    }

    if units2fasta.is_empty() {
        anyhow::bail!(
            "ERROR: No haplotypes matched {} at rank {}",
            target_name,
            target_rank
        );
    }

    Ok(units2fasta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FASTA: &str = ">Zotu1;size=3\nACGT\nACGT\n>Zotu2\nTTTT\n";
    const RANKS: &str = "hap\tfamily\tspecies\nZotu1\tFamA\tSpA\nZotu2\tFamA\tSpB\n";

    fn write_sample(dir: &Path) {
        std::fs::write(dir.join(HAP_FASTA), FASTA).unwrap();
        std::fs::write(dir.join(RANK_TABLE), RANKS).unwrap();
    }

    #[test]
    fn test_parse_fasta_sizes_and_multiline() {
        let haps = parse_fasta(FASTA).unwrap();

        assert_eq!(haps.len(), 2);
        assert_eq!(haps[0].id, "Zotu1");
        assert_eq!(haps[0].size, 3);
        assert_eq!(haps[0].seq, "ACGTACGT");
        assert_eq!(haps[1].size, 1); // no annotation defaults to 1
    }

    #[test]
    fn test_parse_fasta_rejects_empty() {
        assert!(parse_fasta("no records here\n").is_err());
        assert!(parse_fasta(">only_header\n").is_err());
    }

    #[test]
    fn test_parse_rank_table() {
        let (ranks, hap2rank) = parse_rank_table(RANKS).unwrap();

        assert_eq!(ranks, vec!["family", "species"]);
        assert_eq!(hap2rank["Zotu1"], vec!["FamA", "SpA"]);
    }

    #[test]
    fn test_parse_rank_table_missing_column() {
        let bad = "hap\tfamily\tspecies\nZotu1\tFamA\n";
        assert!(parse_rank_table(bad).is_err());
    }

    #[test]
    fn test_reader_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haps.fa.gz");

        let file = File::create(&path).unwrap();
        let mut encoder =
            flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(FASTA.as_bytes()).unwrap();
        encoder.finish().unwrap();

        assert_eq!(reader(&path).unwrap(), FASTA);
    }

    #[test]
    fn test_load_bundle_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        for id in ["S1", "S2"] {
            let sample_dir = dir.path().join(id);
            std::fs::create_dir(&sample_dir).unwrap();
            write_sample(&sample_dir);
        }

        let bundle = load_bundle(dir.path(), &[]).unwrap();
        assert_eq!(bundle.sample_ids, vec!["S1", "S2"]);

        let all = bundle.resolve_sample_ids(&[]).unwrap();
        assert_eq!(all, vec!["S1", "S2"]);

        let some = bundle.resolve_sample_ids(&["S2".to_string()]).unwrap();
        assert_eq!(some, vec!["S2"]);

        assert!(bundle.resolve_sample_ids(&["S3".to_string()]).is_err());
        assert!(load_bundle(dir.path(), &["S3".to_string()]).is_err());
    }

    #[test]
    fn test_load_bundle_requested_subset_only() {
        let dir = tempfile::tempdir().unwrap();
        for id in ["S1", "S2", "S3"] {
            let sample_dir = dir.path().join(id);
            std::fs::create_dir(&sample_dir).unwrap();
            write_sample(&sample_dir);
        }

        let bundle = load_bundle(dir.path(), &["S2".to_string()]).unwrap();

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.sample_ids, vec!["S2"]);
        assert!(bundle.get("S1").is_none());
    }

    #[test]
    fn test_units_to_fasta_groups_by_unit() {
        let dir = tempfile::tempdir().unwrap();
        let sample_dir = dir.path().join("S1");
        std::fs::create_dir(&sample_dir).unwrap();
        write_sample(&sample_dir);

        let bundle = load_bundle(dir.path(), &[]).unwrap();
        let units =
            units_to_fasta(&bundle, "FamA", "family", "species", &bundle.sample_ids).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units["SpA"], ">SpA_S1_Zotu1\nACGTACGT\n");
        assert_eq!(units["SpB"], ">SpB_S1_Zotu2\nTTTT\n");

        // no hap carries this target name
        assert!(
            units_to_fasta(&bundle, "FamZ", "family", "species", &bundle.sample_ids).is_err()
        );
    }
}
