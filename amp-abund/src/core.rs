use anyhow::Result;
use hashbrown::HashMap;
use log::info;
use rayon::prelude::*;

use amp_pack::{load_bundle, Sample};
use config::{create_dir, write_collection, ArgCheck};

use crate::cli::Args;
use crate::plot;

/// A per-sample percentage matrix over the union of rank names.
///
/// `values` is row-major: one row per sample, aligned to `columns`;
/// ranks absent from a sample contribute 0.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceTable {
    pub rank: String,
    pub columns: Vec<String>,
    pub samples: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl AbundanceTable {
    /// one column of the matrix, in sample order
    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.values.iter().map(|row| row[idx]).collect()
    }

    pub fn to_tsv(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.samples.len() + 1);
        lines.push(format!("sample\t{}", self.columns.join("\t")));

        for (sample, row) in self.samples.iter().zip(self.values.iter()) {
            let cells: Vec<String> = row.iter().map(|v| format!("{:.4}", v)).collect();
            lines.push(format!("{}\t{}", sample, cells.join("\t")));
        }

        lines
    }
}

/// sum haplotype sizes per rank name for one sample
pub fn rank_abundance(sample: &Sample, rank: &str) -> Result<HashMap<String, u64>> {
    if sample.rank_index(rank).is_none() {
        anyhow::bail!("ERROR: Sample {} has no rank {}", sample.id, rank);
    }

    let mut abundance: HashMap<String, u64> = HashMap::new();
    for hap in sample.hap2rank.keys() {
        let name = sample
            .rank_name(hap, rank)
            .ok_or_else(|| anyhow::anyhow!("ERROR: No {} name for {}", rank, hap))?;
        let size = sample
            .hap_size(hap)
            .ok_or_else(|| anyhow::anyhow!("ERROR: No size for {}", hap))?;

        *abundance.entry(name.to_string()).or_insert(0) += size;
    }

    Ok(abundance)
}

/// scale counts to percentages; an empty map stays empty
pub fn normalize_abundance(abundance: &HashMap<String, u64>) -> HashMap<String, f64> {
    let total: u64 = abundance.values().sum();
    if total == 0 {
        return HashMap::new();
    }

    abundance
        .iter()
        .map(|(name, size)| (name.clone(), *size as f64 / total as f64 * 100.0))
        .collect()
}

/// sorted, duplicate-free union of rank-name lists
pub fn rank_union(lists: &[Vec<String>]) -> Vec<String> {
    let mut union: Vec<String> = lists
        .iter()
        .flatten()
        .cloned()
        .collect::<hashbrown::HashSet<String>>()
        .into_iter()
        .collect();
    union.sort();

    union
}

/// assemble the percentage matrix for the given samples at `rank`
pub fn build_table(
    bundle: &amp_pack::SampleBundle,
    rank: &str,
    sample_ids: &[String],
) -> Result<AbundanceTable> {
    let normalized: Vec<(String, HashMap<String, f64>)> = sample_ids
        .par_iter()
        .map(|id| {
            let sample = bundle
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("ERROR: Sample {} not in bundle", id))?;
            let abundance = rank_abundance(sample, rank)?;

            Ok((id.clone(), normalize_abundance(&abundance)))
        })
        .collect::<Result<Vec<_>>>()?;

    let all_names: Vec<Vec<String>> = normalized
        .iter()
        .map(|(_, map)| map.keys().cloned().collect())
        .collect();
    let columns = rank_union(&all_names);

    let values: Vec<Vec<f64>> = normalized
        .iter()
        .map(|(_, map)| {
            columns
                .iter()
                .map(|name| map.get(name).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    Ok(AbundanceTable {
        rank: rank.to_string(),
        columns,
        samples: sample_ids.to_vec(),
        values,
    })
}

/// driver: abundance table + stacked bar charts for one rank
pub fn relative_abundance(args: Args) -> Result<()> {
    info!("Plotting barchart for {}...", args.rank);
    args.check()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let bundle = load_bundle(&args.samples, &args.sample_ids)?;
    let sample_ids = bundle.resolve_sample_ids(&args.sample_ids)?;
    let table = build_table(&bundle, &args.rank, &sample_ids)?;

    create_dir(&args.outdir)?;

    let name = args.chart_name();
    let tsv_path = args.outdir.join(format!("{}.tsv", name));
    let png_path = args.outdir.join(format!("{}.png", name));
    let html_path = args.outdir.join(format!("{}.html", name));

    write_collection(&table.to_tsv(), &tsv_path);

    plot::barchart_png(&table, &png_path, args.width, args.height)?;
    info!("Barchart saved to: {}", png_path.display());

    plot::barchart_html(&table, &html_path)?;
    info!("Barchart saved to: {}", html_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use amp_pack::{Haplotype, SampleBundle};

    fn sample(id: &str, haps: &[(&str, u64, &str)]) -> Sample {
        let mut hapmap = HashMap::new();
        let mut hap2rank = HashMap::new();

        for (hap, size, species) in haps {
            hapmap.insert(
                hap.to_string(),
                Haplotype {
                    id: hap.to_string(),
                    size: *size,
                    seq: "ACGT".to_string(),
                },
            );
            hap2rank.insert(hap.to_string(), vec![species.to_string()]);
        }

        Sample {
            id: id.to_string(),
            haps: hapmap,
            ranks: vec!["species".to_string()],
            hap2rank,
        }
    }

    #[test]
    fn test_rank_abundance_sums_sizes() {
        let s = sample("S1", &[("Z1", 3, "SpA"), ("Z2", 4, "SpB"), ("Z3", 5, "SpA")]);
        let abundance = rank_abundance(&s, "species").unwrap();

        assert_eq!(abundance["SpA"], 8);
        assert_eq!(abundance["SpB"], 4);
        assert!(rank_abundance(&s, "genus").is_err());
    }

    #[test]
    fn test_normalize_sums_to_hundred() {
        let s = sample("S1", &[("Z1", 3, "SpA"), ("Z2", 4, "SpB"), ("Z3", 5, "SpC")]);
        let norm = normalize_abundance(&rank_abundance(&s, "species").unwrap());

        let total: f64 = norm.values().sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!((norm["SpB"] - 4.0 / 12.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_empty_stays_empty() {
        let empty: HashMap<String, u64> = HashMap::new();
        assert!(normalize_abundance(&empty).is_empty());
    }

    #[test]
    fn test_rank_union_sorted_dedup_superset() {
        let lists = vec![
            vec!["SpB".to_string(), "SpA".to_string()],
            vec!["SpB".to_string(), "SpC".to_string()],
        ];
        let union = rank_union(&lists);

        assert_eq!(union, vec!["SpA", "SpB", "SpC"]);
        for list in &lists {
            for name in list {
                assert!(union.contains(name));
            }
        }
    }

    #[test]
    fn test_build_table_zero_fills_missing_ranks() {
        let bundle = SampleBundle::new(vec![
            sample("S1", &[("Z1", 1, "SpA")]),
            sample("S2", &[("Z1", 1, "SpB")]),
        ]);
        let ids = bundle.sample_ids.clone();
        let table = build_table(&bundle, "species", &ids).unwrap();

        assert_eq!(table.columns, vec!["SpA", "SpB"]);
        assert_eq!(table.values[0], vec![100.0, 0.0]);
        assert_eq!(table.values[1], vec![0.0, 100.0]);

        for row in &table.values {
            let total: f64 = row.iter().sum();
            assert!((total - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_table_tsv_shape() {
        let bundle = SampleBundle::new(vec![sample("S1", &[("Z1", 1, "SpA")])]);
        let ids = bundle.sample_ids.clone();
        let table = build_table(&bundle, "species", &ids).unwrap();

        let lines = table.to_tsv();
        assert_eq!(lines[0], "sample\tSpA");
        assert_eq!(lines[1], "S1\t100.0000");
    }
}
