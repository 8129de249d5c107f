use anyhow::Result;

use std::path::Path;

use config::{align_fasta, run_tool, USEARCH};

/// usearch argv for the tabbed pairwise distance list
pub fn distmx_args(
    aln_file: &Path,
    dist_file: &Path,
    maxdist: f64,
    termdist: f64,
    threads: usize,
) -> Vec<String> {
    vec![
        "-calc_distmx".to_string(),
        aln_file.display().to_string(),
        "-tabbedout".to_string(),
        dist_file.display().to_string(),
        "-maxdist".to_string(),
        maxdist.to_string(),
        "-termdist".to_string(),
        termdist.to_string(),
        "-threads".to_string(),
        threads.to_string(),
    ]
}

/// align a FASTA file and derive its pairwise distance list
pub fn calc_dist(
    seq_file: &Path,
    aln_file: &Path,
    dist_file: &Path,
    maxdist: f64,
    termdist: f64,
    threads: usize,
) -> Result<()> {
    align_fasta(seq_file, aln_file)?;

    run_tool(
        USEARCH,
        &distmx_args(aln_file, dist_file, maxdist, termdist, threads),
    )?;

    Ok(())
}

/// A dense symmetric pairwise matrix assembled from a sparse tabbed
/// distance list.
///
/// Stored as similarity [1 - distance] with a unit diagonal so that
/// pairs absent from the list fall back to distance 1. Symmetry holds
/// by construction: every off-diagonal entry is mirrored on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct DistMatrix {
    n: usize,
    sim: Vec<f32>,
}

impl DistMatrix {
    /// mirror an upper-triangular `i<TAB>j<TAB>dist` list into a dense
    /// symmetric matrix
    pub fn from_tabbed(contents: &str) -> Result<Self> {
        let mut entries: Vec<(usize, usize, f32)> = Vec::new();
        let mut n = 0usize;

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                anyhow::bail!("ERROR: Distance row has fewer than 3 fields: {}", line);
            }

            let i = fields[0].parse::<usize>()?;
            let j = fields[1].parse::<usize>()?;
            let d = fields[2].parse::<f32>()?;

            n = n.max(i + 1).max(j + 1);
            entries.push((i, j, d));
        }

        if n == 0 {
            anyhow::bail!("ERROR: Empty distance list");
        }

        let mut sim = vec![0.0f32; n * n];
        for k in 0..n {
            sim[k * n + k] = 1.0;
        }

        for (i, j, d) in entries {
            sim[i * n + j] = 1.0 - d;
            sim[j * n + i] = 1.0 - d;
        }

        log::info!("Created sparse {} x {} distance matrix...", n, n);

        Ok(DistMatrix { n, sim })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn similarity(&self, i: usize, j: usize) -> f32 {
        self.sim[i * self.n + j]
    }

    pub fn distance(&self, i: usize, j: usize) -> f32 {
        1.0 - self.similarity(i, j)
    }

    pub fn is_symmetric(&self) -> bool {
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if self.sim[i * self.n + j] != self.sim[j * self.n + i] {
                    return false;
                }
            }
        }

        true
    }

    /// dense distance rows for the matrix artifact
    pub fn to_tsv(&self) -> Vec<String> {
        (0..self.n)
            .map(|i| {
                let cells: Vec<String> = (0..self.n)
                    .map(|j| format!("{}", self.distance(i, j)))
                    .collect();
                cells.join("\t")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const TABBED: &str = "0\t0\t0.0\n0\t1\t0.25\n1\t1\t0.0\n2\t2\t0.0\n1\t2\t0.5\n";

    #[test]
    fn test_matrix_equals_its_transpose() {
        let m = DistMatrix::from_tabbed(TABBED).unwrap();

        assert_eq!(m.len(), 3);
        assert!(m.is_symmetric());
        for i in 0..m.len() {
            for j in 0..m.len() {
                assert_eq!(m.distance(i, j), m.distance(j, i));
            }
        }
    }

    #[test]
    fn test_matrix_diagonal_and_defaults() {
        let m = DistMatrix::from_tabbed(TABBED).unwrap();

        for i in 0..m.len() {
            assert_eq!(m.distance(i, i), 0.0);
        }

        // (0, 2) never listed: maximally distant
        assert_eq!(m.distance(0, 2), 1.0);
        assert_eq!(m.distance(0, 1), 0.25);
    }

    #[test]
    fn test_matrix_rejects_malformed() {
        assert!(DistMatrix::from_tabbed("").is_err());
        assert!(DistMatrix::from_tabbed("0\t1\n").is_err());
        assert!(DistMatrix::from_tabbed("a\tb\tc\n").is_err());
    }

    #[test]
    fn test_matrix_tsv_shape() {
        let m = DistMatrix::from_tabbed("0\t1\t0.5\n").unwrap();
        let rows = m.to_tsv();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], "0\t0.5");
        assert_eq!(rows[1], "0.5\t0");
    }

    #[test]
    fn test_distmx_args_shape() {
        let aln = PathBuf::from("in.aln");
        let dist = PathBuf::from("dist.txt");

        let usearch = distmx_args(&aln, &dist, 1.0, 1.0, 12);
        assert_eq!(
            usearch,
            vec![
                "-calc_distmx",
                "in.aln",
                "-tabbedout",
                "dist.txt",
                "-maxdist",
                "1",
                "-termdist",
                "1",
                "-threads",
                "12"
            ]
        );
    }
}
