use anyhow::{Context, Result};
use hashbrown::HashMap;

use std::path::Path;

use config::REFERENCE_SOURCE;

pub const INDEX_HEADER: &str = "index\tseq_id\tunit\ttarget\tsource\tumap1\tumap2";

/// One row of the distance index: a re-numbered sequence joined to its
/// labels and 2-D embedding coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub index: usize,
    pub seq_id: String,
    pub unit: String,
    pub target: String,
    pub source: String,
    pub umap1: f64,
    pub umap2: f64,
}

/// unit label: seq-id prefix before the first `_`
pub fn unit_of(seq_id: &str) -> &str {
    seq_id.split('_').next().unwrap_or(seq_id)
}

/// source label: first matching tag substring, else `reference`
pub fn source_label(seq_id: &str, tags: &[String]) -> String {
    tags.iter()
        .find(|tag| seq_id.contains(tag.as_str()))
        .cloned()
        .unwrap_or_else(|| REFERENCE_SOURCE.to_string())
}

/// parse a `unit<TAB>target` map [identity for unlisted units]
pub fn parse_target_map(contents: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for line in contents.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let unit = fields
            .next()
            .ok_or_else(|| anyhow::anyhow!("ERROR: Cannot parse unit from: {}", line))?;
        let target = fields
            .next()
            .ok_or_else(|| anyhow::anyhow!("ERROR: Cannot parse target from: {}", line))?;

        map.insert(unit.to_string(), target.to_string());
    }

    Ok(map)
}

/// rewrite FASTA records with integer ids, collecting index rows
///
/// Returns the renumbered FASTA text and one record per sequence with
/// labels filled in and coordinates zeroed, in input order.
pub fn fasta_to_index(
    contents: &str,
    target_map: &HashMap<String, String>,
    source_tags: &[String],
) -> Result<(String, Vec<IndexRecord>)> {
    let haps = amp_pack::parse_fasta(contents)?;

    let mut fasta = String::new();
    let mut records = Vec::with_capacity(haps.len());

    for (i, hap) in haps.into_iter().enumerate() {
        fasta.push_str(&format!(">{}\n{}\n", i, hap.seq));

        let unit = unit_of(&hap.id).to_string();
        let target = target_map.get(&unit).cloned().unwrap_or_else(|| unit.clone());
        let source = source_label(&hap.id, source_tags);

        records.push(IndexRecord {
            index: i,
            seq_id: hap.id,
            unit,
            target,
            source,
            umap1: 0.0,
            umap2: 0.0,
        });
    }

    Ok((fasta, records))
}

/// join embedder coordinates onto the index rows by integer id
pub fn join_coords(records: &mut [IndexRecord], coords: &HashMap<usize, (f64, f64)>) -> Result<()> {
    for record in records.iter_mut() {
        let (x, y) = coords.get(&record.index).ok_or_else(|| {
            anyhow::anyhow!(
                "ERROR: No embedding coordinates for record {} [{}]",
                record.index,
                record.seq_id
            )
        })?;

        record.umap1 = *x;
        record.umap2 = *y;
    }

    Ok(())
}

/// parse an embedder coordinate table: `id<TAB>x<TAB>y` per row
pub fn parse_coords(contents: &str) -> Result<HashMap<usize, (f64, f64)>> {
    let mut coords = HashMap::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            anyhow::bail!("ERROR: Coordinate row has fewer than 3 fields: {}", line);
        }

        // header row
        if fields[0].parse::<usize>().is_err() {
            continue;
        }

        let idx = fields[0].parse::<usize>()?;
        let x = fields[1].parse::<f64>()?;
        let y = fields[2].parse::<f64>()?;

        coords.insert(idx, (x, y));
    }

    if coords.is_empty() {
        anyhow::bail!("ERROR: No coordinates found in embedder output");
    }

    Ok(coords)
}

pub fn write_index(records: &[IndexRecord], path: &Path) {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(INDEX_HEADER.to_string());

    for r in records {
        lines.push(format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.index, r.seq_id, r.unit, r.target, r.source, r.umap1, r.umap2
        ));
    }

    config::write_collection(&lines, path);
}

pub fn read_index(path: &Path) -> Result<Vec<IndexRecord>> {
    let contents = amp_pack::reader(path)?;
    let mut records = Vec::new();

    for line in contents.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            anyhow::bail!("ERROR: Index row has {} fields, expected 7", fields.len());
        }

        records.push(IndexRecord {
            index: fields[0].parse().context("ERROR: Cannot parse index")?,
            seq_id: fields[1].to_string(),
            unit: fields[2].to_string(),
            target: fields[3].to_string(),
            source: fields[4].to_string(),
            umap1: fields[5].parse().context("ERROR: Cannot parse umap1")?,
            umap2: fields[6].parse().context("ERROR: Cannot parse umap2")?,
        });
    }

    if records.is_empty() {
        anyhow::bail!("ERROR: Empty index at {:?}", path);
    }

    Ok(records)
}
