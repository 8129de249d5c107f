use anyhow::Result;
use log::info;
use plotters::prelude::*;

use std::path::Path;

use config::{create_dir, validate, UMAP_PNG};

use crate::cli::{FacetArgs, PlotArgs};
use crate::index::{read_index, IndexRecord};

/// drop records whose unit has fewer than `min_count` members
pub fn filter_small_units(records: &[IndexRecord], min_count: usize) -> Vec<IndexRecord> {
    let mut counts: hashbrown::HashMap<&str, usize> = hashbrown::HashMap::new();
    for r in records {
        *counts.entry(r.unit.as_str()).or_insert(0) += 1;
    }

    records
        .iter()
        .filter(|r| counts[r.unit.as_str()] >= min_count)
        .cloned()
        .collect()
}

/// coordinate bounds with a 5% margin
pub fn bounds(records: &[IndexRecord]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for r in records {
        x_min = x_min.min(r.umap1);
        x_max = x_max.max(r.umap1);
        y_min = y_min.min(r.umap2);
        y_max = y_max.max(r.umap2);
    }

    let x_pad = ((x_max - x_min) * 0.05).max(0.5);
    let y_pad = ((y_max - y_min) * 0.05).max(0.5);

    (x_min - x_pad, x_max + x_pad, y_min - y_pad, y_max + y_pad)
}

fn column_value<'a>(record: &'a IndexRecord, column: &str) -> Result<&'a str> {
    match column {
        "unit" => Ok(&record.unit),
        "target" => Ok(&record.target),
        "source" => Ok(&record.source),
        _ => anyhow::bail!(
            "ERROR: Unknown index column {} [unit, target or source]",
            column
        ),
    }
}

fn sorted_distinct<'a>(
    records: &'a [IndexRecord],
    get: impl Fn(&'a IndexRecord) -> &'a str,
) -> Vec<&'a str> {
    let mut values: Vec<&str> = records
        .iter()
        .map(get)
        .collect::<hashbrown::HashSet<&str>>()
        .into_iter()
        .collect();
    values.sort();

    values
}

/// scatter of embedding coordinates, colored by unit, marker by source
pub fn scatter(
    records: &[IndexRecord],
    path: &Path,
    width: u32,
    height: u32,
    title: &str,
) -> Result<()> {
    if records.is_empty() {
        anyhow::bail!("ERROR: Nothing to plot for {}", title);
    }

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw scatter: {}", e))?;

    let (x_min, x_max, y_min, y_max) = bounds(records);
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, ("sans-serif", 24))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw scatter: {}", e))?;

    chart
        .configure_mesh()
        .x_desc("umap1")
        .y_desc("umap2")
        .draw()
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw scatter: {}", e))?;

    let units = sorted_distinct(records, |r| r.unit.as_str());
    let sources = sorted_distinct(records, |r| r.source.as_str());

    for (ui, unit) in units.iter().enumerate() {
        let color = Palette99::pick(ui).mix(0.9);

        for (si, source) in sources.iter().enumerate() {
            let points: Vec<(f64, f64)> = records
                .iter()
                .filter(|r| r.unit == *unit && r.source == *source)
                .map(|r| (r.umap1, r.umap2))
                .collect();

            if points.is_empty() {
                continue;
            }

            let series = match si % 3 {
                0 => chart.draw_series(
                    points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
                ),
                1 => chart.draw_series(
                    points
                        .iter()
                        .map(|&(x, y)| TriangleMarker::new((x, y), 4, color.filled())),
                ),
                _ => chart.draw_series(
                    points
                        .iter()
                        .map(|&(x, y)| Cross::new((x, y), 3, color.stroke_width(1))),
                ),
            };

            let series =
                series.map_err(|e| anyhow::anyhow!("ERROR: Cannot draw scatter: {}", e))?;

            // one legend entry per unit
            if si == 0 {
                let legend_color = color.clone();
                series.label(*unit).legend(move |(x, y)| {
                    Circle::new((x + 5, y), 3, legend_color.filled())
                });
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw scatter: {}", e))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot write {}: {}", path.display(), e))?;

    Ok(())
}

/// driver: one scatter PNG from an index TSV
pub fn plot_umap(args: PlotArgs) -> Result<()> {
    validate(&args.index, &[".tsv"]).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let records = read_index(&args.index)?;
    let kept = filter_small_units(&records, args.min_unit_count);

    info!(
        "Drawing PNG with {} of {} records...",
        kept.len(),
        records.len()
    );

    create_dir(&args.outdir)?;
    let png_path = args.outdir.join(UMAP_PNG);
    scatter(&kept, &png_path, args.width, args.height, "UMAP embedding")?;
    info!("Saved PNG to: {}", png_path.display());

    Ok(())
}

/// driver: one scatter PNG per distinct value of an index column
pub fn plot_facets(args: FacetArgs) -> Result<()> {
    validate(&args.index, &[".tsv"]).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let records = read_index(&args.index)?;

    // fail early on a bad column name
    column_value(&records[0], &args.column)?;

    create_dir(&args.outdir)?;

    let values: Vec<String> = sorted_distinct(&records, |r| {
        column_value(r, &args.column).expect("column checked above")
    })
    .into_iter()
    .map(|v| v.to_string())
    .collect();

    for value in values {
        info!("{}", value);

        let subset: Vec<IndexRecord> = records
            .iter()
            .filter(|r| column_value(r, &args.column).unwrap_or_default() == value)
            .cloned()
            .collect();

        let png_path = args.outdir.join(format!("{}.png", value));
        scatter(&subset, &png_path, args.width, args.height, &value)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(idx: usize, unit: &str, source: &str, x: f64, y: f64) -> IndexRecord {
        IndexRecord {
            index: idx,
            seq_id: format!("{}_S1_Zotu{}", unit, idx),
            unit: unit.to_string(),
            target: unit.to_string(),
            source: source.to_string(),
            umap1: x,
            umap2: y,
        }
    }

    #[test]
    fn test_filter_small_units() {
        let records = vec![
            record(0, "SpA", "reference", 0.0, 0.0),
            record(1, "SpA", "reference", 1.0, 1.0),
            record(2, "SpB", "reference", 2.0, 2.0),
        ];

        let kept = filter_small_units(&records, 2);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.unit == "SpA"));

        // threshold 1 keeps everything
        assert_eq!(filter_small_units(&records, 1).len(), 3);
    }

    #[test]
    fn test_bounds_pad() {
        let records = vec![
            record(0, "SpA", "reference", 0.0, -10.0),
            record(1, "SpA", "reference", 10.0, 10.0),
        ];

        let (x_min, x_max, y_min, y_max) = bounds(&records);
        assert!(x_min < 0.0 && x_max > 10.0);
        assert!(y_min < -10.0 && y_max > 10.0);
    }

    #[test]
    fn test_plot_rejects_non_tsv_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.txt");
        std::fs::write(&path, "index\tseq_id\n").unwrap();

        let args = crate::cli::PlotArgs {
            index: path,
            outdir: dir.path().join("out"),
            min_unit_count: 1,
            width: 100,
            height: 100,
        };

        assert!(plot_umap(args).is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_column_value_rejects_unknown() {
        let r = record(0, "SpA", "reference", 0.0, 0.0);

        assert_eq!(column_value(&r, "unit").unwrap(), "SpA");
        assert_eq!(column_value(&r, "source").unwrap(), "reference");
        assert!(column_value(&r, "family").is_err());
    }
}
