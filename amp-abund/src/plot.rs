use anyhow::Result;
use plotters::prelude::*;

use std::path::Path;

use crate::core::AbundanceTable;

// plotly qualitative Pastel palette
pub const PASTEL: [(u8, u8, u8); 11] = [
    (102, 197, 204),
    (246, 207, 113),
    (248, 156, 116),
    (220, 176, 242),
    (135, 197, 95),
    (158, 185, 243),
    (254, 136, 177),
    (201, 219, 116),
    (139, 224, 164),
    (180, 151, 231),
    (179, 179, 179),
];

pub fn palette_color(idx: usize) -> RGBColor {
    let (r, g, b) = PASTEL[idx % PASTEL.len()];
    RGBColor(r, g, b)
}

/// cumulative [low, high) spans per column per sample for stacking
pub fn stack_spans(table: &AbundanceTable) -> Vec<Vec<(f64, f64)>> {
    let mut spans = vec![Vec::with_capacity(table.samples.len()); table.columns.len()];

    for row in table.values.iter() {
        let mut cum = 0.0;
        for (ci, value) in row.iter().enumerate() {
            spans[ci].push((cum, cum + value));
            cum += value;
        }
    }

    spans
}

/// render a stacked bar chart PNG with one bar per sample
pub fn barchart_png(table: &AbundanceTable, path: &Path, width: u32, height: u32) -> Result<()> {
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw barchart: {}", e))?;

    let n = table.samples.len();
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(
            format!("Relative abundance [{}]", table.rank),
            ("sans-serif", 24),
        )
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..n as f64, 0f64..100f64)
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw barchart: {}", e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| {
            let i = (x.floor() as usize).min(n.saturating_sub(1));
            table.samples.get(i).cloned().unwrap_or_default()
        })
        .x_desc("Sample ID")
        .y_desc("Percentage (%)")
        .draw()
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw barchart: {}", e))?;

    let spans = stack_spans(table);
    for (ci, column) in table.columns.iter().enumerate() {
        let color = palette_color(ci);

        chart
            .draw_series(spans[ci].iter().enumerate().map(|(si, (lo, hi))| {
                Rectangle::new(
                    [(si as f64 + 0.1, *lo), (si as f64 + 0.9, *hi)],
                    color.filled(),
                )
            }))
            .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw barchart: {}", e))?
            .label(column)
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot draw barchart: {}", e))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("ERROR: Cannot write {}: {}", path.display(), e))?;

    Ok(())
}

/// render an interactive stacked bar chart via the plotly.js CDN
pub fn barchart_html(table: &AbundanceTable, path: &Path) -> Result<()> {
    let traces: Vec<serde_json::Value> = table
        .columns
        .iter()
        .enumerate()
        .map(|(ci, column)| {
            let (r, g, b) = PASTEL[ci % PASTEL.len()];
            serde_json::json!({
                "x": table.samples,
                "y": table.column(ci),
                "name": column,
                "type": "bar",
                "marker": { "color": format!("rgb({},{},{})", r, g, b) },
            })
        })
        .collect();

    let layout = serde_json::json!({
        "barmode": "stack",
        "xaxis": { "title": "Sample ID", "tickmode": "linear" },
        "yaxis": { "title": "Percentage (%)" },
        "legend": { "x": 1.05, "y": 1, "orientation": "h" },
    });

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Relative abundance [{rank}]</title>
    <script src="https://cdn.plot.ly/plotly-latest.min.js"></script>
</head>
<body>
    <div id="chart"></div>
    <script>
        Plotly.newPlot('chart', {traces}, {layout});
    </script>
</body>
</html>
"#,
        rank = table.rank,
        traces = serde_json::to_string(&traces)?,
        layout = serde_json::to_string(&layout)?,
    );

    std::fs::write(path, html)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AbundanceTable {
        AbundanceTable {
            rank: "species".to_string(),
            columns: vec!["SpA".to_string(), "SpB".to_string()],
            samples: vec!["S1".to_string(), "S2".to_string()],
            values: vec![vec![25.0, 75.0], vec![100.0, 0.0]],
        }
    }

    #[test]
    fn test_stack_spans_are_cumulative() {
        let spans = stack_spans(&table());

        assert_eq!(spans[0][0], (0.0, 25.0));
        assert_eq!(spans[1][0], (25.0, 100.0));
        assert_eq!(spans[0][1], (0.0, 100.0));
        assert_eq!(spans[1][1], (100.0, 100.0)); // zero-height segment
    }

    #[test]
    fn test_barchart_html_embeds_traces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.html");

        barchart_html(&table(), &path).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();

        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains("\"barmode\":\"stack\""));
        assert!(html.contains("SpB"));
    }
}
