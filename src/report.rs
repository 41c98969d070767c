use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde_json::{json, Map, Value as JsonValue};

use crate::analytics::{BoxSummary, CorrelationMatrix, GenreAggregateTable, ProjectionResult};
use crate::data::model::{ColumnData, TrackTable};
use crate::session::{BoxPanel, Session, Snapshot};

// ---------------------------------------------------------------------------
// Arrow batches for each tabular panel
// ---------------------------------------------------------------------------

pub fn aggregate_batch(table: &GenreAggregateTable) -> Result<RecordBatch, ArrowError> {
    let mut columns: Vec<(String, ArrayRef)> = vec![
        (
            "track_genre".to_string(),
            Arc::new(StringArray::from_iter_values(table.rows.iter().map(|r| r.genre.as_str()))),
        ),
        (
            "tracks".to_string(),
            Arc::new(UInt64Array::from_iter_values(table.rows.iter().map(|r| r.count as u64))),
        ),
    ];
    for (k, name) in table.columns.iter().enumerate() {
        let means: Float64Array = table.rows.iter().map(|r| r.means[k]).collect();
        columns.push((format!("mean_{name}"), Arc::new(means)));
    }
    RecordBatch::try_from_iter(columns)
}

pub fn correlation_batch(matrix: &CorrelationMatrix) -> Result<RecordBatch, ArrowError> {
    let mut columns: Vec<(String, ArrayRef)> = vec![(
        "feature".to_string(),
        Arc::new(StringArray::from_iter_values(matrix.columns.iter())),
    )];
    for (j, name) in matrix.columns.iter().enumerate() {
        let values: Float64Array = matrix.values.iter().map(|row| row[j]).collect();
        columns.push((name.clone(), Arc::new(values)));
    }
    RecordBatch::try_from_iter(columns)
}

pub fn loadings_batch(projection: &ProjectionResult) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_from_iter([
        (
            "feature",
            Arc::new(StringArray::from_iter_values(projection.columns.iter())) as ArrayRef,
        ),
        ("pc1", Arc::new(Float64Array::from(projection.loadings[0].clone())) as ArrayRef),
        ("pc2", Arc::new(Float64Array::from(projection.loadings[1].clone())) as ArrayRef),
    ])
}

pub fn box_batch(panel: &BoxPanel) -> Result<RecordBatch, ArrowError> {
    let stat = |f: fn(&BoxSummary) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(panel.boxes.iter().map(f)))
    };
    RecordBatch::try_from_iter([
        (
            "track_genre",
            Arc::new(StringArray::from_iter_values(panel.boxes.iter().map(|b| b.genre.as_str())))
                as ArrayRef,
        ),
        (
            "tracks",
            Arc::new(UInt64Array::from_iter_values(panel.boxes.iter().map(|b| b.count as u64)))
                as ArrayRef,
        ),
        ("min", stat(|b| b.min)),
        ("q1", stat(|b| b.q1)),
        ("median", stat(|b| b.median)),
        ("q3", stat(|b| b.q3)),
        ("max", stat(|b| b.max)),
        (
            "outliers",
            Arc::new(UInt64Array::from_iter_values(
                panel.boxes.iter().map(|b| b.outliers.len() as u64),
            )) as ArrayRef,
        ),
    ])
}

/// The first `limit` of `rows`, every column of the table.
pub fn preview_batch(table: &TrackTable, rows: &[usize], limit: usize) -> Result<RecordBatch, ArrowError> {
    let rows = &rows[..rows.len().min(limit)];
    let columns = table.columns().iter().map(|col| {
        let array: ArrayRef = match &col.data {
            ColumnData::Integer(v) => Arc::new(rows.iter().map(|&r| v[r]).collect::<Int64Array>()),
            ColumnData::Float(v) => Arc::new(rows.iter().map(|&r| v[r]).collect::<Float64Array>()),
            ColumnData::Bool(v) => Arc::new(rows.iter().map(|&r| v[r]).collect::<BooleanArray>()),
            ColumnData::Text(v) => {
                Arc::new(rows.iter().map(|&r| v[r].as_deref()).collect::<StringArray>())
            }
        };
        (col.name.as_str(), array)
    });
    RecordBatch::try_from_iter(columns)
}

// ---------------------------------------------------------------------------
// Text / JSON rendering
// ---------------------------------------------------------------------------

fn pretty(batch: Result<RecordBatch, ArrowError>, what: &str) -> Result<String> {
    let batch = batch.with_context(|| format!("building {what} table"))?;
    let formatted = pretty_format_batches(&[batch]).with_context(|| format!("formatting {what} table"))?;
    Ok(formatted.to_string())
}

/// Render every panel of `snapshot` as plain-text tables.
pub fn render_text(session: &Session, snapshot: &Snapshot, preview_rows: usize) -> Result<String> {
    let controls = session.controls();
    let (lo, hi) = controls.selection.popularity;
    let genres: Vec<&str> = controls.selection.genres.iter().map(String::as_str).collect();

    let mut out = String::new();
    writeln!(out, "Tracks: {}", snapshot.total_rows)?;
    writeln!(out, "Genres: [{}]  Popularity: {lo}..={hi}", genres.join(", "))?;
    writeln!(out, "Filtered tracks: {}", snapshot.filtered_rows)?;

    if let Some(rows) = &snapshot.table_rows {
        writeln!(out, "\nFiltered data (first {} of {})", rows.len().min(preview_rows), rows.len())?;
        writeln!(out, "{}", pretty(preview_batch(session.table(), rows, preview_rows), "preview")?)?;
    }

    writeln!(out, "\nScatter: {} points", snapshot.scatter.len())?;

    for panel in &snapshot.box_plots {
        writeln!(out, "\nDistribution of {}", panel.column)?;
        writeln!(out, "{}", pretty(box_batch(panel), "box plot")?)?;
    }

    writeln!(out, "\nCorrelation ({})", controls.correlation_method)?;
    match &snapshot.correlation {
        Ok(matrix) => writeln!(out, "{}", pretty(correlation_batch(matrix), "correlation")?)?,
        Err(reason) => writeln!(out, "  {reason}")?,
    }

    writeln!(out, "\nPrincipal components")?;
    match &snapshot.projection {
        Ok(projection) => {
            let [pc1, pc2] = projection.explained_variance;
            writeln!(
                out,
                "  {} tracks projected; PC1 explains {pc1:.1}%, PC2 explains {pc2:.1}%",
                projection.rows.len()
            )?;
            writeln!(out, "{}", pretty(loadings_batch(projection), "loadings")?)?;
        }
        Err(reason) => writeln!(out, "  {reason}")?,
    }

    writeln!(out, "\nMean {} by genre", controls.bar_feature)?;
    writeln!(out, "{}", pretty(aggregate_batch(&snapshot.bar_chart), "bar chart")?)?;

    writeln!(out, "\nGenre averages")?;
    writeln!(out, "{}", pretty(aggregate_batch(&snapshot.aggregates), "aggregate")?)?;

    Ok(out)
}

/// Render controls, panels and the table preview as one JSON document.
pub fn render_json(session: &Session, snapshot: &Snapshot, preview_rows: usize) -> Result<String> {
    let table = session.table();
    let names: Vec<&str> = table.column_names().collect();
    let preview: Vec<JsonValue> = snapshot
        .table_rows
        .iter()
        .flatten()
        .take(preview_rows)
        .map(|&row| -> Result<JsonValue, serde_json::Error> {
            let record: Map<String, JsonValue> = names
                .iter()
                .zip(table.row(row))
                .map(|(name, cell)| serde_json::to_value(cell).map(|v| (name.to_string(), v)))
                .collect::<Result<_, serde_json::Error>>()?;
            Ok(JsonValue::Object(record))
        })
        .collect::<Result<_, serde_json::Error>>()
        .context("serializing table preview")?;

    let document = json!({
        "controls": session.controls(),
        "snapshot": snapshot,
        "preview": preview,
    });
    serde_json::to_string_pretty(&document).context("serializing snapshot")
}
