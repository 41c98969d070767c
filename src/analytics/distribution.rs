use std::collections::HashMap;

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::data::model::Column;

/// Tukey fence multiplier for box-plot whiskers.
const WHISKER_IQR: f64 = 1.5;

// ---------------------------------------------------------------------------
// Scatter: one point per row
// ---------------------------------------------------------------------------

/// A track placed on two features, with what the chart needs for colour,
/// marker size and hover text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub genre: Option<String>,
    pub popularity: Option<i64>,
    pub track_name: Option<String>,
    pub artists: Option<String>,
}

fn numeric_column<'t>(view: &FilteredView<'t>, name: &str) -> Option<&'t Column> {
    match view.table().column(name) {
        Some(col) if col.is_numeric() => Some(col),
        _ => {
            log::warn!("Column '{name}' is not a numeric column of the dataset");
            None
        }
    }
}

/// Points for rows where both `x` and `y` are present.
pub fn scatter_points(view: &FilteredView<'_>, x: &str, y: &str) -> Vec<ScatterPoint> {
    let (Some(xc), Some(yc)) = (numeric_column(view, x), numeric_column(view, y)) else {
        return Vec::new();
    };
    let table = view.table();
    view.rows()
        .iter()
        .filter_map(|&row| {
            Some(ScatterPoint {
                row,
                x: xc.f64_at(row)?,
                y: yc.f64_at(row)?,
                genre: table.genre(row).map(str::to_string),
                popularity: table.popularity(row),
                track_name: table.track_name(row).map(str::to_string),
                artists: table.artists(row).map(str::to_string),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Box plots: five-number summary per genre
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub genre: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Smallest value inside the lower fence.
    pub lower_whisker: f64,
    /// Largest value inside the upper fence.
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Distribution of `column` per genre, genres in order of first appearance
/// in the view. Genres with no values for the column are omitted.
pub fn box_summaries(view: &FilteredView<'_>, column: &str) -> Vec<BoxSummary> {
    let Some(col) = numeric_column(view, column) else {
        return Vec::new();
    };
    let table = view.table();

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
    for &row in view.rows() {
        let (Some(genre), Some(value)) = (table.genre(row), col.f64_at(row)) else {
            continue;
        };
        groups
            .entry(genre)
            .or_insert_with(|| {
                order.push(genre);
                Vec::new()
            })
            .push(value);
    }

    order
        .into_iter()
        .filter_map(|genre| {
            let mut values = groups.remove(genre)?;
            values.sort_by(f64::total_cmp);
            Some(summarize(genre, &values))
        })
        .collect()
}

/// `sorted` must be non-empty and ascending.
fn summarize(genre: &str, sorted: &[f64]) -> BoxSummary {
    let q1 = quantile(sorted, 0.25);
    let q3 = quantile(sorted, 0.75);
    let iqr = q3 - q1;
    let (low_fence, high_fence) = (q1 - WHISKER_IQR * iqr, q3 + WHISKER_IQR * iqr);

    let inside = || sorted.iter().copied().filter(|&v| v >= low_fence && v <= high_fence);
    BoxSummary {
        genre: genre.to_string(),
        count: sorted.len(),
        min: sorted[0],
        q1,
        median: quantile(sorted, 0.5),
        q3,
        max: sorted[sorted.len() - 1],
        lower_whisker: inside().next().unwrap_or(q1),
        upper_whisker: inside().last().unwrap_or(q3),
        outliers: sorted
            .iter()
            .copied()
            .filter(|&v| v < low_fence || v > high_fence)
            .collect(),
    }
}

/// Linear-interpolation quantile of ascending data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::{table_from_csv, ten_track_table};

    #[test]
    fn test_quantiles_interpolate() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.25), 1.75);
        assert_eq!(quantile(&v, 0.5), 2.5);
        assert_eq!(quantile(&v, 0.75), 3.25);
        assert_eq!(quantile(&[7.0], 0.5), 7.0);
    }

    #[test]
    fn test_box_summary_outliers() {
        let table = table_from_csv(
            "track_genre,popularity,track_name,artists,energy\n\
             rock,1,s,x,100\nrock,1,s,x,1\njazz,1,s,x,0.5\nrock,1,s,x,2\nrock,1,s,x,3\nrock,1,s,x,4\n",
        );
        let view = FilteredView::all(&table);
        let boxes = box_summaries(&view, "energy");

        assert_eq!(boxes.len(), 2);
        let rock = &boxes[0];
        assert_eq!(rock.genre, "rock");
        assert_eq!(rock.count, 5);
        assert_eq!((rock.q1, rock.median, rock.q3), (2.0, 3.0, 4.0));
        assert_eq!(rock.upper_whisker, 4.0);
        assert_eq!(rock.lower_whisker, 1.0);
        assert_eq!(rock.outliers, vec![100.0]);
        assert_eq!(rock.max, 100.0);
        assert_eq!(boxes[1].genre, "jazz");
    }

    #[test]
    fn test_box_summaries_unknown_column() {
        let table = ten_track_table();
        let view = FilteredView::all(&table);
        assert!(box_summaries(&view, "loudness").is_empty());
        assert!(box_summaries(&view, "track_name").is_empty());
    }

    #[test]
    fn test_scatter_skips_incomplete_rows() {
        let table = table_from_csv(
            "track_genre,popularity,track_name,artists,danceability,energy\n\
             pop,50,Hit,Someone,0.8,0.7\npop,20,Miss,Nobody,,0.1\nrock,70,Riff,Band,0.3,0.9\n",
        );
        let view = FilteredView::all(&table);
        let points = scatter_points(&view, "danceability", "energy");
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].row, 2);
        assert_eq!(points[1].genre.as_deref(), Some("rock"));
        assert_eq!(points[0].popularity, Some(50));
        assert_eq!(points[0].track_name.as_deref(), Some("Hit"));
        assert_eq!(points[0].artists.as_deref(), Some("Someone"));
    }

    #[test]
    fn test_scatter_unknown_axis() {
        let table = ten_track_table();
        let view = FilteredView::all(&table);
        assert!(scatter_points(&view, "danceability", "nope").is_empty());
    }
}
