use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use super::resolve_columns;
use crate::data::filter::FilteredView;
use crate::data::model::POPULARITY_COLUMN;

/// Per-genre means, one entry per aggregated column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreAggregate {
    pub genre: String,
    /// Rows of this genre in the view.
    pub count: usize,
    /// `None` when the genre has no non-missing value for the column.
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GenreAggregateTable {
    pub columns: Vec<String>,
    pub rows: Vec<GenreAggregate>,
}

impl GenreAggregateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn mean(&self, genre: &str, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.genre == genre)
            .and_then(|r| r.means[idx])
    }

    /// Reorder rows by descending mean of `column`, undefined means last.
    /// The sort is stable; an unknown column leaves the order unchanged.
    pub fn sorted_by(mut self, column: &str) -> Self {
        if let Some(idx) = self.column_index(column) {
            self.rows
                .sort_by(|a, b| descending_nones_last(a.means[idx], b.means[idx]));
        }
        self
    }
}

fn descending_nones_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

struct GroupAccumulator {
    count: usize,
    sums: Vec<f64>,
    present: Vec<usize>,
}

/// Mean of each usable column per genre, over non-missing values only.
///
/// Rows are ordered by descending mean popularity when popularity is one of
/// the aggregated columns, otherwise by ascending genre. Rows without a
/// genre are not grouped.
pub fn aggregate_by_genre(view: &FilteredView<'_>, columns: &[String]) -> GenreAggregateTable {
    let cols = resolve_columns(view, columns);
    let table = view.table();

    let mut groups: BTreeMap<&str, GroupAccumulator> = BTreeMap::new();
    for &row in view.rows() {
        let Some(genre) = table.genre(row) else {
            continue;
        };
        let acc = groups.entry(genre).or_insert_with(|| GroupAccumulator {
            count: 0,
            sums: vec![0.0; cols.len()],
            present: vec![0; cols.len()],
        });
        acc.count += 1;
        for (k, col) in cols.iter().enumerate() {
            if let Some(v) = col.f64_at(row) {
                acc.sums[k] += v;
                acc.present[k] += 1;
            }
        }
    }

    let rows = groups
        .into_iter()
        .map(|(genre, acc)| GenreAggregate {
            genre: genre.to_string(),
            count: acc.count,
            means: acc
                .sums
                .iter()
                .zip(&acc.present)
                .map(|(&sum, &n)| (n > 0).then(|| sum / n as f64))
                .collect(),
        })
        .collect();

    let aggregated = GenreAggregateTable {
        columns: cols.iter().map(|c| c.name.clone()).collect(),
        rows,
    };
    if aggregated.column_index(POPULARITY_COLUMN).is_some() {
        aggregated.sorted_by(POPULARITY_COLUMN)
    } else {
        aggregated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, FilterSelection};
    use crate::data::testing::{table_from_csv, ten_track_table};

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn two_genre_table() -> crate::data::model::TrackTable {
        table_from_csv(
            "track_genre,popularity,track_name,artists,energy,liveness\n\
             metal,90,s,x,0.9,\n\
             ambient,10,s,x,0.1,0.3\n\
             metal,80,s,x,,\n\
             ambient,20,s,x,0.3,0.5\n\
             metal,70,s,x,0.7,\n",
        )
    }

    #[test]
    fn test_means_over_non_missing_values() {
        let table = two_genre_table();
        let view = FilteredView::all(&table);
        let agg = aggregate_by_genre(&view, &cols(&["energy", "liveness"]));

        assert_eq!(agg.len(), 2);
        assert!((agg.mean("metal", "energy").unwrap() - 0.8).abs() < 1e-12);
        assert!((agg.mean("ambient", "liveness").unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(agg.mean("metal", "liveness"), None);
        assert_eq!(agg.rows.iter().map(|r| r.count).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_order_by_genre_without_popularity() {
        let table = two_genre_table();
        let view = FilteredView::all(&table);
        let agg = aggregate_by_genre(&view, &cols(&["energy"]));
        let genres: Vec<&str> = agg.rows.iter().map(|r| r.genre.as_str()).collect();
        assert_eq!(genres, vec!["ambient", "metal"]);
    }

    #[test]
    fn test_order_by_popularity_descending() {
        let table = two_genre_table();
        let view = FilteredView::all(&table);
        let agg = aggregate_by_genre(&view, &cols(&["energy", "popularity"]));
        let genres: Vec<&str> = agg.rows.iter().map(|r| r.genre.as_str()).collect();
        assert_eq!(genres, vec!["metal", "ambient"]);
        assert_eq!(agg.mean("metal", "popularity"), Some(80.0));
    }

    #[test]
    fn test_sorted_by_puts_undefined_last() {
        let table = two_genre_table();
        let view = FilteredView::all(&table);
        let agg = aggregate_by_genre(&view, &cols(&["liveness"])).sorted_by("liveness");
        assert_eq!(agg.rows[0].genre, "ambient");
        assert_eq!(agg.rows[1].means[0], None);

        let unchanged = aggregate_by_genre(&view, &cols(&["liveness"])).sorted_by("tempo");
        assert_eq!(unchanged.rows[0].genre, "ambient");
    }

    #[test]
    fn test_one_row_per_genre_in_view() {
        let table = ten_track_table();
        let view = filter(&table, &FilterSelection::new(["pop", "rock"], (0, 100)));
        let agg = aggregate_by_genre(&view, &cols(&["danceability", "popularity"]));
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.rows[0].genre, "pop");
        assert!((agg.mean("rock", "popularity").unwrap() - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_view_gives_empty_table() {
        let table = ten_track_table();
        let view = filter(&table, &FilterSelection::new(Vec::<String>::new(), (0, 100)));
        let agg = aggregate_by_genre(&view, &cols(&["energy"]));
        assert!(agg.is_empty());
        assert_eq!(agg.columns, vec!["energy".to_string()]);
    }
}
