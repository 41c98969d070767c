use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

/// Genre label column.
pub const GENRE_COLUMN: &str = "track_genre";
/// Integer popularity score column.
pub const POPULARITY_COLUMN: &str = "popularity";
pub const TRACK_NAME_COLUMN: &str = "track_name";
pub const ARTISTS_COLUMN: &str = "artists";

/// Columns every downstream panel depends on.
pub const REQUIRED_COLUMNS: &[&str] = &[
    GENRE_COLUMN,
    POPULARITY_COLUMN,
    TRACK_NAME_COLUMN,
    ARTISTS_COLUMN,
];

/// Columns always kept as text, even when every value happens to parse as a number.
pub const TEXT_COLUMNS: &[&str] = &[
    GENRE_COLUMN,
    TRACK_NAME_COLUMN,
    ARTISTS_COLUMN,
    "album_name",
    "track_id",
];

/// Numeric audio-feature columns of the tracks dataset.
pub const FEATURE_COLUMNS: &[&str] = &[
    "danceability",
    "energy",
    "valence",
    "acousticness",
    "instrumentalness",
    "liveness",
    "speechiness",
    "tempo",
    "loudness",
    "duration_ms",
];

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, as produced by per-column type inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Column – one typed column, missing values as `None`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer and float columns take part in numeric analytics.
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Integer(_) | ColumnData::Float(_))
    }

    /// Numeric value at `row`; `None` for missing cells and non-numeric columns.
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Integer(v) => v.get(row).copied().flatten().map(|i| i as f64),
            ColumnData::Float(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    pub fn i64_at(&self, row: usize) -> Option<i64> {
        match &self.data {
            ColumnData::Integer(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    pub fn text_at(&self, row: usize) -> Option<&str> {
        match &self.data {
            ColumnData::Text(v) => v.get(row).and_then(|s| s.as_deref()),
            _ => None,
        }
    }

    pub fn cell(&self, row: usize) -> CellValue {
        let value = match &self.data {
            ColumnData::Integer(v) => v.get(row).copied().flatten().map(CellValue::Integer),
            ColumnData::Float(v) => v.get(row).copied().flatten().map(CellValue::Float),
            ColumnData::Bool(v) => v.get(row).copied().flatten().map(CellValue::Bool),
            ColumnData::Text(v) => v
                .get(row)
                .and_then(|s| s.clone())
                .map(CellValue::Text),
        };
        value.unwrap_or(CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// TrackTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The loaded tracks dataset. Columnar, immutable after construction.
#[derive(Debug, Clone)]
pub struct TrackTable {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
    n_rows: usize,
    /// Sorted distinct genres.
    genres: Vec<String>,
    popularity_bounds: Option<(i64, i64)>,
}

impl TrackTable {
    /// Build the table and its indices. Callers guarantee equal column
    /// lengths, unique names and the presence of the required columns.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let by_name: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        let mut table = TrackTable {
            columns,
            by_name,
            n_rows,
            genres: Vec::new(),
            popularity_bounds: None,
        };

        let genres: BTreeSet<String> = (0..n_rows)
            .filter_map(|row| table.genre(row).map(str::to_string))
            .collect();
        table.genres = genres.into_iter().collect();

        table.popularity_bounds = (0..n_rows)
            .filter_map(|row| table.popularity(row))
            .fold(None, |acc, p| match acc {
                None => Some((p, p)),
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
            });
        table
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    pub fn genre(&self, row: usize) -> Option<&str> {
        self.column(GENRE_COLUMN).and_then(|c| c.text_at(row))
    }

    pub fn popularity(&self, row: usize) -> Option<i64> {
        self.column(POPULARITY_COLUMN).and_then(|c| c.i64_at(row))
    }

    pub fn track_name(&self, row: usize) -> Option<&str> {
        self.column(TRACK_NAME_COLUMN).and_then(|c| c.text_at(row))
    }

    pub fn artists(&self, row: usize) -> Option<&str> {
        self.column(ARTISTS_COLUMN).and_then(|c| c.text_at(row))
    }

    /// Distinct genres in ascending order.
    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    /// Minimum and maximum popularity, `None` if no row has one.
    pub fn popularity_bounds(&self) -> Option<(i64, i64)> {
        self.popularity_bounds
    }

    /// All cells of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<CellValue> {
        self.columns.iter().map(|c| c.cell(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> TrackTable {
        TrackTable::from_columns(vec![
            Column {
                name: GENRE_COLUMN.into(),
                data: ColumnData::Text(vec![
                    Some("rock".into()),
                    Some("pop".into()),
                    None,
                    Some("rock".into()),
                ]),
            },
            Column {
                name: POPULARITY_COLUMN.into(),
                data: ColumnData::Integer(vec![Some(40), None, Some(90), Some(7)]),
            },
            Column {
                name: "energy".into(),
                data: ColumnData::Float(vec![Some(0.5), Some(0.25), None, Some(1.0)]),
            },
        ])
    }

    #[test]
    fn test_indices_built_on_construction() {
        let table = small_table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.genres(), &["pop".to_string(), "rock".to_string()]);
        assert_eq!(table.popularity_bounds(), Some((7, 90)));
    }

    #[test]
    fn test_typed_accessors() {
        let table = small_table();
        let energy = table.column("energy").unwrap();
        assert!(energy.is_numeric());
        assert_eq!(energy.f64_at(1), Some(0.25));
        assert_eq!(energy.f64_at(2), None);
        assert_eq!(table.popularity(0), Some(40));
        assert_eq!(table.column(POPULARITY_COLUMN).unwrap().f64_at(3), Some(7.0));
        assert_eq!(table.genre(2), None);
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_row_cells() {
        let table = small_table();
        assert_eq!(
            table.row(1),
            vec![
                CellValue::Text("pop".into()),
                CellValue::Null,
                CellValue::Float(0.25)
            ]
        );
    }
}
