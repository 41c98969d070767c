use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use thiserror::Error;

use super::model::{
    Column, ColumnData, TrackTable, POPULARITY_COLUMN, REQUIRED_COLUMNS, TEXT_COLUMNS,
};

/// Cell spellings treated as missing values.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed delimited data in {origin}: {source}")]
    Csv {
        origin: String,
        source: csv::Error,
    },
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("row {row}, column '{column}': '{value}' is not an integer")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

/// How the input file is split into fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

type CacheKey = (PathBuf, LoadOptions);

/// Tables loaded during this process, keyed by canonical path and options.
static TABLE_CACHE: OnceLock<Mutex<HashMap<CacheKey, Arc<TrackTable>>>> = OnceLock::new();

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a comma-separated tracks file, reusing the cached table when the
/// same file was loaded before.
pub fn load(path: &Path) -> Result<Arc<TrackTable>, LoadError> {
    load_with(path, LoadOptions::default())
}

/// Same as [`load`] with explicit parsing options.
pub fn load_with(path: &Path, options: LoadOptions) -> Result<Arc<TrackTable>, LoadError> {
    let canonical = std::fs::canonicalize(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let key = (canonical, options);

    let mut cache = TABLE_CACHE
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(table) = cache.get(&key) {
        log::debug!("Reusing cached table for {}", key.0.display());
        return Ok(Arc::clone(table));
    }

    let table = Arc::new(read_file(&key.0, options)?);
    log::info!(
        "Loaded {} tracks ({} columns, {} genres) from {}",
        table.len(),
        table.columns().len(),
        table.genres().len(),
        key.0.display()
    );
    cache.insert(key, Arc::clone(&table));
    Ok(table)
}

/// Read and parse a file without consulting the cache.
pub fn read_file(path: &Path, options: LoadOptions) -> Result<TrackTable, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(file, options, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse delimited text with a header row. Column types are inferred per
/// column over all of its values.
pub fn parse<R: Read>(input: R, options: LoadOptions, origin: &str) -> Result<TrackTable, LoadError> {
    let csv_error = |source| LoadError::Csv {
        origin: origin.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .from_reader(input);

    let names: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("unnamed_{i}")
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(LoadError::DuplicateColumn(name.clone()));
        }
    }
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !seen.contains(**c)) {
        return Err(LoadError::MissingColumn(missing.to_string()));
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_error)? {
        for (values, field) in raw.iter_mut().zip(record.iter()) {
            values.push(field.to_string());
        }
    }

    let columns = names
        .into_iter()
        .zip(raw)
        .map(|(name, values)| build_column(name, values))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TrackTable::from_columns(columns))
}

fn is_missing(s: &str) -> bool {
    MISSING_MARKERS.contains(&s.trim())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn build_column(name: String, values: Vec<String>) -> Result<Column, LoadError> {
    let data = if TEXT_COLUMNS.contains(&name.as_str()) {
        text_data(values)
    } else {
        infer_data(values)
    };

    if name == POPULARITY_COLUMN && !matches!(data, ColumnData::Integer(_)) {
        return Err(first_non_integer(&name, &data));
    }

    Ok(Column { name, data })
}

fn text_data(values: Vec<String>) -> ColumnData {
    ColumnData::Text(
        values
            .into_iter()
            .map(|s| if is_missing(&s) { None } else { Some(s) })
            .collect(),
    )
}

fn infer_data(values: Vec<String>) -> ColumnData {
    let present = || values.iter().map(|s| s.trim()).filter(|s| !is_missing(s));

    if present().all(|s| s.parse::<i64>().is_ok()) {
        ColumnData::Integer(
            values
                .iter()
                .map(|s| s.trim().parse::<i64>().ok())
                .collect(),
        )
    } else if present().all(|s| s.parse::<f64>().is_ok()) {
        ColumnData::Float(
            values
                .iter()
                .map(|s| s.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect(),
        )
    } else if present().all(|s| parse_bool(s).is_some()) {
        ColumnData::Bool(values.iter().map(|s| parse_bool(s)).collect())
    } else {
        text_data(values)
    }
}

/// Build the error for a column that was expected to hold integers.
fn first_non_integer(name: &str, data: &ColumnData) -> LoadError {
    let offending = match data {
        ColumnData::Float(v) => v
            .iter()
            .enumerate()
            .find_map(|(row, x)| x.map(|x| (row, x.to_string()))),
        ColumnData::Bool(v) => v
            .iter()
            .enumerate()
            .find_map(|(row, x)| x.map(|x| (row, x.to_string()))),
        ColumnData::Text(v) => v.iter().enumerate().find_map(|(row, x)| {
            x.as_ref()
                .filter(|s| s.trim().parse::<i64>().is_err())
                .map(|s| (row, s.clone()))
        }),
        ColumnData::Integer(_) => None,
    };
    let (row, value) = offending.unwrap_or_default();
    LoadError::InvalidValue {
        row,
        column: name.to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, GENRE_COLUMN};

    const HEADER: &str = ",track_id,artists,track_name,popularity,explicit,danceability,tempo,track_genre";

    fn parse_str(body: &str) -> Result<TrackTable, LoadError> {
        let text = format!("{HEADER}\n{body}");
        parse(text.as_bytes(), LoadOptions::default(), "<test>")
    }

    #[test]
    fn test_infers_column_types() {
        let table = parse_str(
            "0,a1,Artist A,Song A,55,False,0.61,120,pop\n\
             1,b2,Artist B,Song B,12,True,,98.5,rock\n",
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.column("unnamed_0").unwrap().is_numeric());
        assert_eq!(table.column("explicit").unwrap().cell(1), CellValue::Bool(true));
        assert_eq!(table.column("danceability").unwrap().f64_at(1), None);
        assert_eq!(table.column("tempo").unwrap().f64_at(0), Some(120.0));
        assert_eq!(table.column("track_id").unwrap().text_at(0), Some("a1"));
        assert_eq!(table.popularity(1), Some(12));
        assert_eq!(table.genres(), &["pop".to_string(), "rock".to_string()]);
    }

    #[test]
    fn test_numeric_looking_genre_stays_text() {
        let table = parse_str("0,a,A,S,1,False,0.5,100,80s\n1,b,B,T,2,False,0.4,90,1990\n").unwrap();
        let genre = table.column(GENRE_COLUMN).unwrap();
        assert!(!genre.is_numeric());
        assert_eq!(table.genre(1), Some("1990"));
    }

    #[test]
    fn test_nan_markers_are_missing() {
        let table = parse_str("0,a,A,S,1,False,NaN,100,pop\n1,b,B,T,2,False,0.4,nan,pop\n").unwrap();
        assert_eq!(table.column("danceability").unwrap().f64_at(0), None);
        assert_eq!(table.column("tempo").unwrap().f64_at(1), None);
    }

    #[test]
    fn test_non_finite_floats_are_missing() {
        let table = parse_str(
            "0,a,A,S,1,False,inf,100,pop\n1,b,B,T,2,False,0.4,-infinity,pop\n2,c,C,U,3,False,0.3,95,pop\n",
        )
        .unwrap();
        let danceability = table.column("danceability").unwrap();
        assert!(danceability.is_numeric());
        assert_eq!(danceability.f64_at(0), None);
        assert_eq!(danceability.f64_at(2), Some(0.3));
        assert_eq!(table.column("tempo").unwrap().f64_at(1), None);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut bytes = format!("{HEADER}\n0,a,A,").into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",1,False,0.5,100,pop\n");
        let err = parse(bytes.as_slice(), LoadOptions::default(), "<test>").unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse(
            "artists,track_name,popularity\nA,S,3\n".as_bytes(),
            LoadOptions::default(),
            "<test>",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(c) if c == GENRE_COLUMN));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let err = parse_str("0,a,A,S,1,False,0.5,100,pop\n1,b,B\n").unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn test_non_integer_popularity() {
        let err = parse_str("0,a,A,S,high,False,0.5,100,pop\n").unwrap_err();
        match err {
            LoadError::InvalidValue { row, column, value } => {
                assert_eq!(row, 0);
                assert_eq!(column, POPULARITY_COLUMN);
                assert_eq!(value, "high");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_header() {
        let err = parse(
            "track_genre,popularity,track_name,artists,energy,energy\n".as_bytes(),
            LoadOptions::default(),
            "<test>",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateColumn(c) if c == "energy"));
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let table = parse_str("").unwrap();
        assert!(table.is_empty());
        assert!(table.genres().is_empty());
        assert_eq!(table.popularity_bounds(), None);
    }

    #[test]
    fn test_custom_delimiter() {
        let text = "track_genre;popularity;track_name;artists;energy\npop;10;S;A;0,5\n";
        let table = parse(text.as_bytes(), LoadOptions { delimiter: b';' }, "<test>").unwrap();
        assert_eq!(table.len(), 1);
        // "0,5" is not a float in this locale-free parser
        assert_eq!(table.column("energy").unwrap().text_at(0), Some("0,5"));
    }

    #[test]
    fn test_missing_file() {
        let err = load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
