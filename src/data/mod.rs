/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///   tracks .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → TrackTable (cached per path)
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ TrackTable │  typed columns, genre / popularity indices
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  genre set + popularity range → FilteredView
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;

#[cfg(test)]
pub(crate) mod testing {
    use super::loader::{parse, LoadOptions};
    use super::model::TrackTable;

    pub fn table_from_csv(text: &str) -> TrackTable {
        parse(text.as_bytes(), LoadOptions::default(), "<test>").unwrap()
    }

    /// Ten tracks: six "pop", four "rock", interleaved.
    pub fn ten_track_table() -> TrackTable {
        table_from_csv(
            "track_genre,popularity,track_name,artists,danceability,energy,valence,tempo\n\
             pop,10,Song 0,Artist 0,0.80,0.70,0.90,120\n\
             rock,5,Song 1,Artist 1,0.40,0.90,0.30,140\n\
             pop,25,Song 2,Artist 2,0.75,0.65,0.80,118\n\
             pop,40,Song 3,Artist 3,0.70,0.60,0.85,122\n\
             rock,30,Song 4,Artist 4,0.45,0.85,0.35,150\n\
             pop,55,Song 5,Artist 5,0.85,0.75,0.70,125\n\
             rock,60,Song 6,Artist 6,0.35,0.95,0.25,160\n\
             pop,70,Song 7,Artist 7,0.90,0.80,0.95,128\n\
             rock,85,Song 8,Artist 8,0.50,0.88,0.40,135\n\
             pop,95,Song 9,Artist 9,0.65,0.55,0.60,110\n",
        )
    }
}
