use std::collections::BTreeSet;

use serde::Serialize;

use super::model::TrackTable;

// ---------------------------------------------------------------------------
// Filter selection: which genres and which popularity range
// ---------------------------------------------------------------------------

/// The user's current filter controls.
///
/// An empty genre set selects nothing. The popularity range is inclusive on
/// both ends; an inverted range (`lo > hi`) matches no row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub genres: BTreeSet<String>,
    pub popularity: (i64, i64),
}

impl FilterSelection {
    pub fn new<I, S>(genres: I, popularity: (i64, i64)) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            genres: genres.into_iter().map(Into::into).collect(),
            popularity,
        }
    }

    /// Initial selection: the first `genre_count` genres in sorted order and
    /// `popularity` clamped to the table's popularity bounds.
    pub fn initial(table: &TrackTable, genre_count: usize, popularity: (i64, i64)) -> Self {
        let genres = table.genres().iter().take(genre_count).cloned().collect();
        let popularity = match table.popularity_bounds() {
            Some((min, max)) => (popularity.0.clamp(min, max), popularity.1.clamp(min, max)),
            None => popularity,
        };
        Self { genres, popularity }
    }

    /// Whether `row` of `table` passes both predicates.
    pub fn matches(&self, table: &TrackTable, row: usize) -> bool {
        let (lo, hi) = self.popularity;
        let in_range = table
            .popularity(row)
            .is_some_and(|p| lo <= p && p <= hi);
        in_range
            && table
                .genre(row)
                .is_some_and(|g| self.genres.contains(g))
    }
}

// ---------------------------------------------------------------------------
// Filtered view: row indices into the table
// ---------------------------------------------------------------------------

/// A borrowed subset of table rows, in table order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a TrackTable,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Every row of the table.
    pub fn all(table: &'a TrackTable) -> Self {
        Self {
            table,
            rows: (0..table.len()).collect(),
        }
    }

    pub fn table(&self) -> &'a TrackTable {
        self.table
    }

    /// Row indices into [`Self::table`], ascending.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Apply `selection` to the rows of this view.
    pub fn refine(&self, selection: &FilterSelection) -> FilteredView<'a> {
        FilteredView {
            table: self.table,
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|&row| selection.matches(self.table, row))
                .collect(),
        }
    }

    /// Consume the view, keeping only the row indices.
    pub fn into_rows(self) -> Vec<usize> {
        self.rows
    }
}

/// Return the rows of `table` that pass `selection`.
pub fn filter<'a>(table: &'a TrackTable, selection: &FilterSelection) -> FilteredView<'a> {
    let (lo, hi) = selection.popularity;
    if lo > hi {
        log::debug!("Inverted popularity range ({lo}, {hi}) selects no rows");
    }
    let view = FilteredView::all(table).refine(selection);
    log::debug!(
        "Filter kept {} of {} rows ({} genres, popularity {lo}..={hi})",
        view.len(),
        table.len(),
        selection.genres.len()
    );
    view
}
