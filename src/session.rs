use std::sync::Arc;

use serde::Serialize;

use crate::analytics::{
    aggregate_by_genre, box_summaries, correlation, project2d, scatter_points, BoxSummary,
    CorrelationMatrix, CorrelationMethod, GenreAggregateTable, InsufficientData, ProjectionResult,
    ScatterPoint,
};
use crate::config::DashboardConfig;
use crate::data::filter::{filter, FilterSelection};
use crate::data::model::TrackTable;

// ---------------------------------------------------------------------------
// Controls: plain values owned by the presentation layer
// ---------------------------------------------------------------------------

/// Every user-facing control, independent of rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Controls {
    pub selection: FilterSelection,
    /// Whether the filtered rows are shown as a table.
    pub show_table: bool,
    pub correlation_method: CorrelationMethod,
    pub bar_feature: String,
    pub aggregate_sort: Option<String>,
}

impl Controls {
    /// Initial controls for `table` from the configured defaults.
    pub fn initial(table: &TrackTable, config: &DashboardConfig) -> Self {
        Self {
            selection: FilterSelection::initial(
                table,
                config.filters.default_genre_count,
                config.filters.popularity,
            ),
            show_table: config.filters.show_table,
            correlation_method: config.analytics.correlation_method,
            bar_feature: config.analytics.bar_feature.clone(),
            aggregate_sort: config.analytics.aggregate_sort.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot: everything one run produces
// ---------------------------------------------------------------------------

/// Box plots of one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPanel {
    pub column: String,
    pub boxes: Vec<BoxSummary>,
}

/// Output of one full pipeline run. Panels that cannot be computed carry
/// their [`InsufficientData`] reason; the rest are unaffected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub total_rows: usize,
    pub filtered_rows: usize,
    /// Row indices of the filtered view, present when the table is shown.
    #[serde(skip)]
    pub table_rows: Option<Vec<usize>>,
    pub scatter: Vec<ScatterPoint>,
    pub box_plots: Vec<BoxPanel>,
    pub correlation: Result<CorrelationMatrix, InsufficientData>,
    pub projection: Result<ProjectionResult, InsufficientData>,
    /// Per-genre mean of the bar feature, highest first.
    pub bar_chart: GenreAggregateTable,
    pub aggregates: GenreAggregateTable,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One interactive session over a shared, read-only table.
pub struct Session {
    table: Arc<TrackTable>,
    config: DashboardConfig,
    controls: Controls,
}

impl Session {
    pub fn new(table: Arc<TrackTable>, config: DashboardConfig) -> Self {
        let controls = Controls::initial(&table, &config);
        Self {
            table,
            config,
            controls,
        }
    }

    pub fn table(&self) -> &TrackTable {
        &self.table
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Toggle a single genre in the selection.
    pub fn toggle_genre(&mut self, genre: &str) {
        let genres = &mut self.controls.selection.genres;
        if !genres.remove(genre) {
            genres.insert(genre.to_string());
        }
    }

    /// Select every genre of the table.
    pub fn select_all_genres(&mut self) {
        self.controls.selection.genres = self.table.genres().iter().cloned().collect();
    }

    /// Deselect every genre.
    pub fn select_no_genres(&mut self) {
        self.controls.selection.genres.clear();
    }

    pub fn set_popularity_range(&mut self, lo: i64, hi: i64) {
        self.controls.selection.popularity = (lo, hi);
    }

    pub fn set_show_table(&mut self, show: bool) {
        self.controls.show_table = show;
    }

    pub fn set_correlation_method(&mut self, method: CorrelationMethod) {
        self.controls.correlation_method = method;
    }

    pub fn set_bar_feature(&mut self, feature: &str) {
        self.controls.bar_feature = feature.to_string();
    }

    pub fn set_aggregate_sort(&mut self, feature: Option<&str>) {
        self.controls.aggregate_sort = feature.map(str::to_string);
    }

    /// Re-run filtering and every panel for the current controls.
    pub fn run(&self) -> Snapshot {
        let analytics = &self.config.analytics;
        let controls = &self.controls;
        let view = filter(&self.table, &controls.selection);

        let correlation = correlation(
            &view,
            &analytics.correlation_columns,
            controls.correlation_method,
        );
        if let Err(reason) = &correlation {
            log::info!("Correlation panel unavailable: {reason}");
        }
        let projection = project2d(&view, &analytics.projection_columns);
        if let Err(reason) = &projection {
            log::info!("Projection panel unavailable: {reason}");
        }

        let bar_chart = aggregate_by_genre(&view, std::slice::from_ref(&controls.bar_feature))
            .sorted_by(&controls.bar_feature);
        let aggregates = aggregate_by_genre(&view, &analytics.aggregate_columns);
        let aggregates = match &controls.aggregate_sort {
            Some(feature) => aggregates.sorted_by(feature),
            None => aggregates,
        };

        Snapshot {
            total_rows: self.table.len(),
            filtered_rows: view.len(),
            scatter: scatter_points(&view, &analytics.scatter_x, &analytics.scatter_y),
            box_plots: analytics
                .box_columns
                .iter()
                .map(|column| BoxPanel {
                    column: column.clone(),
                    boxes: box_summaries(&view, column),
                })
                .collect(),
            correlation,
            projection,
            bar_chart,
            aggregates,
            table_rows: controls.show_table.then(|| view.into_rows()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::ten_track_table;

    fn session() -> Session {
        let mut config = DashboardConfig::default();
        config.filters.popularity = (0, 100);
        config.analytics.projection_columns = ["danceability", "energy", "valence", "tempo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Session::new(Arc::new(ten_track_table()), config)
    }

    #[test]
    fn test_initial_controls() {
        let session = session();
        let controls = session.controls();
        assert_eq!(controls.selection.genres.len(), 2);
        assert_eq!(controls.selection.popularity, (5, 95));
        assert!(!controls.show_table);
    }

    #[test]
    fn test_full_run() {
        let session = session();
        let snapshot = session.run();
        assert_eq!(snapshot.total_rows, 10);
        assert_eq!(snapshot.filtered_rows, 10);
        assert_eq!(snapshot.scatter.len(), 10);
        assert_eq!(snapshot.box_plots.len(), 2);
        assert_eq!(snapshot.box_plots[0].boxes.len(), 2);
        assert!(snapshot.correlation.is_ok());
        assert_eq!(snapshot.projection.as_ref().unwrap().rows.len(), 10);
        assert_eq!(snapshot.aggregates.len(), 2);
        assert_eq!(snapshot.bar_chart.columns, vec!["danceability".to_string()]);
        assert_eq!(snapshot.bar_chart.rows[0].genre, "pop");
        assert!(snapshot.table_rows.is_none());
    }

    #[test]
    fn test_empty_selection_degrades_per_panel() {
        let mut session = session();
        session.select_no_genres();
        let snapshot = session.run();
        assert_eq!(snapshot.filtered_rows, 0);
        assert!(snapshot.scatter.is_empty());
        assert!(matches!(snapshot.correlation, Err(InsufficientData::Rows { .. })));
        assert!(matches!(snapshot.projection, Err(InsufficientData::Rows { .. })));
        assert!(snapshot.aggregates.is_empty());
        assert!(snapshot.bar_chart.is_empty());
    }

    #[test]
    fn test_small_selection_keeps_other_panels() {
        let mut session = session();
        session.toggle_genre("pop");
        session.set_popularity_range(0, 40);
        let snapshot = session.run();
        // rock rows with popularity 5 and 30
        assert_eq!(snapshot.filtered_rows, 2);
        assert!(matches!(
            snapshot.projection,
            Err(InsufficientData::Rows { required: 5, available: 2 })
        ));
        assert!(snapshot.correlation.is_ok());
        assert_eq!(snapshot.aggregates.len(), 1);
    }

    #[test]
    fn test_controls_flow_into_run() {
        let mut session = session();
        session.select_no_genres();
        session.select_all_genres();
        session.set_show_table(true);
        session.set_correlation_method(CorrelationMethod::Spearman);
        session.set_bar_feature("energy");
        session.set_aggregate_sort(None);

        let snapshot = session.run();
        assert_eq!(snapshot.table_rows.as_ref().map(Vec::len), Some(10));
        assert_eq!(
            snapshot.correlation.as_ref().unwrap().method,
            CorrelationMethod::Spearman
        );
        // rock tracks are the high-energy ones
        assert_eq!(snapshot.bar_chart.rows[0].genre, "rock");
        // popularity is aggregated, so the default order still ranks pop first
        assert_eq!(snapshot.aggregates.rows[0].genre, "pop");
    }

    #[test]
    fn test_inverted_range_run() {
        let mut session = session();
        session.set_popularity_range(80, 20);
        assert_eq!(session.run().filtered_rows, 0);
        session.set_popularity_range(20, 80);
        assert_eq!(session.run().filtered_rows, 6);
    }
}
