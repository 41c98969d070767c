/// Derived computations over a [`FilteredView`].
///
/// Every function here is pure: it reads the view and returns a new value.
/// Requested columns that are missing from the schema or are not numeric
/// are dropped before computing; a panel that cannot be computed returns
/// [`InsufficientData`] instead of failing the whole run.
pub mod aggregate;
pub mod correlation;
pub mod distribution;
pub mod projection;

use serde::Serialize;
use thiserror::Error;

use crate::data::filter::FilteredView;
use crate::data::model::Column;

pub use aggregate::{aggregate_by_genre, GenreAggregate, GenreAggregateTable};
pub use correlation::{correlation, CorrelationMatrix, CorrelationMethod};
pub use distribution::{box_summaries, scatter_points, BoxSummary, ScatterPoint};
pub use projection::{project2d, ProjectedRow, ProjectionResult};

/// Not enough rows or columns to compute a panel.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsufficientData {
    #[error("insufficient data: need at least {required} numeric columns, have {available}")]
    Columns { required: usize, available: usize },
    #[error("insufficient data: need at least {required} rows, have {available}")]
    Rows { required: usize, available: usize },
}

/// Keep the requested columns that exist in the view's table and are
/// numeric, in request order, without duplicates.
pub(crate) fn resolve_columns<'t>(view: &FilteredView<'t>, requested: &[String]) -> Vec<&'t Column> {
    let table = view.table();
    let mut resolved: Vec<&'t Column> = Vec::with_capacity(requested.len());
    for name in requested {
        match table.column(name) {
            Some(col) if col.is_numeric() => {
                if !resolved.iter().any(|c| c.name == col.name) {
                    resolved.push(col);
                }
            }
            Some(_) => log::debug!("Skipping non-numeric column '{name}'"),
            None => log::debug!("Skipping unknown column '{name}'"),
        }
    }
    resolved
}
