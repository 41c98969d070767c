use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::Serialize;

use super::{resolve_columns, InsufficientData};
use crate::data::filter::FilteredView;

pub const MIN_PROJECTION_COLUMNS: usize = 2;
pub const MIN_PROJECTION_ROWS: usize = 5;

/// Relative spread below which a column counts as constant.
const ZERO_STD_TOLERANCE: f64 = 1e-12;

/// One retained row with its first two principal-component scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRow {
    /// Row index into the source table.
    pub row: usize,
    pub pc1: f64,
    pub pc2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub columns: Vec<String>,
    pub rows: Vec<ProjectedRow>,
    /// Percent of total standardized variance captured by PC1 and PC2.
    pub explained_variance: [f64; 2],
    /// Unit loading vectors of PC1 and PC2, one weight per column.
    pub loadings: [Vec<f64>; 2],
}

/// Standardize the usable `columns` and project the rows onto their two
/// directions of maximum variance.
///
/// Rows with a missing value in any of the columns are dropped first. The
/// eigen decomposition is deterministic, and each component is oriented so
/// that its largest-magnitude loading is positive, so repeated runs on the
/// same data give identical coordinates.
pub fn project2d(
    view: &FilteredView<'_>,
    columns: &[String],
) -> Result<ProjectionResult, InsufficientData> {
    let cols = resolve_columns(view, columns);
    if cols.len() < MIN_PROJECTION_COLUMNS {
        return Err(InsufficientData::Columns {
            required: MIN_PROJECTION_COLUMNS,
            available: cols.len(),
        });
    }

    let retained: Vec<(usize, Vec<f64>)> = view
        .rows()
        .iter()
        .filter_map(|&row| {
            let values: Option<Vec<f64>> = cols.iter().map(|c| c.f64_at(row)).collect();
            values.map(|v| (row, v))
        })
        .collect();
    if retained.len() < MIN_PROJECTION_ROWS {
        return Err(InsufficientData::Rows {
            required: MIN_PROJECTION_ROWS,
            available: retained.len(),
        });
    }

    let (n, p) = (retained.len(), cols.len());
    let mut data = DMatrix::from_fn(n, p, |i, j| retained[i].1[j]);
    standardize(&mut data);

    let covariance = data.transpose() * &data / (n as f64 - 1.0);
    let eigen = SymmetricEigen::new(covariance);

    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let variances: Vec<f64> = eigen.eigenvalues.iter().map(|v| v.max(0.0)).collect();
    let total: f64 = variances.iter().sum();
    let first = percent(variances[order[0]], total);
    let second = percent(variances[order[1]], total).min(100.0 - first);

    let components = [0, 1].map(|k| oriented(eigen.eigenvectors.column(order[k]).into_owned()));
    let scores = [&data * &components[0], &data * &components[1]];

    let rows = retained
        .iter()
        .enumerate()
        .map(|(i, (row, _))| ProjectedRow {
            row: *row,
            pc1: scores[0][i],
            pc2: scores[1][i],
        })
        .collect();

    log::debug!(
        "Projected {n} of {} rows over {p} columns: PC1 {first:.1}%, PC2 {second:.1}%",
        view.len()
    );
    Ok(ProjectionResult {
        columns: cols.iter().map(|c| c.name.clone()).collect(),
        rows,
        explained_variance: [first, second],
        loadings: components.map(|c| c.iter().copied().collect()),
    })
}

/// Center each column and scale it to unit population variance. Constant
/// columns are left at zero after centering.
pub(crate) fn standardize(data: &mut DMatrix<f64>) {
    let n = data.nrows() as f64;
    for mut col in data.column_iter_mut() {
        let mean = col.sum() / n;
        col.add_scalar_mut(-mean);
        let std = (col.norm_squared() / n).sqrt();
        if std > ZERO_STD_TOLERANCE * mean.abs().max(1.0) {
            col /= std;
        } else {
            col.fill(0.0);
        }
    }
}

fn percent(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        (part / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Flip the sign so the largest-magnitude entry is positive.
fn oriented(v: DVector<f64>) -> DVector<f64> {
    if v[v.iamax()] < 0.0 {
        -v
    } else {
        v
    }
}
