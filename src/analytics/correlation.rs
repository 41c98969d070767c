use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{resolve_columns, InsufficientData};
use crate::data::filter::FilteredView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
    Kendall,
}

impl CorrelationMethod {
    pub const ALL: [CorrelationMethod; 3] = [Self::Pearson, Self::Spearman, Self::Kendall];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
            Self::Kendall => "kendall",
        }
    }

    /// Coefficient over paired complete observations.
    fn coefficient(self, x: &[f64], y: &[f64]) -> Option<f64> {
        match self {
            Self::Pearson => pearson(x, y),
            Self::Spearman => pearson(&average_ranks(x), &average_ranks(y)),
            Self::Kendall => kendall_tau_b(x, y),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrelationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown correlation method '{s}'"))
    }
}

/// Square, symmetric matrix of pairwise coefficients.
/// `None` marks a coefficient that is undefined for the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Correlate every pair of usable `columns` over the view's rows, using
/// the rows where both values are present.
pub fn correlation(
    view: &FilteredView<'_>,
    columns: &[String],
    method: CorrelationMethod,
) -> Result<CorrelationMatrix, InsufficientData> {
    let cols = resolve_columns(view, columns);
    if cols.len() < 2 {
        return Err(InsufficientData::Columns {
            required: 2,
            available: cols.len(),
        });
    }
    if view.is_empty() {
        return Err(InsufficientData::Rows {
            required: 1,
            available: 0,
        });
    }

    let series: Vec<Vec<Option<f64>>> = cols
        .iter()
        .map(|c| view.rows().iter().map(|&r| c.f64_at(r)).collect())
        .collect();

    let k = cols.len();
    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        let own: Vec<f64> = series[i].iter().flatten().copied().collect();
        values[i][i] = (own.len() >= 2 && !is_constant(&own)).then_some(1.0);

        for j in (i + 1)..k {
            let (x, y): (Vec<f64>, Vec<f64>) = series[i]
                .iter()
                .zip(&series[j])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .unzip();
            let r = method.coefficient(&x, &y);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    log::debug!("{method} correlation over {k} columns, {} rows", view.len());
    Ok(CorrelationMatrix {
        method,
        columns: cols.iter().map(|c| c.name.clone()).collect(),
        values,
    })
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || is_constant(x) || is_constant(y) {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let (mut sxx, mut syy, mut sxy) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&a, &b) in x.iter().zip(y) {
        let (da, db) = (a - mx, b - my);
        sxx += da * da;
        syy += db * db;
        sxy += da * db;
    }
    let denom = (sxx * syy).sqrt();
    if denom <= 0.0 {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// 1-based ranks, ties receive the average of the positions they span.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Kendall's tau-b in O(n log n): sort by (x, y), then count discordant
/// pairs as strict inversions of y.
fn kendall_tau_b(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 {
        return None;
    }
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let total = (n as u64) * (n as u64 - 1) / 2;
    let x_ties = tied_pairs(pairs.iter().map(|p| p.0));
    let joint_ties = tied_pairs(pairs.iter().copied());

    let mut ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let discordant = count_inversions(&mut ys);
    let y_ties = tied_pairs(ys.iter().copied());

    let denom = ((total - x_ties) as f64 * (total - y_ties) as f64).sqrt();
    if denom <= 0.0 {
        return None;
    }
    let numerator =
        total as f64 - x_ties as f64 - y_ties as f64 + joint_ties as f64 - 2.0 * discordant as f64;
    Some((numerator / denom).clamp(-1.0, 1.0))
}

/// Number of equal pairs in a sorted sequence.
fn tied_pairs<T: PartialEq>(sorted: impl IntoIterator<Item = T>) -> u64 {
    let mut total = 0u64;
    let mut run = 0u64;
    let mut prev: Option<T> = None;
    for v in sorted {
        match &prev {
            Some(p) if *p == v => run += 1,
            _ => {
                total += run * run.saturating_sub(1) / 2;
                run = 1;
            }
        }
        prev = Some(v);
    }
    total + run * run.saturating_sub(1) / 2
}

/// Merge sort `values` in place, returning the number of strict inversions.
fn count_inversions(values: &mut [f64]) -> u64 {
    let n = values.len();
    if n < 2 {
        return 0;
    }
    let mid = n / 2;
    let mut count = count_inversions(&mut values[..mid]) + count_inversions(&mut values[mid..]);

    let mut merged = Vec::with_capacity(n);
    let (mut i, mut j) = (0, mid);
    while i < mid && j < n {
        if values[j] < values[i] {
            count += (mid - i) as u64;
            merged.push(values[j]);
            j += 1;
        } else {
            merged.push(values[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&values[i..mid]);
    merged.extend_from_slice(&values[j..n]);
    values.copy_from_slice(&merged);
    count
}
