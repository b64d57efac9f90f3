//! Equal-width histogram over one numeric column.
//!
//! Bin `i` covers `[min + i*w, min + (i+1)*w)`; the last bin is closed at the
//! observed max so every finite value lands in exactly one bin. Bins with no
//! values are still reported. NaN and infinities are left out of the bins and
//! counted with the nulls.

use serde::{Deserialize, Serialize};

use ctxbound_core::types::Scalar;
use ctxbound_core::{Error, Result};
use ctxbound_store::{quote_ident, DateRange, Source, Store};

use crate::SummaryOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramResult {
    pub column: String,
    pub bins: Vec<Bin>,
    /// Finite values; equals the sum of bin counts.
    pub total_count: u64,
    /// Nulls plus NaN and infinite values.
    pub null_count: u64,
}

/// Histogram `column` of `source`. `bins` defaults to
/// `opts.default_bins` and is clamped to `opts.max_bins`.
pub fn histogram(
    store: &Store,
    source: &Source,
    column: &str,
    bins: Option<usize>,
    range: Option<&DateRange>,
    opts: &SummaryOptions,
) -> Result<HistogramResult> {
    let requested = bins.unwrap_or(opts.default_bins);
    if requested == 0 {
        return Err(Error::InvalidArgument("bins must be at least 1".into()));
    }
    let bins = if requested > opts.max_bins {
        tracing::warn!(requested, max = opts.max_bins, "clamping histogram bin count");
        opts.max_bins
    } else {
        requested
    };

    let schema = store.describe(source)?;
    let field = schema.field_named(column).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "unknown column '{column}'; available: {}",
            schema.names().join(", ")
        ))
    })?;
    if !field.data_type.is_numeric() {
        return Err(Error::InvalidArgument(format!(
            "column '{column}' is not numeric; histograms need a numeric column"
        )));
    }
    if range.is_some() && schema.field_named(&opts.date_column).is_none() {
        return Err(Error::InvalidArgument(format!(
            "date range given but '{}' has no date column '{}'",
            source, opts.date_column
        )));
    }

    let q = quote_ident(column);
    let finite = format!("isfinite(CAST({q} AS DOUBLE))");
    let filtered = source.select_all(range, &opts.date_column);
    let stats = store.query_table(
        &format!(
            "SELECT COUNT(*) FILTER (WHERE {finite}) AS n, COUNT(*) AS total, \
                    MIN(CAST({q} AS DOUBLE)) FILTER (WHERE {finite}) AS lo, \
                    MAX(CAST({q} AS DOUBLE)) FILTER (WHERE {finite}) AS hi \
             FROM ({filtered}) AS f"
        ),
        1,
    )?;
    let first = |name: &str| {
        stats
            .column(name)
            .and_then(|c| c.values.first().cloned())
            .unwrap_or(Scalar::Null)
    };
    let total_count = first("n").as_f64().unwrap_or(0.0) as u64;
    let null_count = (first("total").as_f64().unwrap_or(0.0) as u64).saturating_sub(total_count);

    tracing::debug!(source = %source, column, bins, total_count, "histogram");

    let (lo, hi) = match (first("lo").as_f64(), first("hi").as_f64()) {
        (Some(lo), Some(hi)) if total_count > 0 => (lo, hi),
        _ => {
            return Ok(HistogramResult {
                column: column.to_string(),
                bins: Vec::new(),
                total_count: 0,
                null_count,
            })
        }
    };

    // A constant column has zero width; report it as one degenerate bin.
    if hi <= lo {
        return Ok(HistogramResult {
            column: column.to_string(),
            bins: vec![Bin {
                min: lo,
                max: hi,
                count: total_count,
            }],
            total_count,
            null_count,
        });
    }

    let width = (hi - lo) / bins as f64;
    if !width.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "column '{column}' spans [{lo}, {hi}], too wide to bin"
        )));
    }
    let counted = store.query_table(
        &format!(
            "SELECT GREATEST(LEAST(CAST(FLOOR((CAST({q} AS DOUBLE) - ({lo:?})) / ({width:?})) AS BIGINT), {last}), 0) AS b, \
                    COUNT(*) AS n \
             FROM ({filtered}) AS f WHERE {finite} GROUP BY b ORDER BY b",
            last = bins - 1
        ),
        bins,
    )?;

    let mut counts = vec![0u64; bins];
    if let (Some(b), Some(n)) = (counted.column("b"), counted.column("n")) {
        for (idx, count) in b.values.iter().zip(&n.values) {
            if let (Some(idx), Some(count)) = (idx.as_f64(), count.as_f64()) {
                if let Some(slot) = counts.get_mut(idx as usize) {
                    *slot += count as u64;
                }
            }
        }
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            min: lo + i as f64 * width,
            max: if i + 1 == bins {
                hi
            } else {
                lo + (i + 1) as f64 * width
            },
            count,
        })
        .collect();

    Ok(HistogramResult {
        column: column.to_string(),
        bins,
        total_count,
        null_count,
    })
}
