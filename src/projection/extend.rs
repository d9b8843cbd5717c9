//! Forward extension of annual series with a rolling-average yearly step.
//!
//! Given a series ending in year `T`, every year `T+1..=last_year` gets
//!
//! ```text
//! value(y) = value(y - 1) + mean(last `window` year-over-year differences)
//! ```
//!
//! The step is computed once from observed history and held constant, so the
//! projection is a straight line continuing the recent trend.

use tracing::debug;

use crate::domain::{Series, ValueKind};
use crate::error::AppError;
use crate::projection::interpolate::lerp;
use crate::projection::table::SeriesTable;

/// Extend `series` to `last_year`.
///
/// Interior gaps are filled by straight-line interpolation before the yearly
/// differences are taken, so the step is always a one-year difference. With
/// fewer than `rolling_window` differences available the average uses what
/// exists; a single-point series is held flat.
///
/// If the series already reaches `last_year` it is returned unchanged.
pub fn extend_series(series: &Series, last_year: i32, rolling_window: usize) -> Result<Series, AppError> {
    if rolling_window == 0 {
        return Err(AppError::input("Rolling window must be >= 1."));
    }
    let Some(observed_max) = series.last_year() else {
        return Err(AppError::no_data(format!(
            "Cannot extend an empty series (entity {}).",
            series.entity()
        )));
    };
    if observed_max >= last_year {
        return Ok(series.clone());
    }

    let mut out = fill_interior_gaps(series);
    let step = average_step(&out, rolling_window);

    let mut value = out
        .get(observed_max)
        .ok_or_else(|| AppError::compute("Series lost its last observation during gap filling."))?;
    for year in (observed_max + 1)..=last_year {
        value += step;
        out.set(year, value, ValueKind::Projected);
    }

    debug!(
        entity = %series.entity(),
        from = observed_max + 1,
        to = last_year,
        step,
        "extended series"
    );
    Ok(out)
}

/// Extend every entity of `table` independently.
pub fn extend_table(table: &SeriesTable, last_year: i32, rolling_window: usize) -> Result<SeriesTable, AppError> {
    table.try_map_series(|s| extend_series(s, last_year, rolling_window))
}

/// Fill missing years between the first and last year by linear interpolation.
pub fn fill_interior_gaps(series: &Series) -> Series {
    let mut out = series.clone();
    let anchors: Vec<(i32, f64)> = series.iter().map(|(y, v)| (y, v.value)).collect();
    for pair in anchors.windows(2) {
        let (y0, v0) = pair[0];
        let (y1, v1) = pair[1];
        for year in (y0 + 1)..y1 {
            out.set(year, lerp((y0, v0), (y1, v1), year), ValueKind::Interpolated);
        }
    }
    out
}

/// Mean of the trailing `window` year-over-year differences (0 if none).
fn average_step(series: &Series, window: usize) -> f64 {
    let values: Vec<f64> = series.iter().map(|(_, v)| v.value).collect();
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let take = window.min(diffs.len());
    if take == 0 {
        return 0.0;
    }
    diffs[diffs.len() - take..].iter().sum::<f64>() / take as f64
}
