use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, NaiveDateTime};
use plotters::prelude::*;

use crate::color::{generate_palette, SCATTER_COLOR, TREND_COLOR};
use crate::data::model::MeasurementTable;
use crate::data::resolver::ColumnMap;

// ---------------------------------------------------------------------------
// Chart catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    AqiTrend,
    MonthlyPm25,
    Pm25VsPm10,
}

impl Chart {
    pub fn file_name(self) -> &'static str {
        match self {
            Chart::AqiTrend => "aqi_trend.png",
            Chart::MonthlyPm25 => "monthly_pm25.png",
            Chart::Pm25VsPm10 => "scatter_pm25_pm10.png",
        }
    }

    fn size(self) -> (u32, u32) {
        match self {
            Chart::AqiTrend | Chart::MonthlyPm25 => (1000, 400),
            Chart::Pm25VsPm10 => (600, 500),
        }
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chart::AqiTrend => write!(f, "Daily AQI Trend"),
            Chart::MonthlyPm25 => write!(f, "Monthly Avg PM2.5"),
            Chart::Pm25VsPm10 => write!(f, "PM2.5 vs PM10"),
        }
    }
}

/// Result of rendering one chart. Failures stay local to their chart.
#[derive(Debug)]
pub struct ChartOutcome {
    pub chart: Chart,
    pub path: PathBuf,
    pub result: Result<()>,
}

// ---------------------------------------------------------------------------
// Series extraction
// ---------------------------------------------------------------------------

/// `(date, value)` pairs in table order, skipping rows without a value.
pub fn trend_points(
    table: &MeasurementTable,
    date_col: &str,
    value_col: &str,
) -> Vec<(NaiveDateTime, f64)> {
    let (Some(d), Some(v)) = (table.column_index(date_col), table.column_index(value_col)) else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter_map(|row| Some((row[d].as_timestamp()?, row[v].as_f64()?)))
        .collect()
}

/// Mean of `value_col` per calendar month, labelled `YYYY-MM`, oldest first.
/// Months without any value are left out.
pub fn monthly_means(
    table: &MeasurementTable,
    date_col: &str,
    value_col: &str,
) -> Vec<(String, f64)> {
    let mut buckets: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for (t, v) in trend_points(table, date_col, value_col) {
        let slot = buckets.entry((t.year(), t.month())).or_insert((0.0, 0));
        slot.0 += v;
        slot.1 += 1;
    }
    buckets
        .into_iter()
        .map(|((y, m), (sum, n))| (format!("{y:04}-{m:02}"), sum / n as f64))
        .collect()
}

/// One `(x, y)` point per row where both columns have a value.
pub fn scatter_points(table: &MeasurementTable, x_col: &str, y_col: &str) -> Vec<(f64, f64)> {
    let (Some(x), Some(y)) = (table.column_index(x_col), table.column_index(y_col)) else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter_map(|row| Some((row[x].as_f64()?, row[y].as_f64()?)))
        .collect()
}

/// Axis range covering `values` with a little headroom. Falls back to
/// `0..1` when there is nothing finite to show.
pub fn axis_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let pad = if span.abs() < f64::EPSILON {
        if min == 0.0 {
            1.0
        } else {
            min.abs() * 0.1
        }
    } else {
        span * 0.05
    };
    (min - pad)..(max + pad)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render every chart whose columns are available into `out_dir`.
///
/// Each chart is drawn independently: an error or a panic inside the drawing
/// backend is logged, recorded in its outcome and does not stop the rest.
pub fn render_all(
    table: &MeasurementTable,
    columns: &ColumnMap,
    out_dir: &Path,
) -> Vec<ChartOutcome> {
    let date = columns.date.as_str();
    let pm25 = present(table, columns.pm25.as_deref());
    let pm10 = present(table, columns.pm10.as_deref());
    let aqi = present(table, columns.aqi.as_deref());

    let mut outcomes = Vec::new();

    if let Some(aqi) = aqi {
        outcomes.push(guarded(Chart::AqiTrend, out_dir, |path| {
            draw_trend(path, &trend_points(table, date, aqi))
        }));
    }
    if let Some(pm25) = pm25 {
        outcomes.push(guarded(Chart::MonthlyPm25, out_dir, |path| {
            draw_monthly(path, &monthly_means(table, date, pm25))
        }));
    }
    if let (Some(pm25), Some(pm10)) = (pm25, pm10) {
        outcomes.push(guarded(Chart::Pm25VsPm10, out_dir, |path| {
            draw_scatter(path, &scatter_points(table, pm25, pm10))
        }));
    }

    outcomes
}

fn present<'a>(table: &MeasurementTable, name: Option<&'a str>) -> Option<&'a str> {
    name.filter(|n| table.has_column(n))
}

fn guarded(chart: Chart, out_dir: &Path, draw: impl FnOnce(&Path) -> Result<()>) -> ChartOutcome {
    let path = out_dir.join(chart.file_name());
    let result = panic::catch_unwind(AssertUnwindSafe(|| draw(&path))).unwrap_or_else(|payload| {
        Err(anyhow!(
            "renderer panicked: {}",
            panic_message(payload.as_ref())
        ))
    });

    match &result {
        Ok(()) => log::info!("{chart}: wrote {}", path.display()),
        Err(e) => log::warn!("{chart}: {e:#}"),
    }
    ChartOutcome {
        chart,
        path,
        result,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn epoch_seconds(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp() as f64
}

fn format_epoch_date(secs: f64) -> String {
    DateTime::from_timestamp(secs.round() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn draw_trend(path: &Path, points: &[(NaiveDateTime, f64)]) -> Result<()> {
    let xs: Vec<f64> = points.iter().map(|&(t, _)| epoch_seconds(t)).collect();
    let ys: Vec<f64> = points.iter().map(|&(_, v)| v).collect();

    let root = BitMapBackend::new(path, Chart::AqiTrend.size()).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(Chart::AqiTrend.to_string(), ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(axis_range(xs.iter().copied()), axis_range(ys.iter().copied()))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("AQI")
        .x_labels(8)
        .x_label_formatter(&|secs| format_epoch_date(*secs))
        .draw()?;

    chart.draw_series(LineSeries::new(
        xs.iter().copied().zip(ys.iter().copied()),
        &TREND_COLOR,
    ))?;

    root.present()?;
    Ok(())
}

fn draw_monthly(path: &Path, months: &[(String, f64)]) -> Result<()> {
    let n = months.len().max(1) as i32;
    let y = axis_range(months.iter().map(|&(_, v)| v).chain([0.0]));
    let palette = generate_palette(months.len());

    let root = BitMapBackend::new(path, Chart::MonthlyPm25.size()).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(Chart::MonthlyPm25.to_string(), ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d((0..n).into_segmented(), y)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Month")
        .y_desc("PM2.5")
        .x_labels(months.len().max(1))
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => months
                .get(*i as usize)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(months.iter().zip(&palette).enumerate().map(|(i, ((_, mean), color))| {
        let i = i as i32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *mean)],
            color.filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn draw_scatter(path: &Path, points: &[(f64, f64)]) -> Result<()> {
    let root = BitMapBackend::new(path, Chart::Pm25VsPm10.size()).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(Chart::Pm25VsPm10.to_string(), ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(
            axis_range(points.iter().map(|&(x, _)| x)),
            axis_range(points.iter().map(|&(_, y)| y)),
        )?;

    chart
        .configure_mesh()
        .x_desc("PM2.5")
        .y_desc("PM10")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, SCATTER_COLOR.filled())),
    )?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Timestamp(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn num(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn sample() -> MeasurementTable {
        let mut t = MeasurementTable::new(vec!["Date".into(), "PM2.5".into(), "PM10".into()]);
        t.rows = vec![
            vec![ts(2024, 1, 5), num(10.0), num(30.0)],
            vec![ts(2024, 1, 20), num(20.0), CellValue::Missing],
            vec![ts(2024, 2, 1), num(7.0), num(21.0)],
            vec![ts(2023, 12, 31), num(100.0), num(150.0)],
        ];
        t
    }

    fn columns(aqi: Option<&str>) -> ColumnMap {
        ColumnMap {
            date: "Date".into(),
            pm25: Some("PM2.5".into()),
            pm10: Some("PM10".into()),
            aqi: aqi.map(str::to_string),
        }
    }

    #[test]
    fn months_are_grouped_and_ordered() {
        let months = monthly_means(&sample(), "Date", "PM2.5");
        assert_eq!(
            months,
            vec![
                ("2023-12".to_string(), 100.0),
                ("2024-01".to_string(), 15.0),
                ("2024-02".to_string(), 7.0),
            ]
        );
    }

    #[test]
    fn scatter_needs_both_values() {
        let points = scatter_points(&sample(), "PM2.5", "PM10");
        assert_eq!(points, vec![(10.0, 30.0), (7.0, 21.0), (100.0, 150.0)]);
    }

    #[test]
    fn trend_of_unknown_column_is_empty() {
        assert!(trend_points(&sample(), "Date", "AQI").is_empty());
    }

    #[test]
    fn axis_range_pads_and_handles_degenerate_input() {
        assert_eq!(axis_range(Vec::new()), 0.0..1.0);
        assert_eq!(axis_range([f64::NAN]), 0.0..1.0);
        assert_eq!(axis_range([0.0, 0.0]), -1.0..1.0);
        assert_eq!(axis_range([50.0]), 45.0..55.0);
        assert_eq!(axis_range([0.0, 100.0]), -5.0..105.0);
    }

    #[test]
    fn epoch_labels_are_calendar_dates() {
        let t = NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(format_epoch_date(epoch_seconds(t)), "2024-07-04");
    }

    #[test]
    fn charts_are_gated_on_columns() {
        let dir = tempfile::tempdir().unwrap();

        let outcomes = render_all(&sample(), &columns(None), dir.path());

        let charts: Vec<Chart> = outcomes.iter().map(|o| o.chart).collect();
        assert_eq!(charts, vec![Chart::MonthlyPm25, Chart::Pm25VsPm10]);
        for outcome in &outcomes {
            assert_eq!(outcome.path, dir.path().join(outcome.chart.file_name()));
            assert!(outcome.result.is_ok(), "{}: {:?}", outcome.chart, outcome.result);
            assert!(outcome.path.exists());
        }
    }

    #[test]
    fn resolved_but_absent_column_is_not_charted() {
        let dir = tempfile::tempdir().unwrap();

        let outcomes = render_all(&sample(), &columns(Some("AQI")), dir.path());

        assert!(outcomes.iter().all(|o| o.chart != Chart::AqiTrend));
    }

    #[test]
    fn failing_chart_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let missing_dir = dir.path().join("does/not/exist");

        let first = guarded(Chart::AqiTrend, &missing_dir, |_| Err(anyhow!("boom")));
        let second = guarded(Chart::MonthlyPm25, dir.path(), |_| panic!("font lookup failed"));
        let third = guarded(Chart::Pm25VsPm10, dir.path(), |_| Ok(()));

        assert_eq!(first.result.unwrap_err().to_string(), "boom");
        assert!(second
            .result
            .unwrap_err()
            .to_string()
            .contains("font lookup failed"));
        assert!(third.result.is_ok());
    }
}
