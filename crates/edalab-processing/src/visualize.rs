//! Exploratory plots rendered to base64-encoded PNGs.
//!
//! Three figures are produced from the numeric columns of a table:
//!
//! - **histograms**: one distribution panel per column, stacked vertically
//! - **correlation_matrix**: annotated Pearson heatmap (needs two or more columns)
//! - **boxplots**: one horizontal box per column, stacked vertically
//!
//! Figures are drawn with the plotters bitmap backend into a temporary PNG
//! file whose bytes are then base64-encoded. Chart text uses the DejaVu Sans
//! face bundled under `assets/`, registered with plotters on first use, so
//! rendering needs no system font libraries.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::utils::{column_f64, numeric_column_names, pearson, quantile_sorted, sorted_values};

/// Width of every figure, in pixels.
const FIGURE_WIDTH: u32 = 1200;
/// Height of one stacked histogram or boxplot panel, in pixels.
const PANEL_HEIGHT: u32 = 400;
/// Size of the correlation heatmap, in pixels.
const HEATMAP_SIZE: (u32, u32) = (1000, 800);
/// Number of equal-width histogram bins.
const HISTOGRAM_BINS: usize = 30;
/// Whisker reach, in IQRs.
const WHISKER_IQR: f64 = 1.5;

/// Family name every chart text style refers to.
const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Whether the bundled face was accepted by plotters.
static FONT_REGISTERED: Lazy<bool> =
    Lazy::new(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;
type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Base64 PNG figures keyed the way the EDA endpoint returns them.
///
/// A key is absent when its precondition fails: histograms and boxplots need
/// one numeric column, the heatmap needs two.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdaPlots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histograms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boxplots: Option<String>,
}

/// One numeric column pulled out of the frame.
struct NumericColumn {
    name: String,
    values: Vec<Option<f64>>,
}

/// Render every EDA figure for the numeric columns of `df`.
pub fn render_eda(df: &DataFrame) -> Result<EdaPlots> {
    let columns = numeric_column_names(df)
        .into_iter()
        .map(|name| {
            let values = column_f64(df, &name)?;
            Ok(NumericColumn { name, values })
        })
        .collect::<Result<Vec<_>>>()?;

    if columns.is_empty() {
        debug!("No numeric columns, skipping EDA figures");
        return Ok(EdaPlots::default());
    }

    let stacked = (FIGURE_WIDTH, PANEL_HEIGHT * columns.len() as u32);
    let histograms = render_png(stacked, |root| draw_histograms(root, &columns))?;
    let correlation_matrix = if columns.len() >= 2 {
        Some(render_png(HEATMAP_SIZE, |root| {
            draw_correlation_heatmap(root, &columns)
        })?)
    } else {
        None
    };
    let boxplots = render_png(stacked, |root| draw_boxplots(root, &columns))?;

    info!(
        numeric_columns = columns.len(),
        heatmap = correlation_matrix.is_some(),
        "EDA figures rendered"
    );

    Ok(EdaPlots {
        histograms: Some(histograms),
        correlation_matrix,
        boxplots: Some(boxplots),
    })
}

/// Draw into a fresh PNG of `size` and return its base64 encoding.
fn render_png<F>(size: (u32, u32), draw: F) -> Result<String>
where
    F: FnOnce(&Area<'_>) -> DrawResult,
{
    if !*FONT_REGISTERED {
        return Err(ProcessingError::Plotting(
            "bundled chart font could not be loaded".to_string(),
        ));
    }

    let file = tempfile::Builder::new()
        .prefix("edalab-")
        .suffix(".png")
        .tempfile()?;

    draw_to_path(file.path(), size, draw).map_err(|e| ProcessingError::Plotting(e.to_string()))?;

    let bytes = std::fs::read(file.path())?;
    Ok(STANDARD.encode(bytes))
}

fn draw_to_path<F>(path: &Path, size: (u32, u32), draw: F) -> DrawResult
where
    F: FnOnce(&Area<'_>) -> DrawResult,
{
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw(&root)?;
    root.present()?;
    Ok(())
}

// =============================================================================
// Histograms
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct HistogramBin {
    start: f64,
    end: f64,
    count: usize,
}

/// Equal-width bins over sorted values. A constant column gets a single unit-wide bin.
fn build_histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin {
            start: min - 0.5,
            end: max + 0.5,
            count: sorted.len(),
        }];
    }

    let bin_count = bins.max(1);
    let width = (max - min) / bin_count as f64;
    let mut counts = vec![0usize; bin_count];
    for value in sorted {
        let index = (((value - min) / width) as usize).min(bin_count - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: min + idx as f64 * width,
            end: min + (idx as f64 + 1.0) * width,
            count,
        })
        .collect()
}

fn draw_histograms(root: &Area<'_>, columns: &[NumericColumn]) -> DrawResult {
    let panels = root.split_evenly((columns.len(), 1));
    for (panel, column) in panels.iter().zip(columns) {
        let bins = build_histogram(&sorted_values(&column.values), HISTOGRAM_BINS);
        let (x_min, x_max) = match (bins.first(), bins.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (0.0, 1.0),
        };
        let y_max = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64 * 1.1;

        let mut chart = ChartBuilder::on(panel)
            .caption(format!("Distribution of {}", column.name), (FONT_FAMILY, 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;
        chart
            .configure_mesh()
            .x_desc(column.name.as_str())
            .y_desc("Count")
            .draw()?;

        chart.draw_series(bins.iter().map(|bin| {
            Rectangle::new(
                [(bin.start, 0.0), (bin.end, bin.count as f64)],
                BLUE.mix(0.6).filled(),
            )
        }))?;
        chart.draw_series(bins.iter().map(|bin| {
            Rectangle::new(
                [(bin.start, 0.0), (bin.end, bin.count as f64)],
                BLACK.mix(0.4).stroke_width(1),
            )
        }))?;
    }
    Ok(())
}

// =============================================================================
// Correlation heatmap
// =============================================================================

/// Pairwise-complete Pearson correlation matrix. Undefined cells are `None`.
fn correlation_matrix(columns: &[NumericColumn]) -> Vec<Vec<Option<f64>>> {
    let n = columns.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&columns[i].values, &columns[j].values);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

/// Diverging blue-white-red scale over `[-1, 1]`.
fn diverging_color(r: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let t = r.clamp(-1.0, 1.0);
    let (from, to, w) = if t < 0.0 { (MID, COLD, -t) } else { (MID, HOT, t) };
    let lerp = |a: f64, b: f64| (a + (b - a) * w).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

fn draw_correlation_heatmap(root: &Area<'_>, columns: &[NumericColumn]) -> DrawResult {
    let matrix = correlation_matrix(columns);
    let n = columns.len() as i32;
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption("Correlation Matrix", (FONT_FAMILY, 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(120)
        .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

    let x_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => names.get(*i as usize).map(|s| s.to_string()).unwrap_or_default(),
        _ => String::new(),
    };
    // Row 0 is drawn at the top, so the y axis reads names back to front.
    let y_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => names
            .get((n - 1 - *i) as usize)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(columns.len())
        .y_labels(columns.len())
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .draw()?;

    let cell = |row: usize, col: usize| {
        let x = col as i32;
        let y = n - 1 - row as i32;
        (x, y)
    };

    chart.draw_series(matrix.iter().enumerate().flat_map(|(row, values)| {
        values.iter().enumerate().map(move |(col, r)| {
            let (x, y) = cell(row, col);
            let color = r.map(diverging_color).unwrap_or(RGBColor(200, 200, 200));
            Rectangle::new(
                [
                    (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                ],
                color.filled(),
            )
        })
    }))?;

    let annotation = TextStyle::from((FONT_FAMILY, 16).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(matrix.iter().enumerate().flat_map(|(row, values)| {
        let annotation = annotation.clone();
        values.iter().enumerate().map(move |(col, r)| {
            let (x, y) = cell(row, col);
            let label = r.map(|v| format!("{v:.2}")).unwrap_or_else(|| "nan".to_string());
            Text::new(
                label,
                (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
                annotation.clone(),
            )
        })
    }))?;

    Ok(())
}

// =============================================================================
// Boxplots
// =============================================================================

/// Five-number summary plus fliers for one column.
#[derive(Debug, Clone, PartialEq)]
struct BoxSummary {
    q1: f64,
    median: f64,
    q3: f64,
    whisker_low: f64,
    whisker_high: f64,
    fliers: Vec<f64>,
}

fn box_summary(sorted: &[f64]) -> Option<BoxSummary> {
    let q1 = quantile_sorted(sorted, 0.25)?;
    let median = quantile_sorted(sorted, 0.5)?;
    let q3 = quantile_sorted(sorted, 0.75)?;
    let iqr = q3 - q1;
    let low_fence = q1 - WHISKER_IQR * iqr;
    let high_fence = q3 + WHISKER_IQR * iqr;

    let inside = || sorted.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);
    let whisker_low = inside().next().unwrap_or(q1);
    let whisker_high = inside().last().unwrap_or(q3);
    let fliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();

    Some(BoxSummary {
        q1,
        median,
        q3,
        whisker_low,
        whisker_high,
        fliers,
    })
}

fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span.abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min - span * 0.05, max + span * 0.05)
    }
}

fn draw_boxplots(root: &Area<'_>, columns: &[NumericColumn]) -> DrawResult {
    let panels = root.split_evenly((columns.len(), 1));
    for (panel, column) in panels.iter().zip(columns) {
        let sorted = sorted_values(&column.values);
        let (x_min, x_max) = match (sorted.first(), sorted.last()) {
            (Some(min), Some(max)) => padded_range(*min, *max),
            _ => (0.0, 1.0),
        };

        let mut chart = ChartBuilder::on(panel)
            .caption(format!("Boxplot of {}", column.name), (FONT_FAMILY, 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(20)
            .build_cartesian_2d(x_min..x_max, 0f64..1f64)?;
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(0)
            .x_desc(column.name.as_str())
            .draw()?;

        let Some(summary) = box_summary(&sorted) else {
            continue;
        };

        chart.draw_series(std::iter::once(Rectangle::new(
            [(summary.q1, 0.3), (summary.q3, 0.7)],
            BLUE.mix(0.3).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(summary.q1, 0.3), (summary.q3, 0.7)],
            BLACK.stroke_width(2),
        )))?;

        let lines = [
            vec![(summary.median, 0.3), (summary.median, 0.7)],
            vec![(summary.whisker_low, 0.5), (summary.q1, 0.5)],
            vec![(summary.q3, 0.5), (summary.whisker_high, 0.5)],
            vec![(summary.whisker_low, 0.4), (summary.whisker_low, 0.6)],
            vec![(summary.whisker_high, 0.4), (summary.whisker_high, 0.6)],
        ];
        chart.draw_series(
            lines
                .into_iter()
                .map(|points| PathElement::new(points, BLACK.stroke_width(2))),
        )?;

        chart.draw_series(
            summary
                .fliers
                .iter()
                .map(|v| Circle::new((*v, 0.5), 4, BLACK.stroke_width(1))),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn decode(encoded: &str) -> Vec<u8> {
        STANDARD.decode(encoded).unwrap()
    }

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_build_histogram_counts_every_value() {
        let sorted = [1.0, 1.5, 2.0, 2.5, 3.0, 10.0];
        let bins = build_histogram(&sorted, 3);
        assert_eq!(bins.len(), 3);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), sorted.len());
        assert_eq!(bins[2].count, 1);
    }

    #[test]
    fn test_build_histogram_constant_column() {
        let bins = build_histogram(&[4.0, 4.0, 4.0], 30);
        assert_eq!(
            bins,
            vec![HistogramBin {
                start: 3.5,
                end: 4.5,
                count: 3
            }]
        );
        assert!(build_histogram(&[], 30).is_empty());
    }

    #[test]
    fn test_box_summary_separates_fliers() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let summary = box_summary(&sorted).unwrap();
        assert_eq!(summary.q1, 2.25);
        assert_eq!(summary.q3, 4.75);
        assert_eq!(summary.whisker_low, 1.0);
        assert_eq!(summary.whisker_high, 5.0);
        assert_eq!(summary.fliers, vec![100.0]);
        assert!(box_summary(&[]).is_none());
    }

    #[test]
    fn test_diverging_color_endpoints() {
        assert_eq!(diverging_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging_color(0.0), RGBColor(221, 221, 221));
        assert_eq!(diverging_color(1.0), RGBColor(180, 4, 38));
    }

    #[test]
    fn test_render_eda_keys_follow_numeric_column_count() {
        let none = df!["label" => ["a", "b"]].unwrap();
        assert_eq!(render_eda(&none).unwrap(), EdaPlots::default());

        let one = df!["x" => [1.0, 2.0, 3.0], "label" => ["a", "b", "c"]].unwrap();
        let plots = render_eda(&one).unwrap();
        assert!(plots.histograms.is_some());
        assert!(plots.boxplots.is_some());
        assert!(plots.correlation_matrix.is_none());

        let json = serde_json::to_value(&plots).unwrap();
        assert!(json.get("correlation_matrix").is_none());
    }

    #[test]
    fn test_text_reaches_the_bitmap() {
        let blank = render_png((160, 60), |_| Ok(())).unwrap();
        let labelled = render_png((160, 60), |root| {
            root.draw(&Text::new("0.42", (10, 10), (FONT_FAMILY, 24).into_font()))?;
            Ok(())
        })
        .unwrap();

        assert_ne!(decode(&blank), decode(&labelled));
    }

    #[test]
    fn test_heatmap_draws_column_names() {
        let short = df!["a" => [1.0, 2.0, 4.0], "b" => [3.0, 1.0, 2.0]].unwrap();
        let long = df!["alpha" => [1.0, 2.0, 4.0], "beta" => [3.0, 1.0, 2.0]].unwrap();

        let short = render_eda(&short).unwrap();
        let long = render_eda(&long).unwrap();

        // Same values, so only the labels can tell the images apart
        assert_ne!(short.correlation_matrix, long.correlation_matrix);
        assert_ne!(short.histograms, long.histograms);
    }

    #[test]
    fn test_render_eda_produces_png_images() {
        let df = df![
            "close" => [1.0, 2.0, 3.5, 2.0, 8.0],
            "volume" => [Some(10i64), Some(12), None, Some(9), Some(30)],
        ]
        .unwrap();

        let plots = render_eda(&df).unwrap();
        for encoded in [&plots.histograms, &plots.correlation_matrix, &plots.boxplots] {
            let bytes = decode(encoded.as_deref().unwrap());
            assert_eq!(&bytes[..8], &PNG_MAGIC);
        }
    }
}
