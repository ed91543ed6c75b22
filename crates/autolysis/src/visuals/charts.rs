//! Chart primitives drawn with plotters.
//!
//! Every public entry point opens its own bitmap backend, draws, presents
//! and drops it before returning, so no drawing state leaks between charts.

use crate::error::{AnalysisError, Result};
use crate::types::CorrelationMatrix;
use crate::utils::{quantile_sorted, sample_std, sorted_copy};
use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;
use std::path::Path;

pub(crate) type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;
pub(crate) type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const FONT: &str = "sans-serif";
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

// plotters resolves every text style through its process-wide font table
static FONT_REGISTERED: Lazy<bool> =
    Lazy::new(|| register_font(FONT, FontStyle::Normal, EMBEDDED_FONT).is_ok());
const BAR_FILL: RGBColor = RGBColor(76, 114, 176);
const BAR_EDGE: RGBColor = RGBColor(40, 60, 100);
const KDE_LINE: RGBColor = RGBColor(31, 58, 147);
const BOX_FILL: RGBColor = RGBColor(221, 132, 82);
const MISSING_CELL: RGBColor = RGBColor(200, 200, 200);

// coolwarm anchors at -1, 0 and +1
const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

/// Open a PNG, run `draw` on its root area and flush it to disk.
pub(crate) fn render_png<F>(path: &Path, size: (u32, u32), draw: F) -> Result<()>
where
    F: FnOnce(&Area<'_>) -> DrawResult<()>,
{
    let outcome = (|| -> DrawResult<()> {
        if !*FONT_REGISTERED {
            return Err("embedded chart font could not be loaded".into());
        }
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
        Ok(())
    })();

    outcome.map_err(|e| AnalysisError::RenderFailed {
        artifact: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        reason: e.to_string(),
    })
}

/// Rows and columns of the subplot grid for `n` panels.
pub(crate) fn grid_shape(n: usize) -> (usize, usize) {
    let cols = n.clamp(1, 3);
    (n.div_ceil(cols).max(1), cols)
}

/// Diverging color for a coefficient in [-1, 1], centered at zero.
pub(crate) fn diverging_color(value: Option<f64>) -> RGBColor {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return MISSING_CELL;
    };
    let v = v.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 {
        (NEUTRAL, COOL, -v)
    } else {
        (NEUTRAL, WARM, v)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

// ============================================================================
// Histogram with density overlay
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Equal-width bins: the larger of the Sturges and Freedman-Diaconis counts,
/// capped at 50.
pub(crate) fn histogram_bins(values: &[f64]) -> Vec<Bin> {
    if values.is_empty() {
        return Vec::new();
    }
    let sorted = sorted_copy(values);
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    if min == max {
        return vec![Bin {
            lo: min - 0.5,
            hi: max + 0.5,
            count: values.len(),
        }];
    }

    let n = values.len() as f64;
    let sturges = (n.log2().ceil() as usize) + 1;
    let iqr = quantile_sorted(&sorted, 0.75).unwrap_or(max) - quantile_sorted(&sorted, 0.25).unwrap_or(min);
    let fd = if iqr > 0.0 {
        let width = 2.0 * iqr / n.cbrt();
        ((max - min) / width).ceil() as usize
    } else {
        0
    };
    let count = sturges.max(fd).clamp(1, 50);

    let width = (max - min) / count as f64;
    let mut bins: Vec<Bin> = (0..count)
        .map(|i| Bin {
            lo: min + width * i as f64,
            hi: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(count - 1);
        bins[idx].count += 1;
    }
    bins
}

/// Gaussian kernel density estimate scaled to histogram counts, using
/// Scott's rule for the bandwidth. `None` when the spread is zero.
pub(crate) fn kde_curve(values: &[f64], bin_width: f64, lo: f64, hi: f64) -> Option<Vec<(f64, f64)>> {
    let std = sample_std(values)?;
    if std <= 0.0 || hi <= lo {
        return None;
    }
    let n = values.len() as f64;
    let bandwidth = std * n.powf(-0.2);
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let steps = 200;

    Some(
        (0..=steps)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / steps as f64;
                let density: f64 = values
                    .iter()
                    .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                    .sum::<f64>()
                    * norm;
                (x, density * n * bin_width)
            })
            .collect(),
    )
}

pub(crate) fn draw_histogram(area: &Area<'_>, name: &str, values: &[f64]) -> DrawResult<()> {
    let bins = histogram_bins(values);
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        area.titled(&format!("Histogram of {} (no data)", name), (FONT, 16))?;
        return Ok(());
    };
    let (lo, hi) = (first.lo, last.hi);
    let curve = kde_curve(values, first.hi - first.lo, lo, hi);

    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    let max_curve = curve
        .as_ref()
        .map(|c| c.iter().map(|(_, y)| *y).fold(0.0, f64::max))
        .unwrap_or(0.0);
    let y_max = (max_count.max(max_curve) * 1.1).max(1.0);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("Histogram of {}", name), (FONT, 18))
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(lo..hi, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(name)
        .y_desc("Count")
        .draw()?;

    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], BAR_FILL.mix(0.6).filled())
    }))?;
    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], BAR_EDGE.stroke_width(1))
    }))?;

    if let Some(curve) = curve {
        chart.draw_series(LineSeries::new(curve, KDE_LINE.stroke_width(2)))?;
    }
    Ok(())
}

// ============================================================================
// Box and whisker
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Quartiles with whiskers reaching the furthest points within 1.5 IQR.
    pub(crate) fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = sorted_copy(values);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let median = quantile_sorted(&sorted, 0.5)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= low_fence && *v <= high_fence)
            .collect();
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

pub(crate) fn draw_boxplot(area: &Area<'_>, name: &str, values: &[f64]) -> DrawResult<()> {
    let Some(stats) = BoxStats::from_values(values) else {
        area.titled(&format!("Boxplot of {} (no data)", name), (FONT, 16))?;
        return Ok(());
    };

    let lo = stats
        .outliers
        .first()
        .copied()
        .unwrap_or(stats.lower_whisker)
        .min(stats.lower_whisker);
    let hi = stats
        .outliers
        .last()
        .copied()
        .unwrap_or(stats.upper_whisker)
        .max(stats.upper_whisker);
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };

    let mut chart = ChartBuilder::on(area)
        .caption(format!("Boxplot of {}", name), (FONT, 18))
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(10)
        .build_cartesian_2d((lo - pad)..(hi + pad), 0f64..1f64)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_desc(name)
        .draw()?;

    chart.draw_series(std::iter::once(Rectangle::new(
        [(stats.q1, 0.3), (stats.q3, 0.7)],
        BOX_FILL.mix(0.7).filled(),
    )))?;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(stats.q1, 0.3), (stats.q3, 0.7)],
        BLACK.stroke_width(1),
    )))?;

    let segments = [
        vec![(stats.median, 0.3), (stats.median, 0.7)],
        vec![(stats.lower_whisker, 0.5), (stats.q1, 0.5)],
        vec![(stats.q3, 0.5), (stats.upper_whisker, 0.5)],
        vec![(stats.lower_whisker, 0.4), (stats.lower_whisker, 0.6)],
        vec![(stats.upper_whisker, 0.4), (stats.upper_whisker, 0.6)],
    ];
    chart.draw_series(
        segments
            .into_iter()
            .map(|points| PathElement::new(points, BLACK.stroke_width(2))),
    )?;

    chart.draw_series(
        stats
            .outliers
            .iter()
            .map(|v| Circle::new((*v, 0.5), 3, BLACK.stroke_width(1))),
    )?;
    Ok(())
}

// ============================================================================
// Correlation heatmap
// ============================================================================

pub(crate) fn draw_heatmap(root: &Area<'_>, matrix: &CorrelationMatrix) -> DrawResult<()> {
    let k = matrix.len() as u32;
    let names = &matrix.columns;

    let x_fmt = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };
    // Rows are drawn top-down, so the y axis is reversed.
    let y_fmt = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) if *i < k => names
            .get((k - 1 - *i) as usize)
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(root)
        .caption("Correlation Matrix", (FONT, 28))
        .margin(20)
        .x_label_area_size(120)
        .y_label_area_size(140)
        .build_cartesian_2d((0..k).into_segmented(), (0..k).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(k as usize)
        .y_labels(k as usize)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style((FONT, 14).into_font().transform(FontTransform::Rotate90))
        .draw()?;

    let cells: Vec<(u32, u32, Option<f64>)> = (0..k)
        .flat_map(|row| (0..k).map(move |col| (row, col)))
        .map(|(row, col)| (row, col, matrix.get(row as usize, col as usize)))
        .collect();

    chart.draw_series(cells.iter().map(|&(row, col, value)| {
        let y = k - 1 - row;
        Rectangle::new(
            [
                (SegmentValue::Exact(col), SegmentValue::Exact(y)),
                (SegmentValue::Exact(col + 1), SegmentValue::Exact(y + 1)),
            ],
            diverging_color(value).filled(),
        )
    }))?;

    chart.draw_series(cells.iter().map(|&(row, col, value)| {
        let label = value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "nan".to_string());
        Text::new(
            label,
            (SegmentValue::CenterOf(col), SegmentValue::CenterOf(k - 1 - row)),
            (FONT, 14).into_font(),
        )
    }))?;
    Ok(())
}

// ============================================================================
// Labeled bars
// ============================================================================

pub(crate) fn draw_bars(
    root: &Area<'_>,
    title: &str,
    y_desc: &str,
    labels: &[String],
    values: &[f64],
) -> DrawResult<()> {
    let n = labels.len() as u32;
    let y_max = (values.iter().copied().fold(0.0, f64::max) * 1.1).max(1.0);

    let x_fmt = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 26))
        .margin(15)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n.max(1)).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len().max(1))
        .x_label_formatter(&x_fmt)
        .x_label_style((FONT, 13).into_font().transform(FontTransform::Rotate90))
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BAR_FILL.filled())
            .margin(6)
            .data(values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
    )?;
    Ok(())
}

// ============================================================================
// Monthly lines
// ============================================================================

pub(crate) fn draw_lines(
    root: &Area<'_>,
    title: &str,
    x_labels: &[String],
    series: &[(String, Vec<Option<f64>>)],
) -> DrawResult<()> {
    let observed: Vec<f64> = series
        .iter()
        .flat_map(|(_, ys)| ys.iter().flatten().copied())
        .collect();
    let (mut y_lo, mut y_hi) = observed
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if !y_lo.is_finite() {
        (y_lo, y_hi) = (0.0, 1.0);
    }
    let pad = if y_hi > y_lo { (y_hi - y_lo) * 0.05 } else { 0.5 };
    let last = (x_labels.len() as i32 - 1).max(1);

    let x_fmt = |i: &i32| x_labels.get(*i as usize).cloned().unwrap_or_default();

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 26))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0i32..last, (y_lo - pad)..(y_hi + pad))?;

    chart
        .configure_mesh()
        .x_labels(x_labels.len().clamp(2, 24))
        .x_label_formatter(&x_fmt)
        .x_desc("Month")
        .draw()?;

    for (idx, (name, ys)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let mut labeled = false;

        // Months without observations split the line into separate runs.
        let mut runs: Vec<Vec<(i32, f64)>> = vec![Vec::new()];
        for (i, y) in ys.iter().enumerate() {
            match (y, runs.last_mut()) {
                (Some(v), Some(run)) => run.push((i as i32, *v)),
                _ => runs.push(Vec::new()),
            }
        }

        for run in runs.into_iter().filter(|r| !r.is_empty()) {
            let single = run.len() == 1;
            let anno = if single {
                chart.draw_series(run.into_iter().map(|p| Circle::new(p, 3, color.filled())))?
            } else {
                chart.draw_series(LineSeries::new(run, color.stroke_width(2)))?
            };
            if !labeled {
                anno.label(name.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
                labeled = true;
            }
        }
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape(1), (1, 1));
        assert_eq!(grid_shape(2), (1, 2));
        assert_eq!(grid_shape(3), (1, 3));
        assert_eq!(grid_shape(4), (2, 3));
        assert_eq!(grid_shape(7), (3, 3));
    }

    #[test]
    fn test_histogram_bins_cover_all_values() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let bins = histogram_bins(&values);
        assert!(!bins.is_empty());
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 100);
        assert_eq!(bins.first().unwrap().lo, 0.0);
        assert!((bins.last().unwrap().hi - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_bins_constant_values() {
        let bins = histogram_bins(&[4.0, 4.0, 4.0]);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
        assert!(bins[0].lo < 4.0 && bins[0].hi > 4.0);
    }

    #[test]
    fn test_kde_curve_absent_for_zero_spread() {
        assert!(kde_curve(&[2.0, 2.0, 2.0], 1.0, 1.5, 2.5).is_none());
        assert!(kde_curve(&[1.0], 1.0, 0.0, 2.0).is_none());
    }

    #[test]
    fn test_kde_curve_area_matches_count() {
        let values: Vec<f64> = (0..200).map(|i| (i % 20) as f64).collect();
        let curve = kde_curve(&values, 1.0, -10.0, 30.0).unwrap();
        // Integral of the scaled density approximates n * bin_width.
        let step = 40.0 / 200.0;
        let area: f64 = curve.iter().map(|(_, y)| y * step).sum();
        assert!((area - 200.0).abs() < 5.0);
    }

    #[test]
    fn test_box_stats_with_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
        let stats = BoxStats::from_values(&values).unwrap();
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.upper_whisker, 9.0);
        assert_eq!(stats.lower_whisker, 1.0);
    }

    #[test]
    fn test_diverging_color_is_centered() {
        assert_eq!(diverging_color(Some(0.0)), RGBColor(221, 221, 221));
        assert_eq!(diverging_color(Some(-1.0)), RGBColor(59, 76, 192));
        assert_eq!(diverging_color(Some(1.0)), RGBColor(180, 4, 38));
        assert_eq!(diverging_color(None), MISSING_CELL);
    }

    #[test]
    fn test_render_png_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.png");
        render_png(&path, (400, 300), |root| {
            draw_bars(
                root,
                "Test",
                "Count",
                &["a".to_string(), "b".to_string()],
                &[1.0, 2.0],
            )
        })
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_annotated_heatmap_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.png");
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "b".to_string()],
            values: vec![vec![Some(1.0), Some(0.87)], vec![Some(0.87), None]],
        };

        render_png(&path, (500, 500), |root| draw_heatmap(root, &matrix)).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_rotated_text_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.png");
        render_png(&path, (200, 200), |root| {
            root.draw(&Text::new(
                "0.87 annotation",
                (20, 20),
                (FONT, 14).into_font().transform(FontTransform::Rotate90),
            ))?;
            Ok(())
        })
        .unwrap();
        assert!(path.exists());
    }
}
