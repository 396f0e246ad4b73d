//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - each series is drawn as a connected line with its own glyph
//! - optional vertical markers (`|`) at given volumes, e.g. equivalence points
//!
//! Saturated transform values (`±f64::MAX`) are ignored when choosing the
//! y-range and pinned to the top/bottom row.

use crate::domain::{Curve, SeriesBundle};

/// Glyphs assigned to series in order.
const GLYPHS: [char; 6] = ['*', '+', 'x', 'o', '#', '%'];

/// One line on the plot.
#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl PlotSeries {
    pub fn from_curve(label: impl Into<String>, curve: &Curve) -> Self {
        Self {
            label: label.into(),
            points: curve.to_pairs(),
        }
    }
}

/// Render a single curve.
pub fn render_curve_plot(curve: &Curve, y_label: &str, markers: &[f64], width: usize, height: usize) -> String {
    render_ascii_plot(&[PlotSeries::from_curve(y_label, curve)], y_label, markers, width, height)
}

/// Render every series of a bundle, or only those whose label contains
/// `filter`.
pub fn render_bundle_plot(bundle: &SeriesBundle, filter: Option<&str>, width: usize, height: usize) -> String {
    let series: Vec<PlotSeries> = bundle
        .series
        .iter()
        .filter(|s| filter.is_none_or(|f| s.label.contains(f)))
        .map(|s| PlotSeries::from_curve(s.label.clone(), &s.curve))
        .collect();
    let y_label = match series.as_slice() {
        [only] => bundle
            .series
            .iter()
            .find(|s| s.label == only.label)
            .map(|s| s.y_label.as_str())
            .unwrap_or("y"),
        _ => "y",
    };
    render_ascii_plot(&series, y_label, &[], width, height)
}

/// Render several series on shared axes.
pub fn render_ascii_plot(
    series: &[PlotSeries],
    y_label: &str,
    markers: &[f64],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for (s, glyph) in series.iter().zip(GLYPHS.iter().cycle()) {
        draw_curve(&mut grid, &s.points, x_min, x_max, y_min, y_max, *glyph);
    }
    for &v in markers {
        if v >= x_min && v <= x_max {
            let x = map_x(v, x_min, x_max, width);
            for row in grid.iter_mut() {
                if row[x] == ' ' {
                    row[x] = '|';
                }
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: V=[{x_min:.2}, {x_max:.2}] mL | {y_label}=[{}, {}]\n",
        fmt_axis(y_min),
        fmt_axis(y_max)
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    if series.len() > 1 {
        let legend: Vec<String> = series
            .iter()
            .zip(GLYPHS.iter().cycle())
            .map(|(s, g)| format!("{g} {}", s.label))
            .collect();
        out.push_str(&legend.join("  "));
        out.push('\n');
    }

    out
}

fn fmt_axis(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e5 || v.abs() < 1e-3) {
        format!("{v:.3e}")
    } else {
        format!("{v:.4}")
    }
}

fn is_plottable(y: f64) -> bool {
    y.is_finite() && y.abs() < f64::MAX
}

fn x_range(series: &[PlotSeries]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in series.iter().flat_map(|s| s.points.iter()) {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    (min_x.is_finite() && max_x.is_finite() && max_x > min_x).then_some((min_x, max_x))
}

fn y_range(series: &[PlotSeries]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in series.iter().flat_map(|s| s.points.iter()) {
        if is_plottable(y) {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    (min_y.is_finite() && max_y.is_finite() && max_y > min_y).then_some((min_y, max_y))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    points: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    glyph: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        let xx = map_x(x, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, xx, yy, glyph);
        } else {
            grid[yy][xx] = glyph;
        }
        prev = Some((xx, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
