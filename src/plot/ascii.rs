//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - point estimates: `o`
//! - fitted curve: `-` line
//! - cells where both coincide: `*`

use crate::domain::ResultRow;

/// Render point estimates and fitted curve of a finished run.
pub fn render_ascii_plot(rows: &[ResultRow], width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = rows.iter().map(|r| (r.time_ms, r.point_estimate)).collect();
    let curve: Vec<(f64, f64)> = rows.iter().map(|r| (r.time_ms, r.fitted_value)).collect();
    render_plot(&points, &curve, width, height)
}

fn render_plot(points: &[(f64, f64)], curve: &[(f64, f64)], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = range(points.iter().chain(curve).map(|&(t, _)| t)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(points.iter().chain(curve).map(|&(_, y)| y)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points can mark agreement.
    draw_curve(&mut grid, curve, t_min, t_max, y_min, y_max);

    for &(t, y) in points {
        if !(t.is_finite() && y.is_finite()) {
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = match grid[yy][x] {
            '-' | '*' => '*',
            _ => 'o',
        };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: time=[{t_min:.0}, {t_max:.0}] ms | AMPA.O=[{y_min:.4}, {y_max:.4}]\n"
    ));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        None
    } else if max > min {
        Some((min, max))
    } else {
        Some((min - 0.5, max + 0.5))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        if !(t.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, '-'),
            None => grid[yy][x] = '-',
        }
        prev = Some((x, yy));
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
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParameterSet;

    fn row(time_ms: f64, point_estimate: f64, fitted_value: f64) -> ResultRow {
        ResultRow {
            params: ParameterSet::new(1.0, 1.0, 1.0, 1.0, 1.0),
            time_ms,
            point_estimate,
            fitted_value,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let rows = vec![row(0.0, 1.0, 0.0), row(9.0, 0.0, 0.0)];

        let txt = render_ascii_plot(&rows, 10, 5);
        let expected = concat!(
            "Plot: time=[0, 9] ms | AMPA.O=[-0.0500, 1.0500]\n",
            "o\n",
            "\n",
            "\n",
            "\n",
            "---------*\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let rows = vec![row(0.0, 0.0, f64::NAN), row(10.0, 1.0, 1.0), row(20.0, 2.0, 2.0)];
        let txt = render_ascii_plot(&rows, 10, 5);
        assert!(txt.starts_with("Plot: time=[0, 20] ms"));
        assert!(txt.contains('*'));
    }
}
