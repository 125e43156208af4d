// ============================================================
// Layer 6 — Plots
// ============================================================
// Renders the figures the training pipelines produce:
//
//   learning curves  — one polyline per series over epochs
//                      (train vs validation loss, accuracy, MAE)
//   prediction grid  — 2×5 grid of digit images, each titled
//                      "Actual: a, Predicted: p"
//
// Figures are written as standalone SVG files into the run's
// output directory rather than opened in a window, so the
// pipelines also work on headless machines.

use anyhow::{Context, Result};
use std::{fmt::Write, fs, path::Path};

use crate::data::digits::IMAGE_SIDE;

const CURVE_WIDTH:  f64 = 800.0;
const CURVE_HEIGHT: f64 = 500.0;
const MARGIN_LEFT:  f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP:   f64 = 50.0;
const MARGIN_BOTTOM: f64 = 50.0;
const Y_TICKS:      usize = 5;
const PALETTE: [&str; 4] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"];

const GRID_COLS:  usize = 5;
const GRID_ROWS:  usize = 2;
const PIXEL_SIZE: usize = 7;
const PANEL_PAD:  usize = 20;
const TITLE_BAND: usize = 30;

/// One named line of a learning-curve plot
pub struct Series<'a> {
    pub label:  &'a str,
    pub values: &'a [f64],
}

/// A digit image with its true and predicted class
pub struct DigitPanel<'a> {
    pub pixels:    &'a [f32],
    pub actual:    usize,
    pub predicted: usize,
}

/// y-axis range covering every finite value with a small margin
fn value_range(series: &[Series<'_>]) -> (f64, f64) {
    let finite = series.iter().flat_map(|s| s.values.iter().copied()).filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-6);
    (lo - pad, hi + pad)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// SVG document with every series drawn against epoch number (1-based).
pub fn render_curves(title: &str, y_label: &str, series: &[Series<'_>]) -> String {
    let epochs = series.iter().map(|s| s.values.len()).max().unwrap_or(0).max(2);
    let (y_min, y_max) = value_range(series);

    let plot_w = CURVE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = CURVE_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let x_at = |epoch: usize| MARGIN_LEFT + (epoch - 1) as f64 / (epochs - 1) as f64 * plot_w;
    let y_at = |v: f64| MARGIN_TOP + (y_max - v) / (y_max - y_min) * plot_h;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">
  <rect width="100%" height="100%" fill="white"/>
  <text x="{cx}" y="28" text-anchor="middle" font-size="18">{title}</text>
"#,
        w = CURVE_WIDTH,
        h = CURVE_HEIGHT,
        cx = CURVE_WIDTH / 2.0,
        title = escape(title),
    );

    // Axes
    let (x0, y0) = (MARGIN_LEFT, MARGIN_TOP + plot_h);
    let _ = writeln!(
        svg,
        r#"  <path d="M {x0} {MARGIN_TOP} L {x0} {y0} L {:.1} {y0}" fill="none" stroke="black"/>"#,
        x0 + plot_w
    );

    // y ticks with light grid lines
    for i in 0..=Y_TICKS {
        let v = y_min + (y_max - y_min) * i as f64 / Y_TICKS as f64;
        let y = y_at(v);
        let _ = writeln!(
            svg,
            r##"  <line x1="{x0}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#ddd"/>
  <text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{v:.3}</text>"##,
            x0 + plot_w,
            x0 - 6.0,
            y + 4.0,
        );
    }

    // x ticks, at most ~10 labels
    let step = epochs.div_ceil(10).max(1);
    for epoch in (1..=epochs).step_by(step) {
        let _ = writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{epoch}</text>"#,
            x_at(epoch),
            y0 + 16.0,
        );
    }
    let _ = writeln!(
        svg,
        r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">epoch</text>
  <text x="18" y="{:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 18 {:.1})">{}</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        CURVE_HEIGHT - 10.0,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0,
        escape(y_label),
    );

    // One polyline per series, NaN epochs skipped
    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let points: Vec<String> = s.values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(e, &v)| format!("{:.1},{:.1}", x_at(e + 1), y_at(v)))
            .collect();
        let _ = writeln!(
            svg,
            r#"  <polyline points="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
            points.join(" ")
        );

        // Legend entry, top right
        let ly = MARGIN_TOP + 15.0 + 18.0 * i as f64;
        let lx = MARGIN_LEFT + plot_w - 160.0;
        let _ = writeln!(
            svg,
            r#"  <line x1="{lx:.1}" y1="{ly:.1}" x2="{:.1}" y2="{ly:.1}" stroke="{color}" stroke-width="2"/>
  <text x="{:.1}" y="{:.1}" font-size="12">{}</text>"#,
            lx + 20.0,
            lx + 26.0,
            ly + 4.0,
            escape(s.label),
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// SVG document with up to 10 digits in a 2×5 grid, grayscale.
pub fn render_digit_grid(panels: &[DigitPanel<'_>]) -> String {
    let image_px = IMAGE_SIDE * PIXEL_SIZE;
    let panel_w  = image_px + 2 * PANEL_PAD;
    let panel_h  = image_px + TITLE_BAND + PANEL_PAD;
    let (w, h)   = (panel_w * GRID_COLS, panel_h * GRID_ROWS);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">
  <rect width="100%" height="100%" fill="white"/>
"#
    );

    for (i, panel) in panels.iter().take(GRID_COLS * GRID_ROWS).enumerate() {
        let left = (i % GRID_COLS) * panel_w;
        let top  = (i / GRID_COLS) * panel_h;
        let (ix, iy) = (left + PANEL_PAD, top + TITLE_BAND);

        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="middle" font-size="13">Actual: {}, Predicted: {}</text>
  <rect x="{ix}" y="{iy}" width="{image_px}" height="{image_px}" fill="black"/>"#,
            left + panel_w / 2,
            top + TITLE_BAND - 10,
            panel.actual,
            panel.predicted,
        );

        // Black background already drawn; only lit pixels need a rect
        for (p, &value) in panel.pixels.iter().enumerate().take(IMAGE_SIDE * IMAGE_SIDE) {
            let shade = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            if shade == 0 {
                continue;
            }
            let (row, col) = (p / IMAGE_SIDE, p % IMAGE_SIDE);
            let _ = writeln!(
                svg,
                r#"  <rect x="{}" y="{}" width="{PIXEL_SIZE}" height="{PIXEL_SIZE}" fill="rgb({shade},{shade},{shade})"/>"#,
                ix + col * PIXEL_SIZE,
                iy + row * PIXEL_SIZE,
            );
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn write_svg(path: &Path, svg: &str) -> Result<()> {
    fs::write(path, svg).with_context(|| format!("Cannot write plot '{}'", path.display()))?;
    tracing::info!("Wrote plot '{}'", path.display());
    Ok(())
}

/// Learning curves into an SVG file
pub fn plot_curves(path: &Path, title: &str, y_label: &str, series: &[Series<'_>]) -> Result<()> {
    write_svg(path, &render_curves(title, y_label, series))
}

/// Prediction grid into an SVG file
pub fn plot_digit_grid(path: &Path, panels: &[DigitPanel<'_>]) -> Result<()> {
    write_svg(path, &render_digit_grid(panels))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_range_ignores_nan() {
        let a = [1.0, f64::NAN, 3.0];
        let (lo, hi) = value_range(&[Series { label: "a", values: &a }]);
        assert!(lo < 1.0 && lo > 0.8);
        assert!(hi > 3.0 && hi < 3.2);
    }

    #[test]
    fn test_value_range_empty() {
        assert_eq!(value_range(&[]), (0.0, 1.0));
    }

    #[test]
    fn test_curves_have_one_polyline_per_series() {
        let train = [2.0, 1.5, 1.1];
        let val   = [2.2, 1.7, 1.4];
        let svg = render_curves("Loss", "loss", &[
            Series { label: "Train Loss", values: &train },
            Series { label: "Validation Loss", values: &val },
        ]);
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("Validation Loss"));
    }

    #[test]
    fn test_single_epoch_curve_is_finite() {
        let one = [0.5];
        let svg = render_curves("Acc", "accuracy", &[Series { label: "Train Accuracy", values: &one }]);
        assert!(!svg.contains("NaN") && !svg.contains("inf"));
    }

    #[test]
    fn test_digit_grid_titles_and_pixels() {
        let mut pixels = vec![0.0f32; IMAGE_SIDE * IMAGE_SIDE];
        pixels[0] = 1.0;
        pixels[29] = 0.5;
        let panels = [
            DigitPanel { pixels: &pixels, actual: 7, predicted: 7 },
            DigitPanel { pixels: &pixels, actual: 2, predicted: 3 },
        ];
        let svg = render_digit_grid(&panels);
        assert!(svg.contains("Actual: 7, Predicted: 7"));
        assert!(svg.contains("Actual: 2, Predicted: 3"));
        assert_eq!(svg.matches("rgb(255,255,255)").count(), 2);
        assert_eq!(svg.matches("rgb(128,128,128)").count(), 2);
    }

    #[test]
    fn test_plot_file_written() {
        let dir = std::env::temp_dir().join("ai_demos_plot_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("loss.svg");
        let v = [1.0, 0.5];
        plot_curves(&path, "Loss", "loss", &[Series { label: "Train Loss", values: &v }]).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("<polyline"));
    }
}
