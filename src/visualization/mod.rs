//! Trade history chart
//!
//! Draws the close price, both indicator lines and the executed actions as a
//! standalone SVG document.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::VisualizationError;
use crate::models::TradeRecord;

pub trait Visualizer: Send {
    fn render(&self, records: &[TradeRecord], path: &Path) -> Result<(), VisualizationError>;
}

#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 700,
            title: "Price and EMA crossover trades".to_string(),
        }
    }
}

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 50.0;
const MARKER_SIZE: f64 = 7.0;

const CLOSE_COLOR: &str = "#1f77b4";
const FAST_COLOR: &str = "#ff7f0e";
const SLOW_COLOR: &str = "#2ca02c";

/// Maps data coordinates onto the plot area
struct Frame {
    left: f64,
    top: f64,
    plot_width: f64,
    plot_height: f64,
    count: usize,
    min: f64,
    max: f64,
}

impl Frame {
    fn x(&self, index: usize) -> f64 {
        if self.count <= 1 {
            return self.left + self.plot_width / 2.0;
        }
        self.left + self.plot_width * index as f64 / (self.count - 1) as f64
    }

    fn y(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return self.top + self.plot_height / 2.0;
        }
        self.top + self.plot_height * (self.max - value) / span
    }
}

impl SvgChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Render the chart into an SVG string
    pub fn render_to_string(&self, records: &[TradeRecord]) -> Result<String, VisualizationError> {
        if records.is_empty() {
            return Err(VisualizationError::NoData);
        }

        let values = records
            .iter()
            .flat_map(|r| [Some(r.close), r.fast, r.slow])
            .flatten()
            .filter(|v| v.is_finite());
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() || !max.is_finite() {
            return Err(VisualizationError::NoData);
        }

        let frame = Frame {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            plot_width: self.width as f64 - MARGIN_LEFT - MARGIN_RIGHT,
            plot_height: self.height as f64 - MARGIN_TOP - MARGIN_BOTTOM,
            count: records.len(),
            min,
            max,
        };

        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="30" font-family="sans-serif" font-size="18" text-anchor="middle">{}</text>"#,
            self.width / 2,
            escape(&self.title)
        );

        self.write_axes(&mut svg, &frame, records);

        write_polyline(&mut svg, &frame, records.iter().map(|r| Some(r.close)), CLOSE_COLOR, 1.2);
        write_polyline(&mut svg, &frame, records.iter().map(|r| r.fast), FAST_COLOR, 1.5);
        write_polyline(&mut svg, &frame, records.iter().map(|r| r.slow), SLOW_COLOR, 1.5);

        for (index, record) in records.iter().enumerate() {
            let x = frame.x(index);
            let y = frame.y(record.close);
            match record.action.as_str() {
                "BUY" => write_triangle(&mut svg, x, y, true, "green"),
                "SELL" => write_triangle(&mut svg, x, y, false, "red"),
                "STOP_LOSS" => write_cross(&mut svg, x, y, "purple"),
                _ => {}
            }
        }

        write_legend(&mut svg, self.width as f64 - MARGIN_RIGHT - 150.0, MARGIN_TOP + 10.0);
        svg.push_str("</svg>\n");
        Ok(svg)
    }

    fn write_axes(&self, svg: &mut String, frame: &Frame, records: &[TradeRecord]) {
        let bottom = frame.top + frame.plot_height;
        let right = frame.left + frame.plot_width;

        let _ = writeln!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#999"/>"##,
            frame.left, frame.top, frame.plot_width, frame.plot_height
        );

        for step in 0..=4 {
            let value = frame.min + (frame.max - frame.min) * step as f64 / 4.0;
            let y = frame.y(value);
            let _ = writeln!(
                svg,
                r##"<line x1="{:.1}" y1="{y:.1}" x2="{right:.1}" y2="{y:.1}" stroke="#eee"/><text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11" text-anchor="end">{value:.2}</text>"##,
                frame.left,
                frame.left - 6.0,
                y + 4.0,
            );
        }

        let first = records.first().map(|r| r.timestamp.format("%Y-%m-%d %H:%M"));
        let last = records.last().map(|r| r.timestamp.format("%Y-%m-%d %H:%M"));
        if let (Some(first), Some(last)) = (first, last) {
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11">{}</text>"#,
                frame.left,
                bottom + 20.0,
                first
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11" text-anchor="end">{}</text>"#,
                right,
                bottom + 20.0,
                last
            );
        }
    }
}

impl Visualizer for SvgChartRenderer {
    fn render(&self, records: &[TradeRecord], path: &Path) -> Result<(), VisualizationError> {
        let svg = self.render_to_string(records)?;

        // Replace the previous chart in one step
        let tmp_path = path.with_extension("svg.tmp");
        fs::write(&tmp_path, svg)?;
        fs::rename(&tmp_path, path)?;

        tracing::debug!(path = %path.display(), points = records.len(), "Chart rendered");
        Ok(())
    }
}

/// Draw one series, breaking the line wherever a value is missing
fn write_polyline(
    svg: &mut String,
    frame: &Frame,
    values: impl Iterator<Item = Option<f64>>,
    color: &str,
    stroke_width: f64,
) {
    let mut segment: Vec<String> = Vec::new();
    let flush = |segment: &mut Vec<String>, svg: &mut String| {
        if segment.len() > 1 {
            let _ = writeln!(
                svg,
                r#"<polyline fill="none" stroke="{}" stroke-width="{}" points="{}"/>"#,
                color,
                stroke_width,
                segment.join(" ")
            );
        }
        segment.clear();
    };

    for (index, value) in values.enumerate() {
        match value.filter(|v| v.is_finite()) {
            Some(v) => segment.push(format!("{:.1},{:.1}", frame.x(index), frame.y(v))),
            None => flush(&mut segment, svg),
        }
    }
    flush(&mut segment, svg);
}

fn write_triangle(svg: &mut String, x: f64, y: f64, up: bool, color: &str) {
    let tip = if up { y - MARKER_SIZE } else { y + MARKER_SIZE };
    let base = if up { y + MARKER_SIZE } else { y - MARKER_SIZE };
    let _ = writeln!(
        svg,
        r#"<polygon points="{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}" fill="{}"/>"#,
        x,
        tip,
        x - MARKER_SIZE,
        base,
        x + MARKER_SIZE,
        base,
        color
    );
}

fn write_cross(svg: &mut String, x: f64, y: f64, color: &str) {
    let s = MARKER_SIZE;
    let _ = writeln!(
        svg,
        r#"<path d="M{:.1},{:.1} L{:.1},{:.1} M{:.1},{:.1} L{:.1},{:.1}" stroke="{}" stroke-width="2.5"/>"#,
        x - s,
        y - s,
        x + s,
        y + s,
        x - s,
        y + s,
        x + s,
        y - s,
        color
    );
}

fn write_legend(svg: &mut String, x: f64, y: f64) {
    let entries = [
        ("Close", CLOSE_COLOR),
        ("Fast EMA", FAST_COLOR),
        ("Slow EMA", SLOW_COLOR),
    ];
    for (i, (label, color)) in entries.iter().enumerate() {
        let row = y + i as f64 * 18.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{row:.1}" x2="{:.1}" y2="{row:.1}" stroke="{color}" stroke-width="2"/><text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12">{label}</text>"#,
            x,
            x + 24.0,
            x + 30.0,
            row + 4.0,
        );
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
