//! Inline SVG rendering of [`ChartData`] for the HTML views.

use std::fmt::Write;

use crate::domain::chart::{ChartData, ChartKind};

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 320.0;
const PAD_LEFT: f64 = 64.0;
const PAD_RIGHT: f64 = 16.0;
const PAD_TOP: f64 = 36.0;
const PAD_BOTTOM: f64 = 56.0;
const MAX_X_TICKS: usize = 10;
const Y_TICKS: usize = 5;

pub const EMPTY_CHART: &str = "<p class=\"chart-empty\">No data available</p>";

/// Plot area geometry shared by the line and bar renderers.
struct Frame {
    min: f64,
    max: f64,
    n: usize,
}

impl Frame {
    fn plot_width() -> f64 {
        WIDTH - PAD_LEFT - PAD_RIGHT
    }

    fn plot_height() -> f64 {
        HEIGHT - PAD_TOP - PAD_BOTTOM
    }

    fn y(&self, v: f64) -> f64 {
        let range = self.max - self.min;
        let t = if range > 0.0 { (v - self.min) / range } else { 0.5 };
        HEIGHT - PAD_BOTTOM - t * Self::plot_height()
    }

    /// Centre of the i-th category for lines; points spread edge to edge.
    fn line_x(&self, i: usize) -> f64 {
        if self.n > 1 {
            PAD_LEFT + i as f64 * Self::plot_width() / (self.n - 1) as f64
        } else {
            PAD_LEFT + Self::plot_width() / 2.0
        }
    }

    fn slot_width(&self) -> f64 {
        Self::plot_width() / self.n.max(1) as f64
    }

    fn bar_slot_x(&self, i: usize) -> f64 {
        PAD_LEFT + i as f64 * self.slot_width()
    }
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Indices of at most `max` evenly spaced x-axis labels.
pub fn tick_indices(n: usize, max: usize) -> Vec<usize> {
    if n == 0 || max == 0 {
        return Vec::new();
    }
    if n <= max {
        return (0..n).collect();
    }
    let step = (n - 1) as f64 / (max - 1).max(1) as f64;
    let mut ticks: Vec<usize> = (0..max).map(|i| (i as f64 * step).round() as usize).collect();
    ticks.dedup();
    ticks
}

fn format_tick(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if abs >= 1e4 {
        format!("{:.1}K", v / 1e3)
    } else if abs >= 100.0 || v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

/// Render a chart as a standalone `<svg>` element, or [`EMPTY_CHART`].
pub fn render_chart(chart: &ChartData) -> String {
    let Some((lo, hi)) = chart.value_range() else {
        return EMPTY_CHART.to_string();
    };
    if chart.is_empty() {
        return EMPTY_CHART.to_string();
    }
    // bars grow from zero
    let (lo, hi) = match chart.kind {
        ChartKind::Bar => (lo.min(0.0), hi.max(0.0)),
        ChartKind::Line => (lo, hi),
    };
    let frame = Frame {
        min: lo,
        max: hi,
        n: chart.labels.len(),
    };

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg class="chart" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="{title}">"#,
        title = escape_xml(&chart.title)
    );
    let _ = write!(
        svg,
        r#"<text class="chart-title" x="{x}" y="20" text-anchor="middle">{title}</text>"#,
        x = WIDTH / 2.0,
        title = escape_xml(&chart.title)
    );

    write_axes(&mut svg, &frame, &chart.labels, chart.kind);
    match chart.kind {
        ChartKind::Line => write_lines(&mut svg, &frame, chart),
        ChartKind::Bar => write_bars(&mut svg, &frame, chart),
    }
    write_legend(&mut svg, chart);

    svg.push_str("</svg>");
    svg
}

fn write_axes(svg: &mut String, frame: &Frame, labels: &[String], kind: ChartKind) {
    let bottom = HEIGHT - PAD_BOTTOM;
    let right = WIDTH - PAD_RIGHT;

    for i in 0..=Y_TICKS {
        let v = frame.min + (frame.max - frame.min) * i as f64 / Y_TICKS as f64;
        let y = frame.y(v);
        let _ = write!(
            svg,
            r#"<line class="grid" x1="{PAD_LEFT}" y1="{y:.1}" x2="{right}" y2="{y:.1}"/><text class="tick" x="{x:.1}" y="{ty:.1}" text-anchor="end">{label}</text>"#,
            x = PAD_LEFT - 6.0,
            ty = y + 4.0,
            label = format_tick(v)
        );
    }

    let _ = write!(
        svg,
        r#"<line class="axis" x1="{PAD_LEFT}" y1="{bottom}" x2="{right}" y2="{bottom}"/><line class="axis" x1="{PAD_LEFT}" y1="{PAD_TOP}" x2="{PAD_LEFT}" y2="{bottom}"/>"#
    );

    for i in tick_indices(labels.len(), MAX_X_TICKS) {
        let x = match kind {
            ChartKind::Line => frame.line_x(i),
            ChartKind::Bar => frame.bar_slot_x(i) + frame.slot_width() / 2.0,
        };
        let _ = write!(
            svg,
            r#"<text class="tick" x="{x:.1}" y="{y:.1}" text-anchor="middle">{label}</text>"#,
            y = bottom + 16.0,
            label = escape_xml(&labels[i])
        );
    }
}

fn write_lines(svg: &mut String, frame: &Frame, chart: &ChartData) {
    for ds in &chart.datasets {
        // a gap splits the series into separate polylines
        let mut runs: Vec<Vec<(f64, f64)>> = vec![Vec::new()];
        for (i, v) in ds.values.iter().enumerate() {
            match v {
                Some(v) if v.is_finite() => {
                    if let Some(run) = runs.last_mut() {
                        run.push((frame.line_x(i), frame.y(*v)));
                    }
                }
                _ => runs.push(Vec::new()),
            }
        }
        for run in runs.iter().filter(|r| !r.is_empty()) {
            if let [(x, y)] = run.as_slice() {
                let _ = write!(
                    svg,
                    r#"<circle cx="{x:.1}" cy="{y:.1}" r="2.5" fill="{color}"/>"#,
                    color = escape_xml(&ds.color)
                );
            } else {
                let points: Vec<String> = run.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
                let _ = write!(
                    svg,
                    r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{points}"><title>{label}</title></polyline>"#,
                    color = escape_xml(&ds.color),
                    points = points.join(" "),
                    label = escape_xml(&ds.label)
                );
            }
        }
    }
}

fn write_bars(svg: &mut String, frame: &Frame, chart: &ChartData) {
    let series = chart.datasets.len().max(1);
    let group = frame.slot_width() * 0.8;
    let bar_w = group / series as f64;
    let zero = frame.y(0.0);

    for (s, ds) in chart.datasets.iter().enumerate() {
        for (i, v) in ds.values.iter().enumerate() {
            let Some(v) = v.filter(|v| v.is_finite()) else {
                continue;
            };
            let x = frame.bar_slot_x(i) + frame.slot_width() * 0.1 + s as f64 * bar_w;
            let y = frame.y(v);
            let (top, h) = if y < zero { (y, zero - y) } else { (zero, y - zero) };
            let _ = write!(
                svg,
                r#"<rect x="{x:.1}" y="{top:.1}" width="{bar_w:.1}" height="{h:.1}" fill="{color}"><title>{label}: {v}</title></rect>"#,
                color = escape_xml(&ds.color),
                label = escape_xml(&ds.label)
            );
        }
    }
}

fn write_legend(svg: &mut String, chart: &ChartData) {
    let y = HEIGHT - 14.0;
    let mut x = PAD_LEFT;
    for ds in &chart.datasets {
        let _ = write!(
            svg,
            r#"<rect x="{x:.1}" y="{ry:.1}" width="12" height="12" fill="{color}"/><text class="legend" x="{tx:.1}" y="{y:.1}">{label}</text>"#,
            ry = y - 10.0,
            tx = x + 16.0,
            color = escape_xml(&ds.color),
            label = escape_xml(&ds.label)
        );
        x += 24.0 + ds.label.chars().count() as f64 * 7.0;
    }
}
