//! Chart rendering for the category aggregate
//!
//! Two charts are produced from an [`Aggregate`]:
//! - a pie chart of book counts for the 20 largest categories
//! - a bar chart of average price for every category, in aggregate order
//!
//! Rendering goes through [`ChartRenderer`] so the output format can change
//! without touching the pipeline. [`SvgChartRenderer`] writes plain SVG files.

use crate::output::aggregate::Aggregate;
use crate::PersistenceError;
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

/// Number of categories shown in the pie chart
pub const PIE_TOP_N: usize = 20;

pub const PIE_FILE_NAME: &str = "circular_diagram.svg";
pub const BAR_FILE_NAME: &str = "histogram.svg";

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// One pie slice
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub count: u64,
}

/// One bar
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// Something that can turn chart series into files
pub trait ChartRenderer {
    /// Renders the book-count pie chart and returns the written path
    fn render_pie(&self, slices: &[PieSlice]) -> Result<PathBuf, PersistenceError>;

    /// Renders the average-price bar chart and returns the written path
    fn render_bars(&self, bars: &[Bar]) -> Result<PathBuf, PersistenceError>;
}

/// Largest categories by book count, descending
///
/// Ties keep the aggregate's alphabetical order.
pub fn pie_series(stats: &Aggregate) -> Vec<PieSlice> {
    let mut slices: Vec<PieSlice> = stats
        .values()
        .map(|entry| PieSlice {
            label: entry.category.clone(),
            count: entry.books_count,
        })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count));
    slices.truncate(PIE_TOP_N);
    slices
}

/// Average price per category, in aggregate order
pub fn bar_series(stats: &Aggregate) -> Vec<Bar> {
    stats
        .values()
        .map(|entry| Bar {
            label: entry.category.clone(),
            value: entry.average_price,
        })
        .collect()
}

/// Renders both charts for `stats`
pub fn render_charts(
    renderer: &dyn ChartRenderer,
    stats: &Aggregate,
) -> Result<Vec<PathBuf>, PersistenceError> {
    let pie = renderer.render_pie(&pie_series(stats))?;
    let bars = renderer.render_bars(&bar_series(stats))?;
    tracing::info!("Rendered charts {} and {}", pie.display(), bars.display());
    Ok(vec![pie, bars])
}

/// Writes charts as standalone SVG documents into one directory
#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    dir: PathBuf,
}

impl SvgChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, file_name: &str, svg: &str) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;
        let path = self.dir.join(file_name);
        fs::write(&path, svg).map_err(|e| PersistenceError::io(&path, e))?;
        Ok(path)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render_pie(&self, slices: &[PieSlice]) -> Result<PathBuf, PersistenceError> {
        self.write(PIE_FILE_NAME, &pie_svg(slices))
    }

    fn render_bars(&self, bars: &[Bar]) -> Result<PathBuf, PersistenceError> {
        self.write(BAR_FILE_NAME, &bar_svg(bars))
    }
}

fn pie_svg(slices: &[PieSlice]) -> String {
    const SIZE: f64 = 800.0;
    const RADIUS: f64 = 250.0;
    let (cx, cy) = (SIZE / 2.0, SIZE / 2.0 + 20.0);

    let mut svg = svg_open(SIZE, SIZE + 40.0);
    title(&mut svg, SIZE / 2.0, "Books per category (top 20)");

    let total: u64 = slices.iter().map(|s| s.count).sum();
    if total == 0 {
        svg.push_str("</svg>\n");
        return svg;
    }

    // Counter-clockwise from 140 degrees
    let mut angle = 140.0_f64.to_radians();
    let point = |theta: f64, r: f64| (cx + r * theta.cos(), cy - r * theta.sin());

    for (index, slice) in slices.iter().enumerate() {
        let fraction = slice.count as f64 / total as f64;
        let sweep = fraction * 2.0 * PI;
        let color = PALETTE[index % PALETTE.len()];

        if fraction >= 1.0 {
            let _ = writeln!(
                svg,
                r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{RADIUS}" fill="{color}"/>"#
            );
        } else if fraction > 0.0 {
            let (x0, y0) = point(angle, RADIUS);
            let (x1, y1) = point(angle + sweep, RADIUS);
            let large_arc = u8::from(sweep > PI);
            let _ = writeln!(
                svg,
                r##"<path d="M{cx:.2},{cy:.2} L{x0:.2},{y0:.2} A{RADIUS},{RADIUS} 0 {large_arc} 0 {x1:.2},{y1:.2} Z" fill="{color}" stroke="#ffffff"/>"##
            );
        }

        let middle = angle + sweep / 2.0;
        let (px, py) = point(middle, RADIUS * 0.6);
        let (lx, ly) = point(middle, RADIUS * 1.15);
        let anchor = if middle.cos() < 0.0 { "end" } else { "start" };
        let _ = writeln!(
            svg,
            r#"<text x="{px:.2}" y="{py:.2}" font-size="11" text-anchor="middle">{:.1}%</text>"#,
            fraction * 100.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{lx:.2}" y="{ly:.2}" font-size="12" text-anchor="{anchor}">{}</text>"#,
            escape(&slice.label)
        );

        angle += sweep;
    }

    svg.push_str("</svg>\n");
    svg
}

fn bar_svg(bars: &[Bar]) -> String {
    const BAR_WIDTH: f64 = 24.0;
    const GAP: f64 = 8.0;
    const PLOT_HEIGHT: f64 = 400.0;
    const LEFT: f64 = 70.0;
    const TOP: f64 = 50.0;
    const BOTTOM: f64 = 160.0;

    let width = LEFT + bars.len() as f64 * (BAR_WIDTH + GAP) + GAP + 20.0;
    let height = TOP + PLOT_HEIGHT + BOTTOM;
    let baseline = TOP + PLOT_HEIGHT;
    let max = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);

    let mut svg = svg_open(width.max(400.0), height);
    title(&mut svg, width.max(400.0) / 2.0, "Average price per category");

    let _ = writeln!(
        svg,
        r##"<line x1="{LEFT}" y1="{TOP}" x2="{LEFT}" y2="{baseline}" stroke="#000000"/>"##
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{LEFT}" y1="{baseline}" x2="{:.2}" y2="{baseline}" stroke="#000000"/>"##,
        width - 10.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" font-size="12" text-anchor="end">{max:.2}</text>"#,
        LEFT - 6.0,
        TOP + 4.0
    );

    for (index, bar) in bars.iter().enumerate() {
        let x = LEFT + GAP + index as f64 * (BAR_WIDTH + GAP);
        let bar_height = if max > 0.0 {
            bar.value / max * PLOT_HEIGHT
        } else {
            0.0
        };
        let y = baseline - bar_height;
        let label_x = x + BAR_WIDTH / 2.0;
        let label_y = baseline + 12.0;

        let _ = writeln!(
            svg,
            r##"<rect x="{x:.2}" y="{y:.2}" width="{BAR_WIDTH}" height="{bar_height:.2}" fill="#87ceeb"><title>{}: {:.2}</title></rect>"##,
            escape(&bar.label),
            bar.value
        );
        let _ = writeln!(
            svg,
            r#"<text x="{label_x:.2}" y="{label_y:.2}" font-size="11" text-anchor="end" transform="rotate(-45 {label_x:.2} {label_y:.2})">{}</text>"#,
            escape(&bar.label)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn svg_open(width: f64, height: f64) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" \
         viewBox=\"0 0 {width:.0} {height:.0}\" font-family=\"sans-serif\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n"
    )
}

fn title(svg: &mut String, x: f64, text: &str) {
    let _ = writeln!(
        svg,
        r#"<text x="{x:.2}" y="28" font-size="18" text-anchor="middle">{}</text>"#,
        escape(text)
    );
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
