// Static charts as standalone SVG documents.
//
// The tiny builder below writes plain SVG markup: text is drawn by the
// viewer, so no font files or native libraries are needed.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

/// Draws the static report charts.
pub trait ChartRenderer {
    fn name(&self) -> &str;

    /// Vertical bars, one per label.
    fn bar_chart(&self, title: &str, labels: &[String], values: &[f64], path: &Path) -> Result<()>;

    /// Colour-scaled grid, `values[row][column]`.
    fn heatmap(
        &self,
        title: &str,
        rows: &[String],
        columns: &[String],
        values: &[Vec<f64>],
        path: &Path,
    ) -> Result<()>;

    /// Words sized by weight.
    fn word_cloud(&self, title: &str, words: &[(String, f64)], path: &Path) -> Result<()>;
}

/// Renderer used when charts cannot be produced. Every call fails with the
/// stored reason, so the report records the charts as failed and moves on.
pub struct UnavailableRenderer {
    pub reason: String,
}

impl ChartRenderer for UnavailableRenderer {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn bar_chart(&self, _: &str, _: &[String], _: &[f64], _: &Path) -> Result<()> {
        anyhow::bail!("Chart rendering unavailable: {}", self.reason)
    }

    fn heatmap(&self, _: &str, _: &[String], _: &[String], _: &[Vec<f64>], _: &Path) -> Result<()> {
        anyhow::bail!("Chart rendering unavailable: {}", self.reason)
    }

    fn word_cloud(&self, _: &str, _: &[(String, f64)], _: &Path) -> Result<()> {
        anyhow::bail!("Chart rendering unavailable: {}", self.reason)
    }
}

const MARGIN: f64 = 60.0;
const TITLE_HEIGHT: f64 = 40.0;

#[derive(Debug, Clone, Default)]
pub struct SvgRenderer;

impl ChartRenderer for SvgRenderer {
    fn name(&self) -> &str {
        "svg"
    }

    fn bar_chart(&self, title: &str, labels: &[String], values: &[f64], path: &Path) -> Result<()> {
        if labels.len() != values.len() {
            anyhow::bail!("{} labels for {} values", labels.len(), values.len());
        }
        let bar_width = 48.0;
        let plot_height = 300.0;
        let width = MARGIN * 2.0 + bar_width * labels.len().max(1) as f64 * 1.25;
        let height = TITLE_HEIGHT + plot_height + MARGIN * 2.0;
        let max = values.iter().copied().fold(0.0_f64, f64::max).max(f64::MIN_POSITIVE);

        let mut svg = Svg::new(width, height, title);
        let base = TITLE_HEIGHT + MARGIN + plot_height;
        svg.line(MARGIN, base, width - MARGIN, base);
        for (i, (label, &value)) in labels.iter().zip(values).enumerate() {
            let x = MARGIN + i as f64 * bar_width * 1.25 + bar_width * 0.125;
            let h = (value.max(0.0) / max) * plot_height;
            svg.rect(x, base - h, bar_width, h, "#3b7dd8");
            svg.text(x + bar_width / 2.0, base - h - 6.0, 11.0, "middle", &format!("{value:.3}"));
            svg.text(x + bar_width / 2.0, base + 18.0, 12.0, "middle", label);
        }
        svg.save(path)
    }

    fn heatmap(
        &self,
        title: &str,
        rows: &[String],
        columns: &[String],
        values: &[Vec<f64>],
        path: &Path,
    ) -> Result<()> {
        if values.is_empty() || columns.is_empty() {
            anyhow::bail!("Heatmap needs at least one row and one column");
        }
        let cell = (600.0 / rows.len().max(columns.len()) as f64).clamp(6.0, 40.0);
        let label_width = 140.0;
        let width = label_width + cell * columns.len() as f64 + MARGIN;
        let height = TITLE_HEIGHT + MARGIN + cell * values.len() as f64 + MARGIN;
        let (lo, hi) = values
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let span = (hi - lo).max(f64::MIN_POSITIVE);

        let mut svg = Svg::new(width, height, title);
        let top = TITLE_HEIGHT + MARGIN;
        for (c, label) in columns.iter().enumerate() {
            svg.text(label_width + (c as f64 + 0.5) * cell, top - 8.0, 11.0, "middle", label);
        }
        for (r, row) in values.iter().enumerate() {
            let y = top + r as f64 * cell;
            if cell >= 10.0 {
                let label = rows.get(r).map(String::as_str).unwrap_or("");
                svg.text(label_width - 6.0, y + cell * 0.7, 11.0, "end", &super::truncate_chars(label, 20));
            }
            for (c, &v) in row.iter().enumerate() {
                svg.rect(label_width + c as f64 * cell, y, cell, cell, &colour_scale((v - lo) / span));
            }
        }
        svg.save(path)
    }

    fn word_cloud(&self, title: &str, words: &[(String, f64)], path: &Path) -> Result<()> {
        if words.is_empty() {
            anyhow::bail!("Word cloud needs at least one word");
        }
        let width = 800.0;
        let max = words.iter().map(|(_, w)| *w).fold(f64::MIN_POSITIVE, f64::max);
        let mut ranked: Vec<&(String, f64)> = words.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        // Greedy line layout, largest word first
        let mut placed = Vec::with_capacity(ranked.len());
        let (mut x, mut y, mut line_height) = (MARGIN, TITLE_HEIGHT + MARGIN, 0.0_f64);
        for (word, weight) in ranked {
            let size = 14.0 + 34.0 * (weight / max).clamp(0.0, 1.0);
            let advance = size * 0.6 * word.chars().count() as f64 + size * 0.5;
            if x + advance > width - MARGIN && x > MARGIN {
                x = MARGIN;
                y += line_height * 1.2;
                line_height = 0.0;
            }
            line_height = line_height.max(size);
            placed.push((x, y + size, size, word.as_str(), weight / max));
            x += advance;
        }
        let height = y + line_height * 1.2 + MARGIN;

        let mut svg = Svg::new(width, height, title);
        for (x, y, size, word, strength) in placed {
            svg.coloured_text(x, y, size, word, &colour_scale(strength));
        }
        svg.save(path)
    }
}

/// Dark purple (0) through teal to yellow (1).
fn colour_scale(t: f64) -> String {
    const STOPS: [(f64, f64, f64); 3] = [(68.0, 1.0, 84.0), (33.0, 145.0, 140.0), (253.0, 231.0, 37.0)];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let (a, b, f) = if t < 0.5 {
        (STOPS[0], STOPS[1], t * 2.0)
    } else {
        (STOPS[1], STOPS[2], (t - 0.5) * 2.0)
    };
    let mix = |x: f64, y: f64| (x + (y - x) * f).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

struct Svg {
    body: String,
    width: f64,
    height: f64,
}

impl Svg {
    fn new(width: f64, height: f64, title: &str) -> Self {
        let mut svg = Self {
            body: String::new(),
            width,
            height,
        };
        svg.rect(0.0, 0.0, width, height, "#ffffff");
        let _ = writeln!(
            svg.body,
            r#"<text x="{:.1}" y="28" font-size="18" font-weight="bold" text-anchor="middle">{}</text>"#,
            width / 2.0,
            escape_xml(title)
        );
        svg
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{fill}"/>"#
        );
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let _ = writeln!(
            self.body,
            r##"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="#333333"/>"##
        );
    }

    fn text(&mut self, x: f64, y: f64, size: f64, anchor: &str, text: &str) {
        let _ = writeln!(
            self.body,
            r#"<text x="{x:.1}" y="{y:.1}" font-size="{size:.0}" text-anchor="{anchor}">{}</text>"#,
            escape_xml(text)
        );
    }

    fn coloured_text(&mut self, x: f64, y: f64, size: f64, text: &str, fill: &str) {
        let _ = writeln!(
            self.body,
            r#"<text x="{x:.1}" y="{y:.1}" font-size="{size:.0}" fill="{fill}">{}</text>"#,
            escape_xml(text)
        );
    }

    fn save(self, path: &Path) -> Result<()> {
        let doc = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\" font-family=\"sans-serif\">\n{}</svg>\n",
            self.body,
            w = self.width,
            h = self.height,
        );
        std::fs::write(path, doc).with_context(|| format!("Failed to write {}", path.display()))
    }
}
