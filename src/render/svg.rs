//! Minimal SVG document builder shared by all chart kinds.

use std::fmt::Write as _;

pub const WIDTH: f64 = 960.0;
pub const HEIGHT: f64 = 540.0;

pub const PALETTE: [&str; 7] = [
    "#2a7fff", "#e4572e", "#22a06b", "#7c3aed", "#a16207", "#d946ef", "#0ea5e9",
];

const STYLE: &str = "<style>text{font-family:Menlo,Monaco,monospace;font-size:12px;fill:#222} \
.axis{stroke:#333;stroke-width:1} .grid{stroke:#ddd;stroke-width:1} \
.label{font-size:11px;fill:#444}</style>";

pub fn color(idx: usize) -> &'static str {
    PALETTE[idx % PALETTE.len()]
}

/// Canvas with margins around the plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Frame {
    pub const fn standard() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            left: 90.0,
            right: 40.0,
            top: 55.0,
            bottom: 75.0,
        }
    }

    /// Wider right margin to hold a side legend.
    pub const fn with_side_legend() -> Self {
        Self {
            right: 180.0,
            ..Self::standard()
        }
    }

    pub fn plot_width(&self) -> f64 {
        self.width - self.left - self.right
    }

    pub fn plot_height(&self) -> f64 {
        self.height - self.top - self.bottom
    }

    /// y coordinate of the x axis.
    pub fn baseline(&self) -> f64 {
        self.top + self.plot_height()
    }
}

/// Escape text for element content and attribute values.
pub fn escape(s: &str) -> String {
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

/// Tick label for an x value: grouped integer below a million, else scientific.
pub fn x_tick_label(x: f64) -> String {
    if x.abs() < 1_000_000.0 {
        group_thousands(x.round() as i64)
    } else {
        format!("{:.1e}", x)
    }
}

pub fn group_thousands(v: i64) -> String {
    let digits = v.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Accumulates SVG elements. Writing into a `String` cannot fail, so the
/// `fmt::Result`s are discarded.
pub struct SvgDoc {
    frame: Frame,
    buf: String,
}

impl SvgDoc {
    pub fn new(frame: Frame) -> Self {
        let mut buf = String::new();
        let _ = writeln!(
            buf,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = frame.width,
            h = frame.height
        );
        buf.push_str(STYLE);
        buf.push('\n');
        Self { frame, buf }
    }

    /// Title, both axes and both axis labels.
    pub fn chrome(&mut self, title: &str, x_label: &str, y_label: &str) {
        let f = self.frame;
        let _ = writeln!(
            self.buf,
            r#"<text x="{}" y="26" text-anchor="middle">{}</text>"#,
            f.width / 2.0,
            escape(title)
        );
        self.line("axis", f.left, f.baseline(), f.left + f.plot_width(), f.baseline());
        self.line("axis", f.left, f.top, f.left, f.baseline());
        let _ = writeln!(
            self.buf,
            r#"<text class="label" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            f.width / 2.0,
            f.height - 18.0,
            escape(x_label)
        );
        let _ = writeln!(
            self.buf,
            r#"<text class="label" transform="translate(20,{}) rotate(-90)" text-anchor="middle">{}</text>"#,
            f.height / 2.0,
            escape(y_label)
        );
    }

    pub fn line(&mut self, class: &str, x1: f64, y1: f64, x2: f64, y2: f64) {
        let _ = writeln!(
            self.buf,
            r#"<line class="{class}" x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" />"#
        );
    }

    pub fn stroke(&mut self, color: &str, dashed: bool, x1: f64, y1: f64, x2: f64, y2: f64) {
        let dash = if dashed { r#" stroke-dasharray="8,6""# } else { "" };
        let _ = writeln!(
            self.buf,
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{color}" stroke-width="2.5"{dash} />"#
        );
    }

    pub fn label(&mut self, x: f64, y: f64, anchor: &str, text: &str) {
        let _ = writeln!(
            self.buf,
            r#"<text class="label" x="{x:.2}" y="{y:.2}" text-anchor="{anchor}">{}</text>"#,
            escape(text)
        );
    }

    pub fn polyline(&mut self, color: &str, dashed: bool, points: &[(f64, f64)]) {
        let dash = if dashed { r#" stroke-dasharray="8,6""# } else { "" };
        let _ = writeln!(
            self.buf,
            r#"<polyline fill="none" stroke="{color}" stroke-width="2.5"{dash} points="{}" />"#,
            join_points(points)
        );
    }

    pub fn polygon(&mut self, color: &str, points: &[(f64, f64)]) {
        let _ = writeln!(
            self.buf,
            r#"<polygon fill="{color}" fill-opacity="0.8" points="{}" />"#,
            join_points(points)
        );
    }

    pub fn circle(&mut self, color: &str, cx: f64, cy: f64) {
        let _ = writeln!(
            self.buf,
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="3.5" fill="{color}" />"#
        );
    }

    pub fn rect(&mut self, color: &str, x: f64, y: f64, w: f64, h: f64) {
        let _ = writeln!(
            self.buf,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{color}" />"#
        );
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</svg>\n");
        self.buf
    }
}

fn join_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"a<b & "c">"#), "a&lt;b &amp; &quot;c&quot;&gt;");
    }

    #[test]
    fn tick_labels() {
        assert_eq!(x_tick_label(1024.0), "1,024");
        assert_eq!(x_tick_label(999_999.0), "999,999");
        assert_eq!(x_tick_label(64.0), "64");
        assert_eq!(x_tick_label(4_194_304.0), "4.2e6");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
    }

    #[test]
    fn document_is_closed_and_self_contained() {
        let mut doc = SvgDoc::new(Frame::standard());
        doc.chrome("T", "x", "y");
        let svg = doc.finish();
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(!svg.contains("href"));
    }
}
