use super::scale::YScale;
use super::svg::{Frame, PALETTE, SvgDoc};
use super::{Labels, Rendered};

const GAP: f64 = 20.0;

/// One bar per `(label, value)`, with the value printed above each bar.
/// Negative values draw as empty bars.
pub fn render_bar_chart(labels: &Labels, bars: &[(String, f64)]) -> Rendered {
    if bars.is_empty() {
        return Rendered::Skipped;
    }
    let values: Vec<f64> = bars.iter().map(|(_, v)| *v).collect();
    let yscale = YScale::linear(&values);

    let frame = Frame::standard();
    let mut doc = SvgDoc::new(frame);
    doc.chrome(&labels.title, &labels.x, &labels.y);

    for (value, label) in yscale.ticks() {
        let py = yscale.pos(&frame, value);
        doc.line("grid", frame.left, py, frame.left + frame.plot_width(), py);
        doc.label(frame.left - 8.0, py + 4.0, "end", &label);
    }

    let n = bars.len() as f64;
    let bar_w = ((frame.plot_width() - GAP * (n + 1.0)) / n).max(1.0);
    for (i, (label, value)) in bars.iter().enumerate() {
        let x = frame.left + GAP + i as f64 * (bar_w + GAP);
        let h = (yscale.fraction(*value) * frame.plot_height()).max(0.0);
        let y = frame.baseline() - h;
        doc.rect(PALETTE[0], x, y, bar_w, h);
        doc.label(x + bar_w / 2.0, frame.baseline() + 20.0, "middle", label);
        doc.label(x + bar_w / 2.0, y - 6.0, "middle", &format!("{value:.3}"));
    }

    Rendered::Svg(doc.finish())
}
