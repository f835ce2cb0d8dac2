use super::scale::{XScale, YScale};
use super::svg::{Frame, SvgDoc, color, x_tick_label};
use super::{Labels, RenderError, Rendered, Series, x_domain};

/// Multi-series line chart.
///
/// Points are sorted by x before drawing; repeated x values within a series
/// are drawn as separate points. Dashed series get square markers, solid
/// ones round markers. Legend entries stack down the top-left corner.
pub fn render_line_chart(
    labels: &Labels,
    series: &[Series],
    log_x: bool,
    log_y: bool,
) -> Result<Rendered, RenderError> {
    let xs = x_domain(series);
    let Some(xscale) = XScale::fit(&xs, log_x)? else {
        return Ok(Rendered::Skipped);
    };
    let ys: Vec<f64> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, y)| *y))
        .collect();
    let yscale = YScale::fit(&ys, log_y);

    let frame = Frame::standard();
    let mut doc = SvgDoc::new(frame);
    doc.chrome(&labels.title, &labels.x, &labels.y);

    for (value, label) in yscale.ticks() {
        let py = yscale.pos(&frame, value);
        doc.line("grid", frame.left, py, frame.left + frame.plot_width(), py);
        doc.label(frame.left - 8.0, py + 4.0, "end", &label);
    }

    for &x in &xs {
        let px = xscale.pos(&frame, x);
        doc.line("grid", px, frame.top, px, frame.baseline());
        doc.label(px, frame.baseline() + 20.0, "middle", &x_tick_label(x));
    }

    let legend_x = frame.left + 10.0;
    let legend_y = frame.top + 12.0;
    for (idx, s) in series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        let c = color(idx);

        let mut pts = s.points.clone();
        pts.sort_by(|a, b| a.0.total_cmp(&b.0));
        let coords: Vec<(f64, f64)> = pts
            .iter()
            .map(|&(x, y)| (xscale.pos(&frame, x), yscale.pos(&frame, y)))
            .collect();

        doc.polyline(c, s.dashed, &coords);
        for &(px, py) in &coords {
            if s.dashed {
                doc.rect(c, px - 2.5, py - 2.5, 5.0, 5.0);
            } else {
                doc.circle(c, px, py);
            }
        }

        let ly = legend_y + idx as f64 * 18.0;
        doc.stroke(c, s.dashed, legend_x, ly, legend_x + 16.0, ly);
        doc.label(legend_x + 22.0, ly + 4.0, "start", &s.name);
    }

    Ok(Rendered::Svg(doc.finish()))
}
