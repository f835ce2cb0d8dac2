use super::scale::{XScale, YScale};
use super::svg::{Frame, SvgDoc, color, group_thousands, x_tick_label};
use super::{Labels, RenderError, Rendered, Series, x_domain};

/// Cumulative heights per layer: `layers[i][j]` is the sum of series `0..=i`
/// at `xs[j]`. A series without a point at some x contributes zero there; if
/// it has several, the last one wins.
pub fn stack_layers(series: &[Series], xs: &[f64]) -> Vec<Vec<f64>> {
    let mut layers: Vec<Vec<f64>> = Vec::with_capacity(series.len());
    for (i, s) in series.iter().enumerate() {
        let layer = xs
            .iter()
            .enumerate()
            .map(|(j, &x)| {
                let own = s
                    .points
                    .iter()
                    .rev()
                    .find(|(px, _)| *px == x)
                    .map(|(_, y)| *y)
                    .unwrap_or(0.0);
                let below = if i > 0 { layers[i - 1][j] } else { 0.0 };
                below + own
            })
            .collect();
        layers.push(layer);
    }
    layers
}

/// Stacked-area chart; series stack bottom to top in declaration order.
///
/// Each layer is an explicit polygon: its own cumulative curve on top, the
/// layer below (or the axis) underneath. Legend sits on the right, listed
/// top layer first.
pub fn render_stacked_area(
    labels: &Labels,
    series: &[Series],
    log_x: bool,
) -> Result<Rendered, RenderError> {
    let xs = x_domain(series);
    let Some(xscale) = XScale::fit(&xs, log_x)? else {
        return Ok(Rendered::Skipped);
    };
    let layers = stack_layers(series, &xs);
    let tops: Vec<f64> = layers.last().cloned().unwrap_or_default();
    let yscale = YScale::linear(&tops);

    let frame = Frame::with_side_legend();
    let mut doc = SvgDoc::new(frame);
    doc.chrome(&labels.title, &labels.x, &labels.y);

    let y_max = match yscale {
        YScale::Linear { max } => max,
        YScale::Log { .. } => 1.0,
    };
    for (value, _) in yscale.ticks() {
        let py = yscale.pos(&frame, value);
        doc.line("grid", frame.left, py, frame.left + frame.plot_width(), py);
        let label = if y_max < 100.0 {
            format!("{value:.1}")
        } else {
            group_thousands(value.round() as i64)
        };
        doc.label(frame.left - 8.0, py + 4.0, "end", &label);
    }

    for &x in &xs {
        let px = xscale.pos(&frame, x);
        doc.line("grid", px, frame.top, px, frame.baseline());
        doc.label(px, frame.baseline() + 20.0, "middle", &x_tick_label(x));
    }

    // Top layer first so lower layers paint over any overlap.
    for i in (0..layers.len()).rev() {
        let mut polygon: Vec<(f64, f64)> = xs
            .iter()
            .zip(&layers[i])
            .map(|(&x, &y)| (xscale.pos(&frame, x), yscale.pos(&frame, y)))
            .collect();
        if i > 0 {
            polygon.extend(
                xs.iter()
                    .zip(&layers[i - 1])
                    .rev()
                    .map(|(&x, &y)| (xscale.pos(&frame, x), yscale.pos(&frame, y))),
            );
        } else if let (Some(&first), Some(&last)) = (xs.first(), xs.last()) {
            polygon.push((xscale.pos(&frame, last), frame.baseline()));
            polygon.push((xscale.pos(&frame, first), frame.baseline()));
        }
        doc.polygon(color(i), &polygon);
    }

    let legend_x = frame.left + frame.plot_width() + 10.0;
    for (row, (idx, s)) in series.iter().enumerate().rev().enumerate() {
        let ly = frame.top + 12.0 + row as f64 * 20.0;
        doc.rect(color(idx), legend_x, ly - 8.0, 12.0, 12.0);
        doc.label(legend_x + 18.0, ly + 2.0, "start", &s.name);
    }

    Ok(Rendered::Svg(doc.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels() -> Labels {
        Labels::new("Memory Breakdown", "Keys (N)", "bits/key")
    }

    #[test]
    fn layers_are_cumulative_with_missing_points_as_zero() {
        let series = vec![
            Series::new("Other", vec![(1.0, 1.0), (2.0, 2.0)]),
            Series::new("HZFastTrie", vec![(2.0, 5.0)]),
            Series::new("Buckets", vec![(1.0, 3.0), (2.0, 1.0)]),
        ];
        let xs = x_domain(&series);
        assert_eq!(
            stack_layers(&series, &xs),
            vec![vec![1.0, 2.0], vec![1.0, 7.0], vec![4.0, 8.0]]
        );
    }

    #[test]
    fn top_layer_equals_column_totals() {
        let series = vec![
            Series::new("a", vec![(8.0, 0.5), (16.0, 1.5), (32.0, 2.5)]),
            Series::new("b", vec![(32.0, 4.0), (8.0, 1.0)]),
        ];
        let xs = x_domain(&series);
        let layers = stack_layers(&series, &xs);
        assert_eq!(layers[1], vec![1.5, 1.5, 6.5]);
    }

    #[test]
    fn one_polygon_per_layer() {
        let series = vec![
            Series::new("a", vec![(8.0, 1.0), (16.0, 2.0)]),
            Series::new("b", vec![(8.0, 1.0), (16.0, 1.0)]),
            Series::new("c", vec![(16.0, 1.0)]),
        ];
        let out = match render_stacked_area(&labels(), &series, true).unwrap() {
            Rendered::Svg(s) => s,
            Rendered::Skipped => panic!("skipped"),
        };
        assert_eq!(out.matches("<polygon").count(), 3);
        assert_eq!(out.matches("<rect").count(), 3);
        // Legend lists the top layer first.
        let c = out.find(">c<").unwrap();
        let a = out.find(">a<").unwrap();
        assert!(c < a);
    }

    #[test]
    fn bottom_layer_closes_on_the_axis() {
        let series = vec![Series::new("a", vec![(1.0, 1.0), (2.0, 1.0)])];
        let out = match render_stacked_area(&labels(), &series, false).unwrap() {
            Rendered::Svg(s) => s,
            Rendered::Skipped => panic!("skipped"),
        };
        let f = Frame::with_side_legend();
        let base = format!("{:.2}", f.baseline());
        let poly = out.lines().find(|l| l.starts_with("<polygon")).unwrap();
        assert_eq!(poly.matches(&base).count(), 2);
    }

    #[test]
    fn empty_stack_is_skipped() {
        assert_eq!(
            render_stacked_area(&labels(), &[], false).unwrap(),
            Rendered::Skipped
        );
    }
}
