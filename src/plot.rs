use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plotters::prelude::*;

use crate::centroid::{CentroidTable, MergedTable};
use crate::color::GroupColorMap;
use crate::config::{ComponentPair, LegendPosition, PlotStyle};

// ---------------------------------------------------------------------------
// Score plot rendering (one PNG per component pair)
// ---------------------------------------------------------------------------

/// Render every configured projection into `out_dir`, one
/// `scores_pc<A>_pc<B>.png` per pair. Pairs must already be validated against
/// the retained component count.
pub fn render_all(
    out_dir: &Path,
    merged: &MergedTable,
    centroids: &CentroidTable,
    colors: &GroupColorMap,
    pairs: &[ComponentPair],
    explained_variance_ratio: &[f64],
    style: &PlotStyle,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(pairs.len());
    for &pair in pairs {
        let out_path = out_dir.join(format!("scores_pc{}_pc{}.png", pair.a, pair.b));
        render_score_plot(
            &out_path,
            merged,
            centroids,
            colors,
            pair,
            explained_variance_ratio,
            style,
        )
        .with_context(|| format!("rendering {pair}"))?;
        written.push(out_path);
    }
    Ok(written)
}

/// Draw a single 2-D projection: zero reference lines, a segment from each
/// sample to its group centroid, group-coloured sample points, larger centroid
/// markers, and a legend.
pub fn render_score_plot(
    out_path: &Path,
    merged: &MergedTable,
    centroids: &CentroidTable,
    colors: &GroupColorMap,
    pair: ComponentPair,
    explained_variance_ratio: &[f64],
    style: &PlotStyle,
) -> Result<()> {
    let xi = pair.x_index();
    let yi = pair.y_index();

    let (x_range, y_range) = axis_bounds(merged, centroids, xi, yi);

    let root =
        BitMapBackend::new(out_path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("PCA scores {pair}"), ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;

    chart
        .configure_mesh()
        .x_desc(axis_label(pair.a, explained_variance_ratio))
        .y_desc(axis_label(pair.b, explained_variance_ratio))
        .draw()?;

    // Reference lines at zero on both axes.
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x_range.start, 0.0), (x_range.end, 0.0)],
        BLACK.mix(0.25),
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, y_range.start), (0.0, y_range.end)],
        BLACK.mix(0.25),
    )))?;

    // One segment per sample row, sample → group centroid.
    for row in merged {
        let color = colors.color_for(&row.group);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![
                (row.score[xi], row.score[yi]),
                (row.centroid[xi], row.centroid[yi]),
            ],
            color.mix(0.3),
        )))?;
    }

    // Sample points, one series per group so the legend carries group names.
    for (group, color) in colors.legend_entries() {
        let points: Vec<(f64, f64)> = merged
            .iter()
            .filter(|r| r.group == group)
            .map(|r| (r.score[xi], r.score[yi]))
            .collect();
        if points.is_empty() {
            continue;
        }
        chart
            .draw_series(points.into_iter().map(|(x, y)| {
                Circle::new(
                    (x, y),
                    style.point_size as i32,
                    color.mix(style.point_alpha).filled(),
                )
            }))?
            .label(group)
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    // Centroid markers on top.
    chart.draw_series(centroids.iter().map(|(group, coords)| {
        Circle::new(
            (coords[xi], coords[yi]),
            style.centroid_size as i32,
            colors
                .color_for(group)
                .mix(style.centroid_alpha)
                .filled(),
        )
    }))?;

    chart
        .configure_series_labels()
        .position(series_label_position(style.legend_position))
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .draw()?;

    root.present()
        .with_context(|| format!("writing {}", out_path.display()))?;
    Ok(())
}

/// Axis ranges over samples and centroids for the two plotted dimensions.
/// Always spans zero (the reference lines must be visible) and pads by 5%.
fn axis_bounds(
    merged: &MergedTable,
    centroids: &CentroidTable,
    xi: usize,
    yi: usize,
) -> (Range<f64>, Range<f64>) {
    let mut x_min = 0.0f64;
    let mut x_max = 0.0f64;
    let mut y_min = 0.0f64;
    let mut y_max = 0.0f64;

    let mut cover = |x: f64, y: f64| {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    };
    for row in merged {
        cover(row.score[xi], row.score[yi]);
    }
    for (_, coords) in centroids.iter() {
        cover(coords[xi], coords[yi]);
    }

    let x_pad = (0.05 * (x_max - x_min)).max(1e-3);
    let y_pad = (0.05 * (y_max - y_min)).max(1e-3);
    (
        (x_min - x_pad)..(x_max + x_pad),
        (y_min - y_pad)..(y_max + y_pad),
    )
}

fn axis_label(component: usize, explained_variance_ratio: &[f64]) -> String {
    match explained_variance_ratio.get(component - 1) {
        Some(ratio) => format!("PC{component} ({:.1}%)", ratio * 100.0),
        None => format!("PC{component}"),
    }
}

fn series_label_position(position: LegendPosition) -> SeriesLabelPosition {
    match position {
        LegendPosition::UpperLeft => SeriesLabelPosition::UpperLeft,
        LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
        LegendPosition::LowerLeft => SeriesLabelPosition::LowerLeft,
        LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::{compute_centroids, merge_with_centroids};
    use ndarray::array;

    #[test]
    fn axis_bounds_span_zero_and_all_points() {
        let scores = array![[2.0, 3.0], [4.0, 6.0]];
        let groups = vec!["a".to_string(), "a".to_string()];
        let centroids = compute_centroids(&scores, &groups, 2);
        let merged = merge_with_centroids(&scores, &groups, &centroids).unwrap();

        let (x, y) = axis_bounds(&merged, &centroids, 0, 1);
        // All sample coordinates are positive, yet zero stays inside.
        assert!(x.start <= 0.0 && x.end >= 4.0);
        assert!(y.start <= 0.0 && y.end >= 6.0);
    }

    #[test]
    fn axis_labels_carry_variance_percentages() {
        let ratio = vec![0.6234, 0.2, 0.1];
        assert_eq!(axis_label(1, &ratio), "PC1 (62.3%)");
        assert_eq!(axis_label(4, &ratio), "PC4");
    }
}
