//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the trend/risk code stays clean and testable
//! - output changes are localized (important for future snapshot tests)
//!
//! Degenerate statistics arrive as `None` and are printed as `undefined`;
//! they are never rendered as 0.

use crate::app::pipeline::{Harmonized, RunOutput};
use crate::domain::{FieldStats, Histogram, Quadrant, RunConfig, SourceMode, SummaryFile};
use crate::raster::Raster;
use crate::risk::stats::Summary;

/// Styling triple handed to the rendering sink for one harmonized layer.
#[derive(Debug, Clone)]
pub struct LayerSpec<'a> {
    pub name: &'static str,
    pub raster: &'a Raster,
    pub min: f64,
    pub max: f64,
    /// Color-ramp name for graphical sinks; the terminal sink substitutes a
    /// character ramp.
    pub ramp: &'static str,
}

/// The harmonized layers with their display styling, in report order.
pub fn map_layers(harmonized: &Harmonized) -> Vec<LayerSpec<'_>> {
    let ranged = |raster: &Raster, lo: f64, hi: f64| raster.display_range().unwrap_or((lo, hi));
    let (rain_lo, rain_hi) = ranged(&harmonized.rain_trend, -0.1, 0.1);
    let (ndvi_lo, ndvi_hi) = ranged(&harmonized.ndvi_trend, -0.001, 0.001);
    let (pop_lo, pop_hi) = ranged(&harmonized.population, 0.0, 1_000.0);
    let (built_lo, built_hi) = ranged(&harmonized.builtup_change, 0.0, 5.0);
    vec![
        LayerSpec {
            name: "Rainfall Trend (mm/year)",
            raster: &harmonized.rain_trend,
            min: rain_lo,
            max: rain_hi,
            ramp: "blue-white-red",
        },
        LayerSpec {
            name: "NDVI Trend (per year)",
            raster: &harmonized.ndvi_trend,
            min: ndvi_lo,
            max: ndvi_hi,
            ramp: "brown-white-green",
        },
        LayerSpec {
            name: "Population Density",
            raster: &harmonized.population,
            min: pop_lo,
            max: pop_hi,
            ramp: "white-yellow-orange-red",
        },
        LayerSpec {
            name: "Built-Up Change (m2/year)",
            raster: &harmonized.builtup_change,
            min: built_lo,
            max: built_hi,
            ramp: "white-gray-black",
        },
    ]
}

/// Format the run header: parameters, resolution analysis, sampling
/// diagnostics. Every parameter is echoed so a run is reproducible from its
/// output alone.
pub fn format_run_summary(config: &RunConfig, output: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== pluvial - Compound Pluvial Risk Trends ===\n");
    out.push_str(&format!("Region: {}\n", config.region_label()));
    out.push_str(&format!(
        "Center: ({:.4}, {:.4}) | buffer {:.0} m\n",
        output.region.center_lon, output.region.center_lat, output.region.buffer_m
    ));
    out.push_str(&format!(
        "Years: {}-{} | extreme-rain percentile: p{:.0}\n",
        config.start_year, config.end_year, config.rain_percentile
    ));
    out.push_str(&format!(
        "Grid: {:.0} m | smoothing: {}x{} | samples: {} | seed: {}\n",
        config.resolution_m, config.smoothing, config.smoothing, config.sample_count, config.seed
    ));
    out.push_str(&format!("Source: {}\n", source_label(config.source)));

    out.push_str("\nSpatial resolution:\n");
    out.push_str(&format!("- study area: {:.1} km2\n", output.area_km2));
    out.push_str(&format!(
        "- native rainfall resolution: ~{:.1} km\n",
        output.rain_native_m / 1_000.0
    ));
    out.push_str(&format!(
        "- effective independent rainfall pixels: {:.1}\n",
        output.effective_rain_pixels
    ));
    if output.effective_rain_pixels < 10.0 {
        out.push_str(
            "- warning: coarse rainfall data captures regional gradients rather than intra-urban variation\n",
        );
    }

    out.push_str("\nSampling diagnostics:\n");
    out.push_str(&format!("- points generated: {}\n", output.diagnostics.raw_count));
    out.push_str(&format!("- valid after joins: {}\n", output.diagnostics.valid_count));
    out.push_str(&format!("- dropped (coverage loss): {}\n", output.diagnostics.dropped()));

    out
}

/// Format the aggregate statistics sections.
pub fn format_statistics(summary: &Summary) -> String {
    let mut out = String::new();

    out.push_str("Attribute distributions (valid points):\n");
    out.push_str(&format_field_stats_row("rain_trend", &summary.rain_stats, 4));
    out.push_str(&format_field_stats_row("ndvi_trend", &summary.ndvi_stats, 6));
    out.push_str(&format_field_stats_row("pop", &summary.pop_stats, 1));
    out.push_str(&format_field_stats_row("builtup_change", &summary.built_stats, 2));

    out.push_str("\nSpatial alignment (H1):\n");
    out.push_str(&format!(
        "- Pearson r (ndvi_trend vs rain_trend): {}\n",
        fmt_opt(summary.corr_ndvi_rain, 4)
    ));
    out.push_str(&format!(
        "- Pearson r (builtup_change vs rain_trend): {}\n",
        fmt_opt(summary.corr_built_rain, 4)
    ));
    out.push_str("- interpretation: r < 0.3 weak alignment, r > 0.6 strong alignment\n");

    out.push_str("\nQuadrant distribution:\n");
    for (quadrant, count) in &summary.quadrant_counts {
        let marker = if *quadrant == Quadrant::HighRiskAligned { "*" } else { " " };
        out.push_str(&format!("{marker} {:<20} {count}\n", quadrant.label()));
    }
    out.push_str(&format!(
        "- % points in High_Risk_Aligned: {}\n",
        fmt_opt(summary.percent_aligned, 2)
    ));

    out.push_str("\nPopulation exposure (H2):\n");
    out.push_str(&format!("- total population: {:.0}\n", summary.total_population));
    out.push_str(&format!(
        "- population in aligned zones: {:.0}\n",
        summary.aligned_population
    ));
    out.push_str(&format!(
        "- % population exposed: {}\n",
        fmt_opt(summary.percent_population_exposed, 2)
    ));
    out.push_str(&format!(
        "- cumulative risk score: {}\n",
        fmt_opt(summary.cumulative_risk, 0)
    ));
    out.push_str(&format!(
        "- mean risk in aligned zones: {}\n",
        fmt_opt(summary.mean_risk_aligned, 0)
    ));
    out.push_str(&format!(
        "- zero-risk points: {} | non-zero-risk points: {}\n",
        summary.zero_risk_count, summary.nonzero_risk_count
    ));

    out.push_str("\nPopulation-weighted means (pop > 0):\n");
    out.push_str(&format!(
        "- rain_trend: {}\n",
        fmt_opt(summary.pop_weighted_rain_mean, 4)
    ));
    out.push_str(&format!(
        "- ndvi_trend: {}\n",
        fmt_opt(summary.pop_weighted_ndvi_mean, 6)
    ));

    if let Some(hist) = &summary.risk_histogram {
        out.push('\n');
        out.push_str(&format_histogram(hist));
    }

    out
}

/// The copy-pasteable cross-city comparison block.
pub fn format_cross_city(region_label: &str, summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str("=== CROSS-CITY TABLE ROW ===\n");
    out.push_str(&format!("City: {region_label}\n"));
    out.push_str(&format!(
        "Correlation (r): {}\n",
        fmt_opt(summary.corr_ndvi_rain, 4)
    ));
    out.push_str(&format!(
        "% Aligned Risk (Area): {}\n",
        fmt_opt(summary.percent_aligned, 2)
    ));
    out.push_str(&format!(
        "Cumulative Risk Score: {}\n",
        fmt_opt(summary.cumulative_risk, 0)
    ));
    out.push_str(&format!(
        "Rain Trend SD: {}\n",
        fmt_opt(summary.rain_stats.as_ref().and_then(|s| s.sd), 4)
    ));
    out.push_str(&format!(
        "% Population Exposed: {}\n",
        fmt_opt(summary.percent_population_exposed, 2)
    ));
    out.push_str(&format!(
        "Avg Risk in High-Risk Zones: {}\n",
        fmt_opt(summary.mean_risk_aligned, 0)
    ));
    out
}

/// One bar per bin, scaled to the widest bin.
pub fn format_histogram(hist: &Histogram) -> String {
    const BAR_WIDTH: usize = 40;
    let mut out = String::new();
    out.push_str(&format!(
        "Risk-score distribution (non-zero, {} bins over [{:.0}, {:.0}]):\n",
        hist.counts.len(),
        hist.min,
        hist.max
    ));
    let peak = hist.counts.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        return out;
    }
    let span = hist.max - hist.min;
    for (i, count) in hist.counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let lo = hist.min + span * i as f64 / hist.counts.len() as f64;
        let bar_len = (count * BAR_WIDTH).div_ceil(peak);
        out.push_str(&format!(
            "{:>12.0} | {:>4} {}\n",
            lo,
            count,
            "#".repeat(bar_len)
        ));
    }
    out
}

/// Describe the layer triples handed to the rendering sink.
pub fn format_layer_list(layers: &[LayerSpec<'_>]) -> String {
    let mut out = String::new();
    out.push_str("Map layers (name | display range | ramp):\n");
    for layer in layers {
        out.push_str(&format!(
            "- {} | [{}, {}] | {}\n",
            layer.name, layer.min, layer.max, layer.ramp
        ));
    }
    out
}

/// Re-print a saved summary file: parameter echo plus the statistics
/// sections, reconstructed from the portable schema.
pub fn format_saved_summary(file: &SummaryFile) -> String {
    let summary = summary_from_file(file);
    let mut out = String::new();

    out.push_str("=== pluvial - Saved Run Summary ===\n");
    out.push_str(&format!("Region: {}\n", file.params.region_label));
    out.push_str(&format!(
        "Center: ({:.4}, {:.4}) | buffer {:.0} m\n",
        file.params.center_lon, file.params.center_lat, file.params.buffer_m
    ));
    out.push_str(&format!(
        "Years: {}-{} | p{:.0} | grid {:.0} m | smoothing {}x{} | samples {} | seed {}\n",
        file.params.start_year,
        file.params.end_year,
        file.params.rain_percentile,
        file.params.resolution_m,
        file.params.smoothing,
        file.params.smoothing,
        file.params.sample_count,
        file.params.seed
    ));
    out.push_str(&format!(
        "Area: {:.1} km2 | effective rainfall pixels: {:.1}\n",
        file.area_km2, file.effective_rain_pixels
    ));
    out.push_str(&format!(
        "Sampling: raw {} | valid {}\n\n",
        file.raw_count, file.valid_count
    ));

    out.push_str(&format_statistics(&summary));
    out.push('\n');
    out.push_str(&format_cross_city(&file.params.region_label, &summary));
    out
}

fn summary_from_file(file: &SummaryFile) -> Summary {
    let quadrant_counts = Quadrant::ALL
        .into_iter()
        .map(|q| {
            let count = file
                .quadrant_counts
                .iter()
                .find(|c| c.quadrant == q.label())
                .map(|c| c.count)
                .unwrap_or(0);
            (q, count)
        })
        .collect();
    Summary {
        raw_count: file.raw_count,
        valid_count: file.valid_count,
        quadrant_counts,
        corr_ndvi_rain: file.corr_ndvi_rain,
        corr_built_rain: file.corr_built_rain,
        pop_weighted_rain_mean: file.pop_weighted_rain_mean,
        pop_weighted_ndvi_mean: file.pop_weighted_ndvi_mean,
        percent_aligned: file.percent_aligned,
        total_population: file.total_population,
        aligned_population: file.aligned_population,
        percent_population_exposed: file.percent_population_exposed,
        cumulative_risk: file.cumulative_risk,
        mean_risk_aligned: file.mean_risk_aligned,
        zero_risk_count: file.zero_risk_count,
        nonzero_risk_count: file.nonzero_risk_count,
        rain_stats: file.rain_stats,
        ndvi_stats: file.ndvi_stats,
        pop_stats: file.pop_stats,
        built_stats: file.built_stats,
        risk_histogram: file.risk_histogram.clone(),
    }
}

fn format_field_stats_row(name: &str, stats: &Option<FieldStats>, precision: usize) -> String {
    match stats {
        None => format!("- {name:<15} undefined (no valid points)\n"),
        Some(s) => format!(
            "- {name:<15} min={:.p$} max={:.p$} mean={:.p$} sd={}\n",
            s.min,
            s.max,
            s.mean,
            fmt_opt(s.sd, precision),
            p = precision
        ),
    }
}

fn source_label(source: SourceMode) -> &'static str {
    match source {
        SourceMode::Auto => "auto",
        SourceMode::Synthetic => "synthetic",
        SourceMode::Remote => "remote",
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "undefined".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::stats::summarize;
    use crate::sample::JoinDiagnostics;

    fn empty_summary() -> Summary {
        summarize(
            &[],
            JoinDiagnostics {
                raw_count: 12,
                valid_count: 0,
            },
        )
    }

    #[test]
    fn degenerate_statistics_print_as_undefined() {
        let text = format_statistics(&empty_summary());
        assert!(text.contains("undefined"));
        assert!(!text.contains("NaN"));
        // Quadrant table still lists all four labels.
        for q in Quadrant::ALL {
            assert!(text.contains(q.label()), "missing {}", q.label());
        }
    }

    #[test]
    fn cross_city_block_carries_the_region_label() {
        let text = format_cross_city("Kuala Lumpur", &empty_summary());
        assert!(text.contains("City: Kuala Lumpur"));
        assert!(text.contains("% Population Exposed: undefined"));
    }

    #[test]
    fn histogram_renders_nonempty_bins_only() {
        let hist = Histogram {
            min: 0.0,
            max: 10.0,
            counts: vec![2, 0, 1],
        };
        let text = format_histogram(&hist);
        let bars = text.lines().filter(|l| l.contains('#')).count();
        assert_eq!(bars, 2);
    }
}
