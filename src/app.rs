//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - acquires the scene (remote catalog or synthetic)
//! - runs trends, harmonization, sampling, and risk statistics
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, PlotArgs, ReportArgs, RunArgs};
use crate::domain::RunConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `pluvial` binary.
pub fn run() -> Result<(), AppError> {
    // We want `pluvial` and `pluvial -c mumbai` to behave like
    // `pluvial run ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Report(args) => handle_report(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let output = pipeline::run_analysis(&config)?;

    println!("{}", crate::report::format_run_summary(&config, &output));
    println!("{}", crate::report::format_statistics(&output.summary));

    let layers = crate::report::map_layers(&output.harmonized);
    println!("{}", crate::report::format_layer_list(&layers));
    if config.show_layers {
        for layer in &layers {
            println!(
                "{}",
                crate::plot::render_layer_heatmap(
                    layer.name,
                    layer.raster,
                    layer.min,
                    layer.max,
                    config.plot_width,
                    config.plot_height,
                )
            );
        }
    }

    if config.plot {
        println!(
            "{}",
            crate::plot::render_quadrant_scatter(
                &output.records,
                config.plot_width,
                config.plot_height,
            )
        );
    }

    println!(
        "{}",
        crate::report::format_cross_city(&config.region_label(), &output.summary)
    );

    // Optional exports.
    if let Some(path) = &config.export_samples {
        crate::io::export::write_samples_csv(path, &output.records)?;
    }
    if let Some(path) = &config.export_summary {
        let summary = crate::io::summary::build_summary_file(&config, &output);
        crate::io::summary::write_summary_json(path, &summary)?;
    }
    if config.debug_bundle {
        let path = crate::debug::write_run_bundle(&config, &output)?;
        println!("Run bundle written to {}", path.display());
    }

    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let summary = crate::io::summary::read_summary_json(&args.summary)?;
    println!("{}", crate::report::format_saved_summary(&summary));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let records = crate::io::export::read_samples_csv(&args.samples)?;
    println!(
        "{} valid points loaded from {}",
        records.len(),
        args.samples.display()
    );
    println!(
        "{}",
        crate::plot::render_quadrant_scatter(&records, args.width, args.height)
    );
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        city: args.city,
        center_override: match (args.lon, args.lat) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        },
        buffer_m: args.buffer_m,
        start_year: args.start_year,
        end_year: args.end_year,
        resolution_m: args.resolution_m,
        sample_count: args.samples,
        seed: args.seed,
        smoothing: args.smoothing,
        rain_percentile: args.rain_percentile,
        source: args.source,
        plot: args.plot && !args.no_plot,
        show_layers: args.layers,
        plot_width: args.width,
        plot_height: args.height,
        export_samples: args.export.clone(),
        export_summary: args.export_summary.clone(),
        debug_bundle: args.debug_bundle,
    }
}

/// Rewrite argv so `pluvial` defaults to `pluvial run`.
///
/// Rules:
/// - `pluvial`                     -> `pluvial run`
/// - `pluvial -c mumbai ...`       -> `pluvial run -c mumbai ...`
/// - `pluvial --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "report" | "plot");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_run() {
        assert_eq!(rewrite_args(argv(&["pluvial"])), argv(&["pluvial", "run"]));
        assert_eq!(
            rewrite_args(argv(&["pluvial", "-c", "mumbai"])),
            argv(&["pluvial", "run", "-c", "mumbai"])
        );
    }

    #[test]
    fn explicit_subcommands_and_help_pass_through() {
        assert_eq!(
            rewrite_args(argv(&["pluvial", "report", "--summary", "s.json"])),
            argv(&["pluvial", "report", "--summary", "s.json"])
        );
        assert_eq!(rewrite_args(argv(&["pluvial", "--help"])), argv(&["pluvial", "--help"]));
    }

    #[test]
    fn config_mapping_honors_no_plot_and_overrides() {
        let args = crate::cli::Cli::parse_from([
            "pluvial",
            "run",
            "--lon",
            "101.5",
            "--lat",
            "3.1",
            "--no-plot",
            "-n",
            "100",
        ]);
        let Command::Run(run_args) = args.command else {
            panic!("expected run subcommand");
        };
        let config = run_config_from_args(&run_args);
        assert_eq!(config.center_override, Some((101.5, 3.1)));
        assert!(!config.plot);
        assert_eq!(config.sample_count, 100);
        // Defaults carried through.
        assert_eq!(config.start_year, 2000);
        assert_eq!(config.end_year, 2020);
        assert_eq!(config.resolution_m, 500.0);
    }
}
