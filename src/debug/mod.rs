//! Run-bundle writer: a markdown record of one analysis run.
//!
//! The bundle logs every run parameter next to the diagnostics and
//! aggregates, so any result can be reproduced (or disputed) from the file
//! alone.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::report;

pub fn write_run_bundle(config: &RunConfig, output: &RunOutput) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir)
        .map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let slug = region_slug(&config.region_label());
    let path = dir.join(format!("pluvial_run_{slug}_seed{}_{ts}.md", config.seed));

    let mut text = String::new();
    text.push_str("# pluvial run bundle\n");
    text.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    text.push_str(&format!("- region: {}\n", config.region_label()));
    text.push_str(&format!(
        "- center: ({:.4}, {:.4})\n",
        output.region.center_lon, output.region.center_lat
    ));
    text.push_str(&format!("- buffer_m: {:.0}\n", output.region.buffer_m));
    text.push_str(&format!(
        "- years: {}-{}\n",
        config.start_year, config.end_year
    ));
    text.push_str(&format!("- resolution_m: {:.0}\n", config.resolution_m));
    text.push_str(&format!("- sample_count: {}\n", config.sample_count));
    text.push_str(&format!("- seed: {}\n", config.seed));
    text.push_str(&format!("- smoothing: {}\n", config.smoothing));
    text.push_str(&format!("- rain_percentile: {:.0}\n", config.rain_percentile));
    text.push_str(&format!("- source: {:?}\n", config.source));

    text.push_str("\n## Sampling\n");
    text.push_str(&format!(
        "| raw | valid | dropped |\n| - | - | - |\n| {} | {} | {} |\n",
        output.diagnostics.raw_count,
        output.diagnostics.valid_count,
        output.diagnostics.dropped()
    ));

    text.push_str("\n## Statistics\n```\n");
    text.push_str(&report::format_statistics(&output.summary));
    text.push_str("```\n");

    text.push_str("\n## Cross-city row\n```\n");
    text.push_str(&report::format_cross_city(
        &config.region_label(),
        &output.summary,
    ));
    text.push_str("```\n");

    let mut file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::new(4, format!("Failed to write debug file: {e}")))?;

    Ok(path)
}

fn region_slug(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_slug_is_filename_safe() {
        assert_eq!(region_slug("Kuala Lumpur"), "kuala-lumpur");
        assert_eq!(region_slug("custom (101.5000, 3.1000)"), "custom--101-5000--3-1000");
    }
}
