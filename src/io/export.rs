//! Samples CSV export and re-import.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts. The reader exists for `pluvial plot`, which re-renders the
//! quadrant scatter from a saved table.
//!
//! Derived columns (hazard, vulnerability, risk_score, quadrant) are written
//! for convenience but never trusted on the way back in: they are pure
//! functions of the joined attributes and are recomputed after parsing.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Attributes, RiskRecord, SamplePoint};
use crate::error::AppError;
use crate::risk::derive_record;

const REQUIRED_COLUMNS: [&str; 7] = [
    "id",
    "lon",
    "lat",
    "rain_trend",
    "ndvi_trend",
    "pop",
    "builtup_change",
];

/// Write the valid-point table to a CSV file.
pub fn write_samples_csv(path: &Path, records: &[RiskRecord]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create samples CSV '{}': {e}", path.display()))
    })?;

    writeln!(
        file,
        "id,lon,lat,rain_trend,ndvi_trend,pop,builtup_change,hazard,vulnerability,risk_score,quadrant"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write samples CSV header: {e}")))?;

    for r in records {
        let p = &r.point;
        writeln!(
            file,
            "{},{:.6},{:.6},{:.10},{:.10},{:.4},{:.6},{:.10},{:.10},{:.6},{}",
            p.id,
            p.lon,
            p.lat,
            p.attrs.rain_trend,
            p.attrs.ndvi_trend,
            p.attrs.pop,
            p.attrs.builtup_change,
            r.hazard,
            r.vulnerability,
            r.risk_score,
            r.quadrant.label(),
        )
        .map_err(|e| AppError::new(2, format!("Failed to write samples CSV row: {e}")))?;
    }

    Ok(())
}

/// Load a samples CSV and rebuild the risk records.
pub fn read_samples_csv(path: &Path) -> Result<Vec<RiskRecord>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open samples CSV '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read samples CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(AppError::new(
                2,
                format!("Samples CSV is missing required column '{column}'."),
            ));
        }
    }

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let line = i + 2; // 1-based, after the header
        let row = row
            .map_err(|e| AppError::new(2, format!("Failed to read samples CSV line {line}: {e}")))?;

        let id = field(&row, &header_map, "id", line)?.to_string();
        let point = SamplePoint {
            id,
            lon: parse_f64(&row, &header_map, "lon", line)?,
            lat: parse_f64(&row, &header_map, "lat", line)?,
            attrs: Attributes {
                rain_trend: parse_f64(&row, &header_map, "rain_trend", line)?,
                ndvi_trend: parse_f64(&row, &header_map, "ndvi_trend", line)?,
                pop: parse_f64(&row, &header_map, "pop", line)?,
                builtup_change: parse_f64(&row, &header_map, "builtup_change", line)?,
            },
        };
        records.push(derive_record(point));
    }

    Ok(records)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect()
}

fn field<'a>(
    row: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
    line: usize,
) -> Result<&'a str, AppError> {
    header_map
        .get(name)
        .and_then(|&i| row.get(i))
        .ok_or_else(|| AppError::new(2, format!("Missing '{name}' on samples CSV line {line}.")))
}

fn parse_f64(
    row: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
    line: usize,
) -> Result<f64, AppError> {
    let raw = field(row, header_map, name, line)?;
    let value: f64 = raw.parse().map_err(|_| {
        AppError::new(
            2,
            format!("Invalid '{name}' value '{raw}' on samples CSV line {line}."),
        )
    })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AppError::new(
            2,
            format!("Non-finite '{name}' value on samples CSV line {line}."),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pluvial-{}-{name}", std::process::id()))
    }

    fn record(id: usize, rain: f64, ndvi: f64, pop: f64) -> RiskRecord {
        derive_record(SamplePoint {
            id: format!("P-{id:04}"),
            lon: 101.5 + id as f64 * 0.01,
            lat: 3.1,
            attrs: Attributes {
                rain_trend: rain,
                ndvi_trend: ndvi,
                pop,
                builtup_change: 1.25,
            },
        })
    }

    #[test]
    fn csv_round_trip_recomputes_derived_fields() {
        let path = temp_path("roundtrip.csv");
        let records = vec![
            record(1, 0.1, -0.01, 100.0),
            record(2, -0.2, 0.02, 200.0),
        ];
        write_samples_csv(&path, &records).unwrap();
        let loaded = read_samples_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 2);
        for (a, b) in records.iter().zip(&loaded) {
            assert_eq!(a.point.id, b.point.id);
            assert!((a.point.attrs.rain_trend - b.point.attrs.rain_trend).abs() < 1e-9);
            assert_eq!(a.quadrant, b.quadrant);
            assert!((a.risk_score - b.risk_score).abs() < 1e-3);
        }
    }

    #[test]
    fn missing_required_column_is_a_config_error() {
        let path = temp_path("missing-column.csv");
        std::fs::write(&path, "id,lon,lat\nP-0001,101.5,3.1\n").unwrap();
        let err = read_samples_csv(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("rain_trend"));
    }

    #[test]
    fn bad_numeric_cell_names_the_line() {
        let path = temp_path("bad-cell.csv");
        std::fs::write(
            &path,
            "id,lon,lat,rain_trend,ndvi_trend,pop,builtup_change\nP-0001,101.5,3.1,oops,0.0,1.0,0.0\n",
        )
        .unwrap();
        let err = read_samples_csv(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("line 2"));
    }
}
