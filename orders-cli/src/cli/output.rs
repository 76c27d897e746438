//! Rendering of records and map points for the terminal

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use unicode_width::UnicodeWidthStr;

use crate::district::{DistrictCases, to_geojson};
use crate::records::{Column, Parasite, Record};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// Pretty-printed JSON array
    Json,
    /// CSV with a header row
    Csv,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MapFormat {
    #[default]
    Table,
    Json,
    Csv,
    /// GeoJSON FeatureCollection of points
    Geojson,
}

/// Align `rows` under `headers`, padding by display width
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.width());
            }
        }
    }

    let pad = |text: &str, width: usize| " ".repeat(width.saturating_sub(text.width()));

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{}{}", h.bold(), pad(h, *w)))
        .collect();
    out.push_str(header_line.join("  ").trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  ").dimmed().to_string());

    for row in rows {
        out.push('\n');
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{}{}", cell, pad(cell, *w)))
            .collect();
        out.push_str(line.join("  ").trim_end());
    }
    out
}

fn render_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().context("Failed to finish CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

pub fn format_records(records: &[&Record], format: OutputFormat) -> Result<String> {
    let headers: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
    match format {
        OutputFormat::Table => {
            if records.is_empty() {
                return Ok("No records".dimmed().to_string());
            }
            let rows: Vec<Vec<String>> = records.iter().map(|r| r.to_row()).collect();
            Ok(render_table(&headers, &rows))
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(records).context("Failed to format JSON output")
        }
        OutputFormat::Csv => {
            let rows: Vec<Vec<String>> = records.iter().map(|r| r.to_row()).collect();
            render_csv(&headers, &rows)
        }
    }
}

pub fn format_cases(points: &[DistrictCases], parasite: Parasite, format: MapFormat) -> Result<String> {
    let headers = ["Powiat", "cases", "latitude", "longitude"];
    let rows: Vec<Vec<String>> = points
        .iter()
        .map(|p| {
            vec![
                p.district.clone(),
                p.cases.to_string(),
                format!("{:.4}", p.latitude),
                format!("{:.4}", p.longitude),
            ]
        })
        .collect();

    match format {
        MapFormat::Table => {
            if points.is_empty() {
                return Ok(format!("No {} cases to plot", parasite).dimmed().to_string());
            }
            Ok(render_table(&headers, &rows))
        }
        MapFormat::Json => {
            serde_json::to_string_pretty(points).context("Failed to format JSON output")
        }
        MapFormat::Csv => render_csv(&headers, &rows),
        MapFormat::Geojson => serde_json::to_string_pretty(&to_geojson(points, parasite))
            .context("Failed to format GeoJSON output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(order: &str, test: &str, horse: &str) -> Record {
        Record {
            order_number: order.into(),
            test_number: test.into(),
            horse_name: horse.into(),
            ..Record::default()
        }
    }

    #[test]
    fn test_table_aligns_by_display_width() {
        colored::control::set_override(false);
        let rendered = render_table(
            &["imię", "n"],
            &[
                vec!["Żółć".into(), "1".into()],
                vec!["ab".into(), "22".into()],
            ],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "imię  n");
        assert_eq!(lines[1], "----  --");
        assert_eq!(lines[2], "Żółć  1");
        assert_eq!(lines[3], "ab    22");
    }

    #[test]
    fn test_records_as_json_use_column_names() {
        let first = record("Z-1", "B-1", "Iskra");
        let json = format_records(&[&first], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["nr badania"], "B-1");
        assert_eq!(value[0]["Oxyuris equi"], 0);
    }

    #[test]
    fn test_records_as_csv_quote_commas() {
        let first = record("Z-1", "B-1", "Siwy, Mały");
        let csv = format_records(&[&first], OutputFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("nr zamówienia,nr badania"));
        assert!(lines.next().unwrap().contains("\"Siwy, Mały\""));
    }

    #[test]
    fn test_empty_map_table_message() {
        colored::control::set_override(false);
        let text = format_cases(&[], Parasite::Oxyuris, MapFormat::Table).unwrap();
        assert_eq!(text, "No Oxyuris equi cases to plot");
    }

    #[test]
    fn test_map_csv() {
        let points = vec![DistrictCases {
            district: "Kraków".into(),
            cases: 3,
            latitude: 50.06,
            longitude: 19.94,
        }];
        let csv = format_cases(&points, Parasite::Oxyuris, MapFormat::Csv).unwrap();
        assert_eq!(csv, "Powiat,cases,latitude,longitude\nKraków,3,50.0600,19.9400\n");
    }
}
