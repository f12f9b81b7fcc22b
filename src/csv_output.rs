//! CSV result tables
//!
//! One table per analysis, keyed by company and product name. Floating values
//! use two decimals; values that could not be computed are written as
//! `undefined`.

use crate::config::ProductNameShape;
use crate::pipeline::FileReport;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Literal written for a statistic that is not defined
pub const UNDEFINED: &str = "undefined";

/// Two-decimal rendering, [`UNDEFINED`] for `None`
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => UNDEFINED.to_string(),
    }
}

/// Render a product name in the requested shape
pub fn format_product_name(name: &str, shape: ProductNameShape) -> String {
    match shape {
        ProductNameShape::Scalar => name.to_string(),
        ProductNameShape::Singleton => format!("('{}',)", name.replace('\'', "\\'")),
    }
}

/// A header plus rows of already formatted fields
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    header: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(header: Vec<&'static str>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = self.header.join(",");
        output.push('\n');

        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(|f| Self::escape_field(f)).collect();
            output.push_str(&fields.join(","));
            output.push('\n');
        }

        output
    }
}

pub fn anomaly_table(report: &FileReport, shape: ProductNameShape) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "company_name",
        "product_name",
        "avg_rating_anomalies",
        "avg_rating_non_anomalies",
        "percentage_anomalies",
    ]);
    table.add_row(vec![
        report.company_name.clone(),
        format_product_name(&report.product_name, shape),
        format_value(report.anomaly.avg_rating_anomalies()),
        format_value(report.anomaly.avg_rating_non_anomalies()),
        format_value(report.anomaly.percentage_anomalies),
    ]);
    table
}

pub fn trend_table(report: &FileReport) -> CsvTable {
    let trend = &report.trend;
    let mut table = CsvTable::new(vec![
        "company_name",
        "product_name",
        "days_diff",
        "max_reviews_per_day",
        "num_dates_higher_than_max",
        "total_reviews_higher_than_max",
        "high_volume_review_percentage",
        "avg_ratings_higher_than_max",
        "avg_ratings_lower_than_max",
    ]);
    table.add_row(vec![
        report.company_name.clone(),
        report.product_name.clone(),
        trend.days_diff.to_string(),
        trend.max_reviews_per_day.to_string(),
        trend.num_dates_higher_than_max.to_string(),
        trend.total_reviews_higher_than_max.to_string(),
        format_value(trend.high_volume_review_percentage),
        format_value(trend.avg_ratings_higher_than_max()),
        format_value(trend.avg_ratings_lower_than_max()),
    ]);
    table
}

pub fn phrase_table(report: &FileReport) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "company_name",
        "product_name",
        "ratings_with_phrases",
        "ratings_without_phrases",
        "percentage_of_review_w_common_phrases",
    ]);
    table.add_row(vec![
        report.company_name.clone(),
        report.product_name.clone(),
        format_value(report.phrases.ratings_with_phrases()),
        format_value(report.phrases.ratings_without_phrases()),
        format_value(report.phrases.percentage_with_common_phrases),
    ]);
    table
}

pub fn duplicate_table(report: &FileReport) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "company_name",
        "product_name",
        "avg_ratings_unique",
        "avg_ratings_non_unique",
        "percentage_non_unique",
    ]);
    table.add_row(vec![
        report.company_name.clone(),
        report.product_name.clone(),
        format_value(report.duplicates.avg_ratings_unique()),
        format_value(report.duplicates.avg_ratings_non_unique()),
        format_value(report.duplicates.percentage_non_unique),
    ]);
    table
}

pub fn word_count_table(report: &FileReport) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "company_name",
        "product_name",
        "word_count_range",
        "review_count",
        "percentage",
    ]);
    for bin in &report.word_counts {
        table.add_row(vec![
            report.company_name.clone(),
            report.product_name.clone(),
            bin.range.to_string(),
            bin.review_count.to_string(),
            format_value(bin.percentage),
        ]);
    }
    table
}

/// All result tables with the file name each is stored under
pub fn result_tables(report: &FileReport, shape: ProductNameShape) -> Vec<(String, CsvTable)> {
    let company = &report.company_name;
    vec![
        (format!("{}_Anomalies.csv", company), anomaly_table(report, shape)),
        (format!("{}_rating_trend.csv", company), trend_table(report)),
        (format!("{}_phrase_repetition.csv", company), phrase_table(report)),
        (format!("{}_unique_nonunique.csv", company), duplicate_table(report)),
        (format!("{}_word_count.csv", company), word_count_table(report)),
    ]
}

/// Write every result table under `<out_dir>/<company>/`
pub fn write_tables(
    report: &FileReport,
    out_dir: &Path,
    shape: ProductNameShape,
) -> io::Result<Vec<PathBuf>> {
    let dir = out_dir.join(&report.company_name);
    fs::create_dir_all(&dir)?;

    let mut written = Vec::new();
    for (file_name, table) in result_tables(report, shape) {
        let path = dir.join(file_name);
        fs::write(&path, table.to_csv())?;
        written.push(path);
    }

    tracing::debug!(dir = %dir.display(), files = written.len(), "wrote result tables");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(3.14159)), "3.14");
        assert_eq!(format_value(Some(20.0)), "20.00");
        assert_eq!(format_value(None), "undefined");
    }

    #[test]
    fn test_product_name_shapes() {
        assert_eq!(format_product_name("Blender X", ProductNameShape::Scalar), "Blender X");
        assert_eq!(
            format_product_name("Blender X", ProductNameShape::Singleton),
            "('Blender X',)"
        );
    }

    #[test]
    fn test_csv_escaping() {
        let mut table = CsvTable::new(vec!["company_name", "product_name"]);
        table.add_row(vec!["acme".to_string(), "cup, \"large\"".to_string()]);

        assert_eq!(
            table.to_csv(),
            "company_name,product_name\nacme,\"cup, \"\"large\"\"\"\n"
        );
    }

    #[test]
    fn test_singleton_shape_is_quoted_in_csv() {
        let mut table = CsvTable::new(vec!["product_name"]);
        table.add_row(vec![format_product_name("mug", ProductNameShape::Singleton)]);
        assert_eq!(table.to_csv(), "product_name\n\"('mug',)\"\n");
    }
}
