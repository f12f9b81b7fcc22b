//! Review export ingestion
//!
//! Reads the marketplace CSV export (fixed column order, header optional),
//! validates each row and produces typed [`ReviewRecord`]s. Rows with an
//! unusable rating, date or text are dropped and counted, never fatal.

use crate::error::{AnalysisError, Result};
use crate::text::TextNormalizer;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Column order of a review export
pub const EXPECTED_HEADER: [&str; 9] = [
    "review_uid",
    "product_name",
    "product_price",
    "product_type",
    "username_1",
    "username_2",
    "rating",
    "review_content",
    "review_date",
];

// Offset timestamps keep their local wall-clock day
const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

// Two-digit years first: `%Y` would read "24.03.15." as the year 24
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%y.%m.%d.", "%y.%m.%d", "%Y.%m.%d.", "%Y.%m.%d", "%Y/%m/%d",
];

/// Raw text values treated as "no review text"
const MISSING_TEXT_MARKERS: [&str; 3] = ["nan", "NaN", "N/A"];

/// One physical CSV record with the line it started on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub fields: Vec<String>,
}

/// A validated review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRecord {
    pub review_uid: String,
    pub product_name: String,
    pub product_price: String,
    pub product_type: String,
    pub username_1: String,
    pub username_2: String,
    /// Star rating in [1, 5]
    pub rating: f64,
    pub raw_text: String,
    /// Normalized text used for duplicate and phrase analysis
    pub text: String,
    /// Calendar day used for bucketing
    pub date: NaiveDate,
    /// Full timestamp when the export carried a time of day
    pub posted_at: Option<NaiveDateTime>,
}

/// Why a row was dropped during ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    FieldCount,
    Rating,
    Date,
    MissingText,
}

/// Row accounting for one ingested file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub rows_read: usize,
    pub accepted: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl IngestSummary {
    pub fn dropped_rows(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Split CSV text into rows
///
/// Handles a leading BOM, quoted fields with doubled quotes, embedded commas
/// and newlines, and CRLF line endings. Blank lines are skipped.
pub fn read_rows(content: &str) -> Result<Vec<CsvRow>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut fields), row_start);
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(AnalysisError::MalformedCsv {
            line: row_start,
            reason: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_row(&mut rows, fields, row_start);
    }

    Ok(rows)
}

fn push_row(rows: &mut Vec<CsvRow>, fields: Vec<String>, line: usize) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        rows.push(CsvRow { line, fields });
    }
}

/// Whether a row is the export header rather than data
pub fn is_header(row: &CsvRow) -> bool {
    row.fields
        .first()
        .is_some_and(|f| f.trim().eq_ignore_ascii_case(EXPECTED_HEADER[0]))
}

/// Parse a rating cell; `None` for non-numeric or out-of-range values
pub fn parse_rating(value: &str) -> Option<f64> {
    let rating: f64 = value.trim().parse().ok()?;
    (rating.is_finite() && (1.0..=5.0).contains(&rating)).then_some(rating)
}

/// Parse a review date cell into its calendar day and, when present, full timestamp
pub fn parse_review_date(value: &str) -> Option<(NaiveDate, Option<NaiveDateTime>)> {
    let value = value.trim();

    let with_offset = DateTime::parse_from_rfc3339(value).ok().or_else(|| {
        OFFSET_DATETIME_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(value, format).ok())
    });
    if let Some(ts) = with_offset {
        let local = ts.naive_local();
        return Some((local.date(), Some(local)));
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some((ts.date(), Some(ts)));
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .map(|date| (date, None))
}

fn is_missing_text(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || MISSING_TEXT_MARKERS.contains(&trimmed)
}

/// Validate one data row into a record
pub fn parse_row(row: &CsvRow, normalizer: &TextNormalizer) -> Result<ReviewRecord> {
    let malformed = |reason: String| AnalysisError::MalformedRow {
        line: row.line,
        reason,
    };

    let [uid, product_name, price, product_type, user_1, user_2, rating, content, date] =
        row.fields.as_slice()
    else {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            EXPECTED_HEADER.len(),
            row.fields.len()
        )));
    };

    let rating =
        parse_rating(rating).ok_or_else(|| malformed(format!("unusable rating {:?}", rating)))?;

    if is_missing_text(content) {
        return Err(malformed("missing review text".to_string()));
    }

    let (date, posted_at) =
        parse_review_date(date).ok_or_else(|| malformed(format!("unparseable date {:?}", date)))?;

    Ok(ReviewRecord {
        review_uid: uid.trim().to_string(),
        product_name: product_name.trim().to_string(),
        product_price: price.trim().to_string(),
        product_type: product_type.trim().to_string(),
        username_1: user_1.trim().to_string(),
        username_2: user_2.trim().to_string(),
        rating,
        raw_text: content.clone(),
        text: normalizer.normalize(content),
        date,
        posted_at,
    })
}

fn drop_reason(row: &CsvRow) -> DropReason {
    match row.fields.as_slice() {
        fields if fields.len() != EXPECTED_HEADER.len() => DropReason::FieldCount,
        fields if parse_rating(&fields[6]).is_none() => DropReason::Rating,
        fields if is_missing_text(&fields[7]) => DropReason::MissingText,
        _ => DropReason::Date,
    }
}

/// Turn CSV rows into validated records
///
/// The header row, if present, is skipped. Fails with
/// [`AnalysisError::EmptyDataset`] when no row survives.
pub fn ingest_rows(
    rows: &[CsvRow],
    normalizer: &TextNormalizer,
) -> Result<(Vec<ReviewRecord>, IngestSummary)> {
    let data = match rows.first() {
        Some(first) if is_header(first) => &rows[1..],
        _ => rows,
    };

    let mut summary = IngestSummary {
        rows_read: data.len(),
        ..IngestSummary::default()
    };
    let mut records = Vec::with_capacity(data.len());

    for row in data {
        match parse_row(row, normalizer) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!("dropping row: {}", e);
                *summary.dropped.entry(drop_reason(row)).or_insert(0) += 1;
            }
        }
    }

    summary.accepted = records.len();

    if records.is_empty() {
        return Err(AnalysisError::EmptyDataset {
            rows_read: summary.rows_read,
            dropped: summary.dropped_rows(),
        });
    }

    if summary.dropped_rows() > 0 {
        tracing::info!(
            accepted = summary.accepted,
            dropped = summary.dropped_rows(),
            "dropped malformed rows"
        );
    }

    Ok((records, summary))
}

/// Read and validate an entire export held in memory
pub fn ingest_csv(
    content: &str,
    normalizer: &TextNormalizer,
) -> Result<(Vec<ReviewRecord>, IngestSummary)> {
    let rows = read_rows(content)?;
    ingest_rows(&rows, normalizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "review_uid,product_name,product_price,product_type,username_1,username_2,rating,review_content,review_date";

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new().unwrap()
    }

    #[test]
    fn test_read_rows_quoted_fields() {
        let rows = read_rows("a,\"b, with comma\",\"say \"\"hi\"\"\"\r\nc,d,e\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields, vec!["a", "b, with comma", "say \"hi\""]);
        assert_eq!(rows[1].fields, vec!["c", "d", "e"]);
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn test_read_rows_embedded_newline_tracks_lines() {
        let rows = read_rows("x,\"line one\nline two\"\ny,z").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields[1], "line one\nline two");
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_read_rows_skips_bom_and_blank_lines() {
        let rows = read_rows("\u{feff}a,b\n\n   \nc,d").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields, vec!["a", "b"]);
    }

    #[test]
    fn test_read_rows_unterminated_quote() {
        let err = read_rows("a,\"never closed\nb").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedCsv { line: 1, .. }));
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4"), Some(4.0));
        assert_eq!(parse_rating(" 4.5 "), Some(4.5));
        assert_eq!(parse_rating("five"), None);
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("NaN"), None);
    }

    #[test]
    fn test_parse_review_date_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_review_date("2024-03-15").unwrap().0, day);
        assert_eq!(parse_review_date("2024.03.15.").unwrap().0, day);
        assert_eq!(parse_review_date("24.03.15.").unwrap().0, day);

        let (date, ts) = parse_review_date("2024-03-15 23:59:01").unwrap();
        assert_eq!(date, day);
        assert!(ts.is_some());

        let (date, ts) = parse_review_date("2024-03-15 10:22:31.123").unwrap();
        assert_eq!(date, day);
        assert_eq!(ts.unwrap().format("%.3f").to_string(), ".123");

        // Local day, not the UTC day
        let (date, ts) = parse_review_date("2024-03-15T01:22:31+09:00").unwrap();
        assert_eq!(date, day);
        assert_eq!(ts.unwrap().format("%H:%M:%S").to_string(), "01:22:31");
        assert_eq!(parse_review_date("2024-03-15 10:22:31+09:00").unwrap().0, day);

        let (date, ts) = parse_review_date("2024.03.15 10:22").unwrap();
        assert_eq!(date, day);
        assert!(ts.is_some());

        assert!(parse_review_date("yesterday").is_none());
    }

    #[test]
    fn test_ingest_drops_and_counts_malformed_rows() {
        let csv = format!(
            "{HEADER}\n\
             1,Widget,9900,A,u1,v1,5,Great!,2024-01-01\n\
             2,Widget,9900,A,u2,v2,bad,Fine,2024-01-01\n\
             3,Widget,9900,A,u3,v3,4,,2024-01-02\n\
             4,Widget,9900,A,u4,v4,3,Okay,someday\n\
             5,Widget,9900,A,u5,v5\n\
             6,Widget,9900,A,u6,v6,2,N/A,2024-01-02\n"
        );

        let (records, summary) = ingest_csv(&csv, &normalizer()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "great");
        assert_eq!(summary.rows_read, 6);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.dropped[&DropReason::Rating], 1);
        assert_eq!(summary.dropped[&DropReason::MissingText], 2);
        assert_eq!(summary.dropped[&DropReason::Date], 1);
        assert_eq!(summary.dropped[&DropReason::FieldCount], 1);
    }

    #[test]
    fn test_ingest_headerless_export() {
        let csv = "1,Widget,9900,A,u1,v1,5,Great,2024-01-01\n";
        let (records, summary) = ingest_csv(csv, &normalizer()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(summary.rows_read, 1);
    }

    #[test]
    fn test_text_empty_after_normalization_is_kept() {
        let csv = format!("{HEADER}\n1,Widget,9900,A,u1,v1,5,!!!,2024-01-01\n");
        let (records, _) = ingest_csv(&csv, &normalizer()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "");
    }

    #[test]
    fn test_ingest_empty_dataset() {
        let csv = format!("{HEADER}\n1,Widget,9900,A,u1,v1,x,text,2024-01-01\n");
        let err = ingest_csv(&csv, &normalizer()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::EmptyDataset {
                rows_read: 1,
                dropped: 1
            }
        ));
    }
}
