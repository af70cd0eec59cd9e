//! CSV export of a user's readings over a date range.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use garden_shared::errors::{AppError, AppResult};

use super::dashboard::unit_for;

pub const DEFAULT_EXPORT_DAYS: i64 = 7;
/// Longest range one export may cover.
pub const MAX_EXPORT_DAYS: i64 = 366;

pub const HEADER: [&str; 6] = ["Sensor Name", "Sensor Type", "Location", "Reading Value", "Unit", "Timestamp"];

/// Lets spreadsheet tools detect UTF-8.
const BOM: &str = "\u{feff}";

/// `?type=&start_date=&end_date=` with dates as `YYYY-MM-DD`, both inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "type")]
    pub sensor_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Half-open instant range `[from, until)` selected by an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl ExportQuery {
    /// Defaults to the last seven days ending today.
    pub fn window(&self, today: NaiveDate) -> AppResult<ExportWindow> {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or(end - Duration::days(DEFAULT_EXPORT_DAYS));

        if start > end {
            return Err(AppError::bad_request("start_date must not be after end_date"));
        }
        if (end - start).num_days() > MAX_EXPORT_DAYS {
            return Err(AppError::bad_request(format!(
                "export range must not exceed {MAX_EXPORT_DAYS} days"
            )));
        }

        let midnight = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(NaiveTime::default()));
        Ok(ExportWindow {
            from: midnight(start),
            until: midnight(end) + Duration::days(1),
        })
    }

    /// Blank `?type=` means every type.
    pub fn type_filter(&self) -> Option<&str> {
        self.sensor_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub sensor_name: String,
    pub sensor_type: String,
    pub location: Option<String>,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

pub fn file_name(today: NaiveDate) -> String {
    format!("sensor_readings_{}.csv", today.format("%Y-%m-%d"))
}

/// Quote a field when it holds a delimiter, a quote or a line break.
fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn push_line<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let line: Vec<String> = fields.into_iter().map(|f| csv_escape(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// The full document: BOM, header line, then one line per row in the given order.
pub fn build_csv(rows: &[ExportRow]) -> String {
    let mut out = String::from(BOM);
    push_line(&mut out, HEADER);
    for row in rows {
        push_line(
            &mut out,
            [
                row.sensor_name.clone(),
                capitalize(&row.sensor_type),
                row.location.clone().unwrap_or_default(),
                row.value.to_string(),
                unit_for(&row.sensor_type).to_string(),
                row.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        );
    }
    out
}
