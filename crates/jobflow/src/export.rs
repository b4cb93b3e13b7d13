//! Spreadsheet (CSV) export of an agent's jobs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::ExportError;
use crate::workflow::Job;

/// Column headers, in order.
pub const HEADERS: [&str; 9] = [
    "Number",
    "Date",
    "Address Details",
    "Quote Request Details",
    "Date of Inspection",
    "Accept or Reject A/R",
    "Job Date",
    "Comments on the job",
    "Job Complete",
];

/// A rendered export, ready to hand out as a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// `maintenance_jobs_for_<agent>_as_of_<YYYYMMDD_HHMMSS>.csv`
///
/// Characters of the agent name outside `[A-Za-z0-9_.-]` become `_`.
pub fn download_filename(agent: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "maintenance_jobs_for_{}_as_of_{}.csv",
        filename_safe(agent),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

fn filename_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn row(job: &Job) -> [String; 9] {
    [
        job.number.to_string(),
        date_cell(Some(job.date)),
        job.address_details.clone(),
        job.quote_request_details.clone(),
        date_cell(job.date_of_inspection),
        job.accepted_or_rejected
            .map(|d| d.to_char().to_string())
            .unwrap_or_default(),
        date_cell(job.job_onsite_work_completion_date),
        job.comments.clone().unwrap_or_default(),
        if job.complete() { "Yes" } else { "No" }.to_string(),
    ]
}

/// Renders `jobs` as CSV with a header row.
pub fn render(agent: &str, jobs: &[Job], timestamp: DateTime<Utc>) -> Result<CsvExport, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for job in jobs {
        writer.write_record(row(job))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;

    Ok(CsvExport {
        filename: download_filename(agent, timestamp),
        content: String::from_utf8(bytes)?,
    })
}
