//! Job repository - CRUD operations for the `jobs` and
//! `job_completion_photos` tables.
//!
//! Write functions take a `&Connection` so they can run inside a caller's
//! transaction (see [`Database::with_transaction`]). Read functions take the
//! `Database` handle directly.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::media::DocumentKind;
use crate::workflow::{DocumentRef, Job, JobStatus, QuoteDecision};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub number: i64,
    pub agent: String,
    pub date: String,
    pub address_details: String,
    pub gps_link: String,
    pub quote_request_details: String,
    pub date_of_inspection: Option<String>,
    pub quote: Option<String>,
    pub accepted_or_rejected: Option<String>,
    pub deposit_proof_of_payment: Option<String>,
    pub job_onsite_work_completion_date: Option<String>,
    pub invoice: Option<String>,
    pub comments: Option<String>,
    pub final_payment_pop: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            number: row.get("number")?,
            agent: row.get("agent")?,
            date: row.get("date")?,
            address_details: row.get("address_details")?,
            gps_link: row.get("gps_link")?,
            quote_request_details: row.get("quote_request_details")?,
            date_of_inspection: row.get("date_of_inspection")?,
            quote: row.get("quote")?,
            accepted_or_rejected: row.get("accepted_or_rejected")?,
            deposit_proof_of_payment: row.get("deposit_proof_of_payment")?,
            job_onsite_work_completion_date: row.get("job_onsite_work_completion_date")?,
            invoice: row.get("invoice")?,
            comments: row.get("comments")?,
            final_payment_pop: row.get("final_payment_pop")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            version: row.get("version")?,
        })
    }

    pub fn from_job(job: &Job) -> Self {
        let doc = |d: &Option<DocumentRef>| d.as_ref().map(|d| d.as_str().to_string());
        Self {
            id: job.id.clone(),
            number: job.number,
            agent: job.agent.clone(),
            date: format_date(job.date),
            address_details: job.address_details.clone(),
            gps_link: job.gps_link.clone(),
            quote_request_details: job.quote_request_details.clone(),
            date_of_inspection: job.date_of_inspection.map(format_date),
            quote: doc(&job.quote),
            accepted_or_rejected: job.accepted_or_rejected.map(|d| d.as_str().to_string()),
            deposit_proof_of_payment: doc(&job.deposit_proof_of_payment),
            job_onsite_work_completion_date: job.job_onsite_work_completion_date.map(format_date),
            invoice: doc(&job.invoice),
            comments: job.comments.clone(),
            final_payment_pop: doc(&job.final_payment_pop),
            status: job.status().as_str().to_string(),
            created_at: format_timestamp(job.created_at),
            updated_at: format_timestamp(job.updated_at),
            version: job.version,
        }
    }

    /// Decodes the row into a `Job`, attaching the given photos.
    pub fn into_job(self, photos: Vec<DocumentRef>) -> Result<Job, DatabaseError> {
        let accepted_or_rejected = match self.accepted_or_rejected {
            Some(value) => Some(QuoteDecision::parse(&value).ok_or(
                DatabaseError::InvalidValue {
                    column: "accepted_or_rejected",
                    value,
                },
            )?),
            None => None,
        };

        Ok(Job {
            date: parse_date("date", &self.date)?,
            date_of_inspection: parse_optional_date(
                "date_of_inspection",
                self.date_of_inspection,
            )?,
            job_onsite_work_completion_date: parse_optional_date(
                "job_onsite_work_completion_date",
                self.job_onsite_work_completion_date,
            )?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            number: self.number,
            agent: self.agent,
            address_details: self.address_details,
            gps_link: self.gps_link,
            quote_request_details: self.quote_request_details,
            quote: self.quote.map(DocumentRef::new),
            accepted_or_rejected,
            deposit_proof_of_payment: self.deposit_proof_of_payment.map(DocumentRef::new),
            job_completion_photos: photos,
            invoice: self.invoice.map(DocumentRef::new),
            comments: self.comments,
            final_payment_pop: self.final_payment_pop.map(DocumentRef::new),
            version: self.version,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(column: &'static str, value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| DatabaseError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

fn parse_optional_date(
    column: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, DatabaseError> {
    value.map(|v| parse_date(column, &v)).transpose()
}

/// RFC 3339 with as many fractional digits as needed, so values round-trip.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidValue {
            column,
            value: value.to_string(),
        })
}

/// Page size used when a [`JobFilter`] sets no limit.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub agent: Option<String>,
    pub status: Option<JobStatus>,
    pub complete: Option<bool>,
    /// Defaults to [`DEFAULT_PAGE_SIZE`].
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// The next sequential job number (1 for an empty table).
pub fn next_number(conn: &Connection) -> Result<i64, DatabaseError> {
    let number: i64 = conn.query_row("SELECT COALESCE(MAX(number), 0) + 1 FROM jobs", [], |r| {
        r.get(0)
    })?;
    Ok(number)
}

/// Inserts a new job row together with its photos.
pub fn insert(conn: &Connection, job: &Job) -> Result<(), DatabaseError> {
    let row = JobRow::from_job(job);
    conn.execute(
        "INSERT INTO jobs (id, number, agent, date, address_details, gps_link,
         quote_request_details, date_of_inspection, quote, accepted_or_rejected,
         deposit_proof_of_payment, job_onsite_work_completion_date, invoice, comments,
         final_payment_pop, status, created_at, updated_at, version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
         ?17, ?18, ?19)",
        params![
            row.id,
            row.number,
            row.agent,
            row.date,
            row.address_details,
            row.gps_link,
            row.quote_request_details,
            row.date_of_inspection,
            row.quote,
            row.accepted_or_rejected,
            row.deposit_proof_of_payment,
            row.job_onsite_work_completion_date,
            row.invoice,
            row.comments,
            row.final_payment_pop,
            row.status,
            row.created_at,
            row.updated_at,
            row.version,
        ],
    )?;
    append_photos(conn, job)?;
    Ok(())
}

/// Writes the mutable fields of `job` if the stored version still equals
/// `expected_version`, bumping the version by one.
///
/// Returns `false` (and writes nothing) when another writer got there first.
/// Creation fields (`number`, `agent`, `date`, address, link, request) are
/// never rewritten.
pub fn update(conn: &Connection, job: &Job, expected_version: i64) -> Result<bool, DatabaseError> {
    let row = JobRow::from_job(job);
    let changed = conn.execute(
        "UPDATE jobs SET date_of_inspection=?3, quote=?4, accepted_or_rejected=?5,
         deposit_proof_of_payment=?6, job_onsite_work_completion_date=?7, invoice=?8,
         comments=?9, final_payment_pop=?10, status=?11, updated_at=?12,
         version=version + 1
         WHERE id=?1 AND version=?2",
        params![
            row.id,
            expected_version,
            row.date_of_inspection,
            row.quote,
            row.accepted_or_rejected,
            row.deposit_proof_of_payment,
            row.job_onsite_work_completion_date,
            row.invoice,
            row.comments,
            row.final_payment_pop,
            row.status,
            row.updated_at,
        ],
    )?;
    if changed == 0 {
        return Ok(false);
    }
    append_photos(conn, job)?;
    Ok(true)
}

/// Inserts the photos of `job` that are not stored yet. Photos are
/// append-only, so anything past the stored count is new.
fn append_photos(conn: &Connection, job: &Job) -> Result<(), DatabaseError> {
    let stored: i64 = conn.query_row(
        "SELECT COUNT(*) FROM job_completion_photos WHERE job_id = ?1",
        params![job.id],
        |r| r.get(0),
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO job_completion_photos (job_id, position, photo) VALUES (?1, ?2, ?3)",
    )?;
    for (position, photo) in job.job_completion_photos.iter().enumerate().skip(stored as usize) {
        stmt.execute(params![job.id, position as i64, photo.as_str()])?;
    }
    Ok(())
}

fn load_photos(conn: &Connection, job_id: &str) -> Result<Vec<DocumentRef>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT photo FROM job_completion_photos WHERE job_id = ?1 ORDER BY position",
    )?;
    let photos = stmt
        .query_map(params![job_id], |r| r.get::<_, String>(0))?
        .map(|p| p.map(DocumentRef::new))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(photos)
}

fn hydrate(conn: &Connection, row: JobRow) -> Result<Job, DatabaseError> {
    let photos = load_photos(conn, &row.id)?;
    row.into_job(photos)
}

fn find_one(
    conn: &Connection,
    sql: &str,
    param: &dyn rusqlite::types::ToSql,
) -> Result<Option<Job>, DatabaseError> {
    let row = conn
        .query_row(sql, &[param], JobRow::from_row)
        .optional()?;
    row.map(|row| hydrate(conn, row)).transpose()
}

/// Finds a job by its ID, inside an open connection or transaction.
pub fn find_by_id_in(conn: &Connection, id: &str) -> Result<Option<Job>, DatabaseError> {
    find_one(conn, "SELECT * FROM jobs WHERE id = ?1", &id)
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Job>, DatabaseError> {
    db.with_conn(|conn| find_by_id_in(conn, id))
}

/// Finds a job by its number.
pub fn find_by_number(db: &Database, number: i64) -> Result<Option<Job>, DatabaseError> {
    db.with_conn(|conn| find_one(conn, "SELECT * FROM jobs WHERE number = ?1", &number))
}

/// Queries jobs with filters, returning (jobs, total_count). Ordered by number.
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<Job>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref agent) = filter.agent {
            conditions.push(format!("agent = ?{}", param_values.len() + 1));
            param_values.push(Box::new(agent.clone()));
        }
        if let Some(status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.as_str()));
        }
        match filter.complete {
            Some(true) => conditions.push("final_payment_pop IS NOT NULL".to_string()),
            Some(false) => conditions.push("final_payment_pop IS NULL".to_string()),
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // Fetch paginated results.
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM jobs {} ORDER BY number ASC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let jobs = rows
            .into_iter()
            .map(|row| hydrate(conn, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((jobs, total))
    })
}

/// Returns the owning agent of the single job that references `reference`
/// as a document of the given kind. Missing or ambiguous matches give `None`.
pub fn find_owner_by_document(
    db: &Database,
    kind: DocumentKind,
    reference: &str,
) -> Result<Option<String>, DatabaseError> {
    let sql = match kind {
        DocumentKind::Quote => "SELECT agent FROM jobs WHERE quote = ?1 LIMIT 2",
        DocumentKind::DepositProofOfPayment => {
            "SELECT agent FROM jobs WHERE deposit_proof_of_payment = ?1 LIMIT 2"
        }
        DocumentKind::Invoice => "SELECT agent FROM jobs WHERE invoice = ?1 LIMIT 2",
        DocumentKind::FinalPaymentPop => {
            "SELECT agent FROM jobs WHERE final_payment_pop = ?1 LIMIT 2"
        }
        DocumentKind::CompletionPhoto => {
            "SELECT j.agent FROM job_completion_photos p
             JOIN jobs j ON j.id = p.job_id WHERE p.photo = ?1 LIMIT 2"
        }
    };
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(sql)?;
        let owners = stmt
            .query_map(params![reference], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match owners.as_slice() {
            [owner] => Some(owner.clone()),
            _ => None,
        })
    })
}
