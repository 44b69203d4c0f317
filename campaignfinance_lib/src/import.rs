//! Bulk CSV import into the SQLite store.
//!
//! This is offline tooling for building the database the API reads from.
//! Each file is loaded inside one transaction; rows are upserted by primary
//! key so re-running an import is safe.

use std::io::Read;

use chrono::NaiveDate;
use rusqlite::params;
use serde::Deserialize;
use tracing::info;

use crate::db::{Db, DbError};

/// Date layouts accepted in contribution exports, tried in order.
///
/// `%m/%d/%y` must precede `%m/%d/%Y`, which also accepts `20` as a year.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

#[derive(Debug, Deserialize)]
pub struct ContributorRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zip_code: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub employer: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommitteeRecord {
    pub sboe_id: String,
    pub committee_name: String,
    pub candidate_name: Option<String>,
    pub office: Option<String>,
    pub party: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContributionRecord {
    pub id: Option<i64>,
    pub contributor_id: String,
    pub committee_sboe_id: String,
    pub amount: String,
    pub date_occurred: String,
    pub form_of_payment: Option<String>,
    pub purpose: Option<String>,
}

/// Normalize a contribution date to ISO `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Result<String, DbError> {
    let trimmed = raw.trim();
    let mut result = NaiveDate::parse_from_str(trimmed, DATE_FORMATS[0]);
    for format in &DATE_FORMATS[1..] {
        result = result.or_else(|_| NaiveDate::parse_from_str(trimmed, format));
    }
    Ok(result?.format("%Y-%m-%d").to_string())
}

/// Parse a dollar amount such as `1,250.00` or `$75`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Db {
    pub fn import_contributors<R: Read>(&mut self, reader: R) -> Result<usize, DbError> {
        let mut csv = csv::Reader::from_reader(reader);
        let tx = self.conn_mut().transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO contributors (id, name, zip_code, city, state, employer, occupation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    zip_code = excluded.zip_code,
                    city = excluded.city,
                    state = excluded.state,
                    employer = excluded.employer,
                    occupation = excluded.occupation",
            )?;
            for record in csv.deserialize() {
                let record: ContributorRecord = record?;
                stmt.execute(params![
                    record.id.trim(),
                    record.name.trim(),
                    record.zip_code.trim(),
                    blank_to_none(record.city),
                    blank_to_none(record.state),
                    blank_to_none(record.employer),
                    blank_to_none(record.occupation),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        info!(count, "imported contributors");
        Ok(count)
    }

    pub fn import_committees<R: Read>(&mut self, reader: R) -> Result<usize, DbError> {
        let mut csv = csv::Reader::from_reader(reader);
        let tx = self.conn_mut().transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO committees (sboe_id, committee_name, candidate_name, office, party)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(sboe_id) DO UPDATE SET
                    committee_name = excluded.committee_name,
                    candidate_name = excluded.candidate_name,
                    office = excluded.office,
                    party = excluded.party",
            )?;
            for record in csv.deserialize() {
                let record: CommitteeRecord = record?;
                stmt.execute(params![
                    record.sboe_id.trim(),
                    record.committee_name.trim(),
                    blank_to_none(record.candidate_name),
                    blank_to_none(record.office),
                    blank_to_none(record.party),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        info!(count, "imported committees");
        Ok(count)
    }

    /// Load contributions. Referenced contributors and committees must
    /// already exist; a dangling reference aborts the whole file.
    pub fn import_contributions<R: Read>(&mut self, reader: R) -> Result<usize, DbError> {
        let mut csv = csv::Reader::from_reader(reader);
        let tx = self.conn_mut().transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO contributions
                    (id, contributor_id, committee_sboe_id, amount, date_occurred, form_of_payment, purpose)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    contributor_id = excluded.contributor_id,
                    committee_sboe_id = excluded.committee_sboe_id,
                    amount = excluded.amount,
                    date_occurred = excluded.date_occurred,
                    form_of_payment = excluded.form_of_payment,
                    purpose = excluded.purpose",
            )?;
            for (index, record) in csv.deserialize().enumerate() {
                let record: ContributionRecord = record?;
                // Header is line 1.
                let line = index as u64 + 2;
                let amount = parse_amount(&record.amount).ok_or_else(|| DbError::InvalidRecord {
                    line,
                    reason: format!("bad amount '{}'", record.amount),
                })?;
                let date = normalize_date(&record.date_occurred).map_err(|e| {
                    DbError::InvalidRecord {
                        line,
                        reason: format!("bad date '{}': {}", record.date_occurred, e),
                    }
                })?;
                stmt.execute(params![
                    record.id,
                    record.contributor_id.trim(),
                    record.committee_sboe_id.trim(),
                    amount,
                    date,
                    blank_to_none(record.form_of_payment),
                    blank_to_none(record.purpose),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        info!(count, "imported contributions");
        Ok(count)
    }
}
