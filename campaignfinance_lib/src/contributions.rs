//! Paged listing of contributions under a parent committee or contributor.

use rusqlite::{params, Connection, Row};
use serde::Serialize;
use tracing::debug;

use crate::error::QueryError;
use crate::pool::{Handle, HandleProvider};
use crate::validation::{validate_parent_key, PageRequest};

/// Parent relation a page of contributions hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Keyed by committee registration id, compared case-insensitively.
    Committee,
    /// Keyed by contributor id, compared exactly.
    Contributor,
}

impl Relation {
    fn key_name(self) -> &'static str {
        match self {
            Self::Committee => "committee id",
            Self::Contributor => "contributor id",
        }
    }

    fn page_sql(self) -> &'static str {
        match self {
            Self::Committee => COMMITTEE_PAGE_SQL,
            Self::Contributor => CONTRIBUTOR_PAGE_SQL,
        }
    }

    fn count_sql(self) -> &'static str {
        match self {
            Self::Committee => COMMITTEE_COUNT_SQL,
            Self::Contributor => CONTRIBUTOR_COUNT_SQL,
        }
    }
}

/// One contribution joined to its committee and contributor.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionRow {
    pub id: i64,
    pub contributor_id: String,
    pub contributor_name: String,
    pub zip_code: String,
    pub committee_sboe_id: String,
    pub committee_name: String,
    pub candidate_name: Option<String>,
    pub amount: f64,
    pub date_occurred: String,
    pub form_of_payment: Option<String>,
    pub purpose: Option<String>,
}

/// A single page plus the number of rows matching without paging.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: i64,
}

// COUNT(*) OVER () is evaluated over the whole join before LIMIT/OFFSET.
const COMMITTEE_PAGE_SQL: &str = concat!(
    "SELECT ",
    "c.id, c.contributor_id, ct.name, ct.zip_code, ",
    "c.committee_sboe_id, cm.committee_name, cm.candidate_name, ",
    "c.amount, c.date_occurred, c.form_of_payment, c.purpose, ",
    "COUNT(*) OVER () AS full_count ",
    "FROM committees cm ",
    "JOIN contributions c ON cm.sboe_id = c.committee_sboe_id ",
    "JOIN contributors ct ON ct.id = c.contributor_id ",
    "WHERE upper(cm.sboe_id) = upper(?1) ",
    "ORDER BY c.date_occurred ASC, c.id ASC ",
    "LIMIT ?2 OFFSET ?3"
);

const CONTRIBUTOR_PAGE_SQL: &str = concat!(
    "SELECT ",
    "c.id, c.contributor_id, ct.name, ct.zip_code, ",
    "c.committee_sboe_id, cm.committee_name, cm.candidate_name, ",
    "c.amount, c.date_occurred, c.form_of_payment, c.purpose, ",
    "COUNT(*) OVER () AS full_count ",
    "FROM contributions c ",
    "JOIN contributors ct ON ct.id = c.contributor_id ",
    "JOIN committees cm ON cm.sboe_id = c.committee_sboe_id ",
    "WHERE c.contributor_id = ?1 ",
    "ORDER BY c.date_occurred ASC, c.id ASC ",
    "LIMIT ?2 OFFSET ?3"
);

const COMMITTEE_COUNT_SQL: &str = "
    SELECT COUNT(*)
    FROM committees cm
    JOIN contributions c ON cm.sboe_id = c.committee_sboe_id
    WHERE upper(cm.sboe_id) = upper(?1)";

const CONTRIBUTOR_COUNT_SQL: &str = "
    SELECT COUNT(*)
    FROM contributions c
    WHERE c.contributor_id = ?1";

/// Fetch one page of contributions under `parent_key`.
///
/// Rows come oldest first. `count` is the number of matching rows ignoring
/// `page`. An empty or blank key is rejected before any connection is taken.
pub fn page_contributions(
    provider: &dyn HandleProvider,
    relation: Relation,
    parent_key: &str,
    page: PageRequest,
) -> Result<Page<ContributionRow>, QueryError> {
    let key = validate_parent_key(parent_key, relation.key_name())?;

    debug!(
        ?relation,
        key = %key,
        offset = page.offset,
        limit = page.limit,
        "paging contributions"
    );
    let handle = Handle::acquire(provider)?;
    fetch_page(&handle, relation, &key, page)
}

fn fetch_page(
    conn: &Connection,
    relation: Relation,
    key: &str,
    page: PageRequest,
) -> Result<Page<ContributionRow>, QueryError> {
    let mut stmt = conn.prepare(relation.page_sql())?;
    let rows = stmt.query_map(params![key, page.limit, page.offset], |row| {
        Ok((contribution_row(row)?, row.get::<_, i64>(11)?))
    })?;

    let mut data = Vec::new();
    let mut full_count = None;
    for row in rows {
        let (contribution, count) = row?;
        full_count.get_or_insert(count);
        data.push(contribution);
    }

    let count = match full_count {
        Some(count) => count,
        // Nothing on the first page means nothing matches at all.
        None if page.offset == 0 => 0,
        // Paged past the end: the window count is gone with the rows.
        None => conn.query_row(relation.count_sql(), params![key], |row| row.get(0))?,
    };

    Ok(Page { data, count })
}

fn contribution_row(row: &Row<'_>) -> rusqlite::Result<ContributionRow> {
    Ok(ContributionRow {
        id: row.get(0)?,
        contributor_id: row.get(1)?,
        contributor_name: row.get(2)?,
        zip_code: row.get(3)?,
        committee_sboe_id: row.get(4)?,
        committee_name: row.get(5)?,
        candidate_name: row.get(6)?,
        amount: row.get(7)?,
        date_occurred: row.get(8)?,
        form_of_payment: row.get(9)?,
        purpose: row.get(10)?,
    })
}
