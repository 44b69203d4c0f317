//! Fuzzy name search over contributors and committees.

use rusqlite::{params, Row};
use serde::Serialize;
use tracing::debug;

use crate::error::QueryError;
use crate::pool::{Handle, HandleProvider};
use crate::validation::PageRequest;

/// Which entity table a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Contributor,
    Committee,
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contributor => write!(f, "contributor"),
            Self::Committee => write!(f, "committee"),
        }
    }
}

/// A contributor whose name matched the search.
#[derive(Debug, Clone, Serialize)]
pub struct ContributorMatch {
    pub id: String,
    pub name: String,
    pub zip_code: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub similarity: f64,
}

/// A committee whose name (or candidate name) matched the search.
#[derive(Debug, Clone, Serialize)]
pub struct CommitteeMatch {
    pub sboe_id: String,
    pub committee_name: String,
    pub candidate_name: Option<String>,
    pub office: Option<String>,
    pub party: Option<String>,
    pub similarity: f64,
}

/// Result of a search, one variant per [`SearchKind`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    Contributors(Vec<ContributorMatch>),
    Committees(Vec<CommitteeMatch>),
}

impl SearchResults {
    pub fn len(&self) -> usize {
        match self {
            Self::Contributors(rows) => rows.len(),
            Self::Committees(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Ranking happens before LIMIT/OFFSET, so paging only slices the ranked list.
// Ties on score fall back to name, then identifier.
const CONTRIBUTOR_SEARCH_SQL: &str = "
    SELECT id, name, zip_code, city, state, score
    FROM (
        SELECT id, name, zip_code, city, state, similarity(name, ?1) AS score
        FROM contributors
    )
    WHERE score >= ?2
    ORDER BY score DESC, name ASC, id ASC
    LIMIT ?3 OFFSET ?4";

const COMMITTEE_SEARCH_SQL: &str = "
    SELECT sboe_id, committee_name, candidate_name, office, party, score
    FROM (
        SELECT sboe_id, committee_name, candidate_name, office, party,
               max(similarity(committee_name, ?1), similarity(candidate_name, ?1)) AS score
        FROM committees
    )
    WHERE score >= ?2
    ORDER BY score DESC, committee_name ASC, sboe_id ASC
    LIMIT ?3 OFFSET ?4";

/// Rank entities of `kind` by trigram similarity to `name`.
///
/// Rows scoring below `threshold` are dropped; `page` slices what is left.
/// `name` is expected to be validated already (see
/// [`crate::validation::validate_search`]).
pub fn search(
    provider: &dyn HandleProvider,
    kind: SearchKind,
    name: &str,
    page: PageRequest,
    threshold: f64,
) -> Result<SearchResults, QueryError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(QueryError::invalid(format!(
            "similarity threshold must be within [0, 1], got {}",
            threshold
        )));
    }

    debug!(%kind, name, offset = page.offset, limit = page.limit, "fuzzy search");
    let handle = Handle::acquire(provider)?;

    let results = match kind {
        SearchKind::Contributor => {
            let mut stmt = handle.prepare(CONTRIBUTOR_SEARCH_SQL)?;
            let rows = stmt.query_map(
                params![name, threshold, page.limit, page.offset],
                contributor_match,
            )?;
            let mut result = Vec::new();
            for row in rows {
                result.push(row?);
            }
            SearchResults::Contributors(result)
        }
        SearchKind::Committee => {
            let mut stmt = handle.prepare(COMMITTEE_SEARCH_SQL)?;
            let rows = stmt.query_map(
                params![name, threshold, page.limit, page.offset],
                committee_match,
            )?;
            let mut result = Vec::new();
            for row in rows {
                result.push(row?);
            }
            SearchResults::Committees(result)
        }
    };

    Ok(results)
}

fn contributor_match(row: &Row<'_>) -> rusqlite::Result<ContributorMatch> {
    Ok(ContributorMatch {
        id: row.get(0)?,
        name: row.get(1)?,
        zip_code: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        similarity: row.get(5)?,
    })
}

fn committee_match(row: &Row<'_>) -> rusqlite::Result<CommitteeMatch> {
    Ok(CommitteeMatch {
        sboe_id: row.get(0)?,
        committee_name: row.get(1)?,
        candidate_name: row.get(2)?,
        office: row.get(3)?,
        party: row.get(4)?,
        similarity: row.get(5)?,
    })
}
