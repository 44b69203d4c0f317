//! Contribution totals grouped by 5-digit postal prefix.

use rusqlite::types::ToSql;
use serde::Serialize;
use tracing::debug;

use crate::error::QueryError;
use crate::pool::{Handle, HandleProvider};
use crate::validation::{validate_filter_text, validate_year};

/// Optional filters for [`aggregate_by_postal_prefix`]. `None` means the
/// filter does not restrict anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateFilter {
    pub year: Option<i32>,
    pub candidate_name: Option<String>,
    pub office: Option<String>,
    pub committee_name: Option<String>,
}

impl AggregateFilter {
    /// Parse raw query-string values.
    ///
    /// Blank values count as absent. A `year` that is not an integer in
    /// range fails the whole request rather than being dropped.
    pub fn from_raw(
        year: Option<&str>,
        candidate_name: Option<&str>,
        office: Option<&str>,
        committee_name: Option<&str>,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            year: validate_year(year)?,
            candidate_name: validate_filter_text(candidate_name, "candidate name")?,
            office: validate_filter_text(office, "office")?,
            committee_name: validate_filter_text(committee_name, "committee name")?,
        })
    }
}

/// One postal-prefix bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZipAggregateRow {
    pub zipcode: String,
    pub dollars_contributed: f64,
    pub number_of_contributions: i64,
    pub average_contribution_amount: f64,
}

/// AND-combined WHERE predicates with positionally bound values.
///
/// Clause text is always static; values only ever travel as parameters.
pub struct Predicates {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Default for Predicates {
    fn default() -> Self {
        Self::new()
    }
}

impl Predicates {
    /// Start from the always-true predicate.
    pub fn new() -> Self {
        Self {
            clauses: vec!["1 = 1".to_string()],
            params: Vec::new(),
        }
    }

    /// Append a predicate. Each `?` in `template` is replaced by the numbered
    /// placeholder for `value`; the template must contain exactly one `?`.
    pub fn push(&mut self, template: &'static str, value: impl ToSql + 'static) {
        self.params.push(Box::new(value));
        let placeholder = format!("?{}", self.params.len());
        self.clauses.push(template.replace('?', &placeholder));
    }

    pub fn where_clause(&self) -> String {
        format!("WHERE {}", self.clauses.join(" AND "))
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Build the predicate set for `filter`: one predicate per present field.
pub fn build_aggregate_predicates(filter: &AggregateFilter) -> Predicates {
    let mut predicates = Predicates::new();

    if let Some(year) = filter.year {
        predicates.push(
            "CAST(strftime('%Y', c.date_occurred) AS INTEGER) = ?",
            year,
        );
    }
    if let Some(ref candidate_name) = filter.candidate_name {
        predicates.push("upper(cm.candidate_name) = upper(?)", candidate_name.clone());
    }
    if let Some(ref office) = filter.office {
        predicates.push("upper(cm.office) = upper(?)", office.clone());
    }
    if let Some(ref committee_name) = filter.committee_name {
        predicates.push("upper(cm.committee_name) = upper(?)", committee_name.clone());
    }

    predicates
}

/// Sum, count and rounded average of contributions per postal prefix.
///
/// Groups come back ordered by prefix.
pub fn aggregate_by_postal_prefix(
    provider: &dyn HandleProvider,
    filter: &AggregateFilter,
) -> Result<Vec<ZipAggregateRow>, QueryError> {
    let predicates = build_aggregate_predicates(filter);
    let sql = format!(
        "SELECT
            substr(ct.zip_code, 1, 5) AS zipcode,
            SUM(c.amount) AS dollars_contributed,
            COUNT(*) AS number_of_contributions,
            ROUND(SUM(c.amount) / COUNT(*)) AS average_contribution_amount
        FROM contributors ct
        JOIN contributions c ON ct.id = c.contributor_id
        JOIN committees cm ON cm.sboe_id = c.committee_sboe_id
        {}
        GROUP BY zipcode
        ORDER BY zipcode ASC",
        predicates.where_clause()
    );

    debug!(?filter, predicates = predicates.len(), "aggregating by postal prefix");
    let handle = Handle::acquire(provider)?;

    let mut stmt = handle.prepare(&sql)?;
    let rows = stmt.query_map(predicates.params().as_slice(), |row| {
        Ok(ZipAggregateRow {
            zipcode: row.get(0)?,
            dollars_contributed: row.get(1)?,
            number_of_contributions: row.get(2)?,
            average_contribution_amount: row.get(3)?,
        })
    })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}
