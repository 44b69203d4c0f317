//! HTTP routes. Handlers only parse parameters and shape responses; all
//! query work happens in `campaignfinance_lib` on a blocking thread.

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use campaignfinance_lib::contributions::{page_contributions, ContributionRow, Page, Relation};
use campaignfinance_lib::search::{search, SearchKind, SearchResults};
use campaignfinance_lib::similarity::DEFAULT_THRESHOLD;
use campaignfinance_lib::validation::validate_search;
use campaignfinance_lib::{
    aggregate_by_postal_prefix, AggregateFilter, HandleProvider, PageRequest, QueryError,
    ZipAggregateRow,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::Mode;
use crate::error::ApiError;

/// Process-wide state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn HandleProvider>,
    pub mode: Mode,
    pub similarity_threshold: f64,
}

impl AppState {
    pub fn new(provider: Arc<dyn HandleProvider>, mode: Mode) -> Self {
        Self {
            provider,
            mode,
            similarity_threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Run a query on the blocking pool and map its failure into the envelope.
    async fn run<T, F>(&self, query: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn HandleProvider) -> Result<T, QueryError> + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        match tokio::task::spawn_blocking(move || query(provider.as_ref())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ApiError::from_query(e, self.mode)),
            Err(e) => Err(ApiError::internal(e, self.mode)),
        }
    }
}

/// Raw paging parameters; malformed values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// A query string that does not decode at all (a repeated key, say)
    /// gets default paging, like any other malformed value.
    fn page(query: Result<Query<PageParams>, QueryRejection>) -> PageRequest {
        match query {
            Ok(Query(params)) => {
                PageRequest::from_raw(params.offset.as_deref(), params.limit.as_deref())
            }
            Err(rejection) => {
                debug!(reason = %rejection.body_text(), "unreadable paging parameters");
                PageRequest::default()
            }
        }
    }
}

fn path_segment(path: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    path.map(|Path(segment)| segment)
        .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))
}

/// Raw aggregate filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipParams {
    pub year: Option<String>,
    pub candidate_name: Option<String>,
    pub office: Option<String>,
    pub committee_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/search/contributors/:name", get(search_contributors))
        .route("/search/candidates/:name", get(search_candidates))
        .route("/candidate/:ncsbe_id", get(candidate_contributions))
        .route(
            "/contributors/:contributor_id/contributions",
            get(contributor_contributions),
        )
        .route("/zipcodes/contributions", get(zipcode_contributions));

    Router::new()
        .nest("/api", api)
        .route("/status", get(status))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/search/contributors/:name
async fn search_contributors(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<SearchResults>, ApiError> {
    let name = path_segment(name)?;
    run_search(state, SearchKind::Contributor, name, PageParams::page(query)).await
}

/// GET /api/search/candidates/:name
async fn search_candidates(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<SearchResults>, ApiError> {
    let name = path_segment(name)?;
    run_search(state, SearchKind::Committee, name, PageParams::page(query)).await
}

async fn run_search(
    state: AppState,
    kind: SearchKind,
    name: String,
    page: PageRequest,
) -> Result<Json<SearchResults>, ApiError> {
    let threshold = state.similarity_threshold;
    let results = state
        .run(move |provider| {
            let name = validate_search(&name)?;
            search(provider, kind, &name, page, threshold)
        })
        .await?;
    Ok(Json(results))
}

/// GET /api/candidate/:ncsbe_id
async fn candidate_contributions(
    State(state): State<AppState>,
    ncsbe_id: Result<Path<String>, PathRejection>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<ContributionRow>>, ApiError> {
    let ncsbe_id = path_segment(ncsbe_id)?;
    let page = PageParams::page(query);
    let result = state
        .run(move |provider| page_contributions(provider, Relation::Committee, &ncsbe_id, page))
        .await?;
    Ok(Json(result))
}

/// GET /api/contributors/:contributor_id/contributions
async fn contributor_contributions(
    State(state): State<AppState>,
    contributor_id: Result<Path<String>, PathRejection>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<ContributionRow>>, ApiError> {
    let contributor_id = path_segment(contributor_id)?;
    let page = PageParams::page(query);
    let result = state
        .run(move |provider| {
            page_contributions(provider, Relation::Contributor, &contributor_id, page)
        })
        .await?;
    Ok(Json(result))
}

/// GET /api/zipcodes/contributions
async fn zipcode_contributions(
    State(state): State<AppState>,
    query: Result<Query<ZipParams>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<ZipAggregateRow>>>, ApiError> {
    let Query(params) = query
        .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
    let filter = AggregateFilter::from_raw(
        params.year.as_deref(),
        params.candidate_name.as_deref(),
        params.office.as_deref(),
        params.committee_name.as_deref(),
    )
    .map_err(|e| ApiError::from_query(e, state.mode))?;

    let data = state
        .run(move |provider| aggregate_by_postal_prefix(provider, &filter))
        .await?;
    Ok(Json(DataResponse { data }))
}

/// GET /status
async fn status() -> Json<StatusResponse> {
    Json(StatusResponse { status: "online" })
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}
