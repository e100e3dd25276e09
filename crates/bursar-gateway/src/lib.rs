pub mod actor;
pub mod error;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use bursar_core::contracts::{
    ApplicationCreate, ApplicationListQuery, ApplicationUpdate, CommentCreate, CommentUpdate,
    DepositCreate, DepositResolve, DepositUpdate, InvoiceCreate, InvoiceUpdate, LedgerListQuery,
    ResolutionRequest, SearchQuery, TermsAmendment, UniversityCreate,
};
use bursar_core::{Application, Comment, Deposit, Invoice, Listing, University};
use bursar_finance::Finances;
use bursar_workflow::BursarService;

pub use actor::{RequireStaff, STAFF_HEADER};
pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub service: BursarService,
}

type Body<T> = Result<Json<T>, JsonRejection>;
type Id = Result<Path<i64>, PathRejection>;
type Params<T> = Result<Query<T>, QueryRejection>;

pub fn router(service: BursarService) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/applications",
            get(list_applications).post(create_application),
        )
        .route("/applications/search", get(search_applications))
        .route("/applications/by-mat/{mat_number}", get(application_by_mat))
        .route(
            "/applications/{id}",
            get(get_application).patch(update_application),
        )
        .route("/applications/{id}/resolve", post(resolve_application))
        .route("/applications/{id}/terms", patch(amend_terms))
        .route("/applications/{id}/finances", get(application_finances))
        .route(
            "/applications/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/applications/{id}/deposits", post(create_deposit_batch))
        .route("/deposits", get(list_deposits).post(create_deposit))
        .route("/deposits/search", get(search_deposits))
        .route("/deposits/{id}", get(get_deposit).put(update_deposit))
        .route("/deposits/{id}/resolve", post(resolve_deposit))
        .route("/deposits/{id}/void", post(void_deposit))
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/search", get(search_invoices))
        .route("/invoices/{id}", get(get_invoice).put(update_invoice))
        .route("/invoices/{id}/void", post(void_invoice))
        .route("/comments/{id}", put(update_comment))
        .route(
            "/universities",
            get(list_universities).post(create_university),
        )
        .route("/universities/{id}", get(get_university))
        .with_state(AppState { service })
}

async fn healthz() -> &'static str {
    "ok"
}

// applications

async fn create_application(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    payload: Body<ApplicationCreate>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let Json(payload) = payload?;
    let application = state.service.create_application(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn list_applications(
    State(state): State<AppState>,
    query: Params<ApplicationListQuery>,
) -> ApiResult<Json<Listing<Application>>> {
    let Query(query) = query?;
    Ok(Json(state.service.list_applications(query).await?))
}

async fn search_applications(
    State(state): State<AppState>,
    query: Params<SearchQuery>,
) -> ApiResult<Json<Listing<Application>>> {
    let Query(query) = query?;
    Ok(Json(state.service.search_applications(query).await?))
}

async fn application_by_mat(
    State(state): State<AppState>,
    Path(mat_number): Path<String>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.service.get_application_by_mat(&mat_number).await?))
}

async fn get_application(State(state): State<AppState>, id: Id) -> ApiResult<Json<Application>> {
    let Path(id) = id?;
    Ok(Json(state.service.get_application(id).await?))
}

async fn update_application(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<ApplicationUpdate>,
) -> ApiResult<Json<Application>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(
        state.service.update_application(&actor, id, payload).await?,
    ))
}

async fn resolve_application(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<ResolutionRequest>,
) -> ApiResult<Json<Application>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(
        state.service.resolve_application(&actor, id, payload).await?,
    ))
}

async fn amend_terms(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<TermsAmendment>,
) -> ApiResult<Json<Application>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(state.service.amend_terms(&actor, id, payload).await?))
}

async fn application_finances(
    State(state): State<AppState>,
    id: Id,
) -> ApiResult<Json<Finances>> {
    let Path(id) = id?;
    Ok(Json(state.service.finances(id).await?))
}

async fn list_comments(State(state): State<AppState>, id: Id) -> ApiResult<Json<Listing<Comment>>> {
    let Path(id) = id?;
    Ok(Json(state.service.list_comments(id).await?))
}

async fn create_comment(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<CommentUpdate>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let comment = state
        .service
        .create_comment(
            &actor,
            CommentCreate {
                student_id: Some(id),
                message: payload.message,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn create_deposit_batch(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<Vec<DepositCreate>>,
) -> ApiResult<(StatusCode, Json<Listing<Deposit>>)> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let deposits = state.service.create_deposits(&actor, id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(Listing {
            total: deposits.len() as i64,
            results: deposits,
        }),
    ))
}

// deposits

async fn create_deposit(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    payload: Body<DepositCreate>,
) -> ApiResult<(StatusCode, Json<Deposit>)> {
    let Json(payload) = payload?;
    let deposit = state.service.create_deposit(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(deposit)))
}

async fn list_deposits(
    State(state): State<AppState>,
    query: Params<LedgerListQuery>,
) -> ApiResult<Json<Listing<Deposit>>> {
    let Query(query) = query?;
    Ok(Json(state.service.list_deposits(query).await?))
}

async fn search_deposits(
    State(state): State<AppState>,
    query: Params<SearchQuery>,
) -> ApiResult<Json<Listing<Deposit>>> {
    let Query(query) = query?;
    Ok(Json(state.service.search_deposits(query).await?))
}

async fn get_deposit(State(state): State<AppState>, id: Id) -> ApiResult<Json<Deposit>> {
    let Path(id) = id?;
    Ok(Json(state.service.get_deposit(id).await?))
}

async fn update_deposit(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<DepositUpdate>,
) -> ApiResult<Json<Deposit>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(state.service.update_deposit(&actor, id, payload).await?))
}

async fn resolve_deposit(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<DepositResolve>,
) -> ApiResult<Json<Deposit>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(state.service.resolve_deposit(&actor, id, payload).await?))
}

async fn void_deposit(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
) -> ApiResult<Json<Deposit>> {
    let Path(id) = id?;
    Ok(Json(state.service.void_deposit(&actor, id).await?))
}

// invoices

async fn create_invoice(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    payload: Body<InvoiceCreate>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let Json(payload) = payload?;
    let invoice = state.service.create_invoice(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn list_invoices(
    State(state): State<AppState>,
    query: Params<LedgerListQuery>,
) -> ApiResult<Json<Listing<Invoice>>> {
    let Query(query) = query?;
    Ok(Json(state.service.list_invoices(query).await?))
}

async fn search_invoices(
    State(state): State<AppState>,
    query: Params<SearchQuery>,
) -> ApiResult<Json<Listing<Invoice>>> {
    let Query(query) = query?;
    Ok(Json(state.service.search_invoices(query).await?))
}

async fn get_invoice(State(state): State<AppState>, id: Id) -> ApiResult<Json<Invoice>> {
    let Path(id) = id?;
    Ok(Json(state.service.get_invoice(id).await?))
}

async fn update_invoice(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<InvoiceUpdate>,
) -> ApiResult<Json<Invoice>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(state.service.update_invoice(&actor, id, payload).await?))
}

async fn void_invoice(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
) -> ApiResult<Json<Invoice>> {
    let Path(id) = id?;
    Ok(Json(state.service.void_invoice(&actor, id).await?))
}

// comments

async fn update_comment(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    id: Id,
    payload: Body<CommentUpdate>,
) -> ApiResult<Json<Comment>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(state.service.update_comment(&actor, id, payload).await?))
}

// universities

async fn create_university(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    payload: Body<UniversityCreate>,
) -> ApiResult<(StatusCode, Json<University>)> {
    let Json(payload) = payload?;
    let university = state.service.create_university(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(university)))
}

async fn list_universities(State(state): State<AppState>) -> ApiResult<Json<Listing<University>>> {
    Ok(Json(state.service.list_universities().await?))
}

async fn get_university(State(state): State<AppState>, id: Id) -> ApiResult<Json<University>> {
    let Path(id) = id?;
    Ok(Json(state.service.get_university(id).await?))
}
