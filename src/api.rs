// 🌐 REST API with Axum
//
// Every handler returns on its first error; the error's IntoResponse impl
// picks the status code and hides storage/credential detail from clients.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{bearer_token, hash_password, verify_password, Claims, TokenKeys};
use crate::dispatch;
use crate::entities::{self, Account, AccountUpdate, Category, CategoryUpdate, NewAccount, NewCategory, User};
use crate::error::LedgerError;
use crate::filter::{AccountFilter, CategoryFilter, QueryVariant};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub keys: TokenKeys,
}

impl AppState {
    pub fn new(conn: Connection, keys: TokenKeys) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            keys,
        }
    }

    /// A panic mid-request can't leave SQLite half-written, so a poisoned
    /// lock is still safe to reuse.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, LedgerError>;

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::InvalidRequest(_) | LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LedgerError::Storage(_) | LedgerError::Credential(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        match &self {
            LedgerError::Storage(_) | LedgerError::Credential(_) => {
                tracing::error!(error = %self, "request failed")
            }
            LedgerError::Unauthorized(_) => tracing::warn!(error = %self, "request rejected"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        (status, Json(ApiResponse::err(self.public_message()))).into_response()
    }
}

// ============================================================================
// Request binding
// ============================================================================

fn bind_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, LedgerError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| LedgerError::InvalidRequest(e.body_text()))
}

fn bind_query<T>(payload: Result<Query<T>, QueryRejection>) -> Result<T, LedgerError> {
    payload
        .map(|Query(value)| value)
        .map_err(|e| LedgerError::InvalidRequest(e.body_text()))
}

fn bind_path<T>(payload: Result<Path<T>, PathRejection>) -> Result<T, LedgerError> {
    payload
        .map(|Path(value)| value)
        .map_err(|e| LedgerError::InvalidRequest(e.body_text()))
}

/// Rejects the request unless it carries a valid bearer token; on success the
/// token's claims are available to handlers as an extension.
async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, LedgerError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let claims = state.keys.verify(bearer_token(header)?)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// ============================================================================
// Users & login
// ============================================================================

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /user
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<User> {
    let req = bind_json(payload)?;
    let password_hash = hash_password(&req.password)?;
    let user = entities::create_user(&state.conn(), &req.username, &password_hash, &req.email)?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Json(ApiResponse::ok(user)))
}

/// GET /user/:username
async fn get_user(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
) -> ApiResult<User> {
    let username = bind_path(username)?;
    let user = entities::get_user_by_username(&state.conn(), &username)?;
    Ok(Json(ApiResponse::ok(user)))
}

/// GET /user/id/:id
async fn get_user_by_id(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<User> {
    let id = bind_path(id)?;
    let user = entities::get_user(&state.conn(), id)?;
    Ok(Json(ApiResponse::ok(user)))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let req = bind_json(payload)?;
    let bad_credentials = || LedgerError::Unauthorized("invalid username or password".into());

    let user = match entities::get_user_by_username(&state.conn(), &req.username) {
        Ok(user) => user,
        Err(LedgerError::NotFound(_)) => return Err(bad_credentials()),
        Err(e) => return Err(e),
    };

    if !verify_password(&req.password, &user.password)? {
        return Err(bad_credentials());
    }

    let token = state.keys.issue(&user)?;
    tracing::info!(user_id = user.id, "login succeeded");
    Ok(Json(ApiResponse::ok(LoginResponse { token, user })))
}

// ============================================================================
// Categories
// ============================================================================

/// POST /category
async fn create_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<Category> {
    let new = bind_json(payload)?;
    let category = entities::create_category(&state.conn(), &new)?;

    tracing::info!(category_id = category.id, by = %claims.username, "category created");
    Ok(Json(ApiResponse::ok(category)))
}

/// GET /category/id/:id
async fn get_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Category> {
    let id = bind_path(id)?;
    Ok(Json(ApiResponse::ok(entities::get_category(&state.conn(), id)?)))
}

/// GET /category?user_id=&type=[&title=][&description=]
async fn list_categories(
    State(state): State<AppState>,
    filter: Result<Query<CategoryFilter>, QueryRejection>,
) -> ApiResult<Vec<Category>> {
    let selection = bind_query(filter)?.evaluate()?;
    tracing::debug!(variant = selection.variant.name(), "listing categories");

    let categories = dispatch::list_categories(&state.conn(), &selection)?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// PUT /category/:id
async fn update_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Category> {
    let id = bind_path(id)?;
    let update = bind_json(payload)?;
    Ok(Json(ApiResponse::ok(entities::update_category(&state.conn(), id, &update)?)))
}

/// DELETE /category/:id
async fn delete_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<bool> {
    let id = bind_path(id)?;
    entities::delete_category(&state.conn(), id)?;

    tracing::info!(category_id = id, by = %claims.username, "category deleted");
    Ok(Json(ApiResponse::ok(true)))
}

// ============================================================================
// Accounts
// ============================================================================

/// POST /account
async fn create_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<NewAccount>, JsonRejection>,
) -> ApiResult<Account> {
    let new = bind_json(payload)?;
    let account = entities::create_account(&state.conn(), &new)?;

    tracing::info!(account_id = account.id, by = %claims.username, "account created");
    Ok(Json(ApiResponse::ok(account)))
}

/// GET /account/id/:id
async fn get_account(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Account> {
    let id = bind_path(id)?;
    Ok(Json(ApiResponse::ok(entities::get_account(&state.conn(), id)?)))
}

/// GET /account?user_id=&type=[&category_id=][&title=][&description=][&date=]
async fn list_accounts(
    State(state): State<AppState>,
    filter: Result<Query<AccountFilter>, QueryRejection>,
) -> ApiResult<Vec<Account>> {
    let selection = bind_query(filter)?.evaluate()?;
    tracing::debug!(variant = selection.variant.name(), "listing accounts");

    let accounts = dispatch::list_accounts(&state.conn(), &selection)?;
    Ok(Json(ApiResponse::ok(accounts)))
}

/// GET /account/graph/:user_id/:type - number of matching accounts
async fn account_graph(
    State(state): State<AppState>,
    params: Result<Path<(i64, String)>, PathRejection>,
) -> ApiResult<i64> {
    let (user_id, account_type) = bind_path(params)?;
    let count = entities::account_graph(&state.conn(), user_id, &account_type)?;
    Ok(Json(ApiResponse::ok(count)))
}

/// GET /account/reports/:user_id/:type - sum of matching values
async fn account_reports(
    State(state): State<AppState>,
    params: Result<Path<(i64, String)>, PathRejection>,
) -> ApiResult<i64> {
    let (user_id, account_type) = bind_path(params)?;
    let total = entities::account_reports(&state.conn(), user_id, &account_type)?;
    Ok(Json(ApiResponse::ok(total)))
}

/// PUT /account/:id
async fn update_account(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AccountUpdate>, JsonRejection>,
) -> ApiResult<Account> {
    let id = bind_path(id)?;
    let update = bind_json(payload)?;
    Ok(Json(ApiResponse::ok(entities::update_account(&state.conn(), id, &update)?)))
}

/// DELETE /account/:id
async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<bool> {
    let id = bind_path(id)?;
    entities::delete_account(&state.conn(), id)?;

    tracing::info!(account_id = id, by = %claims.username, "account deleted");
    Ok(Json(ApiResponse::ok(true)))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/category", post(create_category).get(list_categories))
        .route("/category/id/:id", get(get_category))
        .route("/category/:id", put(update_category).delete(delete_category))
        .route("/account", post(create_account).get(list_accounts))
        .route("/account/id/:id", get(get_account))
        .route("/account/graph/:user_id/:type", get(account_graph))
        .route("/account/reports/:user_id/:type", get(account_reports))
        .route("/account/:id", put(update_account).delete(delete_account))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health_check))
        .route("/user", post(create_user))
        .route("/user/:username", get(get_user))
        .route("/user/id/:id", get(get_user_by_id))
        .route("/login", post(login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
