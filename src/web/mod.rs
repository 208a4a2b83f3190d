//! Web API module for SchemaGate.
//!
//! This module provides the REST API behind the operator UI: login,
//! folder listing, the per-folder template editor and file uploads.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/data-types` - Selectable column types
//! - `POST /api/login` - Exchange credentials for a session token
//! - `POST /api/logout` - End the current session
//! - `GET /api/session` - Check the current session
//! - `GET /api/folders` - List dataset folders
//! - `POST /api/folders/{folder}/uploads` - Upload a CSV/XLSX file (multipart field `file`)
//! - `GET /api/templates` - List stored templates
//! - `GET /api/templates/{folder}` - Get a folder template (empty if none)
//! - `PUT /api/templates/{folder}` - Apply a template editor submission
//!
//! Every route under `/api` except login and data types requires an
//! `Authorization: Bearer <token>` header. Other paths serve the embedded UI.

pub mod session;
pub mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::APP_BINARY_NAME;
use crate::models::{ColumnInput, ColumnSpec, DataType, Template};
use crate::services::folders::validate_path_component;
use crate::services::{
    CredentialCheck, FileSink, FolderService, IntakeError, IntakeOutcome, IntakeService,
    JsonTemplateStore, SchemaValidator, SessionStore, TemplateStore, Upload, ValidationReport,
};
use crate::table::ReadOptions;

pub use session::Session;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the web API.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    config: Arc<Config>,
    /// Configured operator credentials
    credentials: Arc<CredentialCheck>,
    /// Live session tokens
    sessions: Arc<SessionStore>,
    /// Per-folder templates
    templates: Arc<dyn TemplateStore>,
    /// Upload workflow
    intake: Arc<IntakeService>,
    /// Serializes template read-modify-write
    template_edits: Arc<Mutex<()>>,
}

impl AppState {
    /// Creates the state around an existing template store.
    pub fn new(config: Config, templates: Arc<dyn TemplateStore>) -> Self {
        let root = config.storage.root.clone();
        let intake = IntakeService::new(
            root.clone(),
            Arc::clone(&templates),
            SchemaValidator::new(config.ingest.validation_mode),
            FileSink::new(root, config.ingest.merge_policy),
        )
        .with_read_options(ReadOptions {
            csv_dates: config.ingest.parse_csv_dates,
        });

        Self {
            credentials: Arc::new(CredentialCheck::new(&config.auth)),
            sessions: Arc::new(SessionStore::new()),
            templates,
            intake: Arc::new(intake),
            template_edits: Arc::new(Mutex::new(())),
            config: Arc::new(config),
        }
    }

    /// Creates the state with templates persisted to the configured JSON file.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = JsonTemplateStore::open(config.storage.templates_path()?)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Returns the storage root directory.
    #[must_use]
    pub fn storage_root(&self) -> &PathBuf {
        &self.config.storage.root
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Current health status (e.g., "healthy").
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Operator username.
    pub username: String,
    /// Operator password in clear text.
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Session token for the `Authorization: Bearer` header.
    pub token: String,
    /// Logged-in username.
    pub username: String,
}

/// Session check response.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Logged-in username.
    pub username: String,
}

/// Folder list response.
#[derive(Debug, Serialize)]
pub struct FolderListResponse {
    /// Folder names, sorted.
    pub folders: Vec<String>,
}

/// One selectable column type.
#[derive(Debug, Serialize)]
pub struct DataTypeInfo {
    /// Canonical tag (e.g., "int64").
    pub tag: String,
    /// Human-readable name.
    pub name: String,
}

/// Data type list response.
#[derive(Debug, Serialize)]
pub struct DataTypeListResponse {
    /// All selectable types, `object` first.
    pub data_types: Vec<DataTypeInfo>,
}

impl From<DataType> for DataTypeInfo {
    fn from(data_type: DataType) -> Self {
        Self {
            tag: data_type.tag().to_string(),
            name: data_type.display_name().to_string(),
        }
    }
}

/// Template of one folder.
#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    /// Folder the template applies to.
    pub folder: String,
    /// Number of defined columns.
    pub column_count: usize,
    /// Column definitions in order.
    pub columns: Vec<ColumnSpec>,
}

impl TemplateResponse {
    fn new(folder: impl Into<String>, template: Template) -> Self {
        Self {
            folder: folder.into(),
            column_count: template.columns.len(),
            columns: template.columns,
        }
    }
}

/// Template list response.
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    /// Stored templates, ordered by folder name.
    pub templates: Vec<TemplateResponse>,
}

/// Template editor submission.
#[derive(Debug, Deserialize)]
pub struct TemplateEditRequest {
    /// Number of columns shown in the editor.
    pub column_count: usize,
    /// Values of the visible column inputs, in order.
    #[serde(default)]
    pub columns: Vec<ColumnInput>,
}

/// Accepted upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Confirmation message.
    pub message: String,
    /// What was validated and written.
    #[serde(flatten)]
    pub outcome: IntakeOutcome,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message.
    pub error: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Validation report of a rejected upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Box<ValidationReport>>,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            report: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
            report: None,
        }
    }

    fn with_report(error: impl Into<String>, report: Box<ValidationReport>) -> Self {
        Self {
            error: error.into(),
            details: None,
            report: Some(report),
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Helper Functions
// ============================================================================

/// Checks that `folder` names an existing directory under the storage root.
fn require_folder(state: &AppState, folder: &str) -> ApiResult<()> {
    validate_path_component(folder).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_details("Invalid folder name", format!("{e:#}"))),
        )
    })?;

    FolderService::resolve(state.storage_root(), folder).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(format!("Folder not found: {folder}"))),
        )
    })?;

    Ok(())
}

/// Maps an intake failure onto an HTTP status and error body.
fn intake_error_response(err: IntakeError) -> (StatusCode, Json<ApiError>) {
    let message = err.to_string();
    match err {
        IntakeError::InvalidName(_) => (StatusCode::BAD_REQUEST, Json(ApiError::new(message))),
        IntakeError::FolderNotFound(_) => (StatusCode::NOT_FOUND, Json(ApiError::new(message))),
        IntakeError::UnsupportedFormat(_) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(ApiError::new(message)),
        ),
        IntakeError::Parse(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_details(
                "Failed to parse uploaded file",
                format!("{e:#}"),
            )),
        ),
        IntakeError::SchemaMismatch(report) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::with_report(message, report)),
        ),
        IntakeError::Environment(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::with_details(
                "Failed to store uploaded file",
                format!("{e:#}"),
            )),
        ),
    }
}

/// Reads the `file` field of an upload form.
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_details(
                "Invalid multipart body",
                e.body_text(),
            )),
        )
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_request)?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err((
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(format!(
            "Missing multipart field '{UPLOAD_FIELD}'"
        ))),
    ))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /health - Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/data-types - List selectable column types.
async fn list_data_types() -> Json<DataTypeListResponse> {
    Json(DataTypeListResponse {
        data_types: DataType::all().iter().copied().map(Into::into).collect(),
    })
}

/// POST /api/login - Check credentials and open a session.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if !state.credentials.verify(&request.username, &request.password) {
        warn!("Rejected login for user '{}'", request.username);
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("Username/password is incorrect")),
        ));
    }

    let token = state.sessions.create();
    info!("User '{}' logged in", request.username);

    Ok(Json(LoginResponse {
        token,
        username: request.username,
    }))
}

/// POST /api/logout - End the current session.
async fn logout(State(state): State<AppState>, session: Session) -> StatusCode {
    state.sessions.revoke(&session.token);
    info!("Session ended");
    StatusCode::NO_CONTENT
}

/// GET /api/session - Report the logged-in user.
async fn current_session(State(state): State<AppState>, _session: Session) -> Json<SessionResponse> {
    Json(SessionResponse {
        username: state.config.auth.username.clone(),
    })
}

/// GET /api/folders - List dataset folders under the storage root.
async fn list_folders(
    State(state): State<AppState>,
    _session: Session,
) -> ApiResult<Json<FolderListResponse>> {
    let folders = FolderService::list(state.storage_root()).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::with_details(
                "Failed to read storage root",
                format!("{e:#}"),
            )),
        )
    })?;

    Ok(Json(FolderListResponse { folders }))
}

/// GET /api/templates - List all stored templates.
async fn list_templates(
    State(state): State<AppState>,
    _session: Session,
) -> Json<TemplateListResponse> {
    let templates = state
        .templates
        .list()
        .into_iter()
        .map(|(folder, template)| TemplateResponse::new(folder, template))
        .collect();

    Json(TemplateListResponse { templates })
}

/// GET /api/templates/{folder} - Get a folder template.
async fn get_template(
    State(state): State<AppState>,
    _session: Session,
    Path(folder): Path<String>,
) -> ApiResult<Json<TemplateResponse>> {
    require_folder(&state, &folder)?;

    let template = state.templates.get_or_default(&folder);
    Ok(Json(TemplateResponse::new(folder, template)))
}

/// PUT /api/templates/{folder} - Apply a template editor submission.
async fn save_template(
    State(state): State<AppState>,
    _session: Session,
    Path(folder): Path<String>,
    Json(request): Json<TemplateEditRequest>,
) -> ApiResult<Json<TemplateResponse>> {
    require_folder(&state, &folder)?;

    // The store write is blocking file work
    let templates = Arc::clone(&state.templates);
    let edits = Arc::clone(&state.template_edits);
    let target = folder.clone();
    let result = tokio::task::spawn_blocking(move || -> ApiResult<Template> {
        let _guard = edits.lock().unwrap_or_else(PoisonError::into_inner);

        let mut template = templates.get_or_default(&target);
        template
            .apply_edit(request.column_count, &request.columns)
            .map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError::with_details("Invalid template", format!("{e:#}"))),
                )
            })?;

        templates.put(&target, template.clone()).map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::with_details(
                    "Failed to save template",
                    format!("{e:#}"),
                )),
            )
        })?;

        Ok(template)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::with_details("Template task failed", e.to_string())),
        )
    })?;

    let template = result?;

    info!(
        "Saved template for folder '{}' ({} column(s))",
        folder,
        template.columns.len()
    );

    Ok(Json(TemplateResponse::new(folder, template)))
}

/// POST /api/folders/{folder}/uploads - Validate and store an uploaded file.
async fn upload_file(
    State(state): State<AppState>,
    _session: Session,
    Path(folder): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload = read_upload(multipart).await?;

    // Parsing and merging are blocking file work
    let intake = Arc::clone(&state.intake);
    let result = tokio::task::spawn_blocking(move || intake.ingest(&folder, &upload))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::with_details("Upload task failed", e.to_string())),
            )
        })?;

    let outcome = result.map_err(intake_error_response)?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        outcome,
    }))
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS for a separately hosted frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.ingest.max_upload_bytes();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Session endpoints
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/session", get(current_session))
        // Folder endpoints
        .route("/api/folders", get(list_folders))
        .route("/api/folders/{folder}/uploads", post(upload_file))
        // Template endpoints
        .route("/api/templates", get(list_templates))
        .route(
            "/api/templates/{folder}",
            get(get_template).put(save_template),
        )
        .route("/api/data-types", get(list_data_types))
        // Embedded UI
        .fallback(static_files::serve_static)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the web server.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the template file
/// cannot be loaded, or the server fails to start.
pub async fn run_server(config: Config, addr: SocketAddr) -> anyhow::Result<()> {
    config.validate()?;

    if config.auth.uses_default_credentials() {
        warn!(
            "Default credentials (admin/admin) are in use; set [auth] in the config file \
             (digest via `{} hash-password`)",
            APP_BINARY_NAME
        );
    }

    info!("Storage root: {}", config.storage.root.display());
    info!(
        "Merge policy: {:?}, validation mode: {:?}, CSV date parsing: {}",
        config.ingest.merge_policy, config.ingest.validation_mode, config.ingest.parse_csv_dates
    );

    let state = AppState::from_config(config)?;
    let app = create_router(state);

    if !static_files::has_embedded_assets() {
        warn!("No embedded UI assets found; only the API is available");
    }

    info!("Starting SchemaGate web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
