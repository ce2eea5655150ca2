//! Grantmap REST API Server
//!
//! Run with: cargo run --features server --bin grantmap-server
//!
//! Endpoints:
//!   GET    /status                    - Bootstrap status
//!   GET    /roles                     - List roles with user counts
//!   POST   /roles                     - Create (or clone) a role
//!   GET    /roles/:id                 - Get a role
//!   PATCH  /roles/:id                 - Edit label/description/permissions
//!   DELETE /roles/:id?reassign_to=    - Delete, moving users to another role
//!   GET    /roles/:id/users           - Count users holding a role
//!   POST   /roles/:id/toggle/action   - Toggle one action
//!   POST   /roles/:id/toggle/group    - Toggle a group wildcard
//!   POST   /roles/:id/toggle/full     - Toggle full access
//!   PUT    /users/:id                 - Assign a user to a role
//!   POST   /check                     - Resolve a permission for a role
//!   GET    /catalog?q=                - Permission catalog
//!   POST   /reset                     - Reset database (dev only)

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use grantmap::{
    bootstrap, grant_state, is_bootstrapped, CatalogFeeds, GrantState, GrantmapError, Group, LmdbStore, Role,
    RoleChanges, RoleManager, ServerConfig, UserDirectory, STANDARD_ACTIONS,
};

// ============================================================================
// State
// ============================================================================

struct AppState {
    manager: RoleManager<LmdbStore>,
    feeds: CatalogFeeds,
    bootstrap_on_reset: bool,
}

type Shared = State<Arc<AppState>>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct CreateRoleReq {
    label: String,
    #[serde(default)]
    description: String,
    clone_from: Option<String>,
}

#[derive(Deserialize)]
struct DeleteRoleQuery {
    reassign_to: String,
}

#[derive(Deserialize)]
struct ToggleActionReq {
    permission: String,
    group: String,
    subject: String,
    /// Defaults to the subject's actions in the catalog
    actions: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ToggleGroupReq {
    group: String,
}

#[derive(Deserialize)]
struct AssignUserReq {
    role_id: String,
}

#[derive(Deserialize)]
struct CheckReq {
    role_id: String,
    permission: String,
}

#[derive(Deserialize)]
struct CatalogQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct StatusRes {
    bootstrapped: bool,
    roles: usize,
}

#[derive(Serialize)]
struct RoleView {
    #[serde(flatten)]
    role: Role,
    users: usize,
}

#[derive(Serialize)]
struct CheckRes {
    allowed: bool,
    state: GrantState,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

// ============================================================================
// Helpers
// ============================================================================

fn status_of(e: &GrantmapError) -> StatusCode {
    match e {
        GrantmapError::Validation(_) => StatusCode::BAD_REQUEST,
        GrantmapError::NotFound(_) => StatusCode::NOT_FOUND,
        GrantmapError::Forbidden(_) => StatusCode::FORBIDDEN,
        GrantmapError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply<T>(r: grantmap::Result<T>) -> Reply<T> {
    match r {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))),
        Err(e) => {
            if matches!(e, GrantmapError::Storage(_)) {
                error!(error = %e, "storage failure");
            }
            (status_of(&e), Json(ApiResponse::err(e.to_string())))
        }
    }
}

fn subject_actions(catalog: &[Group], group: &str, subject: &str) -> Vec<String> {
    catalog
        .iter()
        .find(|g| g.id == group)
        .and_then(|g| g.subject(subject))
        .map(|s| s.actions.iter().cloned().collect())
        .unwrap_or_else(|| STANDARD_ACTIONS.iter().map(|a| a.to_string()).collect())
}

// ============================================================================
// Handlers
// ============================================================================

fn status(st: &AppState) -> grantmap::Result<StatusRes> {
    Ok(StatusRes {
        bootstrapped: is_bootstrapped(st.manager.store())?,
        roles: st.manager.roles()?.len(),
    })
}

fn role_views(st: &AppState) -> grantmap::Result<Vec<RoleView>> {
    st.manager
        .roles()?
        .into_iter()
        .map(|role| Ok(RoleView { users: st.manager.user_count(&role.id)?, role }))
        .collect()
}

fn reset(st: &AppState) -> grantmap::Result<String> {
    st.manager.store().clear_all()?;
    if st.bootstrap_on_reset {
        bootstrap(st.manager.store())?;
    }
    Ok("reset".into())
}

async fn get_status(State(st): Shared) -> Reply<StatusRes> {
    reply(status(&st))
}

async fn list_roles(State(st): Shared) -> Reply<Vec<RoleView>> {
    reply(role_views(&st))
}

async fn create_role(State(st): Shared, Json(req): Json<CreateRoleReq>) -> Reply<String> {
    reply(st.manager.add_role(&req.label, &req.description, req.clone_from.as_deref()))
}

async fn get_role(State(st): Shared, Path(id): Path<String>) -> Reply<Role> {
    reply(st.manager.role(&id))
}

async fn update_role(State(st): Shared, Path(id): Path<String>, Json(changes): Json<RoleChanges>) -> Reply<Role> {
    reply(st.manager.update_role(&id, &changes))
}

async fn delete_role(State(st): Shared, Path(id): Path<String>, Query(q): Query<DeleteRoleQuery>) -> Reply<String> {
    reply(st.manager.delete_role(&id, &q.reassign_to).map(|_| "deleted".into()))
}

async fn role_users(State(st): Shared, Path(id): Path<String>) -> Reply<usize> {
    reply(st.manager.role(&id).and_then(|_| st.manager.user_count(&id)))
}

async fn toggle_action(State(st): Shared, Path(id): Path<String>, Json(req): Json<ToggleActionReq>) -> Reply<Role> {
    let actions = match req.actions {
        Some(actions) => actions,
        None => match st.manager.catalog(&st.feeds, "") {
            Ok(catalog) => subject_actions(&catalog, &req.group, &req.subject),
            Err(e) => return reply(Err(e)),
        },
    };
    reply(st.manager.toggle_action(&id, &req.permission, &req.group, &req.subject, &actions))
}

async fn toggle_group(State(st): Shared, Path(id): Path<String>, Json(req): Json<ToggleGroupReq>) -> Reply<Role> {
    reply(st.manager.toggle_group_access(&id, &req.group))
}

async fn toggle_full(State(st): Shared, Path(id): Path<String>) -> Reply<Role> {
    reply(st.manager.toggle_full_access(&id))
}

async fn assign_user(State(st): Shared, Path(user): Path<String>, Json(req): Json<AssignUserReq>) -> Reply<String> {
    reply(
        st.manager
            .role(&req.role_id)
            .and_then(|_| st.manager.store().assign_user(&user, &req.role_id))
            .map(|_| "assigned".into()),
    )
}

async fn post_check(State(st): Shared, Json(req): Json<CheckReq>) -> Reply<CheckRes> {
    reply(st.manager.role(&req.role_id).map(|role| {
        let state = grant_state(&role, &req.permission);
        CheckRes { allowed: state.is_granted(), state }
    }))
}

async fn get_catalog(State(st): Shared, Query(q): Query<CatalogQuery>) -> Reply<Vec<Group>> {
    reply(st.manager.catalog(&st.feeds, &q.q))
}

async fn post_reset(State(st): Shared) -> Reply<String> {
    reply(reset(&st))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match ServerConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    info!(path = %config.db_path, "initializing database");
    let store = match LmdbStore::open_with_map_size(&config.db_path, config.map_size) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };
    if config.bootstrap {
        if let Err(e) = bootstrap(&store) {
            error!(error = %e, "bootstrap failed");
            std::process::exit(1);
        }
    }

    // CORS for the admin UI
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let state = Arc::new(AppState {
        manager: RoleManager::new(store),
        feeds: config.catalog.clone(),
        bootstrap_on_reset: config.bootstrap,
    });

    let app = Router::new()
        .route("/status", get(get_status))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id", get(get_role).patch(update_role).delete(delete_role))
        .route("/roles/:id/users", get(role_users))
        .route("/roles/:id/toggle/action", post(toggle_action))
        .route("/roles/:id/toggle/group", post(toggle_group))
        .route("/roles/:id/toggle/full", post(toggle_full))
        .route("/users/:id", put(assign_user))
        .route("/check", post(post_check))
        .route("/catalog", get(get_catalog))
        .route("/reset", post(post_reset))
        .layer(cors)
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind).await {
        Ok(l) => l,
        Err(e) => {
            error!(bind = %config.bind, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(bind = %config.bind, "grantmap server running");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server stopped");
    }
}
