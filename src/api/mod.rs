pub mod auth;
pub mod health;
pub mod transaction_update;
pub mod worklist;

use crate::config::Config;
use crate::orchestration::{Mutator, PageLoader, Worklist};
use auth::SessionAuth;
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<PageLoader>,
    pub mutator: Arc<Mutator>,
    pub worklist: Arc<Mutex<Worklist>>,
    pub auth: Arc<SessionAuth>,
}

impl AppState {
    pub fn new(config: &Config, loader: PageLoader, mutator: Mutator) -> Self {
        Self {
            loader: Arc::new(loader),
            mutator: Arc::new(mutator),
            worklist: Arc::new(Mutex::new(Worklist::new(config.reconcile_rules()))),
            auth: Arc::new(SessionAuth::from_config(config)),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(worklist::index_page))
        .route("/api/transactions", get(worklist::get_transactions))
        .route("/api/worklist", get(worklist::get_worklist))
        .route("/api/worklist/bulk-status", post(worklist::bulk_status))
        .route("/api/worklist/:id/selection", put(worklist::set_selection))
        .route("/api/worklist/:id/status", post(worklist::set_status))
        .route("/api/worklist/:id/equalize", post(worklist::equalize))
        .route(
            "/api/transaction-update",
            patch(transaction_update::patch_transaction),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/login", get(auth::login_page))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
