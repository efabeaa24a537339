use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::ledger::LedgerStore;
use crate::rates::RateCache;
use crate::{admin, currency, documents, expenses};

pub type Ledger = Arc<RwLock<LedgerStore>>;

/// Components shared by every handler. Constructed once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub rates: Arc<RateCache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(ledger: LedgerStore, rates: Arc<RateCache>, config: Config) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            rates,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/expenses",
            post(expenses::create_expense)
                .get(expenses::get_expenses)
                .delete(admin::clear_expenses),
        )
        .route(
            "/expenses/{id}",
            get(expenses::get_expense)
                .patch(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        .route("/expenses/{id}/documents", post(documents::add_document))
        .route(
            "/expenses/{id}/documents/{filename}",
            delete(documents::remove_document),
        )
        .route("/documents", get(documents::list_documents))
        .route("/summary", get(admin::get_summary))
        .route("/stats", get(admin::get_stats))
        .route("/export", get(admin::export_ledger))
        .route("/import", post(admin::import_ledger))
        .route("/rates", get(currency::get_rates))
        .route("/rates/refresh", post(currency::refresh_rates))
        .route("/convert", get(currency::convert))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
