use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::app::AppState;
use crate::ledger::LedgerExport;
use crate::models::SummaryQuery;
use crate::reports::{self, Bucket, Dimension, LedgerStats, PARTY_A_KEY, PARTY_B_KEY, Totals};
use crate::utils::{build_filter, ledger_error};

#[derive(Serialize, Debug, Clone)]
pub struct SummaryResponse {
    pub dimension: Dimension,
    pub groups: BTreeMap<String, Bucket>,
    pub totals: Totals,
}

#[derive(Serialize, Debug, Clone)]
pub struct ImportResponse {
    pub expenses: usize,
    pub next_id: u64,
}

pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<(StatusCode, Json<SummaryResponse>), (StatusCode, String)> {
    let dimension = match query.dimension.as_deref() {
        Some(raw) => raw
            .parse::<Dimension>()
            .map_err(|message| (StatusCode::BAD_REQUEST, message))?,
        None => Dimension::Category,
    };
    let filter = build_filter(
        query.city.as_deref(),
        query.category.as_deref(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )?;

    let records = state.ledger.read().await.list(&filter);
    let mut groups = reports::aggregate(&records, dimension);

    // Show the configured names instead of the internal party keys.
    if dimension == Dimension::Person {
        for (key, name) in [
            (PARTY_A_KEY, &state.config.party_a_name),
            (PARTY_B_KEY, &state.config.party_b_name),
        ] {
            if let Some(bucket) = groups.remove(key) {
                groups.insert(name.clone(), bucket);
            }
        }
    }

    Ok((
        StatusCode::OK,
        Json(SummaryResponse {
            dimension,
            groups,
            totals: reports::totals(&records),
        }),
    ))
}

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<LedgerStats>), (StatusCode, String)> {
    let ledger = state.ledger.read().await;
    Ok((StatusCode::OK, Json(ledger.stats())))
}

pub async fn export_ledger(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<LedgerExport>), (StatusCode, String)> {
    let ledger = state.ledger.read().await;
    Ok((StatusCode::OK, Json(ledger.export())))
}

pub async fn import_ledger(
    State(state): State<AppState>,
    Json(export): Json<LedgerExport>,
) -> Result<(StatusCode, Json<ImportResponse>), (StatusCode, String)> {
    let mut ledger = state.ledger.write().await;
    ledger.import(export).map_err(ledger_error)?;
    Ok((
        StatusCode::OK,
        Json(ImportResponse {
            expenses: ledger.len(),
            next_id: ledger.data().next_id,
        }),
    ))
}

pub async fn clear_expenses(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut ledger = state.ledger.write().await;
    ledger.clear().map_err(ledger_error)?;
    Ok(StatusCode::NO_CONTENT)
}
