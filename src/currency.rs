use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::app::AppState;
use crate::conversion::Rates;
use crate::models::{ConvertQuery, Currency};
use crate::utils::{parse_currency, validate_amount};

#[derive(Serialize, Debug, Clone)]
pub struct RatesResponse {
    pub base_currency: Currency,
    pub rates: Rates,
    /// Units of base currency per one unit of each currency.
    pub inverse: BTreeMap<Currency, f64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
    pub stale: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct RefreshResponse {
    pub refreshed: bool,
    #[serde(flatten)]
    pub rates: RatesResponse,
}

#[derive(Serialize, Debug, Clone)]
pub struct ConvertResponse {
    pub amount_base: f64,
    pub base_currency: Currency,
    pub currency: Currency,
    pub amount: f64,
}

fn rates_response(state: &AppState) -> RatesResponse {
    let snapshot = state.rates.snapshot();
    RatesResponse {
        base_currency: snapshot.base_currency,
        inverse: Currency::ALL
            .into_iter()
            .map(|currency| (currency, snapshot.rates.inverse(currency)))
            .collect(),
        rates: snapshot.rates.clone(),
        last_updated: snapshot.last_updated,
        stale: state.rates.is_stale(),
    }
}

pub async fn get_rates(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RatesResponse>), (StatusCode, String)> {
    state.rates.refresh_if_stale().await;
    Ok((StatusCode::OK, Json(rates_response(&state))))
}

pub async fn refresh_rates(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RefreshResponse>), (StatusCode, String)> {
    let refreshed = state.rates.force_refresh().await;
    Ok((
        StatusCode::OK,
        Json(RefreshResponse {
            refreshed,
            rates: rates_response(&state),
        }),
    ))
}

pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Result<(StatusCode, Json<ConvertResponse>), (StatusCode, String)> {
    let amount_base = validate_amount(query.amount)?;
    let currency = parse_currency(&query.to)?;

    state.rates.refresh_if_stale().await;
    Ok((
        StatusCode::OK,
        Json(ConvertResponse {
            amount_base,
            base_currency: Currency::BASE,
            currency,
            amount: state.rates.convert(amount_base, currency),
        }),
    ))
}
