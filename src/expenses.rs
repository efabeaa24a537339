use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use time::OffsetDateTime;

use crate::app::AppState;
use crate::constants::*;
use crate::ledger::NewExpense;
use crate::models::{
    Currency, CreateExpensePayload, Expense, ExpenseUpdate, GetExpensesQuery,
    GetExpensesResponse, UpdateExpensePayload,
};
use crate::utils::{
    build_filter, ledger_error, not_found, parse_currency, parse_date, parse_payer,
    validate_activity, validate_amount, validate_category, validate_city, validate_notes,
};

fn non_empty(notes: String) -> Option<String> {
    (!notes.is_empty()).then_some(notes)
}

pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateExpensePayload>,
) -> Result<(StatusCode, Json<Expense>), (StatusCode, String)> {
    // Input validation
    let draft = NewExpense {
        city: validate_city(&payload.city)?,
        activity: validate_activity(&payload.activity)?,
        category: validate_category(&payload.category)?,
        payer: parse_payer(&payload.payer, &state.config)?,
        amount: validate_amount(payload.amount)?,
        currency: match payload.currency.as_deref() {
            Some(code) => parse_currency(code)?,
            None => Currency::BASE,
        },
        date: match payload.date.as_deref() {
            Some(date) => parse_date(date)?,
            None => OffsetDateTime::now_utc().date(),
        },
        notes: match payload.notes.as_deref() {
            Some(notes) => non_empty(validate_notes(notes)?),
            None => None,
        },
    };

    // Fetch rates before taking the ledger lock so a slow refresh never
    // blocks readers.
    let rates = state.rates.get_rates().await;

    let mut ledger = state.ledger.write().await;
    let id = ledger.next_id();
    let expense = draft.into_expense(id, &rates, &state.config.homes);
    ledger.add(expense.clone()).map_err(ledger_error)?;

    tracing::info!(
        id,
        city = %expense.city,
        total_base = expense.total_base,
        "expense recorded"
    );
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn get_expenses(
    State(state): State<AppState>,
    Query(query): Query<GetExpensesQuery>,
) -> Result<(StatusCode, Json<GetExpensesResponse>), (StatusCode, String)> {
    let filter = build_filter(
        query.city.as_deref(),
        query.category.as_deref(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )?;

    let ledger = state.ledger.read().await;
    let expenses = ledger.list(&filter);
    let total_count = expenses.len();

    Ok((
        StatusCode::OK,
        Json(GetExpensesResponse {
            expenses,
            total_count,
        }),
    ))
}

pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<(StatusCode, Json<Expense>), (StatusCode, String)> {
    let ledger = state.ledger.read().await;
    let expense = ledger
        .get_by_id(id)
        .cloned()
        .ok_or_else(|| not_found(ERR_EXPENSE_NOT_FOUND))?;
    Ok((StatusCode::OK, Json(expense)))
}

pub fn build_update(
    payload: UpdateExpensePayload,
    state: &AppState,
) -> Result<ExpenseUpdate, (StatusCode, String)> {
    let update = ExpenseUpdate {
        city: payload.city.as_deref().map(validate_city).transpose()?,
        activity: payload.activity.as_deref().map(validate_activity).transpose()?,
        category: payload.category.as_deref().map(validate_category).transpose()?,
        payer: payload
            .payer
            .as_deref()
            .map(|payer| parse_payer(payer, &state.config))
            .transpose()?,
        date: payload.date.as_deref().map(parse_date).transpose()?,
        amount: payload.amount.map(validate_amount).transpose()?,
        currency: payload.currency.as_deref().map(parse_currency).transpose()?,
        notes: payload.notes.as_deref().map(validate_notes).transpose()?,
    };

    if update.is_empty() {
        return Err((StatusCode::BAD_REQUEST, ERR_NO_CHANGES.to_string()));
    }
    Ok(update)
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateExpensePayload>,
) -> Result<(StatusCode, Json<Expense>), (StatusCode, String)> {
    let update = build_update(payload, &state)?;

    let rates = if update.touches_shares() {
        state.rates.get_rates().await
    } else {
        state.rates.snapshot().rates.clone()
    };

    let mut ledger = state.ledger.write().await;
    if !ledger
        .update(id, &update, &rates, &state.config.homes)
        .map_err(ledger_error)?
    {
        return Err(not_found(ERR_EXPENSE_NOT_FOUND));
    }

    let expense = ledger
        .get_by_id(id)
        .cloned()
        .ok_or_else(|| not_found(ERR_EXPENSE_NOT_FOUND))?;
    tracing::info!(id, "expense edited");
    Ok((StatusCode::OK, Json(expense)))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut ledger = state.ledger.write().await;
    if !ledger.delete(id).map_err(ledger_error)? {
        return Err(not_found(ERR_EXPENSE_NOT_FOUND));
    }
    tracing::info!(id, "expense deleted");
    Ok(StatusCode::NO_CONTENT)
}
