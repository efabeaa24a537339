/*!
 * HTTP Handler Tests
 *
 * Calls the axum handlers directly with extracted arguments, against an
 * application state rooted in a temporary directory. Rates are fresh, so no
 * handler reaches a remote source.
 */

mod common;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use common::*;
use tempfile::tempdir;
use trip_ledger::admin::{clear_expenses, export_ledger, get_stats, get_summary, import_ledger};
use trip_ledger::app::AppState;
use trip_ledger::config::{Config, ConfigError};
use trip_ledger::currency::{convert, get_rates, refresh_rates};
use trip_ledger::documents::{add_document, list_documents, remove_document};
use trip_ledger::expenses::{
    create_expense, delete_expense, get_expense, get_expenses, update_expense,
};
use trip_ledger::models::{
    AddDocumentPayload, ConvertQuery, CreateExpensePayload, Currency, Expense, GetExpensesQuery,
    Payer, SummaryQuery, UpdateExpensePayload,
};

fn payload(city: &str, category: &str, payer: &str, amount: f64) -> CreateExpensePayload {
    CreateExpensePayload {
        city: city.to_string(),
        activity: format!("{} in {}", category, city),
        category: category.to_string(),
        payer: payer.to_string(),
        amount,
        currency: None,
        date: Some("2024-03-10".to_string()),
        notes: None,
    }
}

async fn create(state: &AppState, payload: CreateExpensePayload) -> Expense {
    let (status, Json(expense)) = create_expense(State(state.clone()), Json(payload))
        .await
        .expect("create should succeed");
    assert_eq!(status, StatusCode::CREATED);
    expense
}

#[tokio::test]
async fn create_expense_in_foreign_currency_for_couple() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);

    let mut body = payload("beijing", "food", "Couple", 10.0);
    body.currency = Some("GBP".to_string());
    body.notes = Some("  Peking duck ".to_string());
    let expense = create(&state, body).await;

    assert_eq!(expense.id, 1);
    assert_eq!(expense.city, "Beijing");
    assert_eq!(expense.category, "Food");
    assert_eq!(expense.payer, Payer::Joint);
    assert_eq!(expense.original_currency, Currency::Gbp);
    assert!(approx_eq(expense.total_base, 100.0));
    assert!(approx_eq(expense.party_a_base, 50.0));
    assert!(approx_eq(expense.party_b_base, 50.0));
    assert!(approx_eq(expense.party_a_home, 5.0));
    assert!(approx_eq(expense.party_b_home, 25.0));
    assert_eq!(expense.notes.as_deref(), Some("Peking duck"));
}

#[tokio::test]
async fn create_accepts_party_names_and_rmb() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);

    let mut body = payload("Shanghai", "Shopping", "shirin", 88.0);
    body.currency = Some("rmb".to_string());
    let expense = create(&state, body).await;

    assert_eq!(expense.payer, Payer::PartyB);
    assert_eq!(expense.original_currency, Currency::Cny);
    assert_eq!(expense.total_base, 88.0);
    assert_eq!(expense.party_a_base, 0.0);
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);

    let cases = [
        payload("Atlantis", "Food", "Sunil", 10.0),
        payload("Beijing", "Bribes", "Sunil", 10.0),
        payload("Beijing", "Food", "Someone", 10.0),
        payload("Beijing", "Food", "Sunil", 0.0),
        payload("Beijing", "Food", "Sunil", -3.0),
        CreateExpensePayload {
            date: Some("10/03/2024".to_string()),
            ..payload("Beijing", "Food", "Sunil", 10.0)
        },
        CreateExpensePayload {
            currency: Some("JPY".to_string()),
            ..payload("Beijing", "Food", "Sunil", 10.0)
        },
        CreateExpensePayload {
            activity: "   ".to_string(),
            ..payload("Beijing", "Food", "Sunil", 10.0)
        },
    ];

    for body in cases {
        let (status, _) = create_expense(State(state.clone()), Json(body))
            .await
            .expect_err("invalid input should be rejected");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert!(state.ledger.read().await.is_empty());
}

#[tokio::test]
async fn get_missing_expense_is_404() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);

    let (status, message) = get_expense(State(state.clone()), Path(42))
        .await
        .expect_err("no expense 42");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message, "Expense not found");
}

#[tokio::test]
async fn list_with_filters() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);

    create(&state, payload("Beijing", "Food", "Sunil", 30.0)).await;
    create(
        &state,
        CreateExpensePayload {
            date: Some("2024-03-12".to_string()),
            ..payload("Shanghai", "Food", "Joint", 50.0)
        },
    )
    .await;
    create(&state, payload("Shanghai", "Activities", "Shirin", 70.0)).await;

    let (_, Json(all)) = get_expenses(State(state.clone()), Query(GetExpensesQuery::default()))
        .await
        .unwrap();
    assert_eq!(all.total_count, 3);
    assert_eq!(all.expenses[0].date.to_string(), "2024-03-12");

    let query = GetExpensesQuery {
        city: Some("shanghai".to_string()),
        category: Some("Food".to_string()),
        ..Default::default()
    };
    let (_, Json(filtered)) = get_expenses(State(state.clone()), Query(query)).await.unwrap();
    assert_eq!(filtered.total_count, 1);
    assert_eq!(filtered.expenses[0].total_base, 50.0);

    let inverted = GetExpensesQuery {
        start_date: Some("2024-03-12".to_string()),
        end_date: Some("2024-03-01".to_string()),
        ..Default::default()
    };
    let (status, _) = get_expenses(State(state.clone()), Query(inverted))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_and_delete_expense() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);
    let created = create(&state, payload("Chengdu", "Food", "Sunil", 80.0)).await;

    let changes = UpdateExpensePayload {
        payer: Some("couple".to_string()),
        notes: Some("hotpot".to_string()),
        ..Default::default()
    };
    let (status, Json(updated)) =
        update_expense(State(state.clone()), Path(created.id), Json(changes))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated.payer, Payer::Joint);
    assert_eq!(updated.party_a_base, 40.0);
    assert_eq!(updated.party_b_base, 40.0);
    assert_eq!(updated.total_base, 80.0);
    assert_eq!(updated.notes.as_deref(), Some("hotpot"));

    let (status, _) = update_expense(
        State(state.clone()),
        Path(created.id),
        Json(UpdateExpensePayload::default()),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = update_expense(
        State(state.clone()),
        Path(999),
        Json(UpdateExpensePayload {
            city: Some("London".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let status = delete_expense(State(state.clone()), Path(created.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = delete_expense(State(state.clone()), Path(created.id))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_by_person_uses_configured_names() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);

    create(&state, payload("Beijing", "Food", "Joint", 100.0)).await;
    create(&state, payload("Beijing", "Transportation", "Sunil", 30.0)).await;

    let query = SummaryQuery {
        dimension: Some("person".to_string()),
        ..Default::default()
    };
    let (_, Json(summary)) = get_summary(State(state.clone()), Query(query)).await.unwrap();

    assert_eq!(summary.groups["Sunil"].count, 2);
    assert_eq!(summary.groups["Sunil"].total_base, 80.0);
    assert_eq!(summary.groups["Shirin"].count, 1);
    assert_eq!(summary.groups["Shirin"].total_base, 50.0);
    assert!(!summary.groups.contains_key("party_a"));
    assert_eq!(summary.totals.count, 2);
    assert_eq!(summary.totals.total_base, 130.0);

    let (_, Json(by_category)) = get_summary(State(state.clone()), Query(SummaryQuery::default()))
        .await
        .unwrap();
    assert_eq!(by_category.groups.len(), 2);

    let bad = SummaryQuery {
        dimension: Some("weather".to_string()),
        ..Default::default()
    };
    let (status, _) = get_summary(State(state.clone()), Query(bad)).await.unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn documents_through_handlers() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);
    let expense = create(&state, payload("Guilin", "Accommodation", "Joint", 400.0)).await;

    let document = AddDocumentPayload {
        filename: "invoice.pdf".to_string(),
        storage_path: "uploads/1/invoice.pdf".to_string(),
        size: 1024,
    };
    let (status, Json(stored)) =
        add_document(State(state.clone()), Path(expense.id), Json(document.clone()))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored.filename, "invoice.pdf");

    let (status, _) = add_document(State(state.clone()), Path(77), Json(document))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, Json(entries)) = list_documents(State(state.clone())).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].expense_id, expense.id);
    assert_eq!(entries[0].expense_city, "Guilin");

    let status = remove_document(
        State(state.clone()),
        Path((expense.id, "invoice.pdf".to_string())),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, message) = remove_document(
        State(state.clone()),
        Path((expense.id, "invoice.pdf".to_string())),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message, "Document not found");
}

#[tokio::test]
async fn rates_and_conversion() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);

    let (_, Json(rates)) = get_rates(State(state.clone())).await.unwrap();
    assert_eq!(rates.base_currency, Currency::Cny);
    assert!(!rates.stale);
    assert_eq!(rates.rates.get(Currency::Gbp), Some(0.1));
    assert!(approx_eq(rates.inverse[&Currency::Aed], 2.0));

    let query = ConvertQuery {
        amount: 200.0,
        to: "AED".to_string(),
    };
    let (_, Json(converted)) = convert(State(state.clone()), Query(query)).await.unwrap();
    assert_eq!(converted.currency, Currency::Aed);
    assert_eq!(converted.amount, 100.0);

    let bad = ConvertQuery {
        amount: 10.0,
        to: "XYZ".to_string(),
    };
    let (status, _) = convert(State(state.clone()), Query(bad)).await.unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The stub source always fails, so a forced refresh keeps the old rates.
    let (_, Json(refresh)) = refresh_rates(State(state.clone())).await.unwrap();
    assert!(!refresh.refreshed);
    assert_eq!(refresh.rates.rates.get(Currency::Gbp), Some(0.1));
}

#[tokio::test]
async fn stats_export_clear_import() {
    let dir = tempdir().unwrap();
    let state = test_state(&dir);
    create(&state, payload("London", "Connectivity", "Sunil", 20.0)).await;
    create(&state, payload("Abu Dhabi", "Food", "Shirin", 60.0)).await;

    let (_, Json(stats)) = get_stats(State(state.clone())).await.unwrap();
    assert_eq!(stats.total_count, 2);
    assert_eq!(stats.total_base_sum, 80.0);
    assert_eq!(stats.cities.len(), 2);

    let (_, Json(export)) = export_ledger(State(state.clone())).await.unwrap();
    assert_eq!(export.data.expenses.len(), 2);

    let status = clear_expenses(State(state.clone())).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.ledger.read().await.is_empty());

    let (_, Json(imported)) = import_ledger(State(state.clone()), Json(export))
        .await
        .unwrap();
    assert_eq!(imported.expenses, 2);
    assert_eq!(imported.next_id, 3);

    // Ids keep counting from the imported counter.
    let next = create(&state, payload("London", "Food", "Sunil", 5.0)).await;
    assert_eq!(next.id, 3);
}

#[test]
fn config_defaults() {
    let config = Config::from_lookup(|_| None).unwrap();

    assert_eq!(config.bind_address(), "0.0.0.0:3000");
    assert_eq!(config.ledger_path(), std::path::Path::new("data/expenses.json"));
    assert_eq!(config.rate_staleness(), time::Duration::hours(4));
    assert_eq!(config.rate_fetch_timeout(), std::time::Duration::from_secs(10));
    assert_eq!(config.party_a_name, "Sunil");
    assert_eq!(config.homes.party_b, Currency::Aed);
}

#[test]
fn config_rejects_invalid_values() {
    let invalid_port = Config::from_lookup(|var| (var == "SERVER_PORT").then(|| "http".to_string()));
    assert!(matches!(invalid_port, Err(ConfigError::InvalidPort(_))));

    let zero_staleness =
        Config::from_lookup(|var| (var == "RATE_STALENESS_HOURS").then(|| "0".to_string()));
    assert!(matches!(zero_staleness, Err(ConfigError::InvalidNumber(_, _))));

    let bad_home = Config::from_lookup(|var| (var == "PARTY_A_HOME").then(|| "BTC".to_string()));
    assert!(matches!(bad_home, Err(ConfigError::InvalidCurrency(_, _))));

    let blank_name = Config::from_lookup(|var| (var == "PARTY_B_NAME").then(|| " ".to_string()));
    assert!(matches!(blank_name, Err(ConfigError::InvalidPartyName(_))));
}

/// The person summary and payer parsing both key on the party names.
#[test]
fn config_rejects_identical_party_names() {
    let same_name = Config::from_lookup(|var| (var == "PARTY_B_NAME").then(|| "sunil".to_string()));
    assert!(matches!(same_name, Err(ConfigError::DuplicatePartyName(_))));

    let renamed = Config::from_lookup(|var| match var {
        "PARTY_A_NAME" => Some("Alex".to_string()),
        "PARTY_B_NAME" => Some("Sam".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(renamed.party_a_name, "Alex");
    assert_eq!(renamed.party_b_name, "Sam");
}
