#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tempfile::{TempDir, tempdir};
use time::{Date, Duration, OffsetDateTime};

use trip_ledger::app::AppState;
use trip_ledger::config::Config;
use trip_ledger::conversion::Rates;
use trip_ledger::errors::RemoteFetchError;
use trip_ledger::ledger::{LedgerStore, NewExpense};
use trip_ledger::models::{Currency, Expense, HomeCurrencies, Payer};
use trip_ledger::rates::{RateCache, RateCacheSettings, RateSnapshot, RateSource};
use trip_ledger::storage::write_json_atomic;

pub const EPSILON: f64 = 1e-9;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Fresh temporary directory plus the ledger path inside it.
pub fn setup_test_environment() -> (TempDir, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let ledger_path = temp_dir.path().join("expenses.json");
    (temp_dir, ledger_path)
}

pub fn open_store(path: &PathBuf) -> LedgerStore {
    LedgerStore::open(path).expect("Failed to open ledger")
}

pub fn test_rates() -> Rates {
    [
        (Currency::Cny, 1.0),
        (Currency::Gbp, 0.1),
        (Currency::Aed, 0.5),
        (Currency::Usd, 0.125),
        (Currency::Eur, 0.125),
    ]
    .into_iter()
    .collect()
}

pub fn homes() -> HomeCurrencies {
    HomeCurrencies::default()
}

pub fn day(s: &str) -> Date {
    trip_ledger::utils::parse_date(s).expect("Invalid test date")
}

pub fn draft(city: &str, category: &str, date: &str, amount: f64, payer: Payer) -> NewExpense {
    NewExpense {
        city: city.to_string(),
        activity: format!("{} in {}", category, city),
        category: category.to_string(),
        date: day(date),
        amount,
        currency: Currency::BASE,
        payer,
        notes: None,
    }
}

/// Assign an id, convert at [`test_rates`] and store the expense.
pub fn add_expense(store: &mut LedgerStore, draft: NewExpense) -> Expense {
    let id = store.next_id();
    let expense = draft.into_expense(id, &test_rates(), &homes());
    store
        .add(expense.clone())
        .expect("Failed to add test expense");
    expense
}

/// A handful of expenses across cities, categories, dates and payers.
pub fn create_sample_expenses(store: &mut LedgerStore) -> Vec<Expense> {
    vec![
        add_expense(
            store,
            draft("Beijing", "Food", "2024-03-01", 120.0, Payer::Joint),
        ),
        add_expense(
            store,
            draft("Beijing", "Transportation", "2024-03-02", 40.0, Payer::PartyA),
        ),
        add_expense(
            store,
            draft("Shanghai", "Accommodation", "2024-03-03", 800.0, Payer::Joint),
        ),
        add_expense(
            store,
            draft("Shanghai", "Food", "2024-03-03", 60.0, Payer::PartyB),
        ),
    ]
}

#[derive(Clone)]
pub enum StubBehavior {
    Respond(HashMap<String, f64>),
    Fail,
    Hang(StdDuration),
}

/// In-memory rate source that counts how often it is asked.
#[derive(Clone)]
pub struct StubSource {
    name: String,
    behavior: StubBehavior,
    calls: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn new(name: &str, behavior: StubBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl RateSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn latest(&self, _base: Currency) -> Result<HashMap<String, f64>, RemoteFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StubBehavior::Respond(rates) => Ok(rates.clone()),
            StubBehavior::Fail => Err(RemoteFetchError::Incomplete(vec!["GBP".to_string()])),
            StubBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(HashMap::new())
            }
        }
    }
}

pub fn remote_rates(gbp: f64, aed: f64) -> HashMap<String, f64> {
    HashMap::from([
        ("CNY".to_string(), 1.0),
        ("GBP".to_string(), gbp),
        ("AED".to_string(), aed),
        ("USD".to_string(), 0.138),
        ("EUR".to_string(), 0.127),
        ("JPY".to_string(), 20.5),
    ])
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

pub fn rate_settings(dir: &TempDir) -> RateCacheSettings {
    RateCacheSettings {
        path: dir.path().join("exchange_rates.json"),
        staleness: Duration::hours(4),
        fetch_timeout: StdDuration::from_millis(200),
    }
}

/// Persist a snapshot of [`test_rates`] that is `age` old.
pub fn write_rate_file(dir: &TempDir, age: Duration) -> RateSnapshot {
    let snapshot = RateSnapshot {
        rates: test_rates(),
        last_updated: Some(OffsetDateTime::now_utc() - age),
        base_currency: Currency::BASE,
    };
    write_json_atomic(&rate_settings(dir).path, &snapshot).expect("Failed to write rate file");
    snapshot
}

pub fn rate_cache(dir: &TempDir, primary: StubSource, secondary: Option<StubSource>) -> RateCache {
    RateCache::initialize(
        rate_settings(dir),
        Box::new(primary),
        secondary.map(|s| Box::new(s) as Box<dyn RateSource>),
    )
}

pub fn test_config(dir: &TempDir) -> Config {
    let data_path = dir.path().to_string_lossy().to_string();
    Config::from_lookup(|var| match var {
        "DATA_PATH" => Some(data_path.clone()),
        _ => None,
    })
    .expect("Default configuration should be valid")
}

/// Application state over a temporary directory with fresh rates, so no
/// handler triggers a remote fetch.
pub fn test_state(dir: &TempDir) -> AppState {
    write_rate_file(dir, Duration::minutes(5));
    let config = test_config(dir);
    let ledger = LedgerStore::open(config.ledger_path()).expect("Failed to open ledger");
    let rates = rate_cache(dir, StubSource::new("stub", StubBehavior::Fail), None);
    AppState::new(ledger, Arc::new(rates), config)
}
