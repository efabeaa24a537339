use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Currencies the ledger understands. Rates are always expressed as units of
/// a currency per one unit of [`Currency::BASE`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[serde(alias = "RMB")]
    Cny,
    Gbp,
    Aed,
    Usd,
    Eur,
}

impl Currency {
    pub const BASE: Currency = Currency::Cny;
    pub const ALL: [Currency; 5] = [
        Currency::Cny,
        Currency::Gbp,
        Currency::Aed,
        Currency::Usd,
        Currency::Eur,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Cny => "CNY",
            Currency::Gbp => "GBP",
            Currency::Aed => "AED",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Approximate units per one base unit, used whenever no usable live rate
    /// is held for this currency.
    pub fn fallback_rate(self) -> f64 {
        match self {
            Currency::Cny => 1.0,
            Currency::Gbp => 0.11,
            Currency::Aed => 0.52,
            Currency::Usd => 0.14,
            Currency::Eur => 0.13,
        }
    }

    pub fn is_base(self) -> bool {
        self == Currency::BASE
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCurrency(pub String);

impl fmt::Display for UnknownCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported currency: {}", self.0)
    }
}

impl std::error::Error for UnknownCurrency {}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CNY" | "RMB" => Ok(Currency::Cny),
            "GBP" => Ok(Currency::Gbp),
            "AED" => Ok(Currency::Aed),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

/// Who paid for an expense. `Joint` splits the cost evenly between both parties.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Payer {
    PartyA,
    PartyB,
    Joint,
}

/// Home currency of each party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeCurrencies {
    pub party_a: Currency,
    pub party_b: Currency,
}

impl Default for HomeCurrencies {
    fn default() -> Self {
        Self {
            party_a: Currency::Gbp,
            party_b: Currency::Aed,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub filename: String,
    pub storage_path: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// A document together with the expense it is attached to.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DocumentEntry {
    pub expense_id: u64,
    pub expense_activity: String,
    #[serde(with = "iso_date")]
    pub expense_date: Date,
    pub expense_city: String,
    #[serde(flatten)]
    pub document: Document,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: u64,
    pub city: String,
    pub activity: String,
    pub category: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub original_amount: f64,
    pub original_currency: Currency,
    pub total_base: f64,
    pub payer: Payer,
    pub party_a_base: f64,
    pub party_b_base: f64,
    pub party_a_home: f64,
    pub party_b_home: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Filters for [`crate::ledger::LedgerStore::list`]. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    pub city: Option<String>,
    pub category: Option<String>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if self.city.as_deref().is_some_and(|city| expense.city != city) {
            return false;
        }
        if self
            .category
            .as_deref()
            .is_some_and(|category| expense.category != category)
        {
            return false;
        }
        if self.date_from.is_some_and(|from| expense.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| expense.date > to) {
            return false;
        }
        true
    }
}

/// Field-by-field edit of an expense. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseUpdate {
    pub city: Option<String>,
    pub activity: Option<String>,
    pub category: Option<String>,
    pub payer: Option<Payer>,
    pub date: Option<Date>,
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
    pub notes: Option<String>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ExpenseUpdate::default()
    }

    pub fn touches_money(&self) -> bool {
        self.amount.is_some() || self.currency.is_some()
    }

    pub fn touches_shares(&self) -> bool {
        self.touches_money() || self.payer.is_some()
    }
}

// HTTP payloads

#[derive(Deserialize, Debug, Clone)]
pub struct CreateExpensePayload {
    pub city: String,
    pub activity: String,
    pub category: String,
    pub payer: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpdateExpensePayload {
    pub city: Option<String>,
    pub activity: Option<String>,
    pub category: Option<String>,
    pub payer: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GetExpensesQuery {
    pub city: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SummaryQuery {
    pub dimension: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AddDocumentPayload {
    pub filename: String,
    pub storage_path: String,
    pub size: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ConvertQuery {
    pub amount: f64,
    pub to: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct GetExpensesResponse {
    pub expenses: Vec<Expense>,
    pub total_count: usize,
}
