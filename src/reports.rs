//! Aggregations over expense records. Everything here is a pure function of
//! the records passed in.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::conversion::split;
use crate::ledger::LedgerData;
use crate::models::{Expense, Payer, iso_date};

pub const PARTY_A_KEY: &str = "party_a";
pub const PARTY_B_KEY: &str = "party_b";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    City,
    Person,
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(Dimension::Category),
            "city" => Ok(Dimension::City),
            "person" | "payer" => Ok(Dimension::Person),
            other => Err(format!(
                "Unknown dimension '{other}', expected category, city or person"
            )),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Category => "category",
            Dimension::City => "city",
            Dimension::Person => "person",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Bucket {
    pub count: usize,
    pub total_base: f64,
}

impl Bucket {
    fn record(&mut self, amount: f64) {
        self.count += 1;
        self.total_base += amount;
    }
}

/// Group `records` by `dimension`.
///
/// For [`Dimension::Person`] a joint expense contributes half its total to
/// each party and counts once for both.
pub fn aggregate(records: &[Expense], dimension: Dimension) -> BTreeMap<String, Bucket> {
    let mut groups: BTreeMap<String, Bucket> = BTreeMap::new();

    for expense in records {
        match dimension {
            Dimension::Category => groups
                .entry(expense.category.clone())
                .or_default()
                .record(expense.total_base),
            Dimension::City => groups
                .entry(expense.city.clone())
                .or_default()
                .record(expense.total_base),
            Dimension::Person => {
                let (a, b) = split(expense.total_base, expense.payer);
                if matches!(expense.payer, Payer::PartyA | Payer::Joint) {
                    groups.entry(PARTY_A_KEY.to_string()).or_default().record(a);
                }
                if matches!(expense.payer, Payer::PartyB | Payer::Joint) {
                    groups.entry(PARTY_B_KEY.to_string()).or_default().record(b);
                }
            }
        }
    }

    groups
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PartyTotals {
    pub base: f64,
    pub home: f64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    #[serde(with = "iso_date")]
    pub earliest: Date,
    #[serde(with = "iso_date")]
    pub latest: Date,
}

/// Totals over a set of records, as shown for a filtered summary.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Totals {
    pub count: usize,
    pub total_base: f64,
    pub party_a: PartyTotals,
    pub party_b: PartyTotals,
    pub date_span: Option<DateSpan>,
}

pub fn totals(records: &[Expense]) -> Totals {
    let mut totals = Totals::default();

    for expense in records {
        totals.count += 1;
        totals.total_base += expense.total_base;
        totals.party_a.base += expense.party_a_base;
        totals.party_a.home += expense.party_a_home;
        totals.party_b.base += expense.party_b_base;
        totals.party_b.home += expense.party_b_home;

        totals.date_span = Some(match totals.date_span {
            None => DateSpan {
                earliest: expense.date,
                latest: expense.date,
            },
            Some(span) => DateSpan {
                earliest: span.earliest.min(expense.date),
                latest: span.latest.max(expense.date),
            },
        });
    }

    totals
}

/// Whole-ledger summary.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LedgerStats {
    pub total_count: usize,
    pub total_base_sum: f64,
    pub party_a: PartyTotals,
    pub party_b: PartyTotals,
    pub categories: BTreeMap<String, Bucket>,
    pub cities: BTreeMap<String, Bucket>,
    pub date_span: Option<DateSpan>,
    pub document_count: usize,
    pub next_id: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

pub fn stats(data: &LedgerData) -> LedgerStats {
    let records = &data.expenses;
    let totals = totals(records);

    LedgerStats {
        total_count: totals.count,
        total_base_sum: totals.total_base,
        party_a: totals.party_a,
        party_b: totals.party_b,
        categories: aggregate(records, Dimension::Category),
        cities: aggregate(records, Dimension::City),
        date_span: totals.date_span,
        document_count: records.iter().map(|e| e.documents.len()).sum(),
        next_id: data.next_id,
        created_at: data.created_at,
        last_updated: data.last_updated,
    }
}
