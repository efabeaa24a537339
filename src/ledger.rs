//! The expense ledger: an in-memory collection mirrored to a single JSON file.
//!
//! Every mutation builds the complete next state, writes it atomically and
//! only then swaps it in, so memory never runs ahead of disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::constants::{AMOUNT_EPSILON, EXPORT_VERSION};
use crate::conversion::{Rates, Shares, to_base};
use crate::errors::{LedgerError, PersistenceError};
use crate::models::{
    Currency, Document, DocumentEntry, Expense, ExpenseFilter, ExpenseUpdate, HomeCurrencies,
    Payer,
};
use crate::reports::{self, LedgerStats};
use crate::storage::{self, Loaded};

/// The persisted document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LedgerData {
    pub expenses: Vec<Expense>,
    pub next_id: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl LedgerData {
    pub fn empty() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            expenses: Vec::new(),
            next_id: 1,
            created_at: now,
            last_updated: now,
        }
    }

    fn max_id(&self) -> u64 {
        self.expenses.iter().map(|e| e.id).max().unwrap_or(0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LedgerExport {
    pub data: LedgerData,
    #[serde(with = "time::serde::rfc3339")]
    pub export_timestamp: OffsetDateTime,
    pub export_version: String,
}

/// Validated entry input, before an id and derived amounts are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub city: String,
    pub activity: String,
    pub category: String,
    pub date: Date,
    pub amount: f64,
    pub currency: Currency,
    pub payer: Payer,
    pub notes: Option<String>,
}

impl NewExpense {
    /// Convert at the given rates and produce a complete record.
    pub fn into_expense(self, id: u64, rates: &Rates, homes: &HomeCurrencies) -> Expense {
        let total_base = to_base(self.amount, self.currency, rates);
        let shares = Shares::derive(total_base, self.payer, rates, homes);

        Expense {
            id,
            city: self.city,
            activity: self.activity,
            category: self.category,
            date: self.date,
            original_amount: self.amount,
            original_currency: self.currency,
            total_base,
            payer: self.payer,
            party_a_base: shares.party_a_base,
            party_b_base: shares.party_b_base,
            party_a_home: shares.party_a_home,
            party_b_home: shares.party_b_home,
            notes: self.notes.and_then(normalize_notes),
            documents: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

fn validate_amount(amount: f64) -> Result<(), LedgerError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::validation(format!(
            "amount must be greater than 0, got {amount}"
        )));
    }
    Ok(())
}

fn validate_record(record: &Expense) -> Result<(), LedgerError> {
    if record.id == 0 {
        return Err(LedgerError::validation("expense id must be positive"));
    }
    validate_amount(record.original_amount)?;
    validate_amount(record.total_base)?;

    let drift = (record.party_a_base + record.party_b_base - record.total_base).abs();
    if drift > AMOUNT_EPSILON * record.total_base.abs().max(1.0) {
        return Err(LedgerError::validation(format!(
            "party shares of expense {} do not add up to its total",
            record.id
        )));
    }
    Ok(())
}

fn normalize_notes(notes: String) -> Option<String> {
    let trimmed = notes.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    data: LedgerData,
}

impl LedgerStore {
    /// Load the ledger at `path`, creating an empty one if the file is absent.
    /// A file that cannot be parsed is renamed to `<file>.corrupt` and replaced
    /// with an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();

        match storage::read_json::<LedgerData>(&path)? {
            Loaded::Found(mut data) => {
                data.next_id = data.next_id.max(data.max_id() + 1);
                tracing::info!(
                    path = %path.display(),
                    expenses = data.expenses.len(),
                    next_id = data.next_id,
                    "loaded ledger"
                );
                Ok(Self { path, data })
            }
            Loaded::Missing => {
                tracing::info!(path = %path.display(), "creating new ledger");
                let store = Self {
                    path,
                    data: LedgerData::empty(),
                };
                store.save()?;
                Ok(store)
            }
            Loaded::Malformed(err) => {
                let mut aside = path.file_name().unwrap_or_default().to_os_string();
                aside.push(".corrupt");
                let aside = path.with_file_name(aside);
                tracing::error!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %err,
                    "ledger file is malformed, starting empty"
                );
                std::fs::rename(&path, &aside).map_err(|e| PersistenceError::io(&path, e))?;

                let store = Self {
                    path,
                    data: LedgerData::empty(),
                };
                store.save()?;
                Ok(store)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &LedgerData {
        &self.data
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.data.expenses
    }

    pub fn len(&self) -> usize {
        self.data.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.expenses.is_empty()
    }

    fn save(&self) -> Result<(), PersistenceError> {
        storage::write_json_atomic(&self.path, &self.data)
    }

    /// Apply `mutate` to a copy of the state, persist the copy, then swap it in.
    fn transact<R>(
        &mut self,
        mutate: impl FnOnce(&mut LedgerData) -> R,
    ) -> Result<R, PersistenceError> {
        let mut next = self.data.clone();
        let result = mutate(&mut next);
        next.last_updated = OffsetDateTime::now_utc();

        if let Err(e) = storage::write_json_atomic(&self.path, &next) {
            tracing::error!(path = %self.path.display(), error = %e, "ledger write failed");
            return Err(e);
        }
        self.data = next;
        Ok(result)
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.data.expenses.iter().position(|e| e.id == id)
    }

    /// Hand out a fresh id. The counter only moves forward, so ids are never
    /// reused even if the caller never stores a record under this one.
    pub fn next_id(&mut self) -> u64 {
        let id = self.data.next_id;
        self.data.next_id += 1;
        id
    }

    /// Store a record under the id most recently handed out by [`Self::next_id`].
    pub fn add(&mut self, record: Expense) -> Result<(), LedgerError> {
        validate_record(&record)?;
        let last_issued = self.data.next_id - 1;
        if record.id != last_issued {
            return Err(LedgerError::validation(format!(
                "expense id {} was not the last id issued ({})",
                record.id, last_issued
            )));
        }
        if self.position(record.id).is_some() {
            return Err(LedgerError::validation(format!(
                "expense id {} already exists",
                record.id
            )));
        }

        let id = record.id;
        self.transact(|data| data.expenses.push(record))?;
        tracing::debug!(id, "expense added");
        Ok(())
    }

    pub fn get_by_id(&self, id: u64) -> Option<&Expense> {
        self.data.expenses.iter().find(|e| e.id == id)
    }

    /// Matching expenses, newest date first; records sharing a date come most
    /// recently inserted first.
    pub fn list(&self, filter: &ExpenseFilter) -> Vec<Expense> {
        let mut matched: Vec<Expense> = self
            .data
            .expenses
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date));
        matched
    }

    /// Overwrite the provided fields of expense `id`.
    ///
    /// A new amount or currency re-converts `total_base` at `rates`; a new
    /// amount, currency or payer re-derives all four share fields. Returns
    /// `Ok(false)` when no such expense exists.
    pub fn update(
        &mut self,
        id: u64,
        changes: &ExpenseUpdate,
        rates: &Rates,
        homes: &HomeCurrencies,
    ) -> Result<bool, LedgerError> {
        if let Some(amount) = changes.amount {
            validate_amount(amount)?;
        }
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let reprice = changes.touches_money();
        let reshare = changes.touches_shares();
        let changes = changes.clone();
        self.transact(|data| {
            let expense = &mut data.expenses[index];

            if let Some(city) = changes.city {
                expense.city = city;
            }
            if let Some(activity) = changes.activity {
                expense.activity = activity;
            }
            if let Some(category) = changes.category {
                expense.category = category;
            }
            if let Some(date) = changes.date {
                expense.date = date;
            }
            if let Some(notes) = changes.notes {
                expense.notes = normalize_notes(notes);
            }

            if reprice {
                if let Some(amount) = changes.amount {
                    expense.original_amount = amount;
                }
                if let Some(currency) = changes.currency {
                    expense.original_currency = currency;
                }
                expense.total_base =
                    to_base(expense.original_amount, expense.original_currency, rates);
            }
            if let Some(payer) = changes.payer {
                expense.payer = payer;
            }
            if reshare {
                let shares = Shares::derive(expense.total_base, expense.payer, rates, homes);
                expense.party_a_base = shares.party_a_base;
                expense.party_b_base = shares.party_b_base;
                expense.party_a_home = shares.party_a_home;
                expense.party_b_home = shares.party_b_home;
            }
        })?;

        tracing::debug!(id, "expense updated");
        Ok(true)
    }

    pub fn delete(&mut self, id: u64) -> Result<bool, LedgerError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.transact(|data| {
            data.expenses.remove(index);
        })?;
        tracing::debug!(id, "expense deleted");
        Ok(true)
    }

    pub fn add_document(&mut self, id: u64, document: Document) -> Result<bool, LedgerError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.transact(|data| data.expenses[index].documents.push(document))?;
        Ok(true)
    }

    /// Remove the first document on expense `id` named `filename`.
    pub fn remove_document(&mut self, id: u64, filename: &str) -> Result<bool, LedgerError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let Some(doc_index) = self.data.expenses[index]
            .documents
            .iter()
            .position(|d| d.filename == filename)
        else {
            return Ok(false);
        };

        self.transact(|data| {
            data.expenses[index].documents.remove(doc_index);
        })?;
        Ok(true)
    }

    /// Every attached document, most recently uploaded first.
    pub fn documents(&self) -> Vec<DocumentEntry> {
        let mut entries: Vec<DocumentEntry> = self
            .data
            .expenses
            .iter()
            .flat_map(|expense| {
                expense.documents.iter().map(move |doc| DocumentEntry {
                    expense_id: expense.id,
                    expense_activity: expense.activity.clone(),
                    expense_date: expense.date,
                    expense_city: expense.city.clone(),
                    document: doc.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.document.uploaded_at.cmp(&a.document.uploaded_at));
        entries
    }

    pub fn stats(&self) -> LedgerStats {
        reports::stats(&self.data)
    }

    pub fn export(&self) -> LedgerExport {
        LedgerExport {
            data: self.data.clone(),
            export_timestamp: OffsetDateTime::now_utc(),
            export_version: EXPORT_VERSION.to_string(),
        }
    }

    /// Replace the whole ledger with a previous export.
    pub fn import(&mut self, export: LedgerExport) -> Result<(), LedgerError> {
        let incoming = export.data;

        let mut seen = HashSet::with_capacity(incoming.expenses.len());
        for expense in &incoming.expenses {
            validate_record(expense)?;
            if !seen.insert(expense.id) {
                return Err(LedgerError::validation(format!(
                    "duplicate expense id {} in import",
                    expense.id
                )));
            }
        }
        if incoming.next_id <= incoming.max_id() {
            return Err(LedgerError::validation(format!(
                "next_id {} must be greater than the highest expense id {}",
                incoming.next_id,
                incoming.max_id()
            )));
        }

        let count = incoming.expenses.len();
        self.transact(|data| *data = incoming)?;
        tracing::info!(expenses = count, "ledger imported");
        Ok(())
    }

    /// Drop every expense and reset the id counter to 1.
    pub fn clear(&mut self) -> Result<(), LedgerError> {
        self.transact(|data| *data = LedgerData::empty())?;
        tracing::warn!(path = %self.path.display(), "ledger cleared");
        Ok(())
    }
}
