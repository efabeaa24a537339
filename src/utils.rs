use axum::http::StatusCode;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::config::Config;
use crate::constants::*;
use crate::errors::LedgerError;
use crate::models::{Currency, ExpenseFilter, Payer};

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

fn bad_request(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.into())
}

pub fn ledger_error(err: LedgerError) -> (StatusCode, String) {
    match err {
        LedgerError::Validation(message) => (StatusCode::BAD_REQUEST, message),
        LedgerError::Persistence(e) => {
            tracing::error!(error = %e, "ledger persistence failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERR_PERSISTENCE.to_string(),
            )
        }
    }
}

pub fn not_found(message: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, message.to_string())
}

pub fn validate_string_length(
    value: &str,
    field_name: &str,
    max_length: usize,
) -> Result<(), (StatusCode, String)> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{} cannot be empty", field_name)));
    }
    if value.len() > max_length {
        return Err(bad_request(format!(
            "{} must be less than {} characters",
            field_name, max_length
        )));
    }
    Ok(())
}

fn from_catalog(
    value: &str,
    catalog: &[&str],
    field_name: &str,
) -> Result<String, (StatusCode, String)> {
    catalog
        .iter()
        .find(|entry| entry.eq_ignore_ascii_case(value.trim()))
        .map(|entry| entry.to_string())
        .ok_or_else(|| {
            bad_request(format!(
                "Unknown {} '{}'. Choose one of: {}",
                field_name,
                value,
                catalog.join(", ")
            ))
        })
}

pub fn validate_city(city: &str) -> Result<String, (StatusCode, String)> {
    from_catalog(city, CITIES, "city")
}

pub fn validate_category(category: &str) -> Result<String, (StatusCode, String)> {
    from_catalog(category, CATEGORIES, "category")
}

pub fn validate_activity(activity: &str) -> Result<String, (StatusCode, String)> {
    validate_string_length(activity, "Activity", MAX_ACTIVITY_LENGTH)?;
    Ok(activity.trim().to_string())
}

pub fn validate_notes(notes: &str) -> Result<String, (StatusCode, String)> {
    if notes.len() > MAX_NOTES_LENGTH {
        return Err(bad_request(format!(
            "Notes must be less than {} characters",
            MAX_NOTES_LENGTH
        )));
    }
    Ok(notes.trim().to_string())
}

pub fn validate_amount(amount: f64) -> Result<f64, (StatusCode, String)> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(bad_request("Amount must be greater than 0"));
    }
    Ok(amount)
}

pub fn parse_currency(code: &str) -> Result<Currency, (StatusCode, String)> {
    code.parse().map_err(|e| bad_request(format!("{}", e)))
}

/// Accepts the payer keys, the configured party names, or "couple"/"both"
/// for a joint expense.
pub fn parse_payer(value: &str, config: &Config) -> Result<Payer, (StatusCode, String)> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("party_a") || value.eq_ignore_ascii_case(&config.party_a_name) {
        return Ok(Payer::PartyA);
    }
    if value.eq_ignore_ascii_case("party_b") || value.eq_ignore_ascii_case(&config.party_b_name) {
        return Ok(Payer::PartyB);
    }
    if ["joint", "couple", "both"]
        .iter()
        .any(|v| value.eq_ignore_ascii_case(v))
    {
        return Ok(Payer::Joint);
    }
    Err(bad_request(format!(
        "Unknown payer '{}'. Choose one of: {}, {}, Joint",
        value, config.party_a_name, config.party_b_name
    )))
}

pub fn parse_date(value: &str) -> Result<Date, (StatusCode, String)> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| bad_request("Invalid date format. Please use YYYY-MM-DD format."))
}

pub fn validate_filename(filename: &str) -> Result<String, (StatusCode, String)> {
    validate_string_length(filename, "Filename", MAX_FILENAME_LENGTH)?;
    Ok(filename.trim().to_string())
}

pub fn build_filter(
    city: Option<&str>,
    category: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<ExpenseFilter, (StatusCode, String)> {
    let filter = ExpenseFilter {
        city: city.map(validate_city).transpose()?,
        category: category.map(validate_category).transpose()?,
        date_from: start_date.map(parse_date).transpose()?,
        date_to: end_date.map(parse_date).transpose()?,
    };

    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            return Err(bad_request("Start date must not be after end date"));
        }
    }
    Ok(filter)
}
