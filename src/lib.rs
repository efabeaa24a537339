pub mod admin;
pub mod app;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod currency;
pub mod documents;
pub mod errors;
pub mod expenses;
pub mod ledger;
pub mod models;
pub mod rates;
pub mod reports;
pub mod storage;
pub mod utils;
