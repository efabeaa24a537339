//! Currency conversion and cost splitting.
//!
//! Every rate is "units of the currency per one unit of the base currency",
//! so converting into the base divides and converting out of it multiplies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Currency, HomeCurrencies, Payer};

/// Exchange factors keyed by currency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Rates(BTreeMap<Currency, f64>);

fn usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

impl Rates {
    pub fn new(rates: BTreeMap<Currency, f64>) -> Self {
        Self(rates)
    }

    /// Fallback factors for every supported currency.
    pub fn defaults() -> Self {
        Self(
            Currency::ALL
                .into_iter()
                .map(|currency| (currency, currency.fallback_rate()))
                .collect(),
        )
    }

    /// Replace missing, zero or non-finite entries with fallback factors and
    /// pin the base currency to 1.
    pub fn with_fallbacks(mut self) -> Self {
        for currency in Currency::ALL {
            let entry = self.0.entry(currency).or_insert(0.0);
            if currency.is_base() {
                *entry = 1.0;
            } else if !usable(*entry) {
                *entry = currency.fallback_rate();
            }
        }
        self
    }

    /// Raw stored value, if any.
    pub fn get(&self, currency: Currency) -> Option<f64> {
        self.0.get(&currency).copied()
    }

    /// Usable factor for `currency`, falling back to the constant table.
    pub fn factor(&self, currency: Currency) -> f64 {
        if currency.is_base() {
            return 1.0;
        }
        match self.0.get(&currency) {
            Some(rate) if usable(*rate) => *rate,
            _ => currency.fallback_rate(),
        }
    }

    /// Units of base currency per one unit of `currency`.
    pub fn inverse(&self, currency: Currency) -> f64 {
        1.0 / self.factor(currency)
    }

    pub fn convert(&self, amount_in_base: f64, target: Currency) -> f64 {
        amount_in_base * self.factor(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, f64)> + '_ {
        self.0.iter().map(|(currency, rate)| (*currency, *rate))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Currency, f64)> for Rates {
    fn from_iter<I: IntoIterator<Item = (Currency, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn to_base(amount: f64, currency: Currency, rates: &Rates) -> f64 {
    if currency.is_base() {
        amount
    } else {
        amount / rates.factor(currency)
    }
}

/// Split a base amount into (party A, party B) shares.
pub fn split(base_amount: f64, payer: Payer) -> (f64, f64) {
    match payer {
        Payer::Joint => {
            let half = base_amount / 2.0;
            (half, half)
        }
        Payer::PartyA => (base_amount, 0.0),
        Payer::PartyB => (0.0, base_amount),
    }
}

pub fn to_home(party_base_amount: f64, rates: &Rates, home_currency: Currency) -> f64 {
    rates.convert(party_base_amount, home_currency)
}

/// Derived per-party amounts stored on every expense.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shares {
    pub party_a_base: f64,
    pub party_b_base: f64,
    pub party_a_home: f64,
    pub party_b_home: f64,
}

impl Shares {
    pub fn derive(total_base: f64, payer: Payer, rates: &Rates, homes: &HomeCurrencies) -> Self {
        let (party_a_base, party_b_base) = split(total_base, payer);
        Self {
            party_a_base,
            party_b_base,
            party_a_home: to_home(party_a_base, rates, homes.party_a),
            party_b_home: to_home(party_b_base, rates, homes.party_b),
        }
    }
}
