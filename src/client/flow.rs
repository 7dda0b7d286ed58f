//! The conversion flow as an immutable state machine.
//!
//! Every transition takes the current [`ConverterState`] by reference and
//! returns the next one, together with the effect the caller has to carry
//! out (a rate fetch or a record submission). Nothing here performs I/O.

use crate::core::conversion::{self, NewConversion};
use crate::core::rates::{RateSnapshot, RateTable};
use std::fmt;
use std::sync::Arc;

/// Shown when the latest rate fetch failed.
pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch exchange rates. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FetchingRates,
    RatesReady,
    ResultDisplayed,
    Error,
}

/// A rate fetch the caller must start. Only the most recently issued ticket
/// is allowed to update the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub base: String,
}

/// A computed conversion, as displayed and as submitted for recording.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub result: f64,
}

impl ConversionOutcome {
    pub fn to_record(&self) -> NewConversion {
        NewConversion::new(&self.from, &self.to, self.amount, self.result)
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {:.2} {}",
            self.amount, self.from, self.result, self.to
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConverterState {
    from: String,
    to: String,
    amount: f64,
    rates: Arc<RateTable>,
    rates_base: Option<String>,
    phase: Phase,
    error: Option<String>,
    result: Option<ConversionOutcome>,
    latest_fetch: u64,
}

impl ConverterState {
    pub fn new(from: &str, to: &str, amount: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            rates: Arc::new(RateTable::new()),
            rates_base: None,
            phase: Phase::Idle,
            error: None,
            result: None,
            latest_fetch: 0,
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Source currency the current table was fetched for.
    pub fn rates_base(&self) -> Option<&str> {
        self.rates_base.as_deref()
    }

    /// Whether the current table prices the selected source currency.
    pub fn has_source_rates(&self) -> bool {
        self.rates_base.as_deref() == Some(self.from.as_str())
    }

    /// Selectable currencies: the keys of the last applied rate table.
    pub fn currencies(&self) -> Vec<&str> {
        self.rates.keys().map(String::as_str).collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&ConversionOutcome> {
        self.result.as_ref()
    }

    pub fn is_fetching(&self) -> bool {
        self.phase == Phase::FetchingRates
    }

    /// Starts a fetch for the current source currency.
    #[must_use]
    pub fn load(&self) -> (Self, FetchTicket) {
        let mut next = self.clone();
        next.latest_fetch += 1;
        next.phase = Phase::FetchingRates;
        let ticket = FetchTicket {
            seq: next.latest_fetch,
            base: next.from.clone(),
        };
        (next, ticket)
    }

    /// Changes the source currency. A change starts a new fetch; selecting
    /// the current source again does nothing.
    #[must_use]
    pub fn select_source(&self, code: &str) -> (Self, Option<FetchTicket>) {
        if code == self.from {
            return (self.clone(), None);
        }
        let mut next = self.clone();
        next.from = code.to_string();
        let (next, ticket) = next.load();
        (next, Some(ticket))
    }

    #[must_use]
    pub fn select_target(&self, code: &str) -> Self {
        Self {
            to: code.to_string(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn set_amount(&self, amount: f64) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }

    /// Exchanges source and target. The new source triggers a fetch of the
    /// opposite-direction table.
    #[must_use]
    pub fn swap(&self) -> (Self, Option<FetchTicket>) {
        let target = self.to.clone();
        let (next, ticket) = self.select_source(&target);
        let next = Self {
            to: self.from.clone(),
            ..next
        };
        (next, ticket)
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.seq == self.latest_fetch
    }

    /// Applies a fetched table. Completions of superseded tickets are ignored.
    #[must_use]
    pub fn rates_loaded(&self, ticket: &FetchTicket, snapshot: RateSnapshot) -> Self {
        if !self.is_current(ticket) {
            return self.clone();
        }
        Self {
            rates: Arc::new(snapshot.rates),
            rates_base: Some(ticket.base.clone()),
            phase: Phase::RatesReady,
            error: None,
            ..self.clone()
        }
    }

    /// Records a failed fetch. The previous table stays selectable.
    #[must_use]
    pub fn rates_failed(&self, ticket: &FetchTicket, message: &str) -> Self {
        if !self.is_current(ticket) {
            return self.clone();
        }
        Self {
            phase: Phase::Error,
            error: Some(message.to_string()),
            ..self.clone()
        }
    }

    /// Computes `amount * rates[to]`. When the target has no rate, a fetch is
    /// still outstanding, or the table belongs to a previous source currency,
    /// the state is returned unchanged and nothing is to be recorded.
    #[must_use]
    pub fn convert(&self) -> (Self, Option<ConversionOutcome>) {
        if self.is_fetching() || !self.has_source_rates() {
            return (self.clone(), None);
        }
        let Some(result) = conversion::convert(self.amount, &self.to, &self.rates) else {
            return (self.clone(), None);
        };

        let outcome = ConversionOutcome {
            from: self.from.clone(),
            to: self.to.clone(),
            amount: self.amount,
            result,
        };
        let next = Self {
            phase: Phase::ResultDisplayed,
            result: Some(outcome.clone()),
            ..self.clone()
        };
        (next, Some(outcome))
    }
}
