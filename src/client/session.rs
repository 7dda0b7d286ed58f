//! Drives [`ConverterState`] against a rate gateway and a recorder.

use super::flow::{ConversionOutcome, ConverterState, FETCH_ERROR_MESSAGE, FetchTicket};
use crate::core::conversion::{ConversionRecorder, NewConversion};
use crate::core::rates::{GatewayError, RateGateway, RateSnapshot};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Submits conversion records in the background.
///
/// [`RecordDispatcher::fire_and_forget`] returns nothing: callers cannot wait
/// on, or react to, the outcome of a record. Outcomes are only logged.
pub struct RecordDispatcher {
    recorder: Arc<dyn ConversionRecorder>,
    pending: Vec<JoinHandle<()>>,
}

impl RecordDispatcher {
    pub fn new(recorder: Arc<dyn ConversionRecorder>) -> Self {
        Self {
            recorder,
            pending: Vec::new(),
        }
    }

    pub fn fire_and_forget(&mut self, conversion: NewConversion) {
        self.pending.retain(|handle| !handle.is_finished());

        let recorder = Arc::clone(&self.recorder);
        self.pending.push(tokio::spawn(async move {
            match recorder.record(conversion).await {
                Ok(ack) => debug!(message = %ack.message, "Conversion recorded"),
                Err(e) => warn!(error = %e, "Failed to record conversion"),
            }
        }));
    }

    /// Number of submissions that have not completed yet.
    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Waits up to `timeout` for outstanding submissions, for use before a
    /// short-lived process exits. Submissions still running are detached.
    pub async fn drain(&mut self, timeout: Duration) {
        let handles = std::mem::take(&mut self.pending);
        if handles.is_empty() {
            return;
        }
        if tokio::time::timeout(timeout, join_all(handles)).await.is_err() {
            warn!("Gave up waiting for conversion records to be saved");
        }
    }
}

struct FetchCompletion {
    ticket: FetchTicket,
    outcome: Result<RateSnapshot, GatewayError>,
}

async fn fetch_snapshot(gateway: &dyn RateGateway, base: &str) -> Result<RateSnapshot, GatewayError> {
    gateway.get_rates(base).await?.snapshot().map_err(|e| {
        GatewayError::Upstream(format!("Failed to parse rates response for {base}: {e}"))
    })
}

/// Owns the current [`ConverterState`] and performs the effects its
/// transitions ask for.
///
/// Rate fetches run as spawned tasks and report back over a channel; they are
/// applied in completion order, and the state machine drops any completion
/// whose ticket has been superseded.
pub struct ConverterSession {
    state: ConverterState,
    gateway: Arc<dyn RateGateway>,
    records: RecordDispatcher,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    in_flight: usize,
}

impl ConverterSession {
    pub fn new(
        state: ConverterState,
        gateway: Arc<dyn RateGateway>,
        recorder: Arc<dyn ConversionRecorder>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            state,
            gateway,
            records: RecordDispatcher::new(recorder),
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &ConverterState {
        &self.state
    }

    pub fn has_pending_fetches(&self) -> bool {
        self.in_flight > 0
    }

    pub fn pending_records(&self) -> usize {
        self.records.pending()
    }

    /// Initial load of the rate table for the current source currency.
    pub fn start(&mut self) {
        let (next, ticket) = self.state.load();
        self.state = next;
        self.spawn_fetch(ticket);
    }

    pub fn select_source(&mut self, code: &str) {
        let (next, ticket) = self.state.select_source(code);
        self.state = next;
        if let Some(ticket) = ticket {
            self.spawn_fetch(ticket);
        }
    }

    pub fn select_target(&mut self, code: &str) {
        self.state = self.state.select_target(code);
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.state = self.state.set_amount(amount);
    }

    pub fn swap(&mut self) {
        let (next, ticket) = self.state.swap();
        self.state = next;
        if let Some(ticket) = ticket {
            self.spawn_fetch(ticket);
        }
    }

    /// Converts with the current table. The result is in the state before
    /// the record submission has even started.
    pub fn convert(&mut self) -> Option<ConversionOutcome> {
        let (next, outcome) = self.state.convert();
        self.state = next;
        if let Some(outcome) = &outcome {
            self.records.fire_and_forget(outcome.to_record());
        }
        outcome
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket) {
        debug!(seq = ticket.seq, base = %ticket.base, "Fetching rates");
        self.in_flight += 1;

        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions_tx.clone();
        let base = ticket.base.clone();
        tokio::spawn(async move {
            // A panicking gateway still has to complete its ticket
            let fetch = tokio::spawn(async move { fetch_snapshot(gateway.as_ref(), &base).await });
            let outcome = fetch.await.unwrap_or_else(|e| {
                Err(GatewayError::Upstream(format!("Rate fetch aborted: {e}")))
            });
            // The receiver lives as long as the session
            let _ = completions.send(FetchCompletion { ticket, outcome });
        });
    }

    fn apply(&mut self, completion: FetchCompletion) {
        let FetchCompletion { ticket, outcome } = completion;
        if !self.state.is_current(&ticket) {
            debug!(seq = ticket.seq, base = %ticket.base, "Dropping superseded rate fetch");
            return;
        }

        self.state = match outcome {
            Ok(snapshot) => self.state.rates_loaded(&ticket, snapshot),
            Err(e) => {
                warn!(error = %e, base = %ticket.base, "Rate fetch failed");
                self.state.rates_failed(&ticket, FETCH_ERROR_MESSAGE)
            }
        };
    }

    /// Waits for the next rate fetch to complete and applies it. Returns
    /// `false` right away when no fetch is in flight.
    pub async fn apply_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.completions_rx.recv().await {
            Some(completion) => {
                self.in_flight -= 1;
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Applies completions until no rate fetch is in flight.
    pub async fn settle(&mut self) {
        while self.apply_next().await {}
    }

    /// See [`RecordDispatcher::drain`].
    pub async fn flush_records(&mut self, timeout: Duration) {
        self.records.drain(timeout).await;
    }
}
