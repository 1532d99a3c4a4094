//! Live slug availability feedback for the profile editor.
//!
//! Each keystroke issues a sequence-numbered check. Responses can arrive in
//! any order; one is applied only if it answers the most recently issued
//! check. Older answers are dropped, so the status always describes the
//! current input and stays `Checking` until that input's answer lands.
//!
//! The probe is advisory. It never blocks saving: the server decides
//! ownership when the profile is written.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use gathering_profiles::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Nothing to check (empty input).
    #[default]
    Idle,
    Checking,
    Available,
    /// Owned by another member.
    Taken,
    /// The check failed; saving is still allowed.
    Error,
    /// Already owned by the current member.
    Mine,
}

/// Body of `GET /profile/slug-availability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub normalized: String,
    pub available: bool,
    pub reserved_by_other: bool,
    pub is_mine: bool,
}

impl AvailabilityReport {
    fn status(&self) -> ProbeStatus {
        if self.is_mine {
            ProbeStatus::Mine
        } else if self.reserved_by_other || !self.available {
            ProbeStatus::Taken
        } else {
            ProbeStatus::Available
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("availability check failed: {0}")]
    Transport(String),

    #[error("availability check rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Where availability answers come from (the API, or a fake in tests).
#[async_trait::async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn check(&self, candidate: &str) -> Result<AvailabilityReport, ProbeError>;
}

/// A check that was issued and may still be in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTicket {
    pub seq: u64,
    pub normalized: String,
}

/// Single-owner probe state machine.
#[derive(Debug, Default)]
pub struct AvailabilityProbe {
    issued: u64,
    applied: u64,
    status: ProbeStatus,
    normalized: String,
}

impl AvailabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    /// The normalized candidate of the last input.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Register a new input.
    ///
    /// Returns the ticket to check, or `None` when the input normalizes to
    /// nothing; the probe then goes back to `Idle` and anything still in
    /// flight is discarded when it lands.
    pub fn begin(&mut self, raw: &str) -> Option<ProbeTicket> {
        self.issued += 1;
        self.normalized = normalize(raw);

        if self.normalized.is_empty() {
            self.applied = self.issued;
            self.status = ProbeStatus::Idle;
            return None;
        }

        self.status = ProbeStatus::Checking;
        Some(ProbeTicket {
            seq: self.issued,
            normalized: self.normalized.clone(),
        })
    }

    /// Apply the outcome of `ticket`'s check. Returns `false` if a newer
    /// input was registered since (or the ticket was already applied) and the
    /// outcome was dropped.
    pub fn resolve(&mut self, ticket: &ProbeTicket, outcome: Result<AvailabilityReport, ProbeError>) -> bool {
        if ticket.seq != self.issued || ticket.seq <= self.applied {
            debug!(
                seq = ticket.seq,
                issued = self.issued,
                applied = self.applied,
                "discarding superseded availability response"
            );
            return false;
        }

        self.applied = ticket.seq;
        self.status = match outcome {
            Ok(report) => report.status(),
            Err(e) => {
                debug!(seq = ticket.seq, error = %e, "availability check failed");
                ProbeStatus::Error
            }
        };
        true
    }
}

/// Probe that can be driven from concurrent tasks.
///
/// The lock is only held for the state transitions, never across the check.
#[derive(Debug, Clone, Default)]
pub struct SharedProbe {
    inner: Arc<Mutex<AvailabilityProbe>>,
}

impl SharedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ProbeStatus {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).status()
    }

    /// Handle one input: issue its check and apply the answer if still current.
    pub async fn on_input<S>(&self, source: &S, raw: &str) -> ProbeStatus
    where
        S: AvailabilitySource + ?Sized,
    {
        let ticket = self.inner.lock().unwrap_or_else(PoisonError::into_inner).begin(raw);
        let Some(ticket) = ticket else {
            return ProbeStatus::Idle;
        };

        let outcome = source.check(&ticket.normalized).await;

        let mut probe = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        probe.resolve(&ticket, outcome);
        probe.status()
    }
}
