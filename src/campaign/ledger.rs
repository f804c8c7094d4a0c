//! Outcome ledger — per-recipient terminal delivery accounting.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Terminal processing result for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Delivery reported success.
    Sent,
    /// Delivery failed; carries the human-readable detail.
    Errored(String),
}

impl Outcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// A recorded outcome and when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}

/// Sent/errored totals for one campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerCounts {
    pub sent: usize,
    pub errored: usize,
}

impl LedgerCounts {
    /// Recipients with any terminal outcome.
    pub fn accounted(&self) -> usize {
        self.sent + self.errored
    }
}

/// Mapping from recipient identity key to outcome. Append-only except for
/// `clear`, which is invoked only by a full campaign reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLedger {
    entries: HashMap<String, OutcomeRecord>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminal outcome for a key. Each key can be recorded at most
    /// once; a duplicate indicates a bug in pending-chunk computation.
    pub fn record(&mut self, key: impl Into<String>, outcome: Outcome) -> Result<(), LedgerError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(LedgerError::DuplicateKey { key });
        }
        self.entries.insert(
            key,
            OutcomeRecord {
                outcome,
                recorded_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Look up the recorded outcome for a key.
    pub fn lookup(&self, key: &str) -> Option<&OutcomeRecord> {
        self.entries.get(key)
    }

    /// Whether a key has any recorded outcome.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop all entries. Used only by campaign reset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sent/errored totals.
    pub fn counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts::default();
        for record in self.entries.values() {
            match record.outcome {
                Outcome::Sent => counts.sent += 1,
                Outcome::Errored(_) => counts.errored += 1,
            }
        }
        counts
    }

    /// Iterate all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutcomeRecord)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys recorded as errored. Callers wanting error-only reprocessing can
    /// build a new campaign targeting exactly these keys.
    pub fn errored_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, record)| !record.outcome.is_sent())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
