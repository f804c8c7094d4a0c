//! Campaign data model and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::campaign::ledger::{LedgerCounts, OutcomeLedger};
use crate::error::DispatchError;
use crate::recipients::{Recipient, RecipientTable};

/// How a campaign's recipients are processed across activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    /// One activation processes every pending recipient.
    Bulk,
    /// One activation processes at most `batch_size` recipients; the next
    /// activation must be triggered externally.
    Batch,
    /// One activation processes at most `drip_rate` recipients and schedules
    /// the next activation after the configured interval.
    Drip,
}

impl std::fmt::Display for SendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bulk => "bulk",
            Self::Batch => "batch",
            Self::Drip => "drip",
        };
        write!(f, "{s}")
    }
}

/// Spacing unit between drip activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DripInterval {
    Hourly,
    Daily,
}

impl std::fmt::Display for DripInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        };
        write!(f, "{s}")
    }
}

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Composed but not started.
    Draft,
    /// Dispatch in progress; activations are permitted.
    Sending,
    /// Dispatch suspended; no activation runs until resumed.
    Paused,
    /// Every recipient has a terminal outcome.
    Completed,
}

impl CampaignStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: CampaignStatus) -> bool {
        use CampaignStatus::*;

        matches!(
            (self, target),
            (Draft, Sending) |
            (Sending, Paused) | (Sending, Completed) |
            // Resume, or reset back to a clean draft
            (Paused, Sending) | (Paused, Draft) |
            // The only way out of completed is a reset
            (Completed, Draft)
        )
    }

    /// Check if dispatch work may still happen without a reset.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Sending | Self::Paused)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Sending => "sending",
            Self::Paused => "paused",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Campaign configuration, snapshotted at creation and immutable once the
/// campaign starts sending. Fields irrelevant to the selected mode are
/// stored but ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub subject: String,
    pub body: String,
    pub mode: SendMode,
    pub batch_size: usize,
    pub drip_rate: usize,
    pub drip_interval: DripInterval,
}

impl CampaignConfig {
    /// Number of pending recipients one activation processes.
    pub fn chunk_size(&self, pending: usize) -> usize {
        match self.mode {
            SendMode::Bulk => pending,
            SendMode::Batch => self.batch_size.min(pending),
            SendMode::Drip => self.drip_rate.min(pending),
        }
    }

    /// Human-readable send-mode summary for the listing surface.
    pub fn mode_summary(&self) -> String {
        match self.mode {
            SendMode::Bulk => "bulk".to_string(),
            SendMode::Batch => format!("batch ({} per batch)", self.batch_size),
            SendMode::Drip => format!("drip ({} per {})", self.drip_rate, self.drip_interval),
        }
    }
}

/// A campaign: configuration snapshot, recipient snapshot, outcome ledger,
/// and lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub config: CampaignConfig,
    pub recipients: RecipientTable,
    pub ledger: OutcomeLedger,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Create a draft campaign from a configuration and recipient snapshot.
    pub fn new(config: CampaignConfig, recipients: RecipientTable) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            recipients,
            ledger: OutcomeLedger::new(),
            status: CampaignStatus::Draft,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Guarded status transition; maintains the lifecycle timestamps.
    pub fn transition_to(&mut self, target: CampaignStatus) -> Result<(), DispatchError> {
        if !self.status.can_transition_to(target) {
            return Err(DispatchError::InvalidTransition {
                id: self.id,
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }

        self.status = target;
        match target {
            CampaignStatus::Sending if self.started_at.is_none() => {
                self.started_at = Some(Utc::now());
            }
            CampaignStatus::Completed => {
                self.completed_at = Some(Utc::now());
            }
            CampaignStatus::Draft => {
                self.started_at = None;
                self.completed_at = None;
            }
            _ => {}
        }

        Ok(())
    }

    /// Replace the configuration. Only permitted while the campaign is a
    /// draft.
    pub fn update_config(&mut self, config: CampaignConfig) -> Result<(), DispatchError> {
        if self.status != CampaignStatus::Draft {
            return Err(DispatchError::ConfigLocked {
                id: self.id,
                status: self.status.to_string(),
            });
        }
        self.config = config;
        Ok(())
    }

    /// Recipients without a recorded outcome, in table order. Recipients
    /// lacking an identity key are never pending (start validation rejects
    /// them before any activation runs).
    pub fn pending(&self) -> Vec<&Recipient> {
        self.recipients
            .iter()
            .filter(|r| match r.identity_key() {
                Some(key) => !self.ledger.contains(key),
                None => false,
            })
            .collect()
    }

    pub fn total_recipients(&self) -> usize {
        self.recipients.len()
    }

    /// Whether every recipient has a terminal outcome.
    pub fn is_fully_accounted(&self) -> bool {
        self.ledger.counts().accounted() == self.total_recipients()
    }

    /// Read-only listing projection.
    pub fn summary(&self) -> CampaignSummary {
        let LedgerCounts { sent, errored } = self.ledger.counts();
        let total = self.total_recipients();
        CampaignSummary {
            id: self.id,
            subject: self.config.subject.clone(),
            status: self.status,
            total_recipients: total,
            sent,
            errored,
            success_rate: success_rate(sent, total),
            mode_summary: self.config.mode_summary(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Read-only projection of one campaign for the listing surface.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub subject: String,
    pub status: CampaignStatus,
    pub total_recipients: usize,
    pub sent: usize,
    pub errored: usize,
    /// `round(sent / total * 100)`, `0` when the campaign has no recipients.
    pub success_rate: u32,
    pub mode_summary: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn success_rate(sent: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (sent as f64 / total as f64 * 100.0).round() as u32
}
