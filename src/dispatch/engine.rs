//! Dispatch engine — campaign lifecycle and activation processing.
//!
//! One engine serves many campaigns. Per-campaign work is serialized by an
//! activation guard; distinct campaigns share no mutable state beyond the
//! store itself. Drip continuations are plain spawned timers whose handles
//! the engine owns, so pause can cancel them instead of hoping a flag is
//! checked somewhere downstream.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::campaign::ledger::Outcome;
use crate::campaign::model::{CampaignConfig, CampaignStatus, SendMode};
use crate::campaign::store::CampaignStore;
use crate::compose::{self, ComposeSession};
use crate::config::EngineConfig;
use crate::delivery::Delivery;
use crate::error::{DispatchError, Result, StoreError};
use crate::template;

/// Result of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationReport {
    /// Recipients processed in this chunk.
    pub processed: usize,
    /// Successful deliveries in this chunk.
    pub sent: usize,
    /// Failed deliveries in this chunk.
    pub errored: usize,
    /// Campaign status after the activation.
    pub status: CampaignStatus,
}

/// Orchestrates campaign lifecycle: start, pause, resume, reset, and the
/// activation algorithm that processes pending recipients chunk by chunk.
pub struct DispatchEngine {
    store: Arc<CampaignStore>,
    delivery: Arc<dyn Delivery>,
    config: EngineConfig,
    /// Per-campaign activation guards; at most one activation per campaign.
    activation_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    /// Pending drip continuations, abortable on pause.
    drip_timers: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    /// Self-handle for the continuation tasks the engine spawns.
    me: Weak<DispatchEngine>,
}

impl DispatchEngine {
    /// Create an engine over a store and a delivery transport.
    pub fn new(
        store: Arc<CampaignStore>,
        delivery: Arc<dyn Delivery>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            store,
            delivery,
            config,
            activation_locks: Mutex::new(HashMap::new()),
            drip_timers: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// The campaign store this engine dispatches from.
    pub fn store(&self) -> &Arc<CampaignStore> {
        &self.store
    }

    /// Create a draft campaign from a compose session snapshot.
    pub async fn create(&self, session: &ComposeSession) -> Uuid {
        self.store
            .create(session.config(), session.recipients.clone())
            .await
    }

    /// Create a campaign from the session and start it immediately.
    ///
    /// Validation runs before anything is created, so a failed launch leaves
    /// no campaign behind.
    pub async fn launch(&self, session: &ComposeSession) -> Result<(Uuid, ActivationReport)> {
        session.validate()?;
        let id = self.create(session).await;
        let report = self.start(id).await?;
        Ok((id, report))
    }

    /// Start a draft campaign: check the start preconditions, transition to
    /// sending, and run the first activation synchronously.
    pub async fn start(&self, id: Uuid) -> Result<ActivationReport> {
        self.store
            .update(id, |c| -> Result<()> {
                compose::validate(&c.config.subject, &c.config.body, &c.recipients)?;
                c.transition_to(CampaignStatus::Sending)?;
                Ok(())
            })
            .await??;

        info!(campaign_id = %id, "Campaign started");
        self.activate(id).await
    }

    /// Run one activation: process the next chunk of pending recipients,
    /// record outcomes, complete the campaign when everyone is accounted,
    /// and schedule the next drip continuation if applicable.
    ///
    /// Fails with `ActivationInProgress` when another activation holds this
    /// campaign and with `NotSending` unless the campaign is sending; an
    /// already-completed campaign is an idempotent no-op instead.
    pub async fn activate(&self, id: Uuid) -> Result<ActivationReport> {
        let guard_slot = self.activation_lock(id).await;
        let _guard = guard_slot
            .try_lock()
            .map_err(|_| DispatchError::ActivationInProgress { id })?;

        let campaign = self.store.get(id).await.ok_or(StoreError::NotFound { id })?;
        match campaign.status {
            CampaignStatus::Sending => {}
            CampaignStatus::Completed => {
                return Ok(ActivationReport {
                    processed: 0,
                    sent: 0,
                    errored: 0,
                    status: CampaignStatus::Completed,
                });
            }
            status => {
                return Err(DispatchError::NotSending {
                    id,
                    status: status.to_string(),
                }
                .into());
            }
        }

        let pending = campaign.pending();
        let chunk = campaign.config.chunk_size(pending.len());
        debug!(campaign_id = %id, pending = pending.len(), chunk, "Activation running");

        let mut sent = 0usize;
        let mut errored = 0usize;
        for recipient in pending.into_iter().take(chunk) {
            let Some(key) = recipient.identity_key() else {
                continue;
            };

            let subject = template::render(&campaign.config.subject, recipient);
            let body =
                template::render_body(&campaign.config.body, &campaign.recipients, recipient);

            let delivered = tokio::time::timeout(
                self.config.delivery_timeout,
                self.delivery.deliver(&subject, &body, key),
            )
            .await;

            let outcome = match delivered {
                Ok(Ok(())) => Outcome::Sent,
                Ok(Err(failure)) => Outcome::Errored(failure.detail),
                Err(_) => Outcome::Errored(format!(
                    "Delivery timed out after {:?}",
                    self.config.delivery_timeout
                )),
            };

            match &outcome {
                Outcome::Sent => {
                    sent += 1;
                    debug!(campaign_id = %id, recipient = %key, "Delivered");
                }
                Outcome::Errored(detail) => {
                    errored += 1;
                    warn!(campaign_id = %id, recipient = %key, error = %detail, "Delivery failed");
                }
            }

            self.store
                .update(id, |c| c.ledger.record(key, outcome))
                .await??;
        }

        // Completion is evaluated while the campaign is still sending; a
        // pause that landed mid-chunk wins, and the campaign completes on
        // the next activation instead.
        let status = self
            .store
            .update(id, |c| -> std::result::Result<CampaignStatus, DispatchError> {
                if c.status == CampaignStatus::Sending && c.is_fully_accounted() {
                    c.transition_to(CampaignStatus::Completed)?;
                }
                Ok(c.status)
            })
            .await??;

        if status == CampaignStatus::Completed {
            info!(campaign_id = %id, sent, errored, "Campaign completed");
        } else if campaign.config.mode == SendMode::Drip && status == CampaignStatus::Sending {
            let delay = self.config.interval(campaign.config.drip_interval);
            // Await the continuation scheduler through a boxed `dyn Future +
            // Send` so this future does not inline `schedule_drip`'s opaque
            // type. That breaks the auto-trait cycle `activate ->
            // schedule_drip -> tokio::spawn -> activate`, which otherwise
            // leaves the spawned continuation un-provably `Send`.
            let schedule: std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> =
                Box::pin(self.schedule_drip(id, delay));
            schedule.await;
        }

        Ok(ActivationReport {
            processed: chunk,
            sent,
            errored,
            status,
        })
    }

    /// Pause a sending campaign and cancel any pending drip continuation.
    pub async fn pause(&self, id: Uuid) -> Result<()> {
        self.cancel_drip_timer(id).await;
        self.store
            .update(id, |c| c.transition_to(CampaignStatus::Paused))
            .await??;
        info!(campaign_id = %id, "Campaign paused");
        Ok(())
    }

    /// Resume a paused campaign. Status change only: no activation runs and
    /// no drip timer is re-armed; triggering the next activation is the
    /// caller's decision.
    pub async fn resume(&self, id: Uuid) -> Result<()> {
        self.store
            .update(id, |c| c.transition_to(CampaignStatus::Sending))
            .await??;
        info!(campaign_id = %id, "Campaign resumed");
        Ok(())
    }

    /// Reset a paused or completed campaign to a clean draft: the outcome
    /// ledger is cleared (successes included) and the lifecycle timestamps
    /// are dropped. The campaign itself stays in the store.
    pub async fn reset(&self, id: Uuid) -> Result<()> {
        self.store
            .update(id, |c| -> std::result::Result<(), DispatchError> {
                c.transition_to(CampaignStatus::Draft)?;
                c.ledger.clear();
                Ok(())
            })
            .await??;
        self.cancel_drip_timer(id).await;
        info!(campaign_id = %id, "Campaign reset to draft");
        Ok(())
    }

    /// Remove a campaign entirely, cancelling any scheduled work. Removing
    /// an unknown id is a no-op.
    pub async fn delete(&self, id: Uuid) {
        self.cancel_drip_timer(id).await;
        self.activation_locks.lock().await.remove(&id);
        self.store.delete(id).await;
    }

    /// Replace a draft campaign's configuration.
    pub async fn update_config(&self, id: Uuid, config: CampaignConfig) -> Result<()> {
        self.store.update(id, |c| c.update_config(config)).await??;
        Ok(())
    }

    /// Schedule exactly one future activation after `delay`.
    async fn schedule_drip(&self, id: Uuid, delay: Duration) {
        // The engine is always behind an Arc (see `new`); if it is being
        // dropped there is nothing left to continue.
        let Some(engine) = self.me.upgrade() else {
            return;
        };

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Drop our own handle entry before running, so the activation's
            // own rescheduling does not abort the task it runs inside.
            engine.drip_timers.lock().await.remove(&id);

            // Await the activation through a free-function helper that boxes
            // it into a `dyn Future + Send`. Performing the coercion outside
            // the mutually-recursive `activate`/`schedule_drip` defining
            // scope lets the compiler observe that the activation is `Send`.
            match boxed_activation(Arc::clone(&engine), id).await {
                Ok(report) => {
                    debug!(
                        campaign_id = %id,
                        processed = report.processed,
                        status = %report.status,
                        "Drip continuation ran"
                    );
                }
                Err(e) => {
                    warn!(campaign_id = %id, error = %e, "Drip continuation skipped");
                }
            }
        });

        let mut timers = self.drip_timers.lock().await;
        if let Some(stale) = timers.insert(id, handle) {
            stale.abort();
        }
        drop(timers);

        debug!(campaign_id = %id, delay_ms = delay.as_millis() as u64, "Drip continuation scheduled");
    }

    /// Abort the pending drip continuation for a campaign, if any.
    async fn cancel_drip_timer(&self, id: Uuid) {
        if let Some(handle) = self.drip_timers.lock().await.remove(&id) {
            handle.abort();
            debug!(campaign_id = %id, "Pending drip continuation cancelled");
        }
    }

    /// Fetch or create the activation guard for a campaign.
    async fn activation_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.activation_locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }
}

/// Box an `activate` call into a `dyn Future + Send`.
///
/// Defined as a free function so the coercion happens outside the
/// mutually-recursive `activate`/`schedule_drip` opaque-type defining
/// scope; only from here can the compiler confirm the activation future is
/// `Send` and hand it to `tokio::spawn`.
fn boxed_activation(
    engine: Arc<DispatchEngine>,
    id: Uuid,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<ActivationReport>> + Send>> {
    Box::pin(async move { engine.activate(id).await })
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
