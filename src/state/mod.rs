pub mod command;
pub mod state_machine;

use std::{future::Future, sync::Arc};

use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use tracing::{info, warn};

use crate::{
    chat::ChatGateway,
    config::ChannelConfig,
    dao::{challenge_store::ChallengeStore, models::RoundStateEntity},
    error::ServiceError,
    i18n::{Text, TextResolver},
};

pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId};
use self::state_machine::{ChallengeStateMachine, RoundEvent, RoundState};

pub type SharedState = Arc<AppState>;

/// Central application state: collaborators, channel configuration and the round state machine.
pub struct AppState {
    store: Arc<dyn ChallengeStore>,
    chat: Arc<dyn ChatGateway>,
    texts: Arc<dyn TextResolver>,
    channels: ChannelConfig,
    relay_token: String,
    machine: RwLock<ChallengeStateMachine>,
    degraded: watch::Sender<bool>,
    transition_gate: Mutex<()>,
    event_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`], resuming from `round`.
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        chat: Arc<dyn ChatGateway>,
        texts: Arc<dyn TextResolver>,
        channels: ChannelConfig,
        relay_token: String,
        round: RoundState,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            store,
            chat,
            texts,
            channels,
            relay_token,
            machine: RwLock::new(ChallengeStateMachine::resume(round)),
            degraded: degraded_tx,
            transition_gate: Mutex::new(()),
            event_gate: Mutex::new(()),
        })
    }

    /// Load the persisted round state, defaulting to idle when none was ever saved.
    pub async fn load_round(store: &dyn ChallengeStore) -> Result<RoundState, ServiceError> {
        match store.load_round().await? {
            Some(entity) => {
                let round = RoundState::from(entity);
                info!(status = ?round.status, round_id = ?round.round_id, "resuming round state");
                Ok(round)
            }
            None => {
                info!("no persisted round state; starting idle");
                Ok(RoundState::default())
            }
        }
    }

    pub fn store(&self) -> &Arc<dyn ChallengeStore> {
        &self.store
    }

    pub fn chat(&self) -> &Arc<dyn ChatGateway> {
        &self.chat
    }

    pub fn channels(&self) -> &ChannelConfig {
        &self.channels
    }

    /// Shared secret expected from the chat relay on inbound events.
    pub fn relay_token(&self) -> &str {
        &self.relay_token
    }

    /// Render a text in the configured locale.
    pub fn text(&self, text: Text) -> String {
        self.texts.resolve(text)
    }

    /// Snapshot of the current round state.
    pub async fn round(&self) -> RoundState {
        self.machine.read().await.state()
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Serialize inbound event handling; the guard must be held for a whole event.
    pub async fn lock_events(&self) -> MutexGuard<'_, ()> {
        self.event_gate.lock().await
    }

    /// Clear a plan left behind by a transition whose future was dropped.
    ///
    /// The interrupted transition may have persisted its target before being
    /// dropped, so the in-memory state is reloaded from the store.
    async fn recover_interrupted_transition(&self) -> Result<(), ServiceError> {
        let persisted = Self::load_round(self.store.as_ref()).await?;
        let mut sm = self.machine.write().await;
        if let Some(plan) = sm.recover(persisted) {
            warn!(
                event = ?plan.event,
                plan_id = %plan.id,
                pending_for = ?plan.pending_since.elapsed(),
                status = ?sm.state().status,
                "discarded interrupted transition; round state reloaded from store"
            );
        }
        Ok(())
    }

    async fn plan_transition(&self, event: RoundEvent) -> Result<Plan, PlanError> {
        let mut sm = self.machine.write().await;
        sm.plan(event)
    }

    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<RoundState, ApplyError> {
        let mut sm = self.machine.write().await;
        sm.apply(plan_id)
    }

    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.machine.write().await;
        sm.abort(plan_id)
    }

    /// Plan `event`, run `work` against the plan, persist the target state and apply it.
    ///
    /// When `work` or the persistence fails the plan is aborted and the in-memory
    /// state stays as it was, matching what is stored.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: RoundEvent,
        work: F,
    ) -> Result<(T, RoundState), ServiceError>
    where
        F: FnOnce(Plan) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        // Holding the gate, a pending plan can only come from a dropped transition.
        if self.machine.read().await.has_pending() {
            self.recover_interrupted_transition().await?;
        }
        let plan = self.plan_transition(event).await?;
        let plan_id = plan.id;
        let target = RoundStateEntity::from(&plan.to);

        let outcome = match work(plan).await {
            Ok(value) => self
                .store
                .save_round(target)
                .await
                .map(|()| value)
                .map_err(ServiceError::from),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}
