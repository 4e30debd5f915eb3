use std::time::Instant;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::{RoundId, RoundStateEntity, RoundStatusEntity},
    i18n::Text,
};

/// Part count used until a round is started with an explicit one.
pub const DEFAULT_PART_COUNT: u32 = 2;

/// Lifecycle status of the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    /// No round is running; a new one can be started.
    Idle,
    /// Participants can submit entries.
    Active,
    /// Submissions are closed; the round waits for publication or reset.
    Stopped,
}

/// Complete round state as owned by the state machine.
///
/// `round_id` is set exactly when the status is not [`RoundStatus::Idle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub status: RoundStatus,
    pub round_id: Option<RoundId>,
    pub part_count: u32,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            status: RoundStatus::Idle,
            round_id: None,
            part_count: DEFAULT_PART_COUNT,
        }
    }
}

impl RoundState {
    /// Identifier of the round accepting submissions, if any.
    pub fn active_round(&self) -> Option<RoundId> {
        match self.status {
            RoundStatus::Active => self.round_id,
            _ => None,
        }
    }

    /// Identifier of the current round, whether active or stopped.
    pub fn open_round(&self) -> Option<RoundId> {
        match self.status {
            RoundStatus::Idle => None,
            _ => self.round_id,
        }
    }

    fn idle(part_count: u32) -> Self {
        Self {
            status: RoundStatus::Idle,
            round_id: None,
            part_count,
        }
    }
}

impl From<RoundStateEntity> for RoundState {
    fn from(value: RoundStateEntity) -> Self {
        let part_count = if value.part_count > 0 {
            value.part_count
        } else {
            DEFAULT_PART_COUNT
        };
        let status = match value.status {
            RoundStatusEntity::Idle => RoundStatus::Idle,
            RoundStatusEntity::Active => RoundStatus::Active,
            RoundStatusEntity::Stopped => RoundStatus::Stopped,
        };

        match (status, value.round_id) {
            (RoundStatus::Idle, _) => Self::idle(part_count),
            (status, Some(round_id)) => Self {
                status,
                round_id: Some(round_id),
                part_count,
            },
            (status, None) => {
                warn!(?status, "persisted round has no identifier; treating as idle");
                Self::idle(part_count)
            }
        }
    }
}

impl From<&RoundState> for RoundStateEntity {
    fn from(value: &RoundState) -> Self {
        Self {
            status: match value.status {
                RoundStatus::Idle => RoundStatusEntity::Idle,
                RoundStatus::Active => RoundStatusEntity::Active,
                RoundStatus::Stopped => RoundStatusEntity::Stopped,
            },
            round_id: value.round_id,
            part_count: value.part_count,
        }
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Moderator starts a round; `parts` is `None` when no valid count was given.
    Start { parts: Option<u32> },
    /// Moderator closes submissions.
    Stop,
    /// Moderator discards a stopped round.
    Reset,
    /// Moderator discards a round whatever its status.
    ForceReset,
    /// Moderator publishes the compilation of a stopped round.
    Publish,
}

/// Reason a moderator command is refused. The round state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("a positive part count is required")]
    SpecifyParts,
    #[error("no round is open")]
    NoActiveChallenge,
    #[error("a round is already active")]
    AlreadyStarted,
    #[error("the stopped round must be published or reset first")]
    NotPublished,
    #[error("the round is already stopped")]
    AlreadyStopped,
    #[error("an active round requires a forced reset")]
    ResetRequiresForce,
    #[error("the round must be stopped before publishing")]
    StopFirst,
}

impl Rejection {
    /// Moderator-facing explanation.
    pub fn text(&self) -> Text {
        match self {
            Rejection::SpecifyParts => Text::SpecifyParts,
            Rejection::NoActiveChallenge => Text::NoActiveChallenge,
            Rejection::AlreadyStarted => Text::AlreadyStarted,
            Rejection::NotPublished => Text::NotPublished,
            Rejection::AlreadyStopped => Text::AlreadyStopped,
            Rejection::ResetRequiresForce => Text::ResetActiveChallenge,
            Rejection::StopFirst => Text::StopFirst,
        }
    }
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?} ({reason})")]
pub struct InvalidTransition {
    /// The status the state machine was in when the event was received.
    pub from: RoundStatus,
    /// The event that cannot be applied from this status.
    pub event: RoundEvent,
    /// Why the event was refused.
    pub reason: Rejection,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current status.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// Round state changed since the plan was created.
    StateMismatch {
        /// State when plan was created.
        expected: RoundState,
        /// Current state.
        actual: RoundState,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// State the machine is currently in.
    pub from: RoundState,
    /// State the machine will transition to.
    pub to: RoundState,
    /// Event that triggered this transition.
    pub event: RoundEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Owner of the round state. Transitions are planned, persisted by the caller, then applied.
#[derive(Debug, Clone, Default)]
pub struct ChallengeStateMachine {
    state: RoundState,
    version: usize,
    pending: Option<Plan>,
}

impl ChallengeStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state machine resuming from a persisted state.
    pub fn resume(state: RoundState) -> Self {
        Self {
            state,
            version: 0,
            pending: None,
        }
    }

    /// Inspect the current round state.
    pub fn state(&self) -> RoundState {
        self.state.clone()
    }

    /// Whether a planned transition is still waiting for `apply` or `abort`.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending plan and take `state` as the current state.
    ///
    /// Used when a transition was interrupted and the persisted state is the
    /// only reliable reference.
    pub fn recover(&mut self, state: RoundState) -> Option<Plan> {
        let interrupted = self.pending.take();
        self.state = state;
        self.version += 1;
        interrupted
    }

    /// Plan a transition by validating that the event can be applied from the current state.
    pub fn plan(&mut self, event: RoundEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.state.clone(),
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, returning the new state.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RoundState, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.state != plan.from {
            return Err(ApplyError::StateMismatch {
                expected: plan.from,
                actual: self.state.clone(),
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.state = plan.to;
        self.version = plan.version_next;

        Ok(self.state.clone())
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute the next state for an event, or the reason it is refused.
    fn compute_transition(&self, event: RoundEvent) -> Result<RoundState, InvalidTransition> {
        let current = &self.state;
        let reject = |reason| InvalidTransition {
            from: current.status,
            event,
            reason,
        };

        let next = match (current.status, event) {
            (RoundStatus::Idle, RoundEvent::Start { parts: Some(parts) }) => RoundState {
                status: RoundStatus::Active,
                round_id: Some(Uuid::now_v7()),
                part_count: parts,
            },
            (RoundStatus::Idle, RoundEvent::Start { parts: None }) => {
                return Err(reject(Rejection::SpecifyParts));
            }
            (RoundStatus::Idle, _) => return Err(reject(Rejection::NoActiveChallenge)),

            (RoundStatus::Active, RoundEvent::Start { .. }) => {
                return Err(reject(Rejection::AlreadyStarted));
            }
            (RoundStatus::Active, RoundEvent::Stop) => RoundState {
                status: RoundStatus::Stopped,
                ..current.clone()
            },
            (RoundStatus::Active, RoundEvent::Reset) => {
                return Err(reject(Rejection::ResetRequiresForce));
            }
            (RoundStatus::Active, RoundEvent::Publish) => {
                return Err(reject(Rejection::StopFirst));
            }

            (RoundStatus::Stopped, RoundEvent::Start { .. }) => {
                return Err(reject(Rejection::NotPublished));
            }
            (RoundStatus::Stopped, RoundEvent::Stop) => {
                return Err(reject(Rejection::AlreadyStopped));
            }
            (RoundStatus::Stopped, RoundEvent::Reset | RoundEvent::Publish)
            | (RoundStatus::Active, RoundEvent::ForceReset)
            | (RoundStatus::Stopped, RoundEvent::ForceReset) => {
                RoundState::idle(current.part_count)
            }
        };

        Ok(next)
    }
}
