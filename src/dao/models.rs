use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Identifier of a challenge round. Generated as a time-ordered UUID on activation.
pub type RoundId = Uuid;

/// Opaque reference to a message posted through the chat gateway.
pub type MessageRef = String;

/// Lifecycle status of the challenge, as persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatusEntity {
    /// No round is running.
    #[default]
    Idle,
    /// Participants can submit.
    Active,
    /// Submissions closed, waiting for publication or reset.
    Stopped,
}

/// Singleton round state record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundStateEntity {
    /// Current lifecycle status.
    pub status: RoundStatusEntity,
    /// Identifier of the running round, absent while idle.
    pub round_id: Option<RoundId>,
    /// Number of ordered parts each submission is made of.
    pub part_count: u32,
}

/// Progress of one participant through the parts of a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEntity {
    /// Round the progress belongs to.
    pub round_id: RoundId,
    /// Chat identifier of the participant.
    pub participant_id: String,
    /// Part currently expected from the participant; 0 when not submitting.
    pub current_part: u32,
    /// Display name captured when the participant started submitting.
    pub display_name: String,
}

/// Natural key of an entry: one per participant, round and part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    /// Round the entry belongs to.
    pub round_id: RoundId,
    /// Chat identifier of the author.
    pub participant_id: String,
    /// Part number, starting at 1.
    pub part: u32,
}

/// One submitted part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryEntity {
    /// Round the entry belongs to.
    pub round_id: RoundId,
    /// Chat identifier of the author.
    pub participant_id: String,
    /// Part number, starting at 1.
    pub part: u32,
    /// Submitted text, kept verbatim.
    pub content: String,
    /// Time of the last write of this entry.
    pub submitted_at: SystemTime,
    /// Author display name at submission time.
    pub display_name: String,
    /// Set once the moderator deleted the reviewed copy of this entry.
    #[serde(default)]
    pub removed: bool,
    /// Reference of the moderation review message showing this entry.
    #[serde(default)]
    pub message_ref: Option<MessageRef>,
}

impl EntryEntity {
    /// Natural key of this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey {
            round_id: self.round_id,
            participant_id: self.participant_id.clone(),
            part: self.part,
        }
    }
}
