pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    EntryEntity, EntryKey, MessageRef, ProgressEntity, RoundId, RoundStateEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

pub use memory::MemoryChallengeStore;

/// Abstraction over the persistence layer for rounds, progress and entries.
///
/// Every write is an insert-or-replace keyed by the record's natural key so
/// re-delivered events and restarts never duplicate data.
pub trait ChallengeStore: Send + Sync {
    /// Load the singleton round state, if one was ever saved.
    fn load_round(&self) -> BoxFuture<'static, StorageResult<Option<RoundStateEntity>>>;
    /// Upsert the singleton round state.
    fn save_round(&self, round: RoundStateEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Find the progress of a participant in a round.
    fn find_progress(
        &self,
        round_id: RoundId,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ProgressEntity>>>;
    /// Upsert a progress record keyed by `(round_id, participant_id)`.
    fn save_progress(&self, progress: ProgressEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Upsert an entry keyed by `(round_id, participant_id, part)`.
    ///
    /// Content, timestamp and display name are replaced; `removed` and
    /// `message_ref` of an existing entry are preserved.
    fn save_entry(&self, entry: EntryEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Entries of one part of a round in arrival order.
    fn list_part_entries(
        &self,
        round_id: RoundId,
        part: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<EntryEntity>>>;
    /// Entries of one participant in a round, ordered by part.
    fn list_participant_entries(
        &self,
        round_id: RoundId,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<EntryEntity>>>;
    /// Attach the moderation review message reference to an entry.
    fn set_entry_message_ref(
        &self,
        key: EntryKey,
        message_ref: MessageRef,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Mark the entry reviewed under `message_ref` as removed. Returns whether an entry matched.
    fn mark_removed(&self, message_ref: MessageRef) -> BoxFuture<'static, StorageResult<bool>>;
    /// Number of distinct participants with at least one entry in the round.
    fn count_submitters(&self, round_id: RoundId) -> BoxFuture<'static, StorageResult<u64>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Order entries the way they arrived, falling back to the author id for equal timestamps.
pub(crate) fn sort_by_arrival(entries: &mut [EntryEntity]) {
    entries.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
}
