//! Process-local store used when no database is configured, and by the test-suite.

use std::{
    collections::HashSet,
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use super::{ChallengeStore, sort_by_arrival};
use crate::dao::{
    models::{EntryEntity, EntryKey, MessageRef, ProgressEntity, RoundId, RoundStateEntity},
    storage::{StorageError, StorageResult},
};

#[derive(Clone, Default)]
pub struct MemoryChallengeStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    round: RwLock<Option<RoundStateEntity>>,
    progress: DashMap<(RoundId, String), ProgressEntity>,
    entries: DashMap<EntryKey, EntryEntity>,
    unavailable: AtomicBool,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails until switched back.
    #[cfg(test)]
    pub fn set_unavailable(&self, value: bool) {
        self.inner.unavailable.store(value, Ordering::SeqCst);
    }

    /// Snapshot of every stored entry, in no particular order.
    #[cfg(test)]
    pub fn all_entries(&self) -> Vec<EntryEntity> {
        self.inner
            .entries
            .iter()
            .map(|item| item.value().clone())
            .collect()
    }
}

impl MemoryInner {
    fn ensure_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "in-memory store switched off".into(),
                io::Error::new(io::ErrorKind::NotConnected, "store offline"),
            ));
        }
        Ok(())
    }
}

impl ChallengeStore for MemoryChallengeStore {
    fn load_round(&self) -> BoxFuture<'static, StorageResult<Option<RoundStateEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            Ok(inner.round.read().await.clone())
        })
    }

    fn save_round(&self, round: RoundStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            *inner.round.write().await = Some(round);
            Ok(())
        })
    }

    fn find_progress(
        &self,
        round_id: RoundId,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ProgressEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            Ok(inner
                .progress
                .get(&(round_id, participant_id))
                .map(|item| item.value().clone()))
        })
    }

    fn save_progress(&self, progress: ProgressEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            inner.progress.insert(
                (progress.round_id, progress.participant_id.clone()),
                progress,
            );
            Ok(())
        })
    }

    fn save_entry(&self, entry: EntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            inner
                .entries
                .entry(entry.key())
                .and_modify(|existing| {
                    existing.content = entry.content.clone();
                    existing.submitted_at = entry.submitted_at;
                    existing.display_name = entry.display_name.clone();
                })
                .or_insert(entry);
            Ok(())
        })
    }

    fn list_part_entries(
        &self,
        round_id: RoundId,
        part: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<EntryEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            let mut entries = inner
                .entries
                .iter()
                .filter(|item| item.round_id == round_id && item.part == part)
                .map(|item| item.value().clone())
                .collect::<Vec<_>>();
            sort_by_arrival(&mut entries);
            Ok(entries)
        })
    }

    fn list_participant_entries(
        &self,
        round_id: RoundId,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<EntryEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            let mut entries = inner
                .entries
                .iter()
                .filter(|item| item.round_id == round_id && item.participant_id == participant_id)
                .map(|item| item.value().clone())
                .collect::<Vec<_>>();
            entries.sort_by_key(|entry| entry.part);
            Ok(entries)
        })
    }

    fn set_entry_message_ref(
        &self,
        key: EntryKey,
        message_ref: MessageRef,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            if let Some(mut entry) = inner.entries.get_mut(&key) {
                entry.message_ref = Some(message_ref);
            }
            Ok(())
        })
    }

    fn mark_removed(&self, message_ref: MessageRef) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            let mut matched = false;
            for mut entry in inner.entries.iter_mut() {
                if entry.message_ref.as_deref() == Some(message_ref.as_str()) {
                    entry.removed = true;
                    matched = true;
                    break;
                }
            }
            Ok(matched)
        })
    }

    fn count_submitters(&self, round_id: RoundId) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.ensure_available()?;
            let submitters = inner
                .entries
                .iter()
                .filter(|item| item.round_id == round_id)
                .map(|item| item.participant_id.clone())
                .collect::<HashSet<_>>();
            Ok(submitters.len() as u64)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.ensure_available() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.ensure_available() })
    }
}
