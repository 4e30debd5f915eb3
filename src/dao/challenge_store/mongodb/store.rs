use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::connect_challenge_db,
    error::{MongoDaoError, MongoResult},
    models::{
        ENTRY_COLLECTION_NAME, MongoEntryDocument, MongoProgressDocument, MongoRoundDocument,
        PROGRESS_COLLECTION_NAME, STATE_COLLECTION_NAME, STATE_DOCUMENT_ID,
    },
};
use crate::dao::{
    challenge_store::ChallengeStore,
    models::{EntryEntity, EntryKey, MessageRef, ProgressEntity, RoundId, RoundStateEntity},
    storage::StorageResult,
};

#[derive(Clone)]
pub struct MongoChallengeStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = connect_challenge_db(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn progress_filter(round_id: RoundId, participant_id: &str) -> Document {
    doc! { "round_id": round_id.to_string(), "participant_id": participant_id }
}

fn entry_filter(key: &EntryKey) -> Document {
    doc! {
        "round_id": key.round_id.to_string(),
        "participant_id": key.participant_id.as_str(),
        "part": i64::from(key.part),
    }
}

impl MongoChallengeStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = connect_challenge_db(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let progress_index = IndexModel::builder()
            .keys(doc! {"round_id": 1, "participant_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("progress_round_participant_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        self.progress_collection()
            .await
            .create_index(progress_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PROGRESS_COLLECTION_NAME,
                index: "round_id,participant_id",
                source,
            })?;

        let entry_index = IndexModel::builder()
            .keys(doc! {"round_id": 1, "participant_id": 1, "part": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("entry_key_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        let message_index = IndexModel::builder()
            .keys(doc! {"message_ref": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("entry_message_ref_idx".to_owned()))
                    .build(),
            )
            .build();

        let entries = self.entry_collection().await;
        entries
            .create_index(entry_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ENTRY_COLLECTION_NAME,
                index: "round_id,participant_id,part",
                source,
            })?;
        entries
            .create_index(message_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ENTRY_COLLECTION_NAME,
                index: "message_ref",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn state_collection(&self) -> Collection<MongoRoundDocument> {
        self.database()
            .await
            .collection::<MongoRoundDocument>(STATE_COLLECTION_NAME)
    }

    async fn progress_collection(&self) -> Collection<MongoProgressDocument> {
        self.database()
            .await
            .collection::<MongoProgressDocument>(PROGRESS_COLLECTION_NAME)
    }

    async fn entry_collection(&self) -> Collection<MongoEntryDocument> {
        self.database()
            .await
            .collection::<MongoEntryDocument>(ENTRY_COLLECTION_NAME)
    }

    async fn load_round(&self) -> MongoResult<Option<RoundStateEntity>> {
        let document = self
            .state_collection()
            .await
            .find_one(doc! {"_id": STATE_DOCUMENT_ID})
            .await
            .map_err(|source| MongoDaoError::LoadRound { source })?;

        document.map(RoundStateEntity::try_from).transpose()
    }

    async fn save_round(&self, round: RoundStateEntity) -> MongoResult<()> {
        let document: MongoRoundDocument = round.into();
        self.state_collection()
            .await
            .replace_one(doc! {"_id": STATE_DOCUMENT_ID}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRound { source })?;
        Ok(())
    }

    async fn find_progress(
        &self,
        round_id: RoundId,
        participant_id: String,
    ) -> MongoResult<Option<ProgressEntity>> {
        let document = self
            .progress_collection()
            .await
            .find_one(progress_filter(round_id, &participant_id))
            .await
            .map_err(|source| MongoDaoError::LoadProgress {
                participant_id,
                source,
            })?;

        document.map(ProgressEntity::try_from).transpose()
    }

    async fn save_progress(&self, progress: ProgressEntity) -> MongoResult<()> {
        let filter = progress_filter(progress.round_id, &progress.participant_id);
        let participant_id = progress.participant_id.clone();
        let document: MongoProgressDocument = progress.into();
        self.progress_collection()
            .await
            .replace_one(filter, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveProgress {
                participant_id,
                source,
            })?;
        Ok(())
    }

    async fn save_entry(&self, entry: EntryEntity) -> MongoResult<()> {
        let key = entry.key();
        let update = doc! {
            "$set": {
                "content": entry.content,
                "submitted_at": DateTime::from_system_time(entry.submitted_at),
                "display_name": entry.display_name,
            },
            "$setOnInsert": { "removed": false },
        };

        self.entry_collection()
            .await
            .update_one(entry_filter(&key), update)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveEntry {
                participant_id: key.participant_id.clone(),
                part: key.part,
                source,
            })?;
        Ok(())
    }

    async fn list_entries(&self, filter: Document, sort: Document) -> MongoResult<Vec<EntryEntity>> {
        let documents: Vec<MongoEntryDocument> = self
            .entry_collection()
            .await
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::ListEntries { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListEntries { source })?;

        documents.into_iter().map(EntryEntity::try_from).collect()
    }

    async fn set_entry_message_ref(&self, key: EntryKey, message_ref: MessageRef) -> MongoResult<()> {
        self.entry_collection()
            .await
            .update_one(
                entry_filter(&key),
                doc! {"$set": {"message_ref": message_ref}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateEntry { source })?;
        Ok(())
    }

    async fn mark_removed(&self, message_ref: MessageRef) -> MongoResult<bool> {
        let result = self
            .entry_collection()
            .await
            .update_one(
                doc! {"message_ref": message_ref},
                doc! {"$set": {"removed": true}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateEntry { source })?;
        Ok(result.matched_count > 0)
    }

    async fn count_submitters(&self, round_id: RoundId) -> MongoResult<u64> {
        let participants = self
            .entry_collection()
            .await
            .distinct("participant_id", doc! {"round_id": round_id.to_string()})
            .await
            .map_err(|source| MongoDaoError::ListEntries { source })?;
        debug!(%round_id, count = participants.len(), "counted distinct submitters");
        Ok(participants.len() as u64)
    }
}

impl ChallengeStore for MongoChallengeStore {
    fn load_round(&self) -> BoxFuture<'static, StorageResult<Option<RoundStateEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_round().await.map_err(Into::into) })
    }

    fn save_round(&self, round: RoundStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_round(round).await.map_err(Into::into) })
    }

    fn find_progress(
        &self,
        round_id: RoundId,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ProgressEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_progress(round_id, participant_id)
                .await
                .map_err(Into::into)
        })
    }

    fn save_progress(&self, progress: ProgressEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_progress(progress).await.map_err(Into::into) })
    }

    fn save_entry(&self, entry: EntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_entry(entry).await.map_err(Into::into) })
    }

    fn list_part_entries(
        &self,
        round_id: RoundId,
        part: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<EntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_entries(
                    doc! {"round_id": round_id.to_string(), "part": i64::from(part)},
                    doc! {"submitted_at": 1, "participant_id": 1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn list_participant_entries(
        &self,
        round_id: RoundId,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<EntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_entries(progress_filter(round_id, &participant_id), doc! {"part": 1})
                .await
                .map_err(Into::into)
        })
    }

    fn set_entry_message_ref(
        &self,
        key: EntryKey,
        message_ref: MessageRef,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_entry_message_ref(key, message_ref)
                .await
                .map_err(Into::into)
        })
    }

    fn mark_removed(&self, message_ref: MessageRef) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.mark_removed(message_ref).await.map_err(Into::into) })
    }

    fn count_submitters(&self, round_id: RoundId) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_submitters(round_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
