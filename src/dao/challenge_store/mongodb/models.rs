use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{EntryEntity, ProgressEntity, RoundStateEntity, RoundStatusEntity};

pub const STATE_COLLECTION_NAME: &str = "state";
pub const PROGRESS_COLLECTION_NAME: &str = "users";
pub const ENTRY_COLLECTION_NAME: &str = "entries";
pub const STATE_DOCUMENT_ID: &str = "state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: String,
    status: RoundStatusEntity,
    round_id: Option<String>,
    part_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProgressDocument {
    round_id: String,
    participant_id: String,
    current_part: i64,
    display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEntryDocument {
    round_id: String,
    participant_id: String,
    part: i64,
    content: String,
    submitted_at: DateTime,
    display_name: String,
    #[serde(default)]
    removed: bool,
    #[serde(default)]
    message_ref: Option<String>,
}

impl From<RoundStateEntity> for MongoRoundDocument {
    fn from(value: RoundStateEntity) -> Self {
        Self {
            id: STATE_DOCUMENT_ID.to_owned(),
            status: value.status,
            round_id: value.round_id.map(|id| id.to_string()),
            part_count: i64::from(value.part_count),
        }
    }
}

impl TryFrom<MongoRoundDocument> for RoundStateEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRoundDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            status: value.status,
            round_id: value
                .round_id
                .as_deref()
                .map(|raw| parse_round_id(STATE_COLLECTION_NAME, raw))
                .transpose()?,
            part_count: parse_count(STATE_COLLECTION_NAME, "part_count", value.part_count)?,
        })
    }
}

impl From<ProgressEntity> for MongoProgressDocument {
    fn from(value: ProgressEntity) -> Self {
        Self {
            round_id: value.round_id.to_string(),
            participant_id: value.participant_id,
            current_part: i64::from(value.current_part),
            display_name: value.display_name,
        }
    }
}

impl TryFrom<MongoProgressDocument> for ProgressEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoProgressDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            round_id: parse_round_id(PROGRESS_COLLECTION_NAME, &value.round_id)?,
            participant_id: value.participant_id,
            current_part: parse_count(
                PROGRESS_COLLECTION_NAME,
                "current_part",
                value.current_part,
            )?,
            display_name: value.display_name,
        })
    }
}

impl TryFrom<MongoEntryDocument> for EntryEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoEntryDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            round_id: parse_round_id(ENTRY_COLLECTION_NAME, &value.round_id)?,
            participant_id: value.participant_id,
            part: parse_count(ENTRY_COLLECTION_NAME, "part", value.part)?,
            content: value.content,
            submitted_at: value.submitted_at.to_system_time(),
            display_name: value.display_name,
            removed: value.removed,
            message_ref: value.message_ref,
        })
    }
}

fn parse_round_id(collection: &'static str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::InvalidRecord {
        collection,
        reason: format!("round id `{raw}`: {err}"),
    })
}

fn parse_count(collection: &'static str, field: &str, raw: i64) -> Result<u32, MongoDaoError> {
    u32::try_from(raw).map_err(|_| MongoDaoError::InvalidRecord {
        collection,
        reason: format!("`{field}` out of range: {raw}"),
    })
}
