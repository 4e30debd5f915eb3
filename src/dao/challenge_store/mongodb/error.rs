use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load round state")]
    LoadRound {
        #[source]
        source: MongoError,
    },
    #[error("failed to save round state")]
    SaveRound {
        #[source]
        source: MongoError,
    },
    #[error("failed to load progress of `{participant_id}`")]
    LoadProgress {
        participant_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save progress of `{participant_id}`")]
    SaveProgress {
        participant_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save entry of `{participant_id}` for part {part}")]
    SaveEntry {
        participant_id: String,
        part: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to list entries")]
    ListEntries {
        #[source]
        source: MongoError,
    },
    #[error("failed to update entry review data")]
    UpdateEntry {
        #[source]
        source: MongoError,
    },
    #[error("invalid stored record in `{collection}`: {reason}")]
    InvalidRecord {
        collection: &'static str,
        reason: String,
    },
}
