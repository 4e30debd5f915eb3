mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoChallengeStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::InvalidRecord { collection, reason } => {
                StorageError::corrupted(collection, reason)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_records_are_reported_as_corrupted() {
        let err = StorageError::from(MongoDaoError::InvalidRecord {
            collection: "entries",
            reason: "part must be positive".into(),
        });
        match err {
            StorageError::Corrupted { collection, reason } => {
                assert_eq!(collection, "entries");
                assert_eq!(reason, "part must be positive");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
