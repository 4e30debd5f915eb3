/// Round, progress and entry storage operations.
pub mod challenge_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
