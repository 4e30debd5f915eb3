/// Review, redaction and publication of the collected entries.
pub mod aggregation_service;
/// Inbound chat event dispatch.
pub mod event_service;
/// Health check service.
pub mod health_service;
/// Moderator commands and round transitions.
pub mod moderation_service;
/// Presence text refresh.
pub mod status_service;
/// Storage health polling with degraded mode.
pub mod storage_supervisor;
/// Participant submission flow.
pub mod submission_service;
