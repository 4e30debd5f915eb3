//! Private submission flow driven by direct messages.
//!
//! A participant first sends `submit`, then answers every part in turn, either
//! with content or with `skip`. Progress and entries are stored before the
//! participant gets an acknowledgement.

use std::time::SystemTime;

use tracing::{debug, error, info};

use crate::{
    chat::Member,
    dao::models::{EntryEntity, ProgressEntity, RoundId},
    error::ServiceError,
    i18n::Text,
    services::{aggregation_service::DELIMITER, event_service::DirectMessage, status_service},
    state::SharedState,
};

const SUBMIT: &str = "submit";
const SKIP: &str = "skip";

/// Handle a direct message sent to the bot.
///
/// Failures past the membership check are answered with the generic error reply
/// before being returned.
pub async fn handle_direct_message(
    state: &SharedState,
    message: DirectMessage,
) -> Result<(), ServiceError> {
    if message.author_is_bot {
        return Ok(());
    }

    let member = match state.chat().find_member(message.author_id.clone()).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            debug!(participant_id = %message.author_id, "ignoring message from non-member");
            return Ok(());
        }
        Err(err) => {
            let err = ServiceError::from(err);
            reply_error(state, &message.author_id, &err).await;
            return Err(err);
        }
    };

    if let Err(err) = intake(state, &member, &message).await {
        reply_error(state, &member.id, &err).await;
        return Err(err);
    }
    Ok(())
}

async fn reply_error(state: &SharedState, participant_id: &str, err: &ServiceError) {
    error!(%participant_id, error = %err, "submission flow failed");
    if let Err(reply_err) = state
        .chat()
        .send_direct_message(participant_id.to_owned(), state.text(Text::ReplyError))
        .await
    {
        error!(%participant_id, error = %reply_err, "failed to send error reply");
    }
}

async fn reply(state: &SharedState, participant_id: &str, content: String) -> Result<(), ServiceError> {
    state
        .chat()
        .send_direct_message(participant_id.to_owned(), content)
        .await?;
    Ok(())
}

async fn intake(
    state: &SharedState,
    member: &Member,
    message: &DirectMessage,
) -> Result<(), ServiceError> {
    if message.attachment_count > 0 {
        return reply(state, &member.id, state.text(Text::ReplyNoAttachments)).await;
    }

    let round = state.round().await;
    let Some(round_id) = round.active_round() else {
        return reply(state, &member.id, state.text(Text::ReplyNoChallenge)).await;
    };

    let command = message.content.trim().to_lowercase();
    let progress = state
        .store()
        .find_progress(round_id, member.id.clone())
        .await?;

    match progress {
        Some(progress) if (1..=round.part_count).contains(&progress.current_part) => {
            answer_part(state, member, round_id, round.part_count, progress, &command, message).await
        }
        _ if command == SUBMIT => begin(state, member, round_id, round.part_count).await,
        _ => {
            let help = if round.part_count == 1 {
                Text::ReplyHelp
            } else {
                Text::ReplyHelpMultipart {
                    parts: round.part_count,
                }
            };
            reply(state, &member.id, state.text(help)).await
        }
    }
}

fn prompt(part_count: u32, part: u32) -> Text {
    if part_count == 1 {
        Text::ReplyAnswer
    } else {
        Text::ReplyAnswerMultipart { part }
    }
}

async fn begin(
    state: &SharedState,
    member: &Member,
    round_id: RoundId,
    part_count: u32,
) -> Result<(), ServiceError> {
    state
        .store()
        .save_progress(ProgressEntity {
            round_id,
            participant_id: member.id.clone(),
            current_part: 1,
            display_name: member.display_name.clone(),
        })
        .await?;
    info!(%round_id, participant_id = %member.id, "submission started");
    status_service::refresh(state).await;

    reply(state, &member.id, state.text(prompt(part_count, 1))).await
}

async fn answer_part(
    state: &SharedState,
    member: &Member,
    round_id: RoundId,
    part_count: u32,
    progress: ProgressEntity,
    command: &str,
    message: &DirectMessage,
) -> Result<(), ServiceError> {
    let part = progress.current_part;
    let skipped = command == SKIP;

    if skipped {
        debug!(%round_id, participant_id = %member.id, part, "part skipped");
    } else {
        state
            .store()
            .save_entry(EntryEntity {
                round_id,
                participant_id: member.id.clone(),
                part,
                content: message.content.clone(),
                submitted_at: SystemTime::now(),
                display_name: member.display_name.clone(),
                removed: false,
                message_ref: None,
            })
            .await?;
        info!(%round_id, participant_id = %member.id, part, "entry stored");
    }

    let finished = part == part_count;
    let next_part = if finished { 0 } else { part + 1 };
    state
        .store()
        .save_progress(ProgressEntity {
            current_part: next_part,
            ..progress
        })
        .await?;
    status_service::refresh(state).await;

    let follow_up = if finished {
        state.text(Text::ReplyFinish)
    } else {
        state.text(prompt(part_count, next_part))
    };
    let content = if skipped {
        follow_up
    } else {
        format!("{} {follow_up}", state.text(Text::ReplyThanks))
    };
    reply(state, &member.id, content).await?;

    if finished {
        echo_entries(state, member, round_id, part_count).await?;
    }
    Ok(())
}

/// Send the participant a copy of everything they stored for the round.
async fn echo_entries(
    state: &SharedState,
    member: &Member,
    round_id: RoundId,
    part_count: u32,
) -> Result<(), ServiceError> {
    reply(
        state,
        &member.id,
        format!("{DELIMITER}{}", state.text(Text::ReplyTitle)),
    )
    .await?;

    let entries = state
        .store()
        .list_participant_entries(round_id, member.id.clone())
        .await?;
    for entry in entries {
        if part_count > 1 {
            reply(
                state,
                &member.id,
                format!(
                    "{DELIMITER}{}",
                    state.text(Text::ReplyTitleMultipart { part: entry.part })
                ),
            )
            .await?;
        }
        reply(state, &member.id, format!("{DELIMITER}{}", entry.content)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::challenge_store::ChallengeStore,
        services::event_service::{self, ChatEvent},
        testing::Harness,
    };

    async fn progress(harness: &Harness, user: &str) -> Option<u32> {
        let round_id = harness.state.round().await.active_round().unwrap();
        harness
            .store
            .find_progress(round_id, user.into())
            .await
            .unwrap()
            .map(|p| p.current_part)
    }

    #[tokio::test]
    async fn two_part_submission_with_skip() {
        let harness = Harness::new();
        harness.moderator(">start 2").await.unwrap();

        harness.dm("alice", "submit").await.unwrap();
        assert_eq!(progress(&harness, "alice").await, Some(1));
        harness.dm("alice", "hello").await.unwrap();
        assert_eq!(progress(&harness, "alice").await, Some(2));
        harness.dm("alice", "skip").await.unwrap();
        assert_eq!(progress(&harness, "alice").await, Some(0));

        let entries = harness.store.all_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].part, 1);
        assert_eq!(entries[0].content, "hello");
        assert_eq!(entries[0].display_name, "Alice");

        let thanks = harness.text(Text::ReplyThanks);
        assert_eq!(
            harness.replies("alice"),
            vec![
                harness.text(Text::ReplyAnswerMultipart { part: 1 }),
                format!(
                    "{thanks} {}",
                    harness.text(Text::ReplyAnswerMultipart { part: 2 })
                ),
                harness.text(Text::ReplyFinish),
                format!("{DELIMITER}{}", harness.text(Text::ReplyTitle)),
                format!(
                    "{DELIMITER}{}",
                    harness.text(Text::ReplyTitleMultipart { part: 1 })
                ),
                format!("{DELIMITER}hello"),
            ]
        );
    }

    #[tokio::test]
    async fn single_part_uses_plain_phrasing() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();

        harness.dm("bob", "hi").await.unwrap();
        harness.dm("bob", "  SUBMIT ").await.unwrap();
        harness.dm("bob", "  My Answer  ").await.unwrap();

        assert_eq!(
            harness.replies("bob"),
            vec![
                harness.text(Text::ReplyHelp),
                harness.text(Text::ReplyAnswer),
                format!(
                    "{} {}",
                    harness.text(Text::ReplyThanks),
                    harness.text(Text::ReplyFinish)
                ),
                format!("{DELIMITER}{}", harness.text(Text::ReplyTitle)),
                format!("{DELIMITER}  My Answer  "),
            ]
        );
    }

    #[tokio::test]
    async fn multi_part_help_mentions_part_count() {
        let harness = Harness::new();
        harness.moderator(">start 3").await.unwrap();
        harness.dm("carol", "what do I do?").await.unwrap();

        assert_eq!(
            harness.replies("carol"),
            vec![harness.text(Text::ReplyHelpMultipart { parts: 3 })]
        );
        assert_eq!(progress(&harness, "carol").await, None);
    }

    #[tokio::test]
    async fn finished_participant_needs_submit_again() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        harness.dm("alice", "submit").await.unwrap();
        harness.dm("alice", "first").await.unwrap();
        harness.chat.clear();

        harness.dm("alice", "second").await.unwrap();
        assert_eq!(harness.replies("alice"), vec![harness.text(Text::ReplyHelp)]);
        assert_eq!(harness.store.all_entries()[0].content, "first");
    }

    #[tokio::test]
    async fn resubmitting_a_part_keeps_one_entry() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        for answer in ["first", "second"] {
            harness.dm("alice", "submit").await.unwrap();
            harness.dm("alice", answer).await.unwrap();
        }

        let entries = harness.store.all_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "second");
    }

    #[tokio::test]
    async fn submit_during_content_phase_is_content() {
        let harness = Harness::new();
        harness.moderator(">start 2").await.unwrap();
        harness.dm("alice", "submit").await.unwrap();
        harness.dm("alice", "submit").await.unwrap();

        assert_eq!(progress(&harness, "alice").await, Some(2));
        assert_eq!(harness.store.all_entries()[0].content, "submit");
    }

    #[tokio::test]
    async fn attachments_are_refused() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        harness.dm("alice", "submit").await.unwrap();
        harness.chat.clear();

        event_service::handle(
            &harness.state,
            ChatEvent::DirectMessage(DirectMessage {
                author_id: "alice".into(),
                author_is_bot: false,
                content: "see picture".into(),
                attachment_count: 1,
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            harness.replies("alice"),
            vec![harness.text(Text::ReplyNoAttachments)]
        );
        assert_eq!(progress(&harness, "alice").await, Some(1));
        assert!(harness.store.all_entries().is_empty());
    }

    #[tokio::test]
    async fn no_challenge_outside_active_round() {
        let harness = Harness::new();
        harness.dm("alice", "submit").await.unwrap();
        harness.moderator(">start 1").await.unwrap();
        harness.moderator(">stop").await.unwrap();
        harness.dm("alice", "submit").await.unwrap();

        assert_eq!(
            harness.replies("alice"),
            vec![harness.text(Text::ReplyNoChallenge); 2]
        );
    }

    #[tokio::test]
    async fn bots_and_non_members_are_ignored() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        harness.chat.clear();

        harness.dm("stranger", "submit").await.unwrap();
        event_service::handle(
            &harness.state,
            ChatEvent::DirectMessage(DirectMessage {
                author_id: "alice".into(),
                author_is_bot: true,
                content: "submit".into(),
                attachment_count: 0,
            }),
        )
        .await
        .unwrap();

        assert!(harness.chat.sent().is_empty());
    }

    #[tokio::test]
    async fn store_failure_answers_with_error_reply() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        harness.chat.clear();
        harness.store.set_unavailable(true);

        assert!(harness.dm("alice", "submit").await.is_err());
        assert_eq!(harness.replies("alice"), vec![harness.text(Text::ReplyError)]);
    }

    #[tokio::test]
    async fn progress_beyond_part_count_restarts_at_entry_phase() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        let round_id = harness.state.round().await.active_round().unwrap();
        harness
            .store
            .save_progress(ProgressEntity {
                round_id,
                participant_id: "alice".into(),
                current_part: 5,
                display_name: "Alice".into(),
            })
            .await
            .unwrap();

        harness.dm("alice", "an answer").await.unwrap();
        assert_eq!(harness.replies("alice"), vec![harness.text(Text::ReplyHelp)]);
        assert!(harness.store.all_entries().is_empty());
    }
}
