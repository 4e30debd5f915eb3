//! Review and publication of the stored entries.
//!
//! The review pass shows every entry to moderators in arrival order and can
//! remember which message shows which entry, so that deleting that message
//! redacts the entry. The publication pass posts the remaining entries to the
//! challenge channel, shuffled and without author names.

use rand::{rng, seq::SliceRandom};
use tracing::{debug, info};

use crate::{
    dao::models::EntryEntity,
    error::ServiceError,
    i18n::Text,
    state::{SharedState, state_machine::RoundState},
};

/// Separator line preceding every entry and echoed submission.
pub const DELIMITER: &str = "=======================\n";

async fn post_moderation(state: &SharedState, content: String) -> Result<String, ServiceError> {
    let channel = state.channels().moderation.clone();
    Ok(state.chat().send_channel_message(channel, content).await?)
}

async fn post_challenge(state: &SharedState, content: String) -> Result<String, ServiceError> {
    let channel = state.channels().challenge.clone();
    Ok(state.chat().send_channel_message(channel, content).await?)
}

/// Post every part of the round to the moderation channel.
///
/// With `record_refs` the reference of each posted entry is stored on the entry.
pub async fn review(
    state: &SharedState,
    round: &RoundState,
    record_refs: bool,
) -> Result<(), ServiceError> {
    let Some(round_id) = round.open_round() else {
        return Err(ServiceError::InvalidState("no round to review".into()));
    };

    for part in 1..=round.part_count {
        post_moderation(state, state.text(Text::AnswerTitle { part })).await?;

        let entries = state.store().list_part_entries(round_id, part).await?;
        if entries.is_empty() {
            post_moderation(state, state.text(Text::NoSubmissions)).await?;
            continue;
        }

        debug!(%round_id, part, count = entries.len(), "reviewing entries");
        for entry in entries {
            let message_ref = post_moderation(state, format!("{DELIMITER}{}", entry.content)).await?;
            if record_refs {
                state
                    .store()
                    .set_entry_message_ref(entry.key(), message_ref)
                    .await?;
            }
        }
    }

    Ok(())
}

/// Entries eligible for publication, in a uniformly random order.
pub fn publication_order(entries: Vec<EntryEntity>) -> Vec<EntryEntity> {
    let mut eligible = entries
        .into_iter()
        .filter(|entry| !entry.removed)
        .collect::<Vec<_>>();
    eligible.shuffle(&mut rng());
    eligible
}

/// Post the anonymized compilation of the round to the challenge channel.
pub async fn publish(state: &SharedState, round: &RoundState) -> Result<(), ServiceError> {
    let Some(round_id) = round.open_round() else {
        return Err(ServiceError::InvalidState("no round to publish".into()));
    };

    post_challenge(state, state.text(Text::Results)).await?;

    for part in 1..=round.part_count {
        let entries = state.store().list_part_entries(round_id, part).await?;
        let compiled = publication_order(entries);

        post_challenge(state, state.text(Text::AnswerTitle { part })).await?;

        if compiled.is_empty() {
            post_challenge(
                state,
                format!("{DELIMITER}{}", state.text(Text::NoSubmissions)),
            )
            .await?;
            continue;
        }

        info!(%round_id, part, count = compiled.len(), "publishing entries");
        for (index, entry) in compiled.iter().enumerate() {
            post_challenge(
                state,
                format!("{DELIMITER}{}. {}", index + 1, entry.content),
            )
            .await?;
        }
    }

    Ok(())
}

/// Redact the entry shown by a deleted moderation message.
pub async fn handle_deletion(
    state: &SharedState,
    channel_id: &str,
    message_ref: String,
) -> Result<(), ServiceError> {
    if channel_id != state.channels().moderation {
        return Ok(());
    }

    if state.store().mark_removed(message_ref.clone()).await? {
        info!(%message_ref, "entry removed from publication");
    } else {
        debug!(%message_ref, "deleted message does not show an entry");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, time::SystemTime};

    use uuid::Uuid;

    use super::*;
    use crate::testing::{CHALLENGE_CHANNEL, Harness, MOD_CHANNEL};

    fn entry(content: &str, removed: bool) -> EntryEntity {
        EntryEntity {
            round_id: Uuid::now_v7(),
            participant_id: content.into(),
            part: 1,
            content: content.into(),
            submitted_at: SystemTime::now(),
            display_name: content.to_uppercase(),
            removed,
            message_ref: None,
        }
    }

    #[test]
    fn publication_order_is_a_permutation_without_removed_entries() {
        let entries = vec![
            entry("a", false),
            entry("b", true),
            entry("c", false),
            entry("d", false),
        ];

        let published = publication_order(entries)
            .into_iter()
            .map(|e| e.content)
            .collect::<Vec<_>>();
        assert_eq!(published.len(), 3);
        assert_eq!(
            published.iter().cloned().collect::<HashSet<_>>(),
            HashSet::from(["a".to_string(), "c".to_string(), "d".to_string()])
        );
    }

    #[test]
    fn publication_order_reaches_every_arrangement() {
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let order = publication_order(vec![entry("x", false), entry("y", false), entry("z", false)])
                .into_iter()
                .map(|e| e.content)
                .collect::<Vec<_>>();
            seen.insert(order);
        }
        assert_eq!(seen.len(), 6);
    }

    async fn submit(harness: &Harness, user: &str, answers: &[&str]) {
        harness.dm(user, "submit").await.unwrap();
        for answer in answers {
            harness.dm(user, answer).await.unwrap();
        }
    }

    #[tokio::test]
    async fn stop_reviews_parts_and_reports_empty_ones() {
        let harness = Harness::new();
        harness.moderator(">start 2").await.unwrap();
        submit(&harness, "alice", &["hello", "skip"]).await;
        harness.chat.clear();

        harness.moderator(">stop").await.unwrap();

        let contents = harness
            .channel_messages(MOD_CHANNEL)
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>();
        assert_eq!(
            contents,
            vec![
                harness.text(Text::StoppedMod),
                harness.text(Text::AnswerTitle { part: 1 }),
                format!("{DELIMITER}hello"),
                harness.text(Text::AnswerTitle { part: 2 }),
                harness.text(Text::NoSubmissions),
            ]
        );
    }

    #[tokio::test]
    async fn only_stop_records_message_refs() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        submit(&harness, "alice", &["first"]).await;

        harness.moderator(">current").await.unwrap();
        assert!(harness.store.all_entries()[0].message_ref.is_none());

        harness.chat.clear();
        harness.moderator(">stop").await.unwrap();
        let posted = harness
            .channel_messages(MOD_CHANNEL)
            .into_iter()
            .find(|m| m.content == format!("{DELIMITER}first"))
            .unwrap();
        assert_eq!(
            harness.store.all_entries()[0].message_ref,
            Some(posted.message_ref)
        );
    }

    #[tokio::test]
    async fn deleting_a_reviewed_message_redacts_the_entry() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        submit(&harness, "alice", &["keep me"]).await;
        submit(&harness, "bob", &["drop me"]).await;
        harness.moderator(">stop").await.unwrap();

        let dropped = harness
            .channel_messages(MOD_CHANNEL)
            .into_iter()
            .find(|m| m.content.ends_with("drop me"))
            .unwrap();
        harness
            .delete(CHALLENGE_CHANNEL, &dropped.message_ref)
            .await
            .unwrap();
        assert!(harness.store.all_entries().iter().all(|e| !e.removed));

        harness.delete(MOD_CHANNEL, &dropped.message_ref).await.unwrap();
        harness.chat.clear();
        harness.moderator(">publish").await.unwrap();

        let public = harness
            .channel_messages(CHALLENGE_CHANNEL)
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>();
        assert!(public.contains(&format!("{DELIMITER}1. keep me")));
        assert!(public.iter().all(|m| !m.contains("drop me")));
    }

    #[tokio::test]
    async fn publish_numbers_entries_without_attribution() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        submit(&harness, "alice", &["one"]).await;
        submit(&harness, "bob", &["two"]).await;
        harness.moderator(">stop").await.unwrap();
        harness.chat.clear();

        harness.moderator(">publish").await.unwrap();

        let public = harness
            .channel_messages(CHALLENGE_CHANNEL)
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>();
        assert_eq!(public.len(), 4);
        assert_eq!(public[0], harness.text(Text::Results));
        assert_eq!(public[1], harness.text(Text::AnswerTitle { part: 1 }));
        let mut numbered = public[2..].to_vec();
        numbered.sort();
        let expected = [
            [format!("{DELIMITER}1. one"), format!("{DELIMITER}2. two")],
            [format!("{DELIMITER}1. two"), format!("{DELIMITER}2. one")],
        ];
        assert!(expected.iter().any(|candidate| {
            let mut candidate = candidate.to_vec();
            candidate.sort();
            candidate == numbered
        }));
        assert!(public.iter().all(|m| !m.contains("Alice") && !m.contains("Bob")));
    }

    #[tokio::test]
    async fn publish_reports_parts_without_entries() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        harness.moderator(">stop").await.unwrap();
        harness.chat.clear();

        harness.moderator(">publish").await.unwrap();

        let public = harness
            .channel_messages(CHALLENGE_CHANNEL)
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>();
        assert_eq!(
            public,
            vec![
                harness.text(Text::Results),
                harness.text(Text::AnswerTitle { part: 1 }),
                format!("{DELIMITER}{}", harness.text(Text::NoSubmissions)),
            ]
        );
    }
}
