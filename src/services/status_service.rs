//! Presence text shown on the bot profile.

use tracing::{debug, warn};

use crate::{i18n::Text, state::SharedState};

/// Recompute and publish the presence text. Failures are logged and swallowed.
///
/// While a round is active the text shows how many distinct participants stored at
/// least one entry; participants who only skipped parts are not counted.
pub async fn refresh(state: &SharedState) {
    let round = state.round().await;

    let text = match round.active_round() {
        None => state.text(Text::StatusIdle),
        Some(round_id) => match state.store().count_submitters(round_id).await {
            Ok(count) => {
                debug!(%round_id, count, "refreshing submission count");
                state.text(Text::StatusSubmissions { count })
            }
            Err(err) => {
                warn!(%round_id, error = %err, "failed to count submitters; presence not updated");
                return;
            }
        },
    };

    if let Err(err) = state.chat().set_presence(text).await {
        warn!(error = %err, "failed to update presence");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[tokio::test]
    async fn idle_round_shows_idle_text() {
        let harness = Harness::new();
        refresh(&harness.state).await;
        assert_eq!(harness.chat.presence(), vec![harness.text(Text::StatusIdle)]);
    }

    #[tokio::test]
    async fn skip_only_participants_are_not_counted() {
        let harness = Harness::new();
        harness.moderator(">start 1").await.unwrap();
        harness.dm("alice", "submit").await.unwrap();
        harness.dm("alice", "skip").await.unwrap();
        harness.dm("bob", "submit").await.unwrap();
        harness.dm("bob", "my answer").await.unwrap();

        harness.chat.clear();
        refresh(&harness.state).await;
        assert_eq!(
            harness.chat.presence(),
            vec![harness.text(Text::StatusSubmissions { count: 1 })]
        );
    }

    #[tokio::test]
    async fn presence_failures_are_not_fatal() {
        let harness = Harness::new();
        harness.chat.set_failing(true);
        refresh(&harness.state).await;
        assert!(harness.chat.presence().is_empty());
    }

    #[tokio::test]
    async fn store_failures_leave_presence_untouched() {
        let harness = Harness::new();
        harness.moderator(">start 2").await.unwrap();
        harness.chat.clear();
        harness.store.set_unavailable(true);
        refresh(&harness.state).await;
        assert!(harness.chat.presence().is_empty());
    }
}
