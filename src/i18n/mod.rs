//! Localized message texts.
//!
//! Every text the bot sends is identified by a [`Text`] value, resolved through a
//! [`TextResolver`]. The default resolver is a [`Catalog`] built from JSON files
//! mapping keys to templates, where `%{name}` placeholders are substituted.

use std::{collections::HashMap, fs, io::ErrorKind, path::Path};

use tracing::{info, warn};

/// Locale every other locale falls back to.
pub const DEFAULT_LOCALE: &str = "en-US";

const DEFAULT_CATALOG: &str = include_str!("../../locales/en-US.json");

/// Messages the bot can send, with their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    Help,
    SpecifyParts,
    StartedMod { parts: u32 },
    Started,
    NoActiveChallenge,
    AlreadyStarted,
    NotPublished,
    AlreadyStopped,
    Stopped,
    StoppedMod,
    ResetActiveChallenge,
    Reset,
    StopFirst,
    Published,
    Results,
    AnswerTitle { part: u32 },
    NoSubmissions,
    StatusIdle,
    StatusSubmissions { count: u64 },
    ReplyNoAttachments,
    ReplyNoChallenge,
    ReplyHelp,
    ReplyHelpMultipart { parts: u32 },
    ReplyAnswer,
    ReplyAnswerMultipart { part: u32 },
    ReplyThanks,
    ReplyFinish,
    ReplyTitle,
    ReplyTitleMultipart { part: u32 },
    ReplyError,
}

impl Text {
    /// Catalog key of the message.
    pub fn key(&self) -> &'static str {
        match self {
            Text::Help => "help",
            Text::SpecifyParts => "specifyParts",
            Text::StartedMod { .. } => "startedMod",
            Text::Started => "started",
            Text::NoActiveChallenge => "noActiveChallenge",
            Text::AlreadyStarted => "alreadyStarted",
            Text::NotPublished => "notPublished",
            Text::AlreadyStopped => "alreadyStopped",
            Text::Stopped => "stopped",
            Text::StoppedMod => "stoppedMod",
            Text::ResetActiveChallenge => "resetActiveChallenge",
            Text::Reset => "reset",
            Text::StopFirst => "stopFirst",
            Text::Published => "published",
            Text::Results => "results",
            Text::AnswerTitle { .. } => "answerTitle",
            Text::NoSubmissions => "noSubmissions",
            Text::StatusIdle => "statusIdle",
            Text::StatusSubmissions { .. } => "statusSubmissions",
            Text::ReplyNoAttachments => "replyNoAttachments",
            Text::ReplyNoChallenge => "replyNoChallenge",
            Text::ReplyHelp => "replyHelp",
            Text::ReplyHelpMultipart { .. } => "replyHelpMultipart",
            Text::ReplyAnswer => "replyAnswer",
            Text::ReplyAnswerMultipart { .. } => "replyAnswerMultipart",
            Text::ReplyThanks => "replyThanks",
            Text::ReplyFinish => "replyFinish",
            Text::ReplyTitle => "replyTitle",
            Text::ReplyTitleMultipart { .. } => "replyTitleMultipart",
            Text::ReplyError => "replyError",
        }
    }

    /// Placeholder values substituted into the template.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match *self {
            Text::StartedMod { parts } => vec![("num", parts.to_string())],
            Text::AnswerTitle { part } => vec![("num", part.to_string())],
            Text::StatusSubmissions { count } => vec![("count", count.to_string())],
            Text::ReplyHelpMultipart { parts } => vec![("parts", parts.to_string())],
            Text::ReplyAnswerMultipart { part } | Text::ReplyTitleMultipart { part } => {
                vec![("part", part.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

/// Maps a [`Text`] to its localized rendering.
pub trait TextResolver: Send + Sync {
    fn resolve(&self, text: Text) -> String;
}

/// JSON backed catalog with per-key fallback to [`DEFAULT_LOCALE`].
#[derive(Debug, Clone)]
pub struct Catalog {
    locale: String,
    phrases: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl Catalog {
    /// Catalog containing only the built-in default locale.
    pub fn builtin() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_owned(),
            phrases: HashMap::new(),
            fallback: parse_builtin(),
        }
    }

    /// Load `<dir>/<locale>.json`, keeping the built-in texts for missing keys.
    ///
    /// A missing or unreadable file is logged and results in the built-in catalog.
    pub fn load(dir: &Path, locale: &str) -> Self {
        let mut catalog = Self::builtin();
        catalog.locale = locale.to_owned();

        let path = dir.join(format!("{locale}.json"));
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(phrases) => {
                    info!(
                        path = %path.display(),
                        locale,
                        count = phrases.len(),
                        "loaded locale texts"
                    );
                    catalog.phrases = phrases;
                }
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse locale file; falling back to built-in texts"
                ),
            },
            Err(err) if err.kind() == ErrorKind::NotFound && locale == DEFAULT_LOCALE => {}
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                "failed to read locale file; falling back to built-in texts"
            ),
        }

        catalog
    }

    /// Locale selected for this catalog.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn template(&self, key: &str) -> Option<&str> {
        self.phrases
            .get(key)
            .or_else(|| self.fallback.get(key))
            .map(String::as_str)
    }
}

impl TextResolver for Catalog {
    fn resolve(&self, text: Text) -> String {
        let key = text.key();
        let Some(template) = self.template(key) else {
            warn!(key, locale = %self.locale, "missing text");
            return key.to_owned();
        };
        interpolate(template, &text.params())
    }
}

fn parse_builtin() -> HashMap<String, String> {
    serde_json::from_str(DEFAULT_CATALOG).unwrap_or_else(|err| {
        warn!(error = %err, "built-in locale catalog is invalid");
        HashMap::new()
    })
}

/// Replace every `%{name}` placeholder by its value; unknown placeholders are kept.
fn interpolate(template: &str, params: &[(&'static str, String)]) -> String {
    params
        .iter()
        .fold(template.to_owned(), |acc, (name, value)| {
            acc.replace(&format!("%{{{name}}}"), value)
        })
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn builtin_catalog_covers_every_text() {
        let catalog = Catalog::builtin();
        let texts = [
            Text::Help,
            Text::SpecifyParts,
            Text::StartedMod { parts: 2 },
            Text::Started,
            Text::NoActiveChallenge,
            Text::AlreadyStarted,
            Text::NotPublished,
            Text::AlreadyStopped,
            Text::Stopped,
            Text::StoppedMod,
            Text::ResetActiveChallenge,
            Text::Reset,
            Text::StopFirst,
            Text::Published,
            Text::Results,
            Text::AnswerTitle { part: 1 },
            Text::NoSubmissions,
            Text::StatusIdle,
            Text::StatusSubmissions { count: 3 },
            Text::ReplyNoAttachments,
            Text::ReplyNoChallenge,
            Text::ReplyHelp,
            Text::ReplyHelpMultipart { parts: 2 },
            Text::ReplyAnswer,
            Text::ReplyAnswerMultipart { part: 2 },
            Text::ReplyThanks,
            Text::ReplyFinish,
            Text::ReplyTitle,
            Text::ReplyTitleMultipart { part: 1 },
            Text::ReplyError,
        ];
        for text in texts {
            assert!(catalog.template(text.key()).is_some(), "missing {text:?}");
        }
    }

    #[test]
    fn placeholders_are_substituted() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.resolve(Text::AnswerTitle { part: 3 }), "**Part 3**");
        assert_eq!(
            catalog.resolve(Text::StatusSubmissions { count: 7 }),
            "7 submission(s) so far"
        );
    }

    #[test]
    fn locale_file_overrides_with_fallback() {
        let dir = env::temp_dir().join(format!("higawari-locales-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("fr-FR.json"),
            r#"{"answerTitle": "**Partie %{num}**"}"#,
        )
        .unwrap();

        let catalog = Catalog::load(&dir, "fr-FR");
        assert_eq!(catalog.locale(), "fr-FR");
        assert_eq!(catalog.resolve(Text::AnswerTitle { part: 2 }), "**Partie 2**");
        assert_eq!(catalog.resolve(Text::ReplyThanks), "Thanks!");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_locale_keeps_builtin_texts() {
        let catalog = Catalog::load(Path::new("/nonexistent/locales"), "de-DE");
        assert_eq!(catalog.resolve(Text::NoSubmissions), "No submissions.");
    }
}
