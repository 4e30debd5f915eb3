//! Parsing of moderator commands posted in the moderation channel.

const FORCE_RESET_PHRASE: &str = ">force reset, please. i understand the consequences";

/// Largest part count a round can be started with.
pub const MAX_PART_COUNT: u32 = 20;

/// Commands understood in the moderation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModCommand {
    /// Show the moderator help.
    Help,
    /// Start a round; `parts` is `None` when the argument is missing or not an integer in
    /// `1..=MAX_PART_COUNT`.
    Start { parts: Option<u32> },
    /// Close submissions and review them.
    Stop,
    /// Review the submissions without changing state.
    Current,
    /// Discard a stopped round.
    Reset,
    /// Discard a round whatever its status.
    ForceReset,
    /// Publish the anonymized compilation.
    Publish,
}

impl ModCommand {
    /// Parse a channel message. Returns `None` for anything that is not a command.
    ///
    /// Matching is case-insensitive and ignores surrounding and repeated whitespace.
    pub fn parse(content: &str) -> Option<Self> {
        let normalized = content.trim().to_lowercase();
        let tokens = normalized.split_whitespace().collect::<Vec<_>>();

        if tokens.join(" ") == FORCE_RESET_PHRASE {
            return Some(ModCommand::ForceReset);
        }

        let command = match tokens.first().copied()? {
            ">help" => ModCommand::Help,
            ">start" => ModCommand::Start {
                parts: tokens.get(1).and_then(|raw| parse_part_count(raw)),
            },
            ">stop" => ModCommand::Stop,
            ">current" => ModCommand::Current,
            ">reset" => ModCommand::Reset,
            ">publish" => ModCommand::Publish,
            _ => return None,
        };

        Some(command)
    }
}

fn parse_part_count(raw: &str) -> Option<u32> {
    raw.parse::<u32>()
        .ok()
        .filter(|parts| (1..=MAX_PART_COUNT).contains(parts))
}
