//! Composable boolean predicates over a command context.
//!
//! Evaluation is pure: no side effects, deterministic for a given context,
//! and a missing field always evaluates to false rather than erroring.

use regex::Regex;

use crate::context::{quote_user_id, CommandContext};

#[derive(Debug, Clone)]
pub enum Condition {
    /// Parsed command is one of the aliases, and the event is neither
    /// bot-originated nor an edit/delete variant. Guards against feedback
    /// loops from bot-to-bot chatter.
    IsCommand { aliases: Vec<String> },
    /// A `reaction_added` event whose reaction is in the set.
    IsReaction { reactions: Vec<String> },
    /// Pattern found anywhere in the event text. Prefix the pattern with
    /// `(?i)` for case-insensitive matching.
    RegexMatch(Regex),
    InChannel { channels: Vec<String> },
    IsUser { users: Vec<String> },
    /// Text contains `meowbot<suffix>` (any case) or the bot's own mention
    /// followed by the suffix.
    BotMentioned { suffix: String },
    Always,
    Never,
    /// All sub-conditions true; vacuously true when empty.
    And(Vec<Condition>),
    /// Any sub-condition true; vacuously false when empty.
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn is_command<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::IsCommand {
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_reaction<I, S>(reactions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::IsReaction {
            reactions: reactions.into_iter().map(Into::into).collect(),
        }
    }

    /// Panics on an invalid pattern; callers pass hardcoded patterns.
    pub fn regex(pattern: &str) -> Self {
        Condition::RegexMatch(Regex::new(pattern).expect("valid regex"))
    }

    pub fn evaluate(&self, ctx: &CommandContext) -> bool {
        match self {
            Condition::IsCommand { aliases } => {
                if ctx.event().has_skipped_subtype() || ctx.event().bot_id().is_some() {
                    return false;
                }
                ctx.command()
                    .is_some_and(|command| aliases.iter().any(|a| a == command))
            }
            Condition::IsReaction { reactions } => {
                ctx.event().kind() == "reaction_added"
                    && ctx
                        .event()
                        .reaction()
                        .is_some_and(|r| reactions.iter().any(|known| known == r))
            }
            Condition::RegexMatch(regex) => {
                ctx.event().text().is_some_and(|text| regex.is_match(text))
            }
            Condition::InChannel { channels } => ctx
                .event()
                .channel()
                .is_some_and(|c| channels.iter().any(|known| known == c)),
            Condition::IsUser { users } => ctx
                .event()
                .user()
                .is_some_and(|u| users.iter().any(|known| known == u)),
            Condition::BotMentioned { suffix } => {
                let Some(text) = ctx.event().text() else {
                    return false;
                };
                let by_name = format!("meowbot{}", suffix);
                if text.to_lowercase().contains(&by_name) {
                    return true;
                }
                ctx.bot_user()
                    .is_some_and(|bot| text.contains(&format!("{}{}", quote_user_id(bot), suffix)))
            }
            Condition::Always => true,
            Condition::Never => false,
            Condition::And(conditions) => conditions.iter().all(|c| c.evaluate(ctx)),
            Condition::Or(conditions) => conditions.iter().any(|c| c.evaluate(ctx)),
            Condition::Not(condition) => !condition.evaluate(ctx),
        }
    }

    /// Alias set of a command-match condition. Interactive relevance
    /// matching uses this identity rather than re-evaluating conditions.
    /// Looks through `And` so a gated command (e.g. command + user check)
    /// still advertises its aliases.
    pub fn command_aliases(&self) -> Option<&[String]> {
        match self {
            Condition::IsCommand { aliases } => Some(aliases),
            Condition::And(conditions) => conditions.iter().find_map(|c| c.command_aliases()),
            _ => None,
        }
    }
}
