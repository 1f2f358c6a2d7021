//! Command context - one parsed inbound request.

use anyhow::{Context as _, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::event::Event;

/// Literal names that address the bot without a user-id mention.
const BOT_NAME_ALIASES: [&str; 3] = ["meowbot", "meowboi", "@meowboi"];

/// Render a user id as the `<@U...>` mention form.
pub fn quote_user_id(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

#[derive(Debug, Clone, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    team_id: String,
    #[serde(default)]
    authed_users: Vec<String>,
    event: Event,
}

/// An [`Event`] plus delivery metadata, with the directed-command parse
/// applied up front. Created per inbound request and never mutated.
#[derive(Debug, Clone)]
pub struct CommandContext {
    raw: Value,
    team_id: String,
    bot_user: Option<String>,
    event: Event,
    command: Option<String>,
    args: Vec<String>,
}

impl CommandContext {
    /// Build a context from the full events API envelope.
    pub fn new(raw: Value) -> Result<Self> {
        let envelope: EventEnvelope =
            serde_json::from_value(raw.clone()).context("malformed event envelope")?;
        let bot_user = envelope.authed_users.first().cloned();
        let (command, args) = parse_command(&envelope.event, bot_user.as_deref());
        Ok(Self {
            raw,
            team_id: envelope.team_id,
            bot_user,
            event: envelope.event,
            command,
            args,
        })
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// The bot's own authorized user id, when the envelope names one.
    pub fn bot_user(&self) -> Option<&str> {
        self.bot_user.as_deref()
    }

    /// Normalized (lowercased) command name, or `None` when the message
    /// doesn't address the bot and isn't a direct message.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Remaining tokens after the command, original case preserved.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The raw payload with the verification token stripped, safe to log.
    pub fn redacted_payload(&self) -> Value {
        let mut payload = self.raw.clone();
        if let Some(map) = payload.as_object_mut() {
            map.remove("token");
        }
        payload
    }
}

/// First token addressed to the bot (or any token in a DM) becomes the
/// command; the rest become args.
fn parse_command(event: &Event, bot_user: Option<&str>) -> (Option<String>, Vec<String>) {
    let Some(text) = event.text() else {
        return (None, Vec::new());
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (None, Vec::new());
    }
    let split: Vec<&str> = trimmed.split(' ').collect();
    let first = split[0];

    let mentioned = bot_user.is_some_and(|bot| first == quote_user_id(bot))
        || BOT_NAME_ALIASES.contains(&first.to_lowercase().as_str());

    let tokens: &[&str] = if mentioned {
        if split.len() < 2 {
            return (None, Vec::new());
        }
        &split[1..]
    } else if event.is_direct_message() {
        &split[..]
    } else {
        return (None, Vec::new());
    };

    let command = tokens[0].to_lowercase();
    let args = tokens[1..].iter().map(|s| s.to_string()).collect();
    (Some(command), args)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: String,
}

/// One embedded action from an interaction callback. The `action_id` packs
/// the originating command and an action-specific name as `command:name`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackAction {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
}

impl SlackAction {
    pub fn command(&self) -> &str {
        self.action_id.split(':').next().unwrap_or(&self.action_id)
    }

    pub fn action_name(&self) -> &str {
        self.action_id
            .split_once(':')
            .map(|(_, name)| name)
            .unwrap_or("")
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// A callback delivered after a user manipulated a previously sent
/// interactive element. Routed by embedded command token, never by
/// re-evaluating trigger conditions.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractivePayload {
    #[serde(default)]
    team: Team,
    #[serde(default)]
    response_url: Option<String>,
    #[serde(default)]
    actions: Vec<SlackAction>,
}

impl InteractivePayload {
    pub fn new(raw: Value) -> Result<Self> {
        serde_json::from_value(raw).context("malformed interaction payload")
    }

    pub fn team_id(&self) -> &str {
        &self.team.id
    }

    pub fn response_url(&self) -> Option<&str> {
        self.response_url.as_deref()
    }

    pub fn actions(&self) -> &[SlackAction] {
        &self.actions
    }
}
