//! Command listing and per-command help.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::conditions::Condition;
use crate::context::CommandContext;
use crate::dispatch::AppContext;
use crate::payload::OutboundMessage;
use crate::trigger::{ResponseCommand, Trigger, TriggerRegistry, NO_HELP};

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(Help::new());
}

pub struct Help {
    condition: Condition,
}

impl Help {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["help"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`help`: shows all commands, or help for a particular command")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        if let Some(wanted) = ctx.args().first() {
            let wanted = wanted.to_lowercase();
            let text = match app.registry.find_command(&wanted) {
                Some(trigger) => trigger.help().unwrap_or(NO_HELP).to_string(),
                None => format!("`{wanted}` is not a valid command"),
            };
            return Ok(vec![OutboundMessage::text(text)]);
        }

        // One line per public command trigger, primary names only.
        let mut listed: Vec<(&str, &str)> = app
            .registry
            .iter()
            .filter(|t| !t.private() && t.condition().command_aliases().is_some())
            .map(|t| (t.name(), t.help().unwrap_or(NO_HELP)))
            .collect();
        listed.sort();
        listed.dedup();

        let names: Vec<&str> = listed.iter().map(|(name, _)| *name).collect();
        let fields: Vec<_> = listed
            .iter()
            .map(|(_, help)| json!({ "value": help }))
            .collect();
        let attachment = json!([{
            "pretext": "Available commands are:",
            "fallback": names.join(", "),
            "fields": fields,
            "footer": format!("meowbot {}", env!("CARGO_PKG_VERSION")),
        }]);
        Ok(vec![OutboundMessage::default()
            .with_attachments(attachment)
            .in_thread(ctx.event().ts())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiMethod;
    use crate::config::BotConfig;
    use crate::plugins::testing::{message_context, test_app};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_listing_skips_private_commands() {
        let (api, _store, mut app) = test_app();
        app.registry = Arc::new(crate::plugins::builtin(&BotConfig::default()));

        let ctx = message_context("help");
        Help::new().run(&ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostMessage);
        let fallback = calls[0]["attachments"][0]["fallback"].as_str().unwrap();
        assert!(fallback.contains("ping"));
        assert!(fallback.contains("weather"));
        assert!(!fallback.contains("shrug"));
    }

    #[tokio::test]
    async fn test_per_command_help() {
        let (api, _store, mut app) = test_app();
        app.registry = Arc::new(crate::plugins::builtin(&BotConfig::default()));

        let ctx = message_context("help PING");
        Help::new().run(&ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "`ping`: see if meowbot is awake");
    }

    #[tokio::test]
    async fn test_unknown_command_help() {
        let (api, _store, app) = test_app();
        let ctx = message_context("help frobnicate");
        Help::new().run(&ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "`frobnicate` is not a valid command");
    }
}
