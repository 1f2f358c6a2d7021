//! Dispatch of one inbound event against the trigger registry.

use std::sync::Arc;

use tracing::debug;

use crate::api::MessagingApi;
use crate::conditions::Condition;
use crate::config::BotConfig;
use crate::context::{CommandContext, InteractivePayload};
use crate::error::{DispatchError, TriggerError};
use crate::store::KeyValueStore;
use crate::trigger::{MissingCommand, Trigger, TriggerRegistry};

/// Collaborator handles for one unit of work. Built before dispatch and
/// dropped unconditionally afterward; concurrent dispatches share state only
/// through the keyed store.
pub struct AppContext {
    pub api: Arc<dyn MessagingApi>,
    pub store: Arc<dyn KeyValueStore>,
    pub config: BotConfig,
    pub registry: Arc<TriggerRegistry>,
}

pub struct Dispatcher {
    registry: Arc<TriggerRegistry>,
    fallback: MissingCommand,
}

impl Dispatcher {
    pub fn new(registry: Arc<TriggerRegistry>) -> Self {
        Self {
            registry,
            fallback: MissingCommand::new(),
        }
    }

    /// Evaluate every trigger's own condition, then run the activated
    /// subset sequentially in descending priority order (stable on
    /// registration order). Activation is solely each condition's business:
    /// a context without a parsed command is still offered to every
    /// trigger, so reaction and regex triggers fire as usual.
    ///
    /// Returns the names of the triggers that ran. Failures don't stop
    /// later triggers; they are collected and returned attributed by name.
    pub async fn dispatch(
        &self,
        ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<String>, DispatchError> {
        let mut activated: Vec<&Arc<dyn Trigger>> =
            self.registry.iter().filter(|t| t.activated(ctx)).collect();
        activated.sort_by_key(|t| std::cmp::Reverse(t.priority()));

        let mut fired = Vec::new();
        let mut failures = Vec::new();
        for trigger in activated {
            debug!(trigger = trigger.name(), "running trigger");
            if let Err(source) = trigger.run(ctx, app).await {
                failures.push(TriggerError {
                    trigger: trigger.name().to_string(),
                    source,
                });
            }
            fired.push(trigger.name().to_string());
        }

        if self.should_fall_back(ctx) {
            debug!(command = ctx.command(), "no trigger for command");
            if let Err(source) = self.fallback.run(ctx, app).await {
                failures.push(TriggerError {
                    trigger: self.fallback.name().to_string(),
                    source,
                });
            }
            fired.push(self.fallback.name().to_string());
        }

        if failures.is_empty() {
            Ok(fired)
        } else {
            Err(DispatchError { failures })
        }
    }

    /// The fallback runs only for a parsed command no registered trigger
    /// claims, and applies the same bot-origin guard as command matching so
    /// bot chatter never gets a "don't understand" reply.
    fn should_fall_back(&self, ctx: &CommandContext) -> bool {
        let Some(command) = ctx.command() else {
            return false;
        };
        !self.registry.knows_command(command)
            && Condition::is_command([command]).evaluate(ctx)
    }

    /// Route every embedded action to every interactive-capable trigger
    /// that claims it. Zero or multiple matches per action are both fine.
    pub async fn dispatch_interaction(
        &self,
        payload: &InteractivePayload,
        app: &AppContext,
    ) -> Result<Vec<String>, DispatchError> {
        let mut handled = Vec::new();
        let mut failures = Vec::new();
        for action in payload.actions() {
            for trigger in self.registry.iter() {
                let Some(interactive) = trigger.as_interactive() else {
                    continue;
                };
                if !interactive.is_action_relevant(action) {
                    continue;
                }
                debug!(
                    trigger = trigger.name(),
                    action = action.action_name(),
                    "routing interaction"
                );
                if let Err(source) = interactive.interact(payload, action, app).await {
                    failures.push(TriggerError {
                        trigger: trigger.name().to_string(),
                        source,
                    });
                }
                handled.push(trigger.name().to_string());
            }
        }
        if failures.is_empty() {
            Ok(handled)
        } else {
            Err(DispatchError { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::RecordingApi;
    use crate::api::ApiMethod;
    use crate::payload::OutboundMessage;
    use crate::store::mock::MemoryStore;
    use crate::trigger::ResponseCommand;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct Tagged {
        name: &'static str,
        condition: Condition,
        priority: i32,
    }

    impl Tagged {
        fn new(name: &'static str, condition: Condition, priority: i32) -> Self {
            Self {
                name,
                condition,
                priority,
            }
        }
    }

    #[async_trait]
    impl ResponseCommand for Tagged {
        fn name(&self) -> &str {
            self.name
        }

        fn condition(&self) -> &Condition {
            &self.condition
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        async fn message_args(
            &self,
            _ctx: &CommandContext,
            _app: &AppContext,
        ) -> Result<Vec<OutboundMessage>> {
            Ok(vec![OutboundMessage::text(self.name)])
        }
    }

    struct Exploding {
        condition: Condition,
    }

    #[async_trait]
    impl Trigger for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn condition(&self) -> &Condition {
            &self.condition
        }

        async fn run(&self, _ctx: &CommandContext, _app: &AppContext) -> Result<()> {
            anyhow::bail!("boom")
        }
    }

    fn context(event: serde_json::Value) -> CommandContext {
        CommandContext::new(json!({
            "team_id": "T1",
            "authed_users": ["UBOT"],
            "event": event,
        }))
        .unwrap()
    }

    fn app_for(registry: Arc<TriggerRegistry>, api: Arc<RecordingApi>) -> AppContext {
        AppContext {
            api,
            store: Arc::new(MemoryStore::new()),
            config: BotConfig::default(),
            registry,
        }
    }

    #[tokio::test]
    async fn test_priority_order_beats_registration_order() {
        let mut registry = TriggerRegistry::new();
        registry.register(Tagged::new("low", Condition::is_command(["hit"]), 0));
        registry.register(Tagged::new("high", Condition::is_command(["hit"]), 1));
        let registry = Arc::new(registry);

        let api = Arc::new(RecordingApi::new());
        let app = app_for(registry.clone(), api.clone());
        let dispatcher = Dispatcher::new(registry);

        let ctx = context(json!({"type": "message", "text": "<@UBOT> hit", "channel": "C1"}));
        let fired = dispatcher.dispatch(&ctx, &app).await.unwrap();
        assert_eq!(fired, ["high", "low"]);

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "high");
        assert_eq!(calls[1]["text"], "low");
    }

    #[tokio::test]
    async fn test_equal_priority_keeps_registration_order() {
        let mut registry = TriggerRegistry::new();
        registry.register(Tagged::new("first", Condition::is_command(["hit"]), 0));
        registry.register(Tagged::new("second", Condition::is_command(["hit"]), 0));
        let registry = Arc::new(registry);

        let app = app_for(registry.clone(), Arc::new(RecordingApi::new()));
        let dispatcher = Dispatcher::new(registry);

        let ctx = context(json!({"type": "message", "text": "<@UBOT> hit", "channel": "C1"}));
        let fired = dispatcher.dispatch(&ctx, &app).await.unwrap();
        assert_eq!(fired, ["first", "second"]);
    }

    #[tokio::test]
    async fn test_commandless_context_still_offered_to_all_triggers() {
        let mut registry = TriggerRegistry::new();
        registry.register(Tagged::new("cmd", Condition::is_command(["hit"]), 0));
        registry.register(Tagged::new(
            "regex",
            Condition::regex(r"(?i)\bugh+\b"),
            0,
        ));
        let registry = Arc::new(registry);

        let app = app_for(registry.clone(), Arc::new(RecordingApi::new()));
        let dispatcher = Dispatcher::new(registry);

        let ctx = context(json!({"type": "message", "text": "ughhh mondays", "channel": "C1"}));
        assert_eq!(ctx.command(), None);
        let fired = dispatcher.dispatch(&ctx, &app).await.unwrap();
        assert_eq!(fired, ["regex"]);
    }

    #[tokio::test]
    async fn test_unknown_command_falls_back_to_missing() {
        let mut registry = TriggerRegistry::new();
        registry.register(Tagged::new("cmd", Condition::is_command(["hit"]), 0));
        let registry = Arc::new(registry);

        let api = Arc::new(RecordingApi::new());
        let app = app_for(registry.clone(), api.clone());
        let dispatcher = Dispatcher::new(registry);

        let ctx = context(json!({
            "type": "message",
            "text": "<@UBOT> frobnicate",
            "channel": "C1",
        }));
        let fired = dispatcher.dispatch(&ctx, &app).await.unwrap();
        assert_eq!(fired, ["missing"]);

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert!(calls[0]["text"].as_str().unwrap().contains("frobnicate"));
    }

    #[tokio::test]
    async fn test_no_fallback_for_bot_originated_command() {
        let registry = Arc::new(TriggerRegistry::new());
        let api = Arc::new(RecordingApi::new());
        let app = app_for(registry.clone(), api.clone());
        let dispatcher = Dispatcher::new(registry);

        let ctx = context(json!({
            "type": "message",
            "text": "frobnicate",
            "channel": "D1",
            "channel_type": "im",
            "bot_id": "B1",
        }));
        assert_eq!(ctx.command(), Some("frobnicate"));
        let fired = dispatcher.dispatch(&ctx, &app).await.unwrap();
        assert!(fired.is_empty());
        assert!(api.calls().is_empty());
    }

    struct Button {
        name: &'static str,
        condition: Condition,
    }

    #[async_trait]
    impl Trigger for Button {
        fn name(&self) -> &str {
            self.name
        }

        fn condition(&self) -> &Condition {
            &self.condition
        }

        async fn run(&self, _ctx: &CommandContext, _app: &AppContext) -> Result<()> {
            Ok(())
        }

        fn as_interactive(&self) -> Option<&dyn crate::trigger::Interactive> {
            Some(self)
        }
    }

    #[async_trait]
    impl crate::trigger::Interactive for Button {
        fn is_action_relevant(&self, action: &crate::context::SlackAction) -> bool {
            crate::trigger::action_matches(&self.condition, action)
        }

        async fn interact(
            &self,
            _payload: &InteractivePayload,
            _action: &crate::context::SlackAction,
            app: &AppContext,
        ) -> Result<()> {
            app.api
                .post_message(&OutboundMessage::text(self.name).with_channel("C1"))
                .await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_interaction_routed_by_command_token_only() {
        let mut registry = TriggerRegistry::new();
        registry.register_arc(Arc::new(Button {
            name: "weather",
            condition: Condition::is_command(["weather", "forecast"]),
        }));
        registry.register_arc(Arc::new(Button {
            name: "setlocation",
            condition: Condition::is_command(["setlocation"]),
        }));
        let registry = Arc::new(registry);

        let api = Arc::new(RecordingApi::new());
        let app = app_for(registry.clone(), api.clone());
        let dispatcher = Dispatcher::new(registry);

        let payload = InteractivePayload::new(json!({
            "team": {"id": "T1"},
            "response_url": "https://hooks.slack.test/r1",
            "actions": [{"action_id": "weather:si", "value": "10001"}],
        }))
        .unwrap();
        let handled = dispatcher.dispatch_interaction(&payload, &app).await.unwrap();
        assert_eq!(handled, ["weather"]);

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["text"], "weather");
    }

    #[tokio::test]
    async fn test_interaction_with_no_match_is_a_noop() {
        let registry = Arc::new(TriggerRegistry::new());
        let api = Arc::new(RecordingApi::new());
        let app = app_for(registry.clone(), api.clone());
        let dispatcher = Dispatcher::new(registry);

        let payload = InteractivePayload::new(json!({
            "team": {"id": "T1"},
            "actions": [{"action_id": "weather:si", "value": "10001"}],
        }))
        .unwrap();
        let handled = dispatcher.dispatch_interaction(&payload, &app).await.unwrap();
        assert!(handled.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failing_trigger_does_not_suppress_later_ones() {
        let mut registry = TriggerRegistry::new();
        registry.register(Exploding {
            condition: Condition::is_command(["hit"]),
        });
        registry.register(Tagged::new("steady", Condition::is_command(["hit"]), 0));
        let registry = Arc::new(registry);

        let api = Arc::new(RecordingApi::new());
        let app = app_for(registry.clone(), api.clone());
        let dispatcher = Dispatcher::new(registry);

        let ctx = context(json!({"type": "message", "text": "<@UBOT> hit", "channel": "C1"}));
        let err = dispatcher.dispatch(&ctx, &app).await.unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].trigger, "exploding");

        // The steady trigger still delivered.
        assert_eq!(api.calls_for(ApiMethod::PostMessage).len(), 1);
    }
}
