//! Trigger capability tiers and the registry.
//!
//! A trigger pairs one [`Condition`] with a behavior. Most commands only
//! produce response payloads and implement [`ResponseCommand`]; the blanket
//! impl turns that into a full [`Trigger`] with the shared delivery and
//! failure-check policy. Triggers that talk to the API directly (ephemeral
//! replies, DM opening, reactions) implement [`Trigger`] themselves.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::api::ApiResponse;
use crate::conditions::Condition;
use crate::context::{CommandContext, InteractivePayload, SlackAction};
use crate::dispatch::AppContext;
use crate::error::DeliveryError;
use crate::payload::OutboundMessage;

pub const NO_HELP: &str = "no help available";

#[async_trait]
pub trait Trigger: Send + Sync {
    fn name(&self) -> &str;

    fn condition(&self) -> &Condition;

    /// Higher runs first; ties keep registration order.
    fn priority(&self) -> i32 {
        0
    }

    /// Private triggers are excluded from help listings.
    fn private(&self) -> bool {
        false
    }

    fn help(&self) -> Option<&str> {
        None
    }

    fn activated(&self, ctx: &CommandContext) -> bool {
        self.condition().evaluate(ctx)
    }

    async fn run(&self, ctx: &CommandContext, app: &AppContext) -> Result<()>;

    fn as_interactive(&self) -> Option<&dyn Interactive> {
        None
    }
}

/// A command whose behavior is "produce payloads, deliver them all, then
/// fail loudly if any delivery was rejected".
#[async_trait]
pub trait ResponseCommand: Send + Sync {
    fn name(&self) -> &str;

    fn condition(&self) -> &Condition;

    fn priority(&self) -> i32 {
        0
    }

    fn private(&self) -> bool {
        false
    }

    fn help(&self) -> Option<&str> {
        None
    }

    /// Finite sequence of payloads for this context. Validation problems
    /// come back as ordinary payloads describing the issue, never errors.
    async fn message_args(
        &self,
        ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<OutboundMessage>>;

    /// Default policy: any non-ok delivery surfaces the raw failure body
    /// after the whole batch was attempted. Override for softer handling.
    async fn post_run(
        &self,
        _ctx: &CommandContext,
        _app: &AppContext,
        responses: &[ApiResponse],
    ) -> Result<()> {
        for response in responses {
            if !response.ok() {
                return Err(DeliveryError::Failed {
                    body: response.body().clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn as_interactive(&self) -> Option<&dyn Interactive> {
        None
    }
}

#[async_trait]
impl<T: ResponseCommand> Trigger for T {
    fn name(&self) -> &str {
        ResponseCommand::name(self)
    }

    fn condition(&self) -> &Condition {
        ResponseCommand::condition(self)
    }

    fn priority(&self) -> i32 {
        ResponseCommand::priority(self)
    }

    fn private(&self) -> bool {
        ResponseCommand::private(self)
    }

    fn help(&self) -> Option<&str> {
        ResponseCommand::help(self)
    }

    async fn run(&self, ctx: &CommandContext, app: &AppContext) -> Result<()> {
        let mut responses = Vec::new();
        for mut message in self.message_args(ctx, app).await? {
            // Always deliver into the originating channel, and into its
            // thread when the event carries a thread anchor.
            if let Some(channel) = ctx.event().channel() {
                message.channel = Some(channel.to_string());
            }
            if let Some(thread_ts) = ctx.event().thread_ts() {
                message.thread_ts = Some(thread_ts.to_string());
            }
            responses.push(app.api.post_message(&message).await?);
        }
        self.post_run(ctx, app, &responses).await
    }

    fn as_interactive(&self) -> Option<&dyn Interactive> {
        ResponseCommand::as_interactive(self)
    }
}

/// Callback handling for triggers that issued interactive elements.
#[async_trait]
pub trait Interactive: Send + Sync {
    /// Relevance is matched by command identity only: the action's embedded
    /// command token against the trigger's command aliases. The full
    /// condition is never re-evaluated here.
    fn is_action_relevant(&self, action: &SlackAction) -> bool;

    async fn interact(
        &self,
        payload: &InteractivePayload,
        action: &SlackAction,
        app: &AppContext,
    ) -> Result<()>;
}

/// Helper for the usual [`Interactive::is_action_relevant`] body.
pub fn action_matches(condition: &Condition, action: &SlackAction) -> bool {
    condition
        .command_aliases()
        .is_some_and(|aliases| aliases.iter().any(|a| a == action.command()))
}

/// Catch-all used by the dispatcher when a parsed command matched nothing.
/// Bound to Never so ordinary dispatch skips it.
pub struct MissingCommand {
    condition: Condition,
}

impl MissingCommand {
    pub fn new() -> Self {
        Self {
            condition: Condition::Never,
        }
    }
}

impl Default for MissingCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCommand for MissingCommand {
    fn name(&self) -> &str {
        "missing"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn private(&self) -> bool {
        true
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        Ok(vec![OutboundMessage::text(format!(
            "Meow? (I don't understand `{}`). Try `@meowbot help`.",
            ctx.command().unwrap_or("")
        ))])
    }
}

/// Ordered collection of triggers, built once at startup and passed around
/// by reference afterwards. Registration order is iteration order, and
/// registering the same trigger twice keeps both entries: this is an
/// ordered list, not a set.
#[derive(Default)]
pub struct TriggerRegistry {
    triggers: Vec<Arc<dyn Trigger>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Trigger + 'static>(&mut self, trigger: T) {
        self.triggers.push(Arc::new(trigger));
    }

    pub fn register_arc(&mut self, trigger: Arc<dyn Trigger>) {
        self.triggers.push(trigger);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Trigger>> {
        self.triggers.iter()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Whether any registered trigger claims `command` among its aliases.
    pub fn knows_command(&self, command: &str) -> bool {
        self.find_command(command).is_some()
    }

    /// First registered trigger whose command aliases include `command`.
    pub fn find_command(&self, command: &str) -> Option<&Arc<dyn Trigger>> {
        self.triggers.iter().find(|t| {
            t.condition()
                .command_aliases()
                .is_some_and(|aliases| aliases.iter().any(|a| a == command))
        })
    }
}
