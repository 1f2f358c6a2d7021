//! DM love notes: open an IM with the recipient first, deliver there, then
//! confirm to the sender. A failed IM open is a user mistake, not an error.

use anyhow::{Context as _, Result};
use async_trait::async_trait;

use crate::conditions::Condition;
use crate::context::CommandContext;
use crate::dispatch::AppContext;
use crate::payload::OutboundMessage;
use crate::trigger::{Trigger, TriggerRegistry};

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(Love::new());
}

pub struct Love {
    condition: Condition,
}

impl Love {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["love"]),
        }
    }
}

#[async_trait]
impl Trigger for Love {
    fn name(&self) -> &str {
        "love"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`love [recipient] [message]`: send meowbot love")
    }

    async fn run(&self, ctx: &CommandContext, app: &AppContext) -> Result<()> {
        let Some(recipient_arg) = ctx.args().first() else {
            return Ok(());
        };
        let (Some(sender), Some(channel)) = (ctx.event().user(), ctx.event().channel()) else {
            return Ok(());
        };

        // The recipient arrives as a <@U123> mention; the API wants the id.
        let recipient = recipient_arg
            .trim_start_matches("<@")
            .trim_end_matches('>');

        let opened = app.api.open_im(recipient).await?;
        if !opened.ok() {
            let complaint = OutboundMessage::text(format!(
                "User `{recipient_arg}` not found. Did you remember to use @?"
            ))
            .with_channel(channel)
            .with_user(sender);
            app.api.post_ephemeral(&complaint).await?;
            return Ok(());
        }
        let dm_channel = opened
            .channel_id()
            .context("im.open response has no channel id")?
            .to_string();

        let extra = if ctx.args().len() > 1 {
            format!("\n>{}", ctx.args()[1..].join(" "))
        } else {
            String::new()
        };
        let note = OutboundMessage::text(format!(
            ":heart_eyes_cat: Someone has sent you meowbot love!{extra}"
        ))
        .with_channel(dm_channel);
        app.api.post_message(&note).await?;

        let confirmation = OutboundMessage::text("Your meowbot love has been sent")
            .with_channel(channel)
            .with_user(sender);
        app.api.post_ephemeral(&confirmation).await?;
        Ok(())
    }
}
