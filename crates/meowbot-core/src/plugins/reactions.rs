//! Passive emoji reactions: match the message text, react on it, say
//! nothing. Delivery failures here are not worth surfacing.

use anyhow::Result;
use async_trait::async_trait;

use crate::conditions::Condition;
use crate::context::CommandContext;
use crate::dispatch::AppContext;
use crate::trigger::{Trigger, TriggerRegistry};

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(ReactWith::new(
        "datboi",
        "datboi2",
        Condition::regex(r"(?i)\bdat boi\b"),
    ));
    registry.register(ReactWith::new(
        "spicy",
        "chilis",
        Condition::regex(r"(?i)\bspicy\b"),
    ));
    registry.register(ReactWith::new("ugh", "ugh", Condition::regex(r"(?i)\bugh+\b")));
    registry.register(ReactWith::new(
        "yubi",
        "yubikey",
        Condition::regex(r"^eid[a-z]{41}$"),
    ));
    registry.register(ReactWith::new(
        "meowshocked",
        "meow_shocked",
        Condition::BotMentioned { suffix: "--".into() },
    ));
    registry.register(ReactWith::new(
        "meowblush",
        "meowblush",
        Condition::BotMentioned { suffix: "++".into() },
    ));
}

pub struct ReactWith {
    name: &'static str,
    emoji: &'static str,
    condition: Condition,
}

impl ReactWith {
    pub fn new(name: &'static str, emoji: &'static str, condition: Condition) -> Self {
        Self {
            name,
            emoji,
            condition,
        }
    }
}

#[async_trait]
impl Trigger for ReactWith {
    fn name(&self) -> &str {
        self.name
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn private(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &CommandContext, app: &AppContext) -> Result<()> {
        let (Some(channel), Some(ts)) = (ctx.event().channel(), ctx.event().ts()) else {
            return Ok(());
        };
        // "already_reacted" and similar rejections are expected noise.
        app.api.add_reaction(self.emoji, channel, ts).await?;
        Ok(())
    }
}
