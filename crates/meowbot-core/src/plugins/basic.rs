//! Canned-reply commands.

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::IndexedRandom;

use crate::conditions::Condition;
use crate::context::{quote_user_id, CommandContext};
use crate::dispatch::AppContext;
use crate::payload::OutboundMessage;
use crate::trigger::{ResponseCommand, TriggerRegistry};

pub const MAGIC_EIGHT_BALL_OPTIONS: &[&str] = &[
    "It is certain",
    "It is decidedly so",
    "Without a doubt",
    "Yes definitely",
    "You may rely on it",
    "You can count on it",
    "As I see it, yes",
    "Most likely",
    "Outlook good",
    "Yes",
    "Signs point to yes",
    "Absolutely",
    "Reply hazy try again",
    "Ask again later",
    "Better not tell you now",
    "Cannot predict now",
    "Concentrate and ask again",
    "Don't count on it",
    "My reply is no",
    "My sources say no",
    "Outlook not so good",
    "Very doubtful",
    "Chances aren't good",
];

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(Ping::new());
    registry.register(Meow::new());
    registry.register(Shrug::new());
    registry.register(Nyan::new());
    registry.register(Magic8::new());
    registry.register(Sing::new());
}

pub struct Ping {
    condition: Condition,
}

impl Ping {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["ping"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`ping`: see if meowbot is awake")
    }

    async fn message_args(
        &self,
        _ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        Ok(vec![OutboundMessage::text("pong!").with_icon(":ping_pong:")])
    }
}

pub struct Meow {
    condition: Condition,
}

impl Meow {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["meow"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Meow {
    fn name(&self) -> &str {
        "meow"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`meow`: meow!")
    }

    async fn message_args(
        &self,
        _ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        Ok(vec![OutboundMessage::text("Meow! :catkool:")])
    }
}

pub struct Shrug {
    condition: Condition,
}

impl Shrug {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["shrug"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Shrug {
    fn name(&self) -> &str {
        "shrug"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn private(&self) -> bool {
        true
    }

    fn help(&self) -> Option<&str> {
        Some("`shrug`: shrug")
    }

    async fn message_args(
        &self,
        _ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        Ok(vec![OutboundMessage::text(r"¯\_:cat:_/¯")])
    }
}

pub struct Nyan {
    condition: Condition,
}

impl Nyan {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["nyan"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Nyan {
    fn name(&self) -> &str {
        "nyan"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`nyan`: nyan")
    }

    async fn message_args(
        &self,
        _ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        Ok(vec![OutboundMessage::blocks(serde_json::json!([{
            "type": "image",
            "image_url": "https://media.giphy.com/media/sIIhZliB2McAo/giphy.gif",
            "alt_text": "nyan cat",
        }]))])
    }
}

pub struct Magic8 {
    condition: Condition,
}

impl Magic8 {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["magic8", "8ball"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Magic8 {
    fn name(&self) -> &str {
        "magic8"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`magic8 [question]`: tells your fortune")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let asker = quote_user_id(ctx.event().user().unwrap_or_default());
        let answer = MAGIC_EIGHT_BALL_OPTIONS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or("Reply hazy try again");
        let text = format!("{} asked:\n>{}\n{}", asker, ctx.args().join(" "), answer);
        Ok(vec![OutboundMessage::text(text).with_icon(":8ball:")])
    }
}

pub struct Sing {
    condition: Condition,
}

impl Sing {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["sing"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Sing {
    fn name(&self) -> &str {
        "sing"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`sing`: get meowbot to sing you a song")
    }

    async fn message_args(
        &self,
        _ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        Ok(vec![OutboundMessage::text(
            "https://www.youtube.com/watch?v=4-L6rEm0rnY",
        )])
    }
}
