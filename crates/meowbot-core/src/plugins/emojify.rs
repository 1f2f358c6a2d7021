//! Text-to-emoji transformations.

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::conditions::Condition;
use crate::context::CommandContext;
use crate::dispatch::AppContext;
use crate::payload::OutboundMessage;
use crate::trigger::{ResponseCommand, TriggerRegistry};

pub const ALL_TEXT_COLORS: &[&str] = &["red", "yellow", "green", "teal", "blue", "purple"];

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(Emojify::new());
    registry.register(Color::new());
    registry.register(Rainbow::new());
    registry.register(Christmas::new());
}

/// Letterform emoji for a (lowercased) character, if one exists.
fn emoji_for(c: char) -> Option<&'static str> {
    Some(match c {
        ' ' => ":blank:",
        '0' => ":zero:",
        '1' => ":one:",
        '2' => ":two:",
        '3' => ":three:",
        '4' => ":four:",
        '5' => ":five:",
        '6' => ":six:",
        '7' => ":seven:",
        '8' => ":eight:",
        '9' => ":nine:",
        'a' => ":a:",
        'b' => ":b:",
        'c' => ":color_c:",
        'd' => ":dailymotion:",
        'e' => ":edge:",
        'f' => ":f:",
        'g' => ":doogle:",
        'h' => ":h:",
        'i' => ":uiuc:",
        'j' => ":jchurch:",
        'k' => ":k:",
        'l' => ":l:",
        'm' => ":mcd:",
        'n' => ":njudah:",
        'o' => ":o:",
        'p' => ":parking:",
        'q' => ":quake:",
        'r' => ":registered:",
        's' => ":gobears:",
        't' => ":t:",
        'u' => ":u:",
        'v' => ":v:",
        'w' => ":wish:",
        'x' => ":x:",
        'y' => ":hn:",
        'z' => ":mana-z:",
        _ => return None,
    })
}

/// Replace spaces with `:blank:` and ASCII letters with colored letterform
/// emojis, pulling the color for each letter from `colors`.
fn coloring(text: &str, mut colors: impl Iterator<Item = &'static str>) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if c == ' ' {
            out.push_str(":blank:");
        } else if c.is_ascii_alphabetic() {
            let color = colors.next().unwrap_or(ALL_TEXT_COLORS[0]);
            out.push_str(&format!(":letter-{}-{color}:", c.to_ascii_lowercase()));
        } else {
            out.push(c);
        }
    }
    out
}

/// Endless color sequence that never repeats the previous color.
fn random_colors() -> impl Iterator<Item = &'static str> {
    let mut last: Option<&'static str> = None;
    std::iter::from_fn(move || {
        let picks: Vec<&&str> = ALL_TEXT_COLORS
            .choose_multiple(&mut rand::rng(), 2)
            .collect();
        let color = if Some(*picks[0]) != last {
            *picks[0]
        } else {
            *picks[1]
        };
        last = Some(color);
        Some(color)
    })
}

fn christmas_colors() -> impl Iterator<Item = &'static str> {
    let pair = if rand::rng().random_bool(0.5) {
        ["red", "green"]
    } else {
        ["green", "red"]
    };
    pair.into_iter().cycle()
}

pub struct Emojify {
    condition: Condition,
}

impl Emojify {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["emojify", "emojifi"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Emojify {
    fn name(&self) -> &str {
        "emojify"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`emojify`: turn any text into emojis")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let text: String = ctx
            .args()
            .join(" ")
            .to_lowercase()
            .chars()
            .map(|c| match emoji_for(c) {
                Some(emoji) => emoji.to_string(),
                None => c.to_string(),
            })
            .collect();
        Ok(vec![OutboundMessage::text(text)])
    }
}

pub struct Color {
    condition: Condition,
}

impl Color {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["color", "colour"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Color {
    fn name(&self) -> &str {
        "color"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`color [text]`: add some color")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let text = coloring(&ctx.args().join(" "), random_colors());
        Ok(vec![OutboundMessage::text(text)])
    }
}

pub struct Rainbow {
    condition: Condition,
}

impl Rainbow {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["rainbow"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Rainbow {
    fn name(&self) -> &str {
        "rainbow"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`rainbow [text]`: make rainbow text")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let text = coloring(&ctx.args().join(" "), ALL_TEXT_COLORS.iter().copied().cycle());
        Ok(vec![OutboundMessage::text(text)])
    }
}

pub struct Christmas {
    condition: Condition,
}

impl Christmas {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["christmas"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Christmas {
    fn name(&self) -> &str {
        "christmas"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`christmas [text]`: make Christmas text")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        _app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let text = coloring(&ctx.args().join(" "), christmas_colors());
        Ok(vec![OutboundMessage::text(text)])
    }
}
