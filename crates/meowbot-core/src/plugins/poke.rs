//! Poke counters keyed by team. The read-modify-write across the three keys
//! is not transactional; two simultaneous pokes may each claim the other's
//! "last poked" slot. Harmless for a toy counter.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::conditions::Condition;
use crate::context::{quote_user_id, CommandContext};
use crate::dispatch::AppContext;
use crate::payload::OutboundMessage;
use crate::trigger::{ResponseCommand, TriggerRegistry};

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(Poke::new());
}

fn last_time_key(team_id: &str) -> String {
    format!("poke:last:{team_id}")
}

fn last_user_key(team_id: &str) -> String {
    format!("poke:lastuser:{team_id}")
}

fn count_key(team_id: &str, user: &str) -> String {
    format!("poke:count:{team_id}:{user}")
}

fn humanize(delta_seconds: i64) -> String {
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("a{} {unit} ago", if unit == "hour" { "n" } else { "" })
        } else {
            format!("{n} {unit}s ago")
        }
    };
    match delta_seconds {
        i64::MIN..=9 => "just now".to_string(),
        10..=59 => format!("{delta_seconds} seconds ago"),
        60..=3599 => plural(delta_seconds / 60, "minute"),
        3600..=86_399 => plural(delta_seconds / 3600, "hour"),
        _ => plural(delta_seconds / 86_400, "day"),
    }
}

pub struct Poke {
    condition: Condition,
}

impl Poke {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["poke"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for Poke {
    fn name(&self) -> &str {
        "poke"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`poke`: poke meowbot")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let team_id = ctx.team_id();
        let user = ctx.event().user().unwrap_or_default();
        let now = Utc::now().timestamp();

        let last_poke_time = app.store.get(&last_time_key(team_id))?;
        app.store.set(&last_time_key(team_id), &now.to_string())?;
        let last_poked_user = app.store.get(&last_user_key(team_id))?;
        app.store.set(&last_user_key(team_id), user)?;
        let total_pokes = app.store.incr(&count_key(team_id, user))?;

        let Some(last_poke_time) = last_poke_time else {
            return Ok(vec![OutboundMessage::text(
                "You have poked meowbot 1 time!\n\nYou're the first to poke meowbot!",
            )
            .with_icon(":shookcat:")]);
        };

        let s = if total_pokes == 1 { "" } else { "s" };
        let elapsed = now - last_poke_time.parse::<i64>().unwrap_or(now);
        let last_user = quote_user_id(last_poked_user.as_deref().unwrap_or_default());
        Ok(vec![OutboundMessage::text(format!(
            "You have poked meowbot {total_pokes} time{s}!\n\n\
             Meowbot was last poked {} by {last_user}",
            humanize(elapsed),
        ))
        .with_icon(":shookcat:")])
    }
}
