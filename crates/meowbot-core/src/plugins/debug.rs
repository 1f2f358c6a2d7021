//! Operational trigger that fails on purpose so the failure-attribution
//! path can be exercised end to end in a live workspace. Only the
//! configured admin can fire it; without an admin it never activates.

use anyhow::Result;
use async_trait::async_trait;

use crate::conditions::Condition;
use crate::config::BotConfig;
use crate::context::CommandContext;
use crate::dispatch::AppContext;
use crate::trigger::{Trigger, TriggerRegistry};

pub fn register(registry: &mut TriggerRegistry, config: &BotConfig) {
    registry.register(DebugError::new(config.admin_user.as_deref()));
}

pub struct DebugError {
    condition: Condition,
}

impl DebugError {
    pub fn new(admin_user: Option<&str>) -> Self {
        let condition = match admin_user {
            Some(admin) => Condition::And(vec![
                Condition::is_command(["debugerror"]),
                Condition::IsUser {
                    users: vec![admin.to_string()],
                },
            ]),
            None => Condition::Never,
        };
        Self { condition }
    }
}

#[async_trait]
impl Trigger for DebugError {
    fn name(&self) -> &str {
        "debugerror"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn private(&self) -> bool {
        true
    }

    async fn run(&self, _ctx: &CommandContext, _app: &AppContext) -> Result<()> {
        anyhow::bail!("deliberate failure requested via debugerror")
    }
}
