//! Built-in triggers, grouped the way they respond: canned replies, emoji
//! text effects, stored cat photos, weather with interactive refresh, DM
//! love notes, poke counters, and passive reactions.

mod basic;
mod cat;
mod debug;
mod emojify;
mod help;
mod love;
mod poke;
mod reactions;
mod weather;

use crate::config::BotConfig;
use crate::trigger::TriggerRegistry;

/// Build the full registry. Registration order is dispatch tiebreak order,
/// so the groups register in a fixed sequence.
pub fn builtin(config: &BotConfig) -> TriggerRegistry {
    let mut registry = TriggerRegistry::new();
    basic::register(&mut registry);
    emojify::register(&mut registry);
    cat::register(&mut registry);
    help::register(&mut registry);
    weather::register(&mut registry);
    love::register(&mut registry);
    poke::register(&mut registry);
    reactions::register(&mut registry);
    debug::register(&mut registry, config);
    registry
}
