//! meowbot-core - the trigger-dispatch engine.
//!
//! An inbound chat event flows through [`context::CommandContext`] (parsing),
//! the [`dispatch::Dispatcher`] (condition evaluation and priority ordering),
//! and each activated [`trigger::Trigger`]'s own logic, which posts responses
//! back through the [`api::MessagingApi`] collaborator.
//!
//! External concerns - webhook ingestion, token persistence, the embedded
//! database - live in the `meowbot-server` and `meowbot-storage` crates and
//! reach the core only through the collaborator traits defined here.

pub mod api;
pub mod conditions;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod payload;
pub mod plugins;
pub mod store;
pub mod trigger;

pub use api::{ApiMethod, ApiResponse, MessagingApi, SlackApi};
pub use conditions::Condition;
pub use config::BotConfig;
pub use context::{CommandContext, InteractivePayload, SlackAction};
pub use dispatch::{AppContext, Dispatcher};
pub use error::{DeliveryError, DispatchError, TriggerError};
pub use event::Event;
pub use payload::OutboundMessage;
pub use store::KeyValueStore;
pub use trigger::{Interactive, MissingCommand, ResponseCommand, Trigger, TriggerRegistry};
