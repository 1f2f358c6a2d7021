//! Configuration surface the engine reads.
//!
//! The server crate loads the full YAML config and hands the engine this
//! narrowed view. Required secrets are validated at load time there; by the
//! time a `BotConfig` exists, dispatch can assume it is usable.

#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    /// Admin user id gating operational triggers (e.g. the debug trigger).
    pub admin_user: Option<String>,
    pub cat_api_key: String,
    pub weather_api_key: String,
    /// Fallback weather location when a user has no stored preference.
    pub default_zip_code: String,
}
