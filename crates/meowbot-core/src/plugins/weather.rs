//! Weather forecast with interactive refresh/unit-toggle buttons, plus the
//! per-user preference commands backing it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::conditions::Condition;
use crate::context::{CommandContext, InteractivePayload, SlackAction};
use crate::dispatch::AppContext;
use crate::payload::OutboundMessage;
use crate::trigger::{action_matches, Interactive, ResponseCommand, Trigger, TriggerRegistry};

pub const DEFAULT_UNITS: &str = "us";

const FORECAST_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(Weather::new());
    registry.register(SetLocation::new());
    registry.register(SetUnits::new());
}

fn location_key(user: &str) -> String {
    format!("weather:location:{user}")
}

fn units_key(user: &str) -> String {
    format!("weather:units:{user}")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    lat: String,
    lon: String,
    display_name: String,
}

/// Geocoding plus raw forecast retrieval behind a trait so the command
/// logic can be exercised against canned responses.
#[async_trait]
pub trait ForecastApi: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Option<Location>>;
    async fn forecast(&self, api_key: &str, location: &Location, units: &str) -> Result<String>;
}

pub struct HttpForecastClient {
    client: reqwest::Client,
}

impl HttpForecastClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ForecastApi for HttpForecastClient {
    async fn geocode(&self, query: &str) -> Result<Option<Location>> {
        let results: Vec<Location> = self
            .client
            .get("https://nominatim.openstreetmap.org/search")
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, "meowbot")
            .send()
            .await?
            .json()
            .await?;
        Ok(results.into_iter().next())
    }

    async fn forecast(&self, api_key: &str, location: &Location, units: &str) -> Result<String> {
        let raw = self
            .client
            .get(format!(
                "https://api.darksky.net/forecast/{api_key}/{lat},{lon}",
                lat = location.lat,
                lon = location.lon,
            ))
            .query(&[
                ("exclude", "minutely,alerts,flags"),
                ("lang", "en"),
                ("units", units),
            ])
            .send()
            .await?
            .text()
            .await?;
        Ok(raw)
    }
}

fn icon_for(name: &str) -> &'static str {
    match name {
        "clear-day" => ":sunny:",
        "clear-night" => ":crescent_moon:",
        "rain" | "sleet" => ":rain_cloud:",
        "snow" => ":snow_cloud:",
        "wind" => ":wind_blowing_face:",
        "fog" => ":fog:",
        "cloudy" => ":cloud:",
        "partly-cloudy-day" | "partly-cloudy-night" => ":partly_sunny:",
        _ => ":earth_africa:",
    }
}

fn day_name(unix: i64) -> String {
    chrono::DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.format("%a").to_string())
        .unwrap_or_default()
}

/// Block layout for one forecast payload. Pure so the rendering stays
/// testable against canned responses.
fn render_forecast(query: &str, units: &str, display_name: &str, forecast: &Value) -> OutboundMessage {
    let (temp_symbol, other_symbol, other_unit) = if units == "us" {
        ("℉", "℃", "si")
    } else {
        ("℃", "℉", "us")
    };

    let current = format!(
        "*Current Weather*\n{}\n{} {}{}\n",
        forecast["hourly"]["summary"].as_str().unwrap_or(""),
        icon_for(forecast["currently"]["icon"].as_str().unwrap_or("")),
        forecast["currently"]["temperature"].as_f64().unwrap_or(0.0) as i64,
        temp_symbol,
    );

    let week: Vec<Value> = forecast["daily"]["data"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|day| {
            json!({
                "type": "mrkdwn",
                "text": format!(
                    "*{}*\n{} {}{temp_symbol} / {}{temp_symbol}",
                    day_name(day["time"].as_i64().unwrap_or(0)),
                    icon_for(day["icon"].as_str().unwrap_or("")),
                    day["temperatureHigh"].as_f64().unwrap_or(0.0) as i64,
                    day["temperatureLow"].as_f64().unwrap_or(0.0) as i64,
                ),
            })
        })
        .collect();

    OutboundMessage::blocks(json!([
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*Forecast for {display_name}*"),
            },
        },
        {
            "type": "actions",
            "elements": [
                {
                    "type": "button",
                    "action_id": format!("weather:{units}"),
                    "text": {
                        "type": "plain_text",
                        "text": ":arrows_counterclockwise: Refresh",
                        "emoji": true,
                    },
                    "value": query,
                },
                {
                    "type": "button",
                    "action_id": format!("weather:{other_unit}"),
                    "text": {
                        "type": "plain_text",
                        "text": format!("to {other_symbol}"),
                    },
                    "value": query,
                },
            ],
        },
        { "type": "divider" },
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": current },
        },
        { "type": "divider" },
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": "*This Week*" },
            "fields": week,
        },
    ]))
}

pub struct Weather {
    condition: Condition,
    client: Arc<dyn ForecastApi>,
}

impl Weather {
    pub fn new() -> Self {
        Self::with_client(Arc::new(HttpForecastClient::new()))
    }

    pub fn with_client(client: Arc<dyn ForecastApi>) -> Self {
        Self {
            condition: Condition::is_command(["weather", "forecast"]),
            client,
        }
    }

    async fn weather_message(
        &self,
        query: &str,
        units: &str,
        app: &AppContext,
    ) -> Result<OutboundMessage> {
        let Some(location) = self.client.geocode(query).await? else {
            return Ok(OutboundMessage::text(format!(
                "Location `{query}` not found"
            )));
        };
        let cache_key = format!("weather:{units}:{query}");
        let raw = match app.store.get(&cache_key)? {
            Some(raw) => raw,
            None => {
                let raw = self
                    .client
                    .forecast(&app.config.weather_api_key, &location, units)
                    .await?;
                app.store.set_with_ttl(&cache_key, &raw, FORECAST_CACHE_TTL)?;
                raw
            }
        };
        let forecast: Value = serde_json::from_str(&raw)?;
        Ok(render_forecast(query, units, &location.display_name, &forecast))
    }
}

#[async_trait]
impl ResponseCommand for Weather {
    fn name(&self) -> &str {
        "weather"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`weather [location]`: get weather forecast")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let user = ctx.event().user().unwrap_or_default();
        let query = if ctx.args().is_empty() {
            match app.store.get(&location_key(user))? {
                Some(stored) => stored,
                None => app.config.default_zip_code.clone(),
            }
        } else {
            ctx.args().join(" ")
        };
        let units = app
            .store
            .get(&units_key(user))?
            .unwrap_or_else(|| DEFAULT_UNITS.to_string());
        Ok(vec![self.weather_message(&query, &units, app).await?])
    }

    fn as_interactive(&self) -> Option<&dyn Interactive> {
        Some(self)
    }
}

#[async_trait]
impl Interactive for Weather {
    fn is_action_relevant(&self, action: &SlackAction) -> bool {
        action_matches(&self.condition, action)
    }

    /// Button presses re-render in place: the action name carries the
    /// requested units and the value carries the original query.
    async fn interact(
        &self,
        payload: &InteractivePayload,
        action: &SlackAction,
        app: &AppContext,
    ) -> Result<()> {
        let units = action.action_name();
        let query = action.value().unwrap_or_default();
        let message = self
            .weather_message(query, units, app)
            .await?
            .replace_original();
        let response_url = payload
            .response_url()
            .context("interaction payload has no response_url")?;
        app.api
            .respond(response_url, serde_json::to_value(&message)?)
            .await?;
        Ok(())
    }
}

pub struct SetLocation {
    condition: Condition,
}

impl SetLocation {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["setlocation"]),
        }
    }
}

#[async_trait]
impl Trigger for SetLocation {
    fn name(&self) -> &str {
        "setlocation"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`setlocation [location]`: set your default location for `weather`")
    }

    async fn run(&self, ctx: &CommandContext, app: &AppContext) -> Result<()> {
        let (Some(user), Some(channel)) = (ctx.event().user(), ctx.event().channel()) else {
            return Ok(());
        };
        let location = ctx.args().join(" ");
        app.store.set(&location_key(user), &location)?;
        let confirmation = OutboundMessage::text(format!("Set default location to {location}"))
            .with_channel(channel)
            .with_user(user);
        app.api.post_ephemeral(&confirmation).await?;
        Ok(())
    }
}

pub struct SetUnits {
    condition: Condition,
}

impl SetUnits {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["setunits"]),
        }
    }
}

#[async_trait]
impl Trigger for SetUnits {
    fn name(&self) -> &str {
        "setunits"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`setunits [f|c]`: set your default units for `weather`")
    }

    async fn run(&self, ctx: &CommandContext, app: &AppContext) -> Result<()> {
        let (Some(user), Some(channel)) = (ctx.event().user(), ctx.event().channel()) else {
            return Ok(());
        };
        let ephemeral = |text: String| {
            OutboundMessage::text(text)
                .with_channel(channel)
                .with_user(user)
        };
        if ctx.args().len() != 1 {
            app.api
                .post_ephemeral(&ephemeral("Expected a single argument (f/c)".into()))
                .await?;
            return Ok(());
        }
        let units = ctx.args()[0].to_lowercase();
        let stored = match units.as_str() {
            "f" | "fahrenheit" => "us",
            "c" | "celsius" => "si",
            _ => {
                app.api
                    .post_ephemeral(&ephemeral(format!(
                        "Units must either be `f` or `c`. Got {units}"
                    )))
                    .await?;
                return Ok(());
            }
        };
        app.store.set(&units_key(user), stored)?;
        app.api
            .post_ephemeral(&ephemeral(format!("Set default units to {units}")))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiMethod;
    use crate::plugins::testing::{message_context, test_app};
    use crate::store::KeyValueStore;
    use std::sync::Mutex;

    fn forecast_fixture() -> Value {
        json!({
            "hourly": { "summary": "Light rain through tomorrow." },
            "currently": { "icon": "rain", "temperature": 54.7 },
            "daily": { "data": [
                { "time": 1_546_300_800, "icon": "snow", "temperatureHigh": 33.1, "temperatureLow": 20.9 },
                { "time": 1_546_387_200, "icon": "clear-day", "temperatureHigh": 40.0, "temperatureLow": 28.0 },
            ]},
        })
    }

    struct StubForecastApi {
        location: Option<Location>,
        fetches: Mutex<usize>,
    }

    impl StubForecastApi {
        fn new() -> Self {
            Self {
                location: Some(Location {
                    lat: "40.7".into(),
                    lon: "-74.0".into(),
                    display_name: "New York".into(),
                }),
                fetches: Mutex::new(0),
            }
        }

        fn with_no_match() -> Self {
            Self {
                location: None,
                fetches: Mutex::new(0),
            }
        }

        fn fetches(&self) -> usize {
            *self.fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl ForecastApi for StubForecastApi {
        async fn geocode(&self, _query: &str) -> Result<Option<Location>> {
            Ok(self.location.clone())
        }

        async fn forecast(
            &self,
            _api_key: &str,
            _location: &Location,
            _units: &str,
        ) -> Result<String> {
            *self.fetches.lock().unwrap() += 1;
            Ok(forecast_fixture().to_string())
        }
    }

    #[test]
    fn test_render_forecast_blocks() {
        let message = render_forecast("10001", "us", "New York", &forecast_fixture());
        let blocks = message.blocks.unwrap();
        assert_eq!(blocks[0]["text"]["text"], "*Forecast for New York*");

        let buttons = blocks[1]["elements"].as_array().unwrap();
        assert_eq!(buttons[0]["action_id"], "weather:us");
        assert_eq!(buttons[0]["value"], "10001");
        assert_eq!(buttons[1]["action_id"], "weather:si");

        let current = blocks[3]["text"]["text"].as_str().unwrap();
        assert!(current.contains("Light rain through tomorrow."));
        assert!(current.contains(":rain_cloud: 54℉"));

        let week = blocks[5]["fields"].as_array().unwrap();
        assert_eq!(week.len(), 2);
        assert!(week[0]["text"].as_str().unwrap().contains(":snow_cloud: 33℉ / 20℉"));
    }

    #[test]
    fn test_render_forecast_si_toggle_points_back_to_us() {
        let message = render_forecast("10001", "si", "New York", &forecast_fixture());
        let blocks = message.blocks.unwrap();
        let buttons = blocks[1]["elements"].as_array().unwrap();
        assert_eq!(buttons[1]["action_id"], "weather:us");
        assert_eq!(buttons[1]["text"]["text"], "to ℉");
    }

    #[tokio::test]
    async fn test_setunits_maps_and_confirms() {
        let (api, store, app) = test_app();
        let ctx = message_context("setunits C");
        SetUnits::new().run(&ctx, &app).await.unwrap();

        assert_eq!(store.get("weather:units:U1").unwrap().unwrap(), "si");
        let calls = api.calls_for(ApiMethod::PostEphemeral);
        assert_eq!(calls[0]["text"], "Set default units to c");
        assert_eq!(calls[0]["user"], "U1");
    }

    #[tokio::test]
    async fn test_setunits_rejects_unknown_units() {
        let (api, store, app) = test_app();
        let ctx = message_context("setunits kelvin");
        SetUnits::new().run(&ctx, &app).await.unwrap();

        assert!(store.get("weather:units:U1").unwrap().is_none());
        let calls = api.calls_for(ApiMethod::PostEphemeral);
        assert_eq!(calls[0]["text"], "Units must either be `f` or `c`. Got kelvin");
    }

    #[tokio::test]
    async fn test_setunits_requires_exactly_one_argument() {
        let (api, _store, app) = test_app();
        let ctx = message_context("setunits");
        SetUnits::new().run(&ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostEphemeral);
        assert_eq!(calls[0]["text"], "Expected a single argument (f/c)");
    }

    #[tokio::test]
    async fn test_setlocation_stores_joined_args() {
        let (api, store, app) = test_app();
        let ctx = message_context("setlocation New York");
        SetLocation::new().run(&ctx, &app).await.unwrap();

        assert_eq!(
            store.get("weather:location:U1").unwrap().unwrap(),
            "New York"
        );
        let calls = api.calls_for(ApiMethod::PostEphemeral);
        assert_eq!(calls[0]["text"], "Set default location to New York");
    }

    #[tokio::test]
    async fn test_weather_caches_forecasts_between_requests() {
        let (api, _store, app) = test_app();
        let stub = Arc::new(StubForecastApi::new());
        let weather = Weather::with_client(stub.clone());

        let ctx = message_context("weather 10001");
        Trigger::run(&weather, &ctx, &app).await.unwrap();
        Trigger::run(&weather, &ctx, &app).await.unwrap();

        // Second request is served from the cached raw forecast.
        assert_eq!(stub.fetches(), 1);
        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1]["blocks"][0]["text"]["text"],
            "*Forecast for New York*"
        );
    }

    #[tokio::test]
    async fn test_weather_reports_unknown_location() {
        let (api, _store, app) = test_app();
        let weather = Weather::with_client(Arc::new(StubForecastApi::with_no_match()));

        let ctx = message_context("weather nowhere");
        Trigger::run(&weather, &ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "Location `nowhere` not found");
    }

    #[tokio::test]
    async fn test_interact_rerenders_through_response_url() {
        let (api, _store, app) = test_app();
        let weather = Weather::with_client(Arc::new(StubForecastApi::new()));

        let payload = InteractivePayload::new(json!({
            "team": {"id": "T1"},
            "response_url": "https://hooks.example/abc",
            "actions": [{"action_id": "weather:si", "value": "10001"}],
        }))
        .unwrap();
        let action = &payload.actions()[0];
        weather.interact(&payload, action, &app).await.unwrap();

        let responses = api.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].0, "https://hooks.example/abc");
        let body = &responses[0].1;
        assert_eq!(body["replace_original"], true);
        assert_eq!(body["blocks"][1]["elements"][0]["action_id"], "weather:si");
    }

    #[test]
    fn test_weather_actions_are_relevant_to_weather_only() {
        let weather = Weather::new();
        let refresh: SlackAction =
            serde_json::from_value(json!({ "action_id": "weather:si", "value": "10001" })).unwrap();
        assert!(weather.is_action_relevant(&refresh));

        let other: SlackAction =
            serde_json::from_value(json!({ "action_id": "poke:reset", "value": "x" })).unwrap();
        assert!(!weather.is_action_relevant(&other));
    }
}
