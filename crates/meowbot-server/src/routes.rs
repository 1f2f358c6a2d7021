//! Webhook ingestion and OAuth install endpoints.
//!
//! Ingestion acknowledges immediately: after the token check each event or
//! interaction becomes one spawned task with its own collaborator set, and
//! that task is where dispatch failures get logged.

use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use meowbot_core::{
    AppContext, CommandContext, Dispatcher, InteractivePayload, MessagingApi, SlackApi,
    TriggerRegistry,
};
use meowbot_storage::{AccessToken, Storage};

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub registry: Arc<TriggerRegistry>,
    pub dispatcher: Dispatcher,
}

pub type SharedState = Arc<AppState>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "meowbot is working!" }))
}

fn token_valid(state: &AppState, data: &Value) -> bool {
    data["token"].as_str() == Some(state.config.slack_verification_token.as_str())
}

/// Build the per-unit-of-work collaborator set, or None for a workspace
/// that never installed the bot.
fn app_context(state: &SharedState, team_id: &str) -> anyhow::Result<Option<AppContext>> {
    let Some(bot_token) = state.storage.tokens.bot_token(team_id)? else {
        info!(team_id, "no install record, dropping event");
        return Ok(None);
    };
    let api: Arc<dyn MessagingApi> = Arc::new(SlackApi::new(bot_token));
    Ok(Some(AppContext {
        api,
        store: Arc::new(state.storage.kv.clone()),
        config: state.config.bot_config(),
        registry: state.registry.clone(),
    }))
}

pub async fn meow(State(state): State<SharedState>, Json(data): Json<Value>) -> Response {
    if !token_valid(&state, &data) {
        return (StatusCode::BAD_REQUEST, "Invalid token.").into_response();
    }
    if data["type"] == "url_verification" {
        return Json(json!({ "challenge": data["challenge"] })).into_response();
    }
    tokio::spawn(handle_event(state, data));
    StatusCode::OK.into_response()
}

async fn handle_event(state: SharedState, data: Value) {
    let ctx = match CommandContext::new(data) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%err, "discarding malformed event");
            return;
        }
    };
    debug!(payload = %ctx.redacted_payload(), "inbound event");
    let app = match app_context(&state, ctx.team_id()) {
        Ok(Some(app)) => app,
        Ok(None) => return,
        Err(err) => {
            error!(%err, "token lookup failed");
            return;
        }
    };
    match state.dispatcher.dispatch(&ctx, &app).await {
        Ok(fired) if !fired.is_empty() => debug!(triggers = ?fired, "dispatch complete"),
        Ok(_) => {}
        Err(err) => error!(%err, "dispatch failed"),
    }
}

#[derive(Deserialize)]
pub struct InteractiveForm {
    payload: String,
}

pub async fn interactive(
    State(state): State<SharedState>,
    Form(form): Form<InteractiveForm>,
) -> Response {
    let data: Value = match serde_json::from_str(&form.payload) {
        Ok(data) => data,
        Err(err) => {
            warn!(%err, "discarding malformed interaction payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if !token_valid(&state, &data) {
        return (StatusCode::BAD_REQUEST, "Invalid token.").into_response();
    }
    tokio::spawn(handle_interaction(state, data));
    StatusCode::OK.into_response()
}

async fn handle_interaction(state: SharedState, data: Value) {
    let payload = match InteractivePayload::new(data) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(%err, "discarding malformed interaction payload");
            return;
        }
    };
    let app = match app_context(&state, payload.team_id()) {
        Ok(Some(app)) => app,
        Ok(None) => return,
        Err(err) => {
            error!(%err, "token lookup failed");
            return;
        }
    };
    match state.dispatcher.dispatch_interaction(&payload, &app).await {
        Ok(handled) if !handled.is_empty() => debug!(triggers = ?handled, "interaction handled"),
        Ok(_) => {}
        Err(err) => error!(%err, "interaction dispatch failed"),
    }
}

#[derive(Deserialize)]
pub struct AuthorizeQuery {
    #[serde(default)]
    code: String,
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// OAuth install callback: exchange the temporary code for tokens and
/// persist the workspace record.
pub async fn authorize(
    State(state): State<SharedState>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    let mut params = vec![
        ("client_id", state.config.client_id.clone()),
        ("client_secret", state.config.client_secret.clone()),
        ("code", query.code),
    ];
    if let Some(redirect_uri) = query.redirect_uri {
        params.push(("redirect_uri", redirect_uri));
    }
    let body = match oauth_access(&params).await {
        Ok(body) => body,
        Err(err) => {
            error!(%err, "oauth.access exchange failed");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };
    if body["ok"] != json!(true) {
        error!(body = %body, "oauth.access rejected");
        return Html(format!(
            "Failure :(<br/>{}",
            body["error"].as_str().unwrap_or("unknown")
        ))
        .into_response();
    }
    let token = AccessToken {
        team_id: body["team_id"].as_str().unwrap_or_default().to_string(),
        team_name: body["team_name"].as_str().unwrap_or_default().to_string(),
        user_id: body["user_id"].as_str().unwrap_or_default().to_string(),
        scope: body["scope"].as_str().unwrap_or_default().to_string(),
        access_token: body["access_token"].as_str().unwrap_or_default().to_string(),
        bot_user_id: body["bot"]["bot_user_id"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        bot_access_token: body["bot"]["bot_access_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    };
    if let Err(err) = state.storage.tokens.save(&token) {
        error!(%err, "failed to persist install record");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Html("Success!".to_string()).into_response()
}

async fn oauth_access(params: &[(&str, String)]) -> anyhow::Result<Value> {
    let body = reqwest::Client::new()
        .post("https://slack.com/api/oauth.access")
        .form(params)
        .send()
        .await?
        .json()
        .await?;
    Ok(body)
}
