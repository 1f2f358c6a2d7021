//! Messaging API collaborator.
//!
//! The engine only sees the small method set below and a boolean success
//! indicator per call; transport details stay inside the client. Calling a
//! method without one of its required arguments is a programming error and
//! is rejected before anything goes over the wire.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::payload::OutboundMessage;

const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    PostMessage,
    PostEphemeral,
    UpdateMessage,
    OpenIm,
    AddReaction,
}

impl ApiMethod {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiMethod::PostMessage => "chat.postMessage",
            ApiMethod::PostEphemeral => "chat.postEphemeral",
            ApiMethod::UpdateMessage => "chat.update",
            ApiMethod::OpenIm => "im.open",
            ApiMethod::AddReaction => "reactions.add",
        }
    }

    pub fn required_args(&self) -> &'static [&'static str] {
        match self {
            ApiMethod::PostMessage => &["channel"],
            ApiMethod::PostEphemeral => &["channel", "user"],
            ApiMethod::UpdateMessage => &["channel", "ts"],
            ApiMethod::OpenIm => &["user"],
            ApiMethod::AddReaction => &["name", "channel", "timestamp"],
        }
    }

    /// Reject a call that omits a required argument.
    pub fn validate(&self, args: &Value) -> Result<()> {
        for required in self.required_args() {
            if args.get(required).map_or(true, Value::is_null) {
                bail!(
                    "method `{}` requires argument `{}`",
                    self.endpoint(),
                    required
                );
            }
        }
        Ok(())
    }
}

/// Decoded API call result. `ok` folds together transport success and the
/// body-level `ok` flag; the raw body stays available for failure reporting.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    ok: bool,
    body: Value,
}

impl ApiResponse {
    pub fn new(transport_ok: bool, body: Value) -> Self {
        let ok = transport_ok && body["ok"].as_bool() == Some(true);
        Self { ok, body }
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Channel id of an `im.open` response.
    pub fn channel_id(&self) -> Option<&str> {
        self.body["channel"]["id"].as_str()
    }
}

#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn call(&self, method: ApiMethod, args: Value) -> Result<ApiResponse>;

    /// Post to an interaction's response URL (used with `replace_original`).
    async fn respond(&self, response_url: &str, args: Value) -> Result<ApiResponse>;

    async fn post_message(&self, message: &OutboundMessage) -> Result<ApiResponse> {
        self.call(ApiMethod::PostMessage, serde_json::to_value(message)?)
            .await
    }

    async fn post_ephemeral(&self, message: &OutboundMessage) -> Result<ApiResponse> {
        self.call(ApiMethod::PostEphemeral, serde_json::to_value(message)?)
            .await
    }

    async fn update_message(&self, message: &OutboundMessage) -> Result<ApiResponse> {
        self.call(ApiMethod::UpdateMessage, serde_json::to_value(message)?)
            .await
    }

    async fn open_im(&self, user: &str) -> Result<ApiResponse> {
        self.call(ApiMethod::OpenIm, json!({ "user": user })).await
    }

    async fn add_reaction(&self, name: &str, channel: &str, timestamp: &str) -> Result<ApiResponse> {
        self.call(
            ApiMethod::AddReaction,
            json!({ "name": name, "channel": channel, "timestamp": timestamp }),
        )
        .await
    }
}

/// Bearer-token Web API client.
pub struct SlackApi {
    bot_token: String,
    client: reqwest::Client,
}

impl SlackApi {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MessagingApi for SlackApi {
    async fn call(&self, method: ApiMethod, args: Value) -> Result<ApiResponse> {
        method.validate(&args)?;
        let resp = self
            .client
            .post(format!("{}/{}", SLACK_API_BASE, method.endpoint()))
            .bearer_auth(&self.bot_token)
            .json(&args)
            .send()
            .await?;
        let transport_ok = resp.status().is_success();
        let body: Value = resp.json().await?;
        let response = ApiResponse::new(transport_ok, body);
        if !response.ok() {
            warn!(
                method = method.endpoint(),
                body = %response.body(),
                "API call reported failure"
            );
        }
        Ok(response)
    }

    async fn respond(&self, response_url: &str, args: Value) -> Result<ApiResponse> {
        let resp = self.client.post(response_url).json(&args).send().await?;
        let transport_ok = resp.status().is_success();
        let body: Value = resp.json().await.unwrap_or_else(|_| json!({"ok": transport_ok}));
        Ok(ApiResponse::new(transport_ok, body))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(ApiMethod::PostMessage.endpoint(), "chat.postMessage");
        assert_eq!(ApiMethod::OpenIm.endpoint(), "im.open");
    }

    #[test]
    fn test_validate_rejects_missing_required_argument() {
        let err = ApiMethod::PostEphemeral
            .validate(&json!({"channel": "C1", "text": "hi"}))
            .unwrap_err();
        assert!(err.to_string().contains("requires argument `user`"));
    }

    #[test]
    fn test_validate_rejects_null_argument() {
        assert!(ApiMethod::OpenIm.validate(&json!({"user": null})).is_err());
        assert!(ApiMethod::OpenIm.validate(&json!({"user": "U1"})).is_ok());
    }

    #[test]
    fn test_response_ok_requires_body_flag() {
        assert!(ApiResponse::new(true, json!({"ok": true})).ok());
        assert!(!ApiResponse::new(true, json!({"ok": false})).ok());
        assert!(!ApiResponse::new(false, json!({"ok": true})).ok());
        assert!(!ApiResponse::new(true, json!({})).ok());
    }

    #[test]
    fn test_im_open_channel_id_accessor() {
        let response = ApiResponse::new(true, json!({"ok": true, "channel": {"id": "D77"}}));
        assert_eq!(response.channel_id(), Some("D77"));
    }

    #[tokio::test]
    async fn test_recording_api_validates_and_records() {
        let api = mock::RecordingApi::new();
        let message = OutboundMessage::text("hi").with_channel("C1");
        api.post_message(&message).await.unwrap();
        assert_eq!(api.calls_for(ApiMethod::PostMessage).len(), 1);

        // Ephemeral without a user is a programming error.
        let bare = OutboundMessage::text("hi").with_channel("C1");
        assert!(api.post_ephemeral(&bare).await.is_err());
    }
}
