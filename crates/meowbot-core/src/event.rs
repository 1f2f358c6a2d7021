//! Typed view over one inbound Slack event.
//!
//! The raw events API payload is a loosely-shaped JSON object; this module
//! pins down the fields the engine reads. Every accessor returns an `Option`
//! instead of reaching into the map dynamically, so a missing field is an
//! ordinary value rather than a runtime surprise.

use serde::Deserialize;

/// Subtypes that mark an event as bot-originated or an edit/delete of an
/// earlier message. Command conditions never fire on these.
pub const SKIPPED_SUBTYPES: [&str; 3] = ["bot_message", "message_changed", "message_deleted"];

/// One inbound message or reaction notification. Constructed once per
/// request and read-only for the lifetime of dispatch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    reaction: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
    /// Parent item of a reaction event.
    #[serde(default)]
    item: Option<ReactionItem>,
    /// Embedded replacement payload of a `message_changed` event.
    #[serde(default)]
    message: Option<EditedMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionItem {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditedMessage {
    #[serde(default)]
    pub text: Option<String>,
}

impl Event {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Message text. An edited message carries its current text inside the
    /// embedded replacement payload, not at the top level.
    pub fn text(&self) -> Option<&str> {
        if self.subtype.as_deref() == Some("message_changed") {
            return self.message.as_ref().and_then(|m| m.text.as_deref());
        }
        self.text.as_deref()
    }

    /// Channel the event happened in. Reactions report it on the parent item.
    pub fn channel(&self) -> Option<&str> {
        if self.kind == "reaction_added" {
            return self.item.as_ref().and_then(|i| i.channel.as_deref());
        }
        self.channel.as_deref()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn ts(&self) -> Option<&str> {
        self.ts.as_deref()
    }

    pub fn thread_ts(&self) -> Option<&str> {
        self.thread_ts.as_deref()
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id.as_deref()
    }

    pub fn reaction(&self) -> Option<&str> {
        self.reaction.as_deref()
    }

    pub fn channel_type(&self) -> Option<&str> {
        self.channel_type.as_deref()
    }

    pub fn is_direct_message(&self) -> bool {
        self.channel_type.as_deref() == Some("im")
    }

    /// True for bot-originated, edited, or deleted message variants.
    pub fn has_skipped_subtype(&self) -> bool {
        self.subtype
            .as_deref()
            .is_some_and(|s| SKIPPED_SUBTYPES.contains(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> Event {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_message_fields() {
        let e = event(json!({
            "type": "message",
            "text": "hello",
            "channel": "C1",
            "user": "U1",
            "ts": "111.222",
        }));
        assert_eq!(e.kind(), "message");
        assert_eq!(e.text(), Some("hello"));
        assert_eq!(e.channel(), Some("C1"));
        assert_eq!(e.thread_ts(), None);
        assert!(!e.has_skipped_subtype());
    }

    #[test]
    fn test_edited_message_reads_embedded_text() {
        let e = event(json!({
            "type": "message",
            "subtype": "message_changed",
            "text": "stale top-level text",
            "message": {"text": "edited text"},
        }));
        assert_eq!(e.text(), Some("edited text"));
        assert!(e.has_skipped_subtype());
    }

    #[test]
    fn test_reaction_channel_comes_from_item() {
        let e = event(json!({
            "type": "reaction_added",
            "reaction": "cat",
            "item": {"channel": "C9", "ts": "1.2"},
        }));
        assert_eq!(e.channel(), Some("C9"));
        assert_eq!(e.reaction(), Some("cat"));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let e = event(json!({"type": "message"}));
        assert_eq!(e.text(), None);
        assert_eq!(e.channel(), None);
        assert_eq!(e.user(), None);
        assert_eq!(e.bot_id(), None);
    }

    #[test]
    fn test_direct_message_detection() {
        let e = event(json!({"type": "message", "channel_type": "im"}));
        assert!(e.is_direct_message());
        let e = event(json!({"type": "message", "channel_type": "channel"}));
        assert!(!e.is_direct_message());
    }
}
